//! Waypoint Collection
//!
//! Single source of truth for the waypoints in this session. Every mutation
//! queues change events; the marker projection drains them and redraws only
//! the markers whose backing record changed.

use chrono::{DateTime, Utc};

use crate::domain::{
    is_default_ish, is_default_location, positional_label, Coordinates, LocalId, ServerId,
    SurveyError, SurveyResult, Waypoint, WaypointDraft, WaypointPatch, DEFAULT_LOCATION_NAME,
};

/// What changed, per record
#[derive(Debug, Clone, PartialEq)]
pub enum CollectionEvent {
    Added(LocalId),
    /// Coordinates changed
    Moved(LocalId),
    /// Display name changed, including positional renumbering
    Relabeled(LocalId),
    Removed(LocalId),
}

#[derive(Debug, Default)]
pub struct WaypointCollection {
    records: Vec<Waypoint>,
    next_id: u64,
    events: Vec<CollectionEvent>,
}

impl WaypointCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Waypoint> {
        self.records.iter()
    }

    /// Records in display order
    pub fn records(&self) -> &[Waypoint] {
        &self.records
    }

    pub fn get(&self, local_id: &LocalId) -> Option<&Waypoint> {
        self.records.iter().find(|wp| wp.local_id == *local_id)
    }

    pub fn contains(&self, local_id: &LocalId) -> bool {
        self.index_of(local_id).is_some()
    }

    pub fn index_of(&self, local_id: &LocalId) -> Option<usize> {
        self.records.iter().position(|wp| wp.local_id == *local_id)
    }

    pub fn default_location(&self) -> Option<&Waypoint> {
        self.records.iter().find(|wp| wp.is_default_location())
    }

    /// First record within `tolerance` degrees of `coordinates`
    pub fn find_near(&self, coordinates: &Coordinates, tolerance: f64) -> Option<&Waypoint> {
        self.records
            .iter()
            .find(|wp| wp.coordinates.is_near(coordinates, tolerance))
    }

    /// Append a record and renumber positional labels
    pub fn add(&mut self, draft: WaypointDraft) -> LocalId {
        let local_id = self.push(draft);
        self.renumber();
        local_id
    }

    /// Append many records with a single renumbering pass
    pub fn add_batch(&mut self, drafts: Vec<WaypointDraft>) -> Vec<LocalId> {
        let ids = drafts.into_iter().map(|draft| self.push(draft)).collect();
        self.renumber();
        ids
    }

    /// Merge `patch` into a record.
    ///
    /// Renaming the sentinel fails with `Protected`; naming a second record
    /// "Default Location" is rejected.
    pub fn update(&mut self, local_id: &LocalId, patch: &WaypointPatch) -> SurveyResult<()> {
        let index = self
            .index_of(local_id)
            .ok_or_else(|| SurveyError::NotFound(local_id.clone()))?;
        self.check_rename(index, patch)?;

        let record = &mut self.records[index];
        let before = (record.coordinates, record.name.clone());
        record.apply_fields(patch);
        record.revision += 1;

        if record.coordinates != before.0 {
            self.events.push(CollectionEvent::Moved(local_id.clone()));
        }
        if record.name != before.1 {
            self.events.push(CollectionEvent::Relabeled(local_id.clone()));
        }
        self.renumber();
        Ok(())
    }

    /// Remove a record; the sentinel default location is protected
    pub fn remove(&mut self, local_id: &LocalId) -> SurveyResult<Waypoint> {
        let index = self.check_removable(local_id)?;
        let removed = self.records.remove(index);
        self.events.push(CollectionEvent::Removed(local_id.clone()));
        self.renumber();
        Ok(removed)
    }

    /// Index of a record that `remove` would accept
    pub fn check_removable(&self, local_id: &LocalId) -> SurveyResult<usize> {
        let index = self
            .index_of(local_id)
            .ok_or_else(|| SurveyError::NotFound(local_id.clone()))?;
        if self.records[index].is_default_location() {
            return Err(SurveyError::Protected);
        }
        Ok(index)
    }

    /// The record as it would look with `patch` applied, labelled for its
    /// current position. Nothing is mutated.
    pub fn preview(&self, local_id: &LocalId, patch: &WaypointPatch) -> SurveyResult<Waypoint> {
        let index = self
            .index_of(local_id)
            .ok_or_else(|| SurveyError::NotFound(local_id.clone()))?;
        self.check_rename(index, patch)?;

        let mut view = self.records[index].patched(patch);
        if !view.custom_name && !view.is_default_location() {
            view.name = positional_label(index);
        }
        Ok(view)
    }

    /// Drain pending change events
    pub fn drain_events(&mut self) -> Vec<CollectionEvent> {
        std::mem::take(&mut self.events)
    }

    pub(crate) fn set_server_id(&mut self, local_id: &LocalId, server_id: ServerId) {
        if let Some(record) = self.records.iter_mut().find(|wp| wp.local_id == *local_id) {
            record.server_id = Some(server_id);
        }
    }

    pub(crate) fn set_timestamps(
        &mut self,
        local_id: &LocalId,
        created_at: Option<DateTime<Utc>>,
        updated_at: Option<DateTime<Utc>>,
    ) {
        if let Some(record) = self.records.iter_mut().find(|wp| wp.local_id == *local_id) {
            record.created_at = created_at.or(record.created_at);
            record.updated_at = updated_at.or(record.updated_at);
        }
    }

    /// Write a saved snapshot back, but only if the record has not been
    /// mutated since the snapshot was taken. Returns whether it was applied.
    pub(crate) fn commit_snapshot(&mut self, snapshot: &Waypoint, expected_revision: u64) -> bool {
        let Some(index) = self.index_of(&snapshot.local_id) else {
            return false;
        };
        let record = &mut self.records[index];
        if record.revision != expected_revision {
            return false;
        }

        if record.coordinates != snapshot.coordinates {
            self.events
                .push(CollectionEvent::Moved(snapshot.local_id.clone()));
        }
        if record.name != snapshot.name {
            self.events
                .push(CollectionEvent::Relabeled(snapshot.local_id.clone()));
        }
        record.coordinates = snapshot.coordinates;
        record.name = snapshot.name.clone();
        record.custom_name = snapshot.custom_name;
        record.notes = snapshot.notes.clone();
        record.image_url = snapshot.image_url.clone();
        record.revision += 1;
        self.renumber();
        true
    }

    /// Turn the sentinel `local_id` into an ordinary positional point, so a
    /// persisted sentinel can take its place
    pub(crate) fn demote_default_location(&mut self, local_id: &LocalId) -> SurveyResult<()> {
        let index = self
            .index_of(local_id)
            .filter(|&i| self.records[i].is_default_location())
            .ok_or_else(|| SurveyError::NotFound(local_id.clone()))?;

        let record = &mut self.records[index];
        record.name = positional_label(index);
        record.custom_name = false;
        record.revision += 1;
        self.events.push(CollectionEvent::Relabeled(local_id.clone()));
        self.renumber();
        Ok(())
    }

    fn push(&mut self, draft: WaypointDraft) -> LocalId {
        self.next_id += 1;
        let local_id = LocalId::from_counter(self.next_id);

        let supplied = draft.name.as_deref().map(str::trim).unwrap_or("");
        let (name, custom_name) = if is_default_location(supplied) {
            if self.default_location().is_some() {
                // Only one sentinel per session; the newcomer becomes a plain point
                (String::new(), false)
            } else {
                (DEFAULT_LOCATION_NAME.to_string(), true)
            }
        } else if is_default_ish(supplied) {
            (String::new(), false)
        } else {
            (supplied.to_string(), true)
        };

        self.records.push(Waypoint {
            local_id: local_id.clone(),
            server_id: None,
            coordinates: draft.coordinates,
            name,
            custom_name,
            notes: draft.notes,
            image_url: draft.image_url,
            created_at: draft.created_at,
            updated_at: draft.updated_at,
            revision: 0,
        });
        self.events.push(CollectionEvent::Added(local_id.clone()));
        local_id
    }

    fn check_rename(&self, index: usize, patch: &WaypointPatch) -> SurveyResult<()> {
        let Some(name) = &patch.name else {
            return Ok(());
        };
        let record = &self.records[index];
        if record.is_default_location() {
            if is_default_location(name) {
                return Ok(());
            }
            return Err(SurveyError::Protected);
        }
        if is_default_location(name) && self.default_location().is_some() {
            return Err(SurveyError::ValidationRejected(format!(
                "\"{}\" already exists",
                DEFAULT_LOCATION_NAME
            )));
        }
        Ok(())
    }

    /// Keep positional labels contiguous: record i is "Point i+1"
    fn renumber(&mut self) {
        for (index, record) in self.records.iter_mut().enumerate() {
            if record.custom_name || record.is_default_location() {
                continue;
            }
            let label = positional_label(index);
            if record.name != label {
                let was_labelled = !record.name.is_empty();
                record.name = label;
                if was_labelled {
                    self.events
                        .push(CollectionEvent::Relabeled(record.local_id.clone()));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn at(lat: f64, lng: f64) -> WaypointDraft {
        WaypointDraft::at(Coordinates::new(lat, lng).unwrap())
    }

    fn names(collection: &WaypointCollection) -> Vec<String> {
        collection.iter().map(|wp| wp.name.clone()).collect()
    }

    #[test]
    fn test_add_assigns_unique_ids_and_labels() {
        let mut collection = WaypointCollection::new();
        let a = collection.add(at(1.0, 1.0));
        let b = collection.add(at(2.0, 2.0));
        assert_ne!(a, b);
        assert_eq!(names(&collection), vec!["Point 1", "Point 2"]);
    }

    #[test]
    fn test_remove_renumbers_in_relative_order() {
        let mut collection = WaypointCollection::new();
        let ids: Vec<LocalId> = (0..5).map(|i| collection.add(at(i as f64, 0.0))).collect();

        collection.remove(&ids[1]).unwrap();

        assert_eq!(names(&collection), vec!["Point 1", "Point 2", "Point 3", "Point 4"]);
        let remaining: Vec<f64> = collection.iter().map(|wp| wp.coordinates.lat).collect();
        assert_eq!(remaining, vec![0.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_custom_names_survive_renumbering() {
        let mut collection = WaypointCollection::new();
        let first = collection.add(at(0.0, 0.0));
        collection.add(at(1.0, 0.0).named("Camp"));
        collection.add(at(2.0, 0.0));

        collection.remove(&first).unwrap();
        assert_eq!(names(&collection), vec!["Camp", "Point 2"]);
    }

    #[test]
    fn test_demoted_sentinel_becomes_positional() {
        let mut collection = WaypointCollection::new();
        collection.add(at(0.0, 0.0));
        let home = collection.add(at(1.0, 1.0).named("Default Location"));
        collection.drain_events();

        collection.demote_default_location(&home).unwrap();
        assert_eq!(names(&collection), vec!["Point 1", "Point 2"]);
        assert!(collection.default_location().is_none());
        assert_eq!(collection.drain_events(), vec![CollectionEvent::Relabeled(home.clone())]);
        collection.remove(&home).unwrap();

        let plain = collection.add(at(2.0, 2.0));
        assert_eq!(
            collection.demote_default_location(&plain),
            Err(SurveyError::NotFound(plain.clone()))
        );
    }

    #[test]
    fn test_remove_unknown_is_not_found_and_unchanged() {
        let mut collection = WaypointCollection::new();
        collection.add(at(0.0, 0.0));
        collection.drain_events();

        let missing = LocalId::from_counter(99);
        assert_eq!(collection.remove(&missing), Err(SurveyError::NotFound(missing)));
        assert_eq!(collection.len(), 1);
        assert!(collection.drain_events().is_empty());
    }

    #[test]
    fn test_default_location_is_protected() {
        let mut collection = WaypointCollection::new();
        let home = collection.add(at(0.0, 0.0).named("  default location "));
        assert_eq!(collection.get(&home).unwrap().name, "Default Location");

        assert_eq!(collection.remove(&home), Err(SurveyError::Protected));
        assert_eq!(
            collection.update(&home, &WaypointPatch::name("Home")),
            Err(SurveyError::Protected)
        );
        // Notes and coordinates stay editable
        collection.update(&home, &WaypointPatch::notes("gate code 1234")).unwrap();
        assert_eq!(collection.get(&home).unwrap().notes, "gate code 1234");
    }

    #[test]
    fn test_second_sentinel_is_demoted() {
        let mut collection = WaypointCollection::new();
        collection.add(at(0.0, 0.0).named("Default Location"));
        let dup = collection.add(at(1.0, 1.0).named("Default Location"));
        assert_eq!(collection.get(&dup).unwrap().name, "Point 2");
        assert!(collection.remove(&dup).is_ok());
    }

    #[test]
    fn test_update_emits_only_changed_record_events() {
        let mut collection = WaypointCollection::new();
        let a = collection.add(at(0.0, 0.0));
        let b = collection.add(at(1.0, 1.0));
        collection.drain_events();

        collection
            .update(&b, &WaypointPatch::coordinates(Coordinates::new(5.0, 5.0).unwrap()))
            .unwrap();
        assert_eq!(collection.drain_events(), vec![CollectionEvent::Moved(b.clone())]);

        collection.update(&a, &WaypointPatch::notes("quiet")).unwrap();
        assert!(collection.drain_events().is_empty());

        collection.update(&a, &WaypointPatch::name("Spring")).unwrap();
        assert_eq!(collection.drain_events(), vec![CollectionEvent::Relabeled(a)]);
    }

    #[test]
    fn test_update_bumps_revision() {
        let mut collection = WaypointCollection::new();
        let a = collection.add(at(0.0, 0.0));
        assert_eq!(collection.get(&a).unwrap().revision(), 0);
        collection.update(&a, &WaypointPatch::notes("x")).unwrap();
        assert_eq!(collection.get(&a).unwrap().revision(), 1);
    }

    #[test]
    fn test_default_ish_rename_returns_to_positional() {
        let mut collection = WaypointCollection::new();
        collection.add(at(0.0, 0.0));
        let b = collection.add(at(1.0, 0.0).named("Camp"));
        collection.update(&b, &WaypointPatch::name("Point 9")).unwrap();
        assert_eq!(collection.get(&b).unwrap().name, "Point 2");
    }

    #[test]
    fn test_preview_does_not_mutate() {
        let mut collection = WaypointCollection::new();
        let a = collection.add(at(0.0, 0.0));
        let view = collection.preview(&a, &WaypointPatch::notes("draft")).unwrap();
        assert_eq!(view.notes, "draft");
        assert_eq!(collection.get(&a).unwrap().notes, "");
    }

    #[test]
    fn test_commit_snapshot_skips_stale_revision() {
        let mut collection = WaypointCollection::new();
        let a = collection.add(at(0.0, 0.0));
        let snapshot = collection.preview(&a, &WaypointPatch::notes("old")).unwrap();
        let revision = collection.get(&a).unwrap().revision();

        collection.update(&a, &WaypointPatch::notes("newer")).unwrap();
        assert!(!collection.commit_snapshot(&snapshot, revision));
        assert_eq!(collection.get(&a).unwrap().notes, "newer");
    }

    #[test]
    fn test_find_near_uses_tolerance() {
        let mut collection = WaypointCollection::new();
        let a = collection.add(at(10.0, 10.0));
        let nearby = Coordinates::new(10.00005, 9.99995).unwrap();
        assert_eq!(collection.find_near(&nearby, 0.0001).map(|wp| wp.local_id.clone()), Some(a));
        let far = Coordinates::new(10.001, 10.0).unwrap();
        assert!(collection.find_near(&far, 0.0001).is_none());
    }
}
