//! Survey Controller
//!
//! Owns the collection, identity map, selection, marker projection and the
//! live-location watch, and runs every user-facing operation against them.
//! Suspension happens only at remote calls; state is re-checked after each.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::{
    is_default_location, Coordinates, ExportFormat, LocalId, ServerId, SurveyError, SurveyResult,
    Waypoint, WaypointDraft, WaypointPatch, WaypointPayload, WaypointRecord, DEFAULT_LOCATION_NAME,
};
use crate::geocoding::{Geocoder, Place};
use crate::location::{location_watch, LocationFeed, LocationFix, LocationWatch, DEFAULT_WATCH_CAPACITY};
use crate::markers::{CameraTarget, MarkerProjection, MarkerSurface, SINGLE_POINT_ZOOM};
use crate::media::{upload_with_retry, ImageUpload, UPLOAD_RETRY_DELAY};
use crate::notice::Notice;
use crate::repository::{ImageHost, RemoteStore};
use crate::routing::{Route, RoutingApi};
use crate::store::{IdentityMap, Selection, WaypointCollection};
use crate::transfer::{self, ExportFile};

/// A click this close (degrees, both axes) to a waypoint selects it
pub const CLICK_TOLERANCE_DEG: f64 = 0.0001;

pub const CURRENT_LOCATION_NAME: &str = "My Current Location";

const DEFAULT_LOCATION_NOTES: &str = "User-defined default location";

// ========================
// Save protocol
// ========================

/// Everything a save needs, captured at `begin_save`. Executing it borrows
/// no controller state, so the UI keeps running while it is in flight.
///
/// A ticket is single-use: `complete_save` and `cancel_save` take it by
/// value, and it cannot be cloned.
///
/// ```compile_fail
/// fn cloneable<T: Clone>() {}
/// cloneable::<waypoint_survey::SaveTicket>();
/// ```
#[derive(Debug)]
pub struct SaveTicket {
    local_id: LocalId,
    server_id: Option<ServerId>,
    payload: WaypointPayload,
    snapshot: Waypoint,
    included_edits: WaypointPatch,
    revision: u64,
}

impl SaveTicket {
    pub fn local_id(&self) -> &LocalId {
        &self.local_id
    }

    pub fn is_create(&self) -> bool {
        self.server_id.is_none()
    }

    pub fn payload(&self) -> &WaypointPayload {
        &self.payload
    }

    /// POST for unsaved records, PUT addressed to the known server id otherwise
    pub async fn execute(&self, store: &dyn RemoteStore) -> SurveyResult<WaypointRecord> {
        match &self.server_id {
            Some(id) => store.update(id, &self.payload).await,
            None => store.create(&self.payload).await,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SaveOutcome {
    pub local_id: LocalId,
    pub server_id: ServerId,
    pub created: bool,
    /// False when the record changed while the save was in flight; the
    /// newer local state is kept
    pub applied: bool,
}

impl SaveOutcome {
    pub fn notice(&self) -> Notice {
        Notice::saved(self.created)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportSummary {
    pub file_name: Option<String>,
    pub local_ids: Vec<LocalId>,
    pub camera: Option<CameraTarget>,
}

impl ImportSummary {
    pub fn notice(&self) -> Notice {
        Notice::imported(self.local_ids.len(), self.file_name.as_deref().unwrap_or("file"))
    }
}

// ========================
// Controller
// ========================

pub struct SurveyController<S: MarkerSurface> {
    collection: WaypointCollection,
    identity: IdentityMap,
    selection: Selection,
    markers: MarkerProjection<S>,
    store: Arc<dyn RemoteStore>,
    surveying: bool,
    creates_in_flight: HashSet<LocalId>,
    watch: Option<LocationWatch>,
    upload_retry_delay: Duration,
}

impl<S: MarkerSurface> SurveyController<S> {
    pub fn new(store: Arc<dyn RemoteStore>, surface: S) -> Self {
        Self {
            collection: WaypointCollection::new(),
            identity: IdentityMap::new(),
            selection: Selection::new(),
            markers: MarkerProjection::new(surface),
            store,
            surveying: false,
            creates_in_flight: HashSet::new(),
            watch: None,
            upload_retry_delay: UPLOAD_RETRY_DELAY,
        }
    }

    pub fn with_upload_retry_delay(mut self, delay: Duration) -> Self {
        self.upload_retry_delay = delay;
        self
    }

    pub fn collection(&self) -> &WaypointCollection {
        &self.collection
    }

    pub fn identity(&self) -> &IdentityMap {
        &self.identity
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn markers(&self) -> &MarkerProjection<S> {
        &self.markers
    }

    pub fn get(&self, local_id: &LocalId) -> Option<&Waypoint> {
        self.collection.get(local_id)
    }

    pub fn server_id(&self, local_id: &LocalId) -> Option<&ServerId> {
        self.identity.lookup(local_id)
    }

    /// The selected record as the editor shows it: stored record plus
    /// pending edits
    pub fn selected_view(&self) -> Option<Waypoint> {
        let id = self.selection.selected()?;
        self.collection.preview(id, self.selection.buffer()).ok()
    }

    fn redraw(&mut self) {
        self.markers.sync(&mut self.collection);
        self.markers.highlight(self.selection.selected());
    }

    // ------------------------
    // Survey mode and selection
    // ------------------------

    pub fn is_surveying(&self) -> bool {
        self.surveying
    }

    pub fn start_survey(&mut self) {
        self.surveying = true;
        tracing::info!("survey mode started");
    }

    /// Leave survey mode; any live-location watch is cancelled
    pub fn end_survey(&mut self) {
        self.surveying = false;
        self.stop_watch();
        tracing::info!("survey mode ended");
    }

    /// Map click. Selects a waypoint already under the click, otherwise
    /// drops a new one there.
    pub fn place_pin(&mut self, coordinates: Coordinates) -> SurveyResult<LocalId> {
        if !self.surveying {
            return Err(SurveyError::NotSurveying);
        }
        let local_id = match self.collection.find_near(&coordinates, CLICK_TOLERANCE_DEG) {
            Some(existing) => existing.local_id.clone(),
            None => self.collection.add(WaypointDraft::at(coordinates)),
        };
        self.selection.select(local_id.clone());
        self.redraw();
        Ok(local_id)
    }

    /// Add a waypoint without survey mode (scripts and tests)
    pub fn add(&mut self, draft: WaypointDraft) -> LocalId {
        let local_id = self.collection.add(draft);
        self.redraw();
        local_id
    }

    pub fn select(&mut self, local_id: &LocalId) -> SurveyResult<()> {
        if !self.collection.contains(local_id) {
            return Err(SurveyError::NotFound(local_id.clone()));
        }
        self.selection.select(local_id.clone());
        self.redraw();
        Ok(())
    }

    pub fn deselect(&mut self) {
        self.selection.deselect();
        self.redraw();
    }

    // ------------------------
    // Editing
    // ------------------------

    /// Layer `patch` into the selected record's edit buffer. Rejected edits
    /// leave the buffer untouched.
    pub fn edit(&mut self, patch: WaypointPatch) -> SurveyResult<()> {
        let id = self
            .selection
            .selected()
            .cloned()
            .ok_or(SurveyError::NothingSelected)?;
        let mut pending = self.selection.buffer().clone();
        pending.merge(patch.clone());
        self.collection.preview(&id, &pending)?;
        self.selection.edit(patch);
        Ok(())
    }

    pub fn edit_name(&mut self, name: impl Into<String>) -> SurveyResult<()> {
        self.edit(WaypointPatch::name(name))
    }

    pub fn edit_notes(&mut self, notes: impl Into<String>) -> SurveyResult<()> {
        self.edit(WaypointPatch::notes(notes))
    }

    pub fn edit_coordinates(&mut self, lat: f64, lng: f64) -> SurveyResult<()> {
        self.edit(WaypointPatch::coordinates(Coordinates::new(lat, lng)?))
    }

    pub fn edit_image(&mut self, image_url: Option<String>) -> SurveyResult<()> {
        self.edit(WaypointPatch {
            image_url: Some(image_url),
            ..Default::default()
        })
    }

    /// Apply a patch straight to the stored record, bypassing the buffer
    pub fn update(&mut self, local_id: &LocalId, patch: &WaypointPatch) -> SurveyResult<()> {
        self.collection.update(local_id, patch)?;
        self.redraw();
        Ok(())
    }

    // ------------------------
    // Save
    // ------------------------

    /// Snapshot the record (with pending edits when selected) and decide
    /// between create and update.
    pub fn begin_save(&mut self, local_id: &LocalId) -> SurveyResult<SaveTicket> {
        let record = self
            .collection
            .get(local_id)
            .ok_or_else(|| SurveyError::NotFound(local_id.clone()))?;
        let revision = record.revision();

        let server_id = self.identity.lookup(local_id).cloned();
        if server_id.is_none() && self.creates_in_flight.contains(local_id) {
            return Err(SurveyError::SaveInFlight(local_id.clone()));
        }

        let included_edits = if self.selection.is_selected(local_id) {
            self.selection.buffer().clone()
        } else {
            WaypointPatch::default()
        };
        let snapshot = self.collection.preview(local_id, &included_edits)?;

        if server_id.is_none() {
            self.creates_in_flight.insert(local_id.clone());
        }
        tracing::debug!(%local_id, create = server_id.is_none(), "save started");

        Ok(SaveTicket {
            local_id: local_id.clone(),
            server_id,
            payload: snapshot.to_payload(),
            snapshot,
            included_edits,
            revision,
        })
    }

    /// Fold a finished remote call back into local state.
    ///
    /// A record deleted while its save was in flight is not resurrected and
    /// its identity is not recorded; the call reports `NotFound`.
    pub fn complete_save(
        &mut self,
        ticket: SaveTicket,
        result: SurveyResult<WaypointRecord>,
    ) -> SurveyResult<SaveOutcome> {
        let local_id = ticket.local_id.clone();
        self.creates_in_flight.remove(&local_id);

        let record = result.map_err(|e| {
            tracing::warn!(%local_id, error = %e, "save failed");
            e
        })?;

        if !self.collection.contains(&local_id) {
            tracing::warn!(%local_id, server_id = %record.id, "record removed during save, result discarded");
            return Err(SurveyError::NotFound(local_id));
        }

        let created = ticket.server_id.is_none();
        let server_id = match ticket.server_id {
            Some(id) => id,
            None => {
                self.identity.record(local_id.clone(), record.id.clone());
                self.collection.set_server_id(&local_id, record.id.clone());
                record.id.clone()
            }
        };

        let applied = self.collection.commit_snapshot(&ticket.snapshot, ticket.revision);
        self.collection
            .set_timestamps(&local_id, record.created_at, record.updated_at);

        if applied
            && self.selection.is_selected(&local_id)
            && *self.selection.buffer() == ticket.included_edits
        {
            self.selection.clear_buffer();
        }
        self.redraw();

        tracing::info!(%local_id, %server_id, created, applied, "waypoint saved");
        Ok(SaveOutcome {
            local_id,
            server_id,
            created,
            applied,
        })
    }

    /// Abandon a ticket that will never be executed
    pub fn cancel_save(&mut self, ticket: SaveTicket) {
        self.creates_in_flight.remove(&ticket.local_id);
    }

    pub async fn save(&mut self, local_id: &LocalId) -> SurveyResult<SaveOutcome> {
        let ticket = self.begin_save(local_id)?;
        let store = Arc::clone(&self.store);
        let result = ticket.execute(store.as_ref()).await;
        self.complete_save(ticket, result)
    }

    pub async fn save_selected(&mut self) -> SurveyResult<SaveOutcome> {
        let id = self
            .selection
            .selected()
            .cloned()
            .ok_or(SurveyError::NothingSelected)?;
        self.save(&id).await
    }

    // ------------------------
    // Remove
    // ------------------------

    /// Delete remotely (when persisted), then locally. Returns whether a
    /// remote delete was issued. A failed remote delete leaves everything
    /// in place.
    pub async fn remove(&mut self, local_id: &LocalId) -> SurveyResult<bool> {
        self.collection.check_removable(local_id)?;

        let persisted = self.identity.lookup(local_id).cloned();
        if let Some(server_id) = &persisted {
            let store = Arc::clone(&self.store);
            store.delete(server_id).await.map_err(|e| {
                tracing::warn!(%local_id, %server_id, error = %e, "remote delete failed");
                e
            })?;
        }

        // The record may have gone while the delete was in flight
        match self.collection.remove(local_id) {
            Ok(_) | Err(SurveyError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }
        self.identity.remove(local_id);
        self.selection.on_removed(local_id);
        if self.watch.as_ref().map(|w| w.target()) == Some(local_id) {
            self.stop_watch();
        }
        self.redraw();

        tracing::info!(%local_id, persisted = persisted.is_some(), "waypoint removed");
        Ok(persisted.is_some())
    }

    // ------------------------
    // Import / export
    // ------------------------

    /// Append decoded records in one pass, select the first and report where
    /// the camera should go
    pub fn import_batch(&mut self, drafts: Vec<WaypointDraft>) -> ImportSummary {
        let points: Vec<Coordinates> = drafts.iter().map(|d| d.coordinates).collect();
        let local_ids = self.collection.add_batch(drafts);

        if let Some(first) = local_ids.first() {
            self.selection.select(first.clone());
        }
        let camera = CameraTarget::covering(&points);
        self.redraw();
        if let Some(target) = camera {
            self.markers.focus(target);
        }

        tracing::info!(count = local_ids.len(), "imported waypoints");
        ImportSummary {
            file_name: None,
            local_ids,
            camera,
        }
    }

    pub fn import_file(&mut self, file_name: &str, contents: &str) -> SurveyResult<ImportSummary> {
        let imported = transfer::import(file_name, contents)?;
        if !imported.drafts.is_empty() {
            self.start_survey();
        }
        let mut summary = self.import_batch(imported.drafts);
        summary.file_name = Some(file_name.to_string());
        Ok(summary)
    }

    /// Export the collection as it currently stands
    pub fn export(&self, format: ExportFormat, now: chrono::DateTime<chrono::Utc>) -> ExportFile {
        transfer::export(format, self.collection.records(), now)
    }

    // ------------------------
    // Saved records
    // ------------------------

    pub async fn saved_waypoints(&self) -> SurveyResult<Vec<WaypointRecord>> {
        self.store.list().await
    }

    /// Put a persisted record on the map, or select it if it already is
    pub fn open_saved(&mut self, record: &WaypointRecord) -> SurveyResult<LocalId> {
        let existing = self
            .identity
            .local_for(&record.id)
            .filter(|id| self.collection.contains(id))
            .cloned();

        let local_id = match existing {
            Some(id) => id,
            None => {
                let draft = record.to_draft()?;
                if is_default_location(&record.name) {
                    if let Some(local) = self.make_room_for_sentinel(record) {
                        return self.open_saved_local(local);
                    }
                }
                let id = self.collection.add(draft);
                self.identity.record(id.clone(), record.id.clone());
                self.collection.set_server_id(&id, record.id.clone());
                id
            }
        };

        self.open_saved_local(local_id)
    }

    fn open_saved_local(&mut self, local_id: LocalId) -> SurveyResult<LocalId> {
        self.selection.select(local_id.clone());
        self.redraw();
        if let Some(wp) = self.collection.get(&local_id) {
            let target = CameraTarget::covering(&[wp.coordinates]);
            if let Some(target) = target {
                self.markers.focus(target);
            }
        }
        Ok(local_id)
    }

    /// A persisted sentinel always keeps its name. An unsaved local sentinel
    /// is demoted to a positional point so the server record can be added.
    /// If the local sentinel is itself persisted, that record is returned
    /// and the incoming one is not added.
    fn make_room_for_sentinel(&mut self, record: &WaypointRecord) -> Option<LocalId> {
        let local = self.collection.default_location()?.local_id.clone();
        if self.identity.lookup(&local).is_some() {
            tracing::warn!(%local, server_id = %record.id, "second saved default location ignored");
            return Some(local);
        }
        if let Err(e) = self.collection.demote_default_location(&local) {
            tracing::warn!(%local, error = %e, "could not demote local default location");
            return Some(local);
        }
        tracing::info!(%local, server_id = %record.id, "local default location demoted");
        None
    }

    pub async fn load_default_location(&mut self) -> SurveyResult<LocalId> {
        let store = Arc::clone(&self.store);
        let record = store.default_location().await?;
        self.open_saved(&record)
    }

    /// Find the sentinel on the map or among saved records, creating it at
    /// `center` when it exists nowhere
    pub async fn ensure_default_location(&mut self, center: Coordinates) -> SurveyResult<LocalId> {
        if let Some(existing) = self.collection.default_location() {
            let id = existing.local_id.clone();
            self.select(&id)?;
            return Ok(id);
        }

        let store = Arc::clone(&self.store);
        let saved = store.list().await?;
        let record = match saved.into_iter().find(|r| is_default_location(&r.name)) {
            Some(record) => record,
            None => {
                tracing::info!(%center, "creating default location");
                store
                    .create(&WaypointPayload {
                        name: DEFAULT_LOCATION_NAME.to_string(),
                        latitude: center.lat,
                        longitude: center.lng,
                        notes: DEFAULT_LOCATION_NOTES.to_string(),
                        image_url: None,
                    })
                    .await?
            }
        };
        self.open_saved(&record)
    }

    // ------------------------
    // Live location
    // ------------------------

    /// Drop a waypoint at the device position and select it
    pub fn add_current_location(&mut self, fix: LocationFix) -> LocalId {
        let draft = WaypointDraft::at(fix.coordinates)
            .named(CURRENT_LOCATION_NAME)
            .with_notes(fix.accuracy_note());
        let local_id = self.collection.add(draft);
        self.selection.select(local_id.clone());
        self.redraw();
        self.markers.focus(CameraTarget::Center {
            coordinates: fix.coordinates,
            zoom: crate::markers::SINGLE_POINT_ZOOM,
        });
        local_id
    }

    /// Bind a new watch to `target`, replacing (and cancelling) any previous
    /// one. The returned feed is handed to the position source.
    pub fn watch_location(&mut self, target: &LocalId) -> SurveyResult<LocationFeed> {
        if !self.collection.contains(target) {
            return Err(SurveyError::NotFound(target.clone()));
        }
        self.stop_watch();
        let (watch, feed) = location_watch(target.clone(), DEFAULT_WATCH_CAPACITY);
        self.watch = Some(watch);
        tracing::debug!(waypoint = %target, "location watch started");
        Ok(feed)
    }

    pub fn stop_watch(&mut self) {
        if let Some(watch) = self.watch.take() {
            watch.cancel();
            tracing::debug!(waypoint = %watch.target(), "location watch stopped");
        }
    }

    pub fn is_watching(&self) -> bool {
        self.watch.as_ref().map(|w| !w.is_cancelled()).unwrap_or(false)
    }

    /// Wait for the next fix of the active watch
    pub async fn next_fix(&mut self) -> Option<LocationFix> {
        self.watch.as_mut()?.next_fix().await
    }

    /// Move the watched waypoint to `fix`. A no-op without an active watch.
    /// Returns a warning notice for low-accuracy fixes.
    pub fn apply_fix(&mut self, fix: LocationFix) -> SurveyResult<Option<Notice>> {
        let target = match &self.watch {
            Some(watch) if !watch.is_cancelled() => watch.target().clone(),
            _ => return Ok(None),
        };
        if !self.collection.contains(&target) {
            self.stop_watch();
            return Ok(None);
        }

        let patch = WaypointPatch {
            coordinates: Some(fix.coordinates),
            notes: Some(fix.accuracy_note()),
            ..Default::default()
        };
        self.collection.update(&target, &patch)?;
        self.redraw();

        Ok(fix
            .accuracy_m
            .filter(|_| fix.is_low_accuracy())
            .map(Notice::low_accuracy))
    }

    /// Drain fixes already queued on the watch, applying each in order
    pub fn pump_fixes(&mut self) -> SurveyResult<Vec<Notice>> {
        let mut notices = Vec::new();
        while let Some(fix) = self.watch.as_mut().and_then(|w| w.try_next_fix()) {
            if let Some(notice) = self.apply_fix(fix)? {
                notices.push(notice);
            }
        }
        Ok(notices)
    }

    // ------------------------
    // Media and navigation
    // ------------------------

    /// Upload an image for the selected record and stage its URL in the
    /// edit buffer. The URL is dropped if the selection moved meanwhile.
    pub async fn attach_image(
        &mut self,
        host: &dyn ImageHost,
        image: ImageUpload,
    ) -> SurveyResult<String> {
        let target = self
            .selection
            .selected()
            .cloned()
            .ok_or(SurveyError::NothingSelected)?;

        let url = upload_with_retry(host, &image, self.upload_retry_delay).await?;
        if self.selection.is_selected(&target) {
            self.selection.edit(WaypointPatch {
                image_url: Some(Some(url.clone())),
                ..Default::default()
            });
        } else {
            tracing::debug!(waypoint = %target, "selection changed during upload, image not staged");
        }
        Ok(url)
    }

    /// Look up `query` and center the map on the best match. Nothing is
    /// added to the collection.
    pub async fn search_location(
        &mut self,
        geocoder: &dyn Geocoder,
        query: &str,
    ) -> SurveyResult<Place> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SurveyError::ValidationRejected(
                "Enter a location to search".to_string(),
            ));
        }
        let place = geocoder.search(query).await?.ok_or_else(|| {
            SurveyError::ValidationRejected(
                "Location not found. Please try a different search term.".to_string(),
            )
        })?;

        self.markers.focus(CameraTarget::Center {
            coordinates: place.coordinates,
            zoom: SINGLE_POINT_ZOOM,
        });
        tracing::info!(query, place = %place.display_name, "location found");
        Ok(place)
    }

    /// Driving route from `from` to the waypoint `to`
    pub async fn navigate(
        &self,
        router: &dyn RoutingApi,
        from: Coordinates,
        to: &LocalId,
    ) -> SurveyResult<Route> {
        let destination = self
            .collection
            .get(to)
            .ok_or_else(|| SurveyError::NotFound(to.clone()))?
            .coordinates;
        router.route(from, destination).await
    }
}
