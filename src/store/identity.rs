//! Identity Reconciliation Map
//!
//! Answers "has this local record been persisted, and under which server id?"
//! Only the controller mutates it; the marker projection and codecs never do.

use std::collections::HashMap;

use crate::domain::{LocalId, ServerId};

#[derive(Debug, Default, Clone)]
pub struct IdentityMap {
    by_local: HashMap<LocalId, ServerId>,
}

impl IdentityMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, local_id: &LocalId) -> Option<&ServerId> {
        self.by_local.get(local_id)
    }

    /// Record the server id of a first successful save.
    ///
    /// # Panics
    /// If `local_id` is already mapped to a different server id. Two creates
    /// for one local record is a reconciliation bug, not a runtime condition.
    pub fn record(&mut self, local_id: LocalId, server_id: ServerId) {
        if let Some(existing) = self.by_local.get(&local_id) {
            assert!(
                *existing == server_id,
                "waypoint {} already persisted as {}, refusing to remap to {}",
                local_id,
                existing,
                server_id
            );
            return;
        }
        self.by_local.insert(local_id, server_id);
    }

    /// Forget a deleted record; unknown ids are ignored
    pub fn remove(&mut self, local_id: &LocalId) -> Option<ServerId> {
        self.by_local.remove(local_id)
    }

    /// Reverse lookup, used when opening a saved record already on the map
    pub fn local_for(&self, server_id: &ServerId) -> Option<&LocalId> {
        self.by_local
            .iter()
            .find(|(_, mapped)| *mapped == server_id)
            .map(|(local, _)| local)
    }

    pub fn len(&self) -> usize {
        self.by_local.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_local.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_lookup() {
        let mut map = IdentityMap::new();
        let local = LocalId::from_counter(1);
        assert!(map.lookup(&local).is_none());

        map.record(local.clone(), ServerId::from(7));
        assert_eq!(map.lookup(&local), Some(&ServerId::from(7)));
        assert_eq!(map.local_for(&ServerId::from(7)), Some(&local));
    }

    #[test]
    fn test_rerecord_same_pair_is_noop() {
        let mut map = IdentityMap::new();
        let local = LocalId::from_counter(1);
        map.record(local.clone(), ServerId::from(7));
        map.record(local.clone(), ServerId::from(7));
        assert_eq!(map.len(), 1);
    }

    #[test]
    #[should_panic(expected = "already persisted")]
    fn test_remap_to_different_server_id_panics() {
        let mut map = IdentityMap::new();
        let local = LocalId::from_counter(1);
        map.record(local.clone(), ServerId::from(7));
        map.record(local, ServerId::from(8));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut map = IdentityMap::new();
        let local = LocalId::from_counter(3);
        map.record(local.clone(), ServerId::from(1));
        assert_eq!(map.remove(&local), Some(ServerId::from(1)));
        assert_eq!(map.remove(&local), None);
        assert!(map.is_empty());
    }
}
