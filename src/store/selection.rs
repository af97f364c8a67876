//! Selection and the uncommitted edit buffer of the selected record.

use crate::domain::{LocalId, WaypointPatch};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SelectionState {
    #[default]
    Unselected,
    Selected(LocalId),
}

#[derive(Debug, Default)]
pub struct Selection {
    state: SelectionState,
    buffer: WaypointPatch,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    pub fn selected(&self) -> Option<&LocalId> {
        match &self.state {
            SelectionState::Selected(id) => Some(id),
            SelectionState::Unselected => None,
        }
    }

    pub fn is_selected(&self, local_id: &LocalId) -> bool {
        self.selected() == Some(local_id)
    }

    /// Select `local_id`, discarding edits buffered for a different record.
    /// Returns the previously selected id.
    pub fn select(&mut self, local_id: LocalId) -> Option<LocalId> {
        let previous = self.selected().cloned();
        if previous.as_ref() != Some(&local_id) {
            self.buffer = WaypointPatch::default();
        }
        self.state = SelectionState::Selected(local_id);
        previous
    }

    pub fn deselect(&mut self) -> Option<LocalId> {
        let previous = self.selected().cloned();
        self.state = SelectionState::Unselected;
        self.buffer = WaypointPatch::default();
        previous
    }

    /// Buffered edits for the selected record
    pub fn buffer(&self) -> &WaypointPatch {
        &self.buffer
    }

    /// Layer an edit into the buffer; ignored when nothing is selected
    pub fn edit(&mut self, patch: WaypointPatch) -> bool {
        if self.selected().is_none() {
            return false;
        }
        self.buffer.merge(patch);
        true
    }

    pub fn clear_buffer(&mut self) {
        self.buffer = WaypointPatch::default();
    }

    /// Drop the selection if it pointed at a record that no longer exists
    pub fn on_removed(&mut self, local_id: &LocalId) {
        if self.is_selected(local_id) {
            self.deselect();
        }
    }
}
