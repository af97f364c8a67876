//! Domain Layer
//!
//! Waypoint entities, wire records, naming rules and the error taxonomy.
//! Nothing in here performs I/O.

mod error;
mod format;
mod naming;
mod waypoint;

pub use error::{SurveyError, SurveyResult};
pub use format::{ExportFormat, ImportFormat};
pub use naming::{
    is_default_ish, is_default_location, positional_label, DEFAULT_LOCATION_NAME,
    IMPORTED_POINT_NAME,
};
pub use waypoint::{
    Coordinates, DeleteResponse, LocalId, ServerId, Waypoint, WaypointDraft, WaypointPatch,
    WaypointPayload, WaypointRecord,
};
