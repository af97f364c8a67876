//! Client State
//!
//! The waypoint collection, identity reconciliation and the current
//! selection. All three are owned by the survey controller.

mod collection;
mod identity;
mod selection;

pub use collection::{CollectionEvent, WaypointCollection};
pub use identity::IdentityMap;
pub use selection::{Selection, SelectionState};
