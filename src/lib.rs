//! Waypoint Survey Client
//!
//! Layered architecture:
//! - domain: Waypoint entities, naming rules and the error taxonomy
//! - store: Collection, identity reconciliation and selection state
//! - codec / transfer: GeoJSON, KML, XML and JSON import/export
//! - repository: Remote store, image host and session abstractions
//! - controller: Survey operations over all of the above
//!
//! Map rendering, authentication, routing and place search are consumed
//! through traits (`MarkerSurface`, `SessionProvider`, `RoutingApi`,
//! `Geocoder`).

pub mod codec;
pub mod config;
pub mod controller;
pub mod domain;
pub mod geocoding;
pub mod location;
pub mod markers;
pub mod media;
pub mod notice;
pub mod repository;
pub mod routing;
pub mod store;
pub mod transfer;

#[cfg(test)]
mod testing;

pub use config::SurveyConfig;
pub use controller::{ImportSummary, SaveOutcome, SaveTicket, SurveyController};
pub use domain::{SurveyError, SurveyResult};
pub use notice::{Notice, Severity};
