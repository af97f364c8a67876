//! Import/Export Codec
//!
//! Pure conversions between waypoints and interchange documents. Decoding
//! yields drafts, which the collection names and numbers on insert.

mod geojson;
mod json;
mod kml;
mod xml;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::domain::{ExportFormat, ImportFormat, SurveyResult, Waypoint, WaypointDraft};

/// Decode an import document
pub fn decode(format: ImportFormat, text: &str) -> SurveyResult<Vec<WaypointDraft>> {
    match format {
        ImportFormat::GeoJson => geojson::decode(text),
        ImportFormat::Kml => kml::decode(text),
    }
}

/// Encode waypoints, in order, as an export document
pub fn encode(format: ExportFormat, waypoints: &[Waypoint], exported_at: DateTime<Utc>) -> String {
    match format {
        ExportFormat::Json => json::encode(waypoints, exported_at),
        ExportFormat::Xml => xml::encode(waypoints, exported_at),
        ExportFormat::GeoJson => geojson::encode(waypoints),
        ExportFormat::Kml => kml::encode(waypoints),
    }
}

/// Server id once persisted, local id before that
fn export_id(wp: &Waypoint) -> String {
    match &wp.server_id {
        Some(id) => id.to_string(),
        None => wp.local_id.to_string(),
    }
}

fn stamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}
