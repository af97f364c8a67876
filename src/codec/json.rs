//! Plain JSON export document.

use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use super::{export_id, stamp};
use crate::domain::Waypoint;

pub fn encode(waypoints: &[Waypoint], exported_at: DateTime<Utc>) -> String {
    let list: Vec<Value> = waypoints
        .iter()
        .map(|wp| {
            json!({
                "id": export_id(wp),
                "name": wp.name,
                "latitude": wp.coordinates.lat,
                "longitude": wp.coordinates.lng,
                "notes": wp.notes,
                "image_url": wp.image_url,
                "created_at": wp.created_at.map(stamp),
                "updated_at": wp.updated_at.map(stamp),
            })
        })
        .collect();

    let document = json!({
        "exportDate": stamp(exported_at),
        "totalWaypoints": waypoints.len(),
        "waypoints": list,
    });
    format!("{:#}", document)
}
