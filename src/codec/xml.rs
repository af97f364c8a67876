//! Point-set XML export.

use chrono::{DateTime, Utc};
use quick_xml::escape::escape;

use super::{export_id, stamp};
use crate::domain::Waypoint;

pub fn encode(waypoints: &[Waypoint], exported_at: DateTime<Utc>) -> String {
    let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<waypoints>\n");
    out.push_str(&format!("  <exportDate>{}</exportDate>\n", stamp(exported_at)));
    out.push_str(&format!("  <totalWaypoints>{}</totalWaypoints>\n", waypoints.len()));
    out.push_str("  <waypointList>\n");

    for wp in waypoints {
        let optional_stamp = |at: Option<DateTime<Utc>>| at.map(stamp).unwrap_or_default();
        out.push_str("    <waypoint>\n");
        out.push_str(&format!("      <id>{}</id>\n", escape(export_id(wp).as_str())));
        out.push_str(&format!("      <name>{}</name>\n", escape(wp.name.as_str())));
        out.push_str(&format!("      <latitude>{}</latitude>\n", wp.coordinates.lat));
        out.push_str(&format!("      <longitude>{}</longitude>\n", wp.coordinates.lng));
        out.push_str(&format!("      <notes>{}</notes>\n", escape(wp.notes.as_str())));
        out.push_str(&format!(
            "      <image_url>{}</image_url>\n",
            escape(wp.image_url.as_deref().unwrap_or(""))
        ));
        out.push_str(&format!("      <created_at>{}</created_at>\n", optional_stamp(wp.created_at)));
        out.push_str(&format!("      <updated_at>{}</updated_at>\n", optional_stamp(wp.updated_at)));
        out.push_str("    </waypoint>\n");
    }

    out.push_str("  </waypointList>\n</waypoints>\n");
    out
}
