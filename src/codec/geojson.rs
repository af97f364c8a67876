//! GeoJSON point features.

use geojson::{Feature, FeatureCollection, GeoJson, Geometry, JsonObject, JsonValue, Value};

use super::{export_id, stamp};
use crate::domain::{
    Coordinates, ImportFormat, SurveyError, SurveyResult, Waypoint, WaypointDraft,
    IMPORTED_POINT_NAME,
};

fn format_error(reason: impl Into<String>) -> SurveyError {
    SurveyError::format(ImportFormat::GeoJson, reason)
}

/// Point features of a `FeatureCollection` (or a lone `Feature`). Features
/// with any other geometry, or none, are skipped.
pub fn decode(text: &str) -> SurveyResult<Vec<WaypointDraft>> {
    let document: GeoJson = text.parse().map_err(|e: geojson::Error| format_error(e.to_string()))?;

    let features = match document {
        GeoJson::FeatureCollection(collection) => collection.features,
        GeoJson::Feature(feature) => vec![feature],
        GeoJson::Geometry(_) => {
            return Err(format_error("expected a FeatureCollection, found a bare geometry"))
        }
    };

    let mut drafts = Vec::new();
    for (index, feature) in features.iter().enumerate() {
        let Some(Value::Point(position)) = feature.geometry.as_ref().map(|g| &g.value) else {
            continue;
        };
        let coordinates = match position.as_slice() {
            [lng, lat, ..] => Coordinates::new(*lat, *lng)
                .map_err(|e| format_error(format!("feature {}: {}", index, e)))?,
            _ => {
                return Err(format_error(format!(
                    "feature {}: point needs longitude and latitude",
                    index
                )))
            }
        };
        drafts.push(draft_from_properties(coordinates, feature.properties.as_ref()));
    }
    Ok(drafts)
}

fn text_property<'a>(properties: Option<&'a JsonObject>, key: &str) -> Option<&'a str> {
    properties?
        .get(key)?
        .as_str()
        .filter(|value| !value.is_empty())
}

fn draft_from_properties(coordinates: Coordinates, properties: Option<&JsonObject>) -> WaypointDraft {
    let name = text_property(properties, "name").unwrap_or(IMPORTED_POINT_NAME);
    let notes = text_property(properties, "notes")
        .or_else(|| text_property(properties, "description"))
        .unwrap_or_default();

    let mut draft = WaypointDraft::at(coordinates).named(name).with_notes(notes);
    draft.image_url = text_property(properties, "image_url").map(str::to_string);
    draft
}

/// One feature per waypoint, positions in `[lng, lat]` order
pub fn encode(waypoints: &[Waypoint]) -> String {
    let features = waypoints
        .iter()
        .map(|wp| {
            let mut properties = JsonObject::new();
            properties.insert("id".into(), JsonValue::from(export_id(wp)));
            properties.insert("name".into(), JsonValue::from(wp.name.clone()));
            properties.insert("notes".into(), JsonValue::from(wp.notes.clone()));
            properties.insert("image_url".into(), JsonValue::from(wp.image_url.clone()));
            properties.insert("created_at".into(), JsonValue::from(wp.created_at.map(stamp)));
            properties.insert("updated_at".into(), JsonValue::from(wp.updated_at.map(stamp)));

            Feature {
                bbox: None,
                geometry: Some(Geometry::new(Value::Point(vec![
                    wp.coordinates.lng,
                    wp.coordinates.lat,
                ]))),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    GeoJson::FeatureCollection(FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    })
    .to_string()
}
