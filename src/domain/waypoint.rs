//! Waypoint Entity
//!
//! The in-memory record shown on the map, plus the wire shapes exchanged with
//! the remote store.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::error::{SurveyError, SurveyResult};
use super::naming::{is_default_ish, is_default_location};

// ========================
// Identifiers
// ========================

/// Client-session identifier, assigned at creation and never sent remotely
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LocalId(String);

impl LocalId {
    pub(crate) fn from_counter(n: u64) -> Self {
        Self(format!("wp-{}", n))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Durable identifier assigned by the remote store.
///
/// The backend returns integer keys, but string keys are accepted as well.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ServerId(String);

impl ServerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<i64> for ServerId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for ServerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ServerId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Int(i64),
            Text(String),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Int(n) => ServerId::from(n),
            RawId::Text(s) => ServerId(s),
        })
    }
}

// ========================
// Coordinates
// ========================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    /// Validated constructor; latitude in [-90, 90], longitude in [-180, 180]
    pub fn new(lat: f64, lng: f64) -> SurveyResult<Self> {
        let valid = lat.is_finite()
            && lng.is_finite()
            && (-90.0..=90.0).contains(&lat)
            && (-180.0..=180.0).contains(&lng);
        if valid {
            Ok(Self { lat, lng })
        } else {
            Err(SurveyError::InvalidCoordinates { lat, lng })
        }
    }

    /// Both axes within `tolerance` degrees
    pub fn is_near(&self, other: &Coordinates, tolerance: f64) -> bool {
        (self.lat - other.lat).abs() < tolerance && (self.lng - other.lng).abs() < tolerance
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}, {:.6}", self.lat, self.lng)
    }
}

// ========================
// Waypoint
// ========================

/// A waypoint currently held by the collection
#[derive(Debug, Clone, PartialEq)]
pub struct Waypoint {
    pub local_id: LocalId,
    /// Set once the record has been persisted
    pub server_id: Option<ServerId>,
    pub coordinates: Coordinates,
    pub name: String,
    /// User-assigned names survive renumbering
    pub custom_name: bool,
    pub notes: String,
    pub image_url: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub(crate) revision: u64,
}

impl Waypoint {
    pub fn is_default_location(&self) -> bool {
        is_default_location(&self.name)
    }

    /// Mutation counter, bumped on every change to the record
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Body for a create/update call
    pub fn to_payload(&self) -> WaypointPayload {
        WaypointPayload {
            name: self.name.clone(),
            latitude: self.coordinates.lat,
            longitude: self.coordinates.lng,
            notes: self.notes.clone(),
            image_url: self.image_url.clone(),
        }
    }

    /// Copy of this record with `patch` applied, without touching the revision
    pub fn patched(&self, patch: &WaypointPatch) -> Waypoint {
        let mut copy = self.clone();
        copy.apply_fields(patch);
        copy
    }

    /// Merge a patch. A default-ish name hands the record back to positional
    /// labelling; the sentinel keeps its canonical name.
    pub(crate) fn apply_fields(&mut self, patch: &WaypointPatch) {
        if let Some(coordinates) = patch.coordinates {
            self.coordinates = coordinates;
        }
        if let Some(name) = &patch.name {
            if is_default_location(&self.name) {
                // unchanged
            } else if is_default_ish(name) {
                self.custom_name = false;
            } else {
                self.name = name.trim().to_string();
                self.custom_name = true;
            }
        }
        if let Some(notes) = &patch.notes {
            self.notes = notes.clone();
        }
        if let Some(image_url) = &patch.image_url {
            self.image_url = image_url.clone();
        }
    }
}

/// Input for a new record: map click, locate-me, import, or a saved record
#[derive(Debug, Clone, PartialEq)]
pub struct WaypointDraft {
    pub coordinates: Coordinates,
    pub name: Option<String>,
    pub notes: String,
    pub image_url: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl WaypointDraft {
    pub fn at(coordinates: Coordinates) -> Self {
        Self {
            coordinates,
            name: None,
            notes: String::new(),
            image_url: None,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }
}

/// Partial update; `None` leaves a field untouched
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WaypointPatch {
    pub coordinates: Option<Coordinates>,
    pub name: Option<String>,
    pub notes: Option<String>,
    /// `Some(None)` clears the image
    pub image_url: Option<Option<String>>,
}

impl WaypointPatch {
    pub fn is_empty(&self) -> bool {
        self.coordinates.is_none()
            && self.name.is_none()
            && self.notes.is_none()
            && self.image_url.is_none()
    }

    pub fn coordinates(coordinates: Coordinates) -> Self {
        Self {
            coordinates: Some(coordinates),
            ..Default::default()
        }
    }

    pub fn name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn notes(notes: impl Into<String>) -> Self {
        Self {
            notes: Some(notes.into()),
            ..Default::default()
        }
    }

    /// Layer `other` on top of this patch
    pub fn merge(&mut self, other: WaypointPatch) {
        if other.coordinates.is_some() {
            self.coordinates = other.coordinates;
        }
        if other.name.is_some() {
            self.name = other.name;
        }
        if other.notes.is_some() {
            self.notes = other.notes;
        }
        if other.image_url.is_some() {
            self.image_url = other.image_url;
        }
    }
}

// ========================
// Wire records
// ========================

/// A row as returned by the remote store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaypointRecord {
    pub id: ServerId,
    pub name: String,
    #[serde(deserialize_with = "lenient_f64")]
    pub latitude: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub longitude: f64,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl WaypointRecord {
    pub fn coordinates(&self) -> SurveyResult<Coordinates> {
        Coordinates::new(self.latitude, self.longitude)
    }

    pub fn to_draft(&self) -> SurveyResult<WaypointDraft> {
        Ok(WaypointDraft {
            coordinates: self.coordinates()?,
            name: Some(self.name.clone()),
            notes: self.notes.clone().unwrap_or_default(),
            image_url: self.image_url.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Body of create and update calls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaypointPayload {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub notes: String,
    pub image_url: Option<String>,
}

/// Body of a delete response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub message: String,
    #[serde(default)]
    pub waypoint: Option<WaypointRecord>,
}

/// Postgres `numeric` columns arrive as strings
fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawNumber {
        Number(f64),
        Text(String),
    }

    match RawNumber::deserialize(deserializer)? {
        RawNumber::Number(n) => Ok(n),
        RawNumber::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinates_range_check() {
        assert!(Coordinates::new(90.0, -180.0).is_ok());
        assert!(Coordinates::new(90.1, 0.0).is_err());
        assert!(Coordinates::new(0.0, 180.5).is_err());
        assert!(Coordinates::new(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_record_accepts_numeric_strings_and_integer_ids() {
        let json = r#"{
            "id": 7,
            "name": "Camp",
            "latitude": "12.340000",
            "longitude": 56.78,
            "notes": null,
            "image_url": null,
            "created_at": "2024-05-01T10:00:00.000Z",
            "updated_at": "2024-05-01T10:00:00.000Z"
        }"#;
        let record: WaypointRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.id, ServerId::from(7));
        assert_eq!(record.latitude, 12.34);
        assert_eq!(record.longitude, 56.78);
        assert!(record.created_at.is_some());

        let text_id: WaypointRecord =
            serde_json::from_str(r#"{"id":"abc","name":"x","latitude":1,"longitude":2}"#).unwrap();
        assert_eq!(text_id.id.as_str(), "abc");
    }

    #[test]
    fn test_patch_merge_keeps_latest() {
        let mut patch = WaypointPatch::notes("first");
        patch.merge(WaypointPatch::name("Camp"));
        patch.merge(WaypointPatch::notes("second"));
        assert_eq!(patch.notes.as_deref(), Some("second"));
        assert_eq!(patch.name.as_deref(), Some("Camp"));
    }
}
