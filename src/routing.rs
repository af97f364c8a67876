//! Driving directions between two coordinates via OpenRouteService.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::domain::{Coordinates, SurveyError, SurveyResult};

const DIRECTIONS_URL: &str = "https://api.openrouteservice.org/v2/directions/driving-car";

/// Key value shipped in sample configs; never valid
const PLACEHOLDER_KEY: &str = "YOUR_KEY";

#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    /// Polyline from start to end
    pub geometry: Vec<Coordinates>,
    pub distance_m: f64,
    pub duration_s: f64,
}

#[async_trait]
pub trait RoutingApi: Send + Sync {
    async fn route(&self, from: Coordinates, to: Coordinates) -> SurveyResult<Route>;
}

pub struct OpenRouteService {
    client: Client,
    api_key: String,
}

impl OpenRouteService {
    /// Fails with `Configuration` when the key is missing or the placeholder
    pub fn new(api_key: Option<&str>, timeout: Duration) -> SurveyResult<Self> {
        let api_key = api_key.map(str::trim).unwrap_or_default();
        if api_key.is_empty() || api_key == PLACEHOLDER_KEY {
            return Err(SurveyError::Configuration(
                "OpenRouteService API key is not set".to_string(),
            ));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SurveyError::Configuration(format!("HTTP client: {}", e)))?;
        Ok(Self {
            client,
            api_key: api_key.to_string(),
        })
    }
}

#[async_trait]
impl RoutingApi for OpenRouteService {
    async fn route(&self, from: Coordinates, to: Coordinates) -> SurveyResult<Route> {
        let body = json!({ "coordinates": [[from.lng, from.lat], [to.lng, to.lat]] });
        let response = self
            .client
            .post(DIRECTIONS_URL)
            .query(&[("api_key", self.api_key.as_str()), ("format", "geojson")])
            .json(&body)
            .send()
            .await
            .map_err(|e| SurveyError::TransportFailure(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| SurveyError::TransportFailure(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
                .unwrap_or_else(|| "Failed to fetch route".to_string());
            return Err(match status.as_u16() {
                401 | 403 => SurveyError::Configuration(message),
                400..=499 => SurveyError::ValidationRejected(message),
                code => SurveyError::TransportFailure(format!("HTTP {}: {}", code, message)),
            });
        }

        parse_route(&text)
    }
}

fn positions(value: &Value) -> Option<Vec<Coordinates>> {
    value
        .as_array()?
        .iter()
        .map(|pos| {
            let lng = pos.get(0)?.as_f64()?;
            let lat = pos.get(1)?.as_f64()?;
            Coordinates::new(lat, lng).ok()
        })
        .collect()
}

/// One signed delta of an encoded polyline
fn next_delta(bytes: &[u8], index: &mut usize) -> Option<i64> {
    let mut result = 0i64;
    let mut shift = 0u32;
    loop {
        let chunk = i64::from(*bytes.get(*index)?) - 63;
        *index += 1;
        if !(0..64).contains(&chunk) || shift > 60 {
            return None;
        }
        result |= (chunk & 0x1f) << shift;
        shift += 5;
        if chunk < 0x20 {
            break;
        }
    }
    Some(if result & 1 != 0 { !(result >> 1) } else { result >> 1 })
}

/// Encoded polyline at precision 5, latitude first
pub fn decode_polyline(encoded: &str) -> Option<Vec<Coordinates>> {
    let bytes = encoded.as_bytes();
    let mut index = 0;
    let (mut lat, mut lng) = (0i64, 0i64);
    let mut points = Vec::new();
    while index < bytes.len() {
        lat += next_delta(bytes, &mut index)?;
        lng += next_delta(bytes, &mut index)?;
        points.push(Coordinates::new(lat as f64 / 1e5, lng as f64 / 1e5).ok()?);
    }
    Some(points)
}

/// First route of a directions response. Accepts the GeoJSON shape
/// (`features[0]`) and the plain JSON shape (`routes[0]`), whose geometry
/// is either a coordinate object or an encoded polyline string.
pub fn parse_route(body: &str) -> SurveyResult<Route> {
    let invalid = |reason: &str| SurveyError::TransportFailure(format!("Invalid route response: {}", reason));
    let doc: Value = serde_json::from_str(body).map_err(|e| invalid(&e.to_string()))?;

    let (geometry, summary) = if let Some(feature) = doc["features"].get(0) {
        (&feature["geometry"], &feature["properties"]["summary"])
    } else if let Some(route) = doc["routes"].get(0) {
        (&route["geometry"], &route["summary"])
    } else {
        return Err(SurveyError::ValidationRejected("No route found".to_string()));
    };

    let geometry = match geometry {
        Value::String(encoded) => decode_polyline(encoded),
        other => positions(&other["coordinates"]),
    }
    .ok_or_else(|| invalid("bad geometry"))?;
    Ok(Route {
        geometry,
        distance_m: summary["distance"].as_f64().unwrap_or(0.0),
        duration_s: summary["duration"].as_f64().unwrap_or(0.0),
    })
}
