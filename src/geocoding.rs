//! Place search through a Nominatim-compatible geocoder.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::domain::{Coordinates, SurveyError, SurveyResult};

pub const DEFAULT_GEOCODER_URL: &str = "https://nominatim.openstreetmap.org";

/// Nominatim rejects requests without an identifying agent
const USER_AGENT: &str = concat!("waypoint-survey/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, PartialEq)]
pub struct Place {
    pub coordinates: Coordinates,
    pub display_name: String,
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Best match for `query`, `None` when nothing matches
    async fn search(&self, query: &str) -> SurveyResult<Option<Place>>;
}

pub struct Nominatim {
    client: Client,
    search_url: String,
}

impl Nominatim {
    pub fn new(base_url: &str, timeout: Duration) -> SurveyResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| SurveyError::Configuration(format!("HTTP client: {}", e)))?;
        Ok(Self {
            client,
            search_url: format!("{}/search", base_url.trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl Geocoder for Nominatim {
    async fn search(&self, query: &str) -> SurveyResult<Option<Place>> {
        let response = self
            .client
            .get(&self.search_url)
            .query(&[("format", "json"), ("q", query), ("limit", "1")])
            .send()
            .await
            .map_err(|e| SurveyError::TransportFailure(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| SurveyError::TransportFailure(e.to_string()))?;
        if !status.is_success() {
            return Err(SurveyError::TransportFailure(format!(
                "HTTP {}: Search failed",
                status.as_u16()
            )));
        }

        parse_places(&text)
    }
}

#[derive(Deserialize)]
struct RawPlace {
    lat: String,
    lon: String,
    #[serde(default)]
    display_name: String,
}

/// First hit of a search response. Nominatim sends coordinates as strings.
pub fn parse_places(body: &str) -> SurveyResult<Option<Place>> {
    let invalid = |reason: String| SurveyError::TransportFailure(format!("Invalid search response: {}", reason));
    let places: Vec<RawPlace> = serde_json::from_str(body).map_err(|e| invalid(e.to_string()))?;

    let Some(first) = places.into_iter().next() else {
        return Ok(None);
    };
    let lat: f64 = first.lat.trim().parse().map_err(|_| invalid(format!("lat {:?}", first.lat)))?;
    let lng: f64 = first.lon.trim().parse().map_err(|_| invalid(format!("lon {:?}", first.lon)))?;
    Ok(Some(Place {
        coordinates: Coordinates::new(lat, lng)?,
        display_name: first.display_name,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_first_hit() {
        let body = r#"[
            {"place_id":1,"lat":"48.8588897","lon":"2.3200410","display_name":"Paris, France"},
            {"place_id":2,"lat":"33.66","lon":"-95.55","display_name":"Paris, Texas"}
        ]"#;
        let place = parse_places(body).unwrap().unwrap();
        assert_eq!(place.display_name, "Paris, France");
        assert_eq!(place.coordinates, Coordinates::new(48.8588897, 2.3200410).unwrap());
    }

    #[test]
    fn test_parse_no_hits_and_garbage() {
        assert_eq!(parse_places("[]").unwrap(), None);
        assert!(matches!(parse_places("{}"), Err(SurveyError::TransportFailure(_))));
        assert!(matches!(
            parse_places(r#"[{"lat":"north","lon":"1"}]"#),
            Err(SurveyError::TransportFailure(_))
        ));
    }

    #[test]
    fn test_search_url_drops_trailing_slash() {
        let geocoder = Nominatim::new("http://geo.test/", Duration::from_secs(5)).unwrap();
        assert_eq!(geocoder.search_url, "http://geo.test/search");
    }
}
