use std::env;
use std::fmt::Display;
use std::fs::read_to_string;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::domain::{SurveyError, SurveyResult};
use crate::geocoding::DEFAULT_GEOCODER_URL;

pub const DEFAULT_API_BASE_URL: &str = "https://terr-aqua-survey-platform-backend.vercel.app";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurveyConfig {
    pub api_base_url: String,
    pub routing_api_key: Option<String>,
    pub geocoder_url: String,
    pub request_timeout_secs: u64,
    pub log_dir: PathBuf,
}

impl Default for SurveyConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            routing_api_key: None,
            geocoder_url: DEFAULT_GEOCODER_URL.to_string(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            log_dir: PathBuf::from("logs"),
        }
    }
}

impl SurveyConfig {
    /// Optional JSON file, then `SURVEY_*` environment overrides
    pub fn load(file: Option<&Path>) -> SurveyResult<Self> {
        let base = match file {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        base.with_overrides(|key| env::var(key).ok())
    }

    pub fn from_file(path: &Path) -> SurveyResult<Self> {
        let text = read_to_string(path).map_err(|e| {
            SurveyError::Configuration(format!("Failed to read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&text).map_err(|e| {
            SurveyError::Configuration(format!("Invalid config {}: {}", path.display(), e))
        })
    }

    /// Apply overrides from `lookup` (the process environment in `load`)
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> SurveyResult<Self> {
        if let Some(url) = var(&lookup, "SURVEY_API_BASE_URL") {
            self.api_base_url = url;
        }
        if let Some(key) = var(&lookup, "SURVEY_ROUTING_API_KEY") {
            self.routing_api_key = Some(key);
        }
        if let Some(url) = var(&lookup, "SURVEY_GEOCODER_URL") {
            self.geocoder_url = url;
        }
        if let Some(secs) = parsed(&lookup, "SURVEY_TIMEOUT_SECS")? {
            self.request_timeout_secs = secs;
        }
        if let Some(dir) = var(&lookup, "SURVEY_LOG_DIR") {
            self.log_dir = PathBuf::from(dir);
        }

        if self.request_timeout_secs == 0 {
            warn!("request timeout of 0s requested, using {DEFAULT_TIMEOUT_SECS}s");
            self.request_timeout_secs = DEFAULT_TIMEOUT_SECS;
        }
        Ok(self)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn var(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    match lookup(key).map(|v| v.trim().to_string()) {
        Some(value) if !value.is_empty() => Some(value),
        _ => {
            info!("{key} not set, keeping configured value");
            None
        }
    }
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> SurveyResult<Option<T>>
where
    T::Err: Display,
{
    var(lookup, key)
        .map(|raw| {
            raw.parse().map_err(|e| {
                warn!("Invalid {key} value: {e}");
                SurveyError::Configuration(format!("Invalid {key} value {raw:?}: {e}"))
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_overrides() {
        let config = SurveyConfig::default().with_overrides(env_of(&[])).unwrap();
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.routing_api_key, None);
        assert_eq!(config.geocoder_url, DEFAULT_GEOCODER_URL);
    }

    #[test]
    fn test_env_overrides_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"api_base_url":"http://file.test","request_timeout_secs":5}}"#).unwrap();

        let config = SurveyConfig::from_file(file.path())
            .unwrap()
            .with_overrides(env_of(&[
                ("SURVEY_ROUTING_API_KEY", "k-123"),
                ("SURVEY_TIMEOUT_SECS", "12"),
                ("SURVEY_GEOCODER_URL", "http://geo.test"),
                ("SURVEY_LOG_DIR", "  "),
            ]))
            .unwrap();

        assert_eq!(config.api_base_url, "http://file.test");
        assert_eq!(config.routing_api_key.as_deref(), Some("k-123"));
        assert_eq!(config.request_timeout_secs, 12);
        assert_eq!(config.geocoder_url, "http://geo.test");
        assert_eq!(config.log_dir, PathBuf::from("logs"));
    }

    #[test]
    fn test_bad_timeout_is_configuration_error() {
        let err = SurveyConfig::default()
            .with_overrides(env_of(&[("SURVEY_TIMEOUT_SECS", "soon")]))
            .unwrap_err();
        assert!(matches!(err, SurveyError::Configuration(_)));
    }
}
