//! Interchange formats accepted on import and produced on export.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::{SurveyError, SurveyResult};

/// Formats the import surface can decode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportFormat {
    GeoJson,
    Kml,
}

impl ImportFormat {
    /// Pick a decoder from the file name; `.json` files are read as GeoJSON
    pub fn from_file_name(file_name: &str) -> SurveyResult<Self> {
        let lower = file_name.trim().to_lowercase();
        if lower.ends_with(".geojson") || lower.ends_with(".json") {
            Ok(ImportFormat::GeoJson)
        } else if lower.ends_with(".kml") {
            Ok(ImportFormat::Kml)
        } else {
            Err(SurveyError::InvalidFileType(file_name.to_string()))
        }
    }
}

impl fmt::Display for ImportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportFormat::GeoJson => write!(f, "GeoJSON"),
            ImportFormat::Kml => write!(f, "KML"),
        }
    }
}

/// Formats the export surface can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Xml,
    GeoJson,
    Kml,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 4] = [
        ExportFormat::Json,
        ExportFormat::Xml,
        ExportFormat::GeoJson,
        ExportFormat::Kml,
    ];

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Xml => "xml",
            ExportFormat::GeoJson => "geojson",
            ExportFormat::Kml => "kml",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Json => "application/json",
            ExportFormat::Xml => "application/xml",
            ExportFormat::GeoJson => "application/geo+json",
            ExportFormat::Kml => "application/vnd.google-earth.kml+xml",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "json" => Some(ExportFormat::Json),
            "xml" => Some(ExportFormat::Xml),
            "geojson" => Some(ExportFormat::GeoJson),
            "kml" => Some(ExportFormat::Kml),
            _ => None,
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Json => write!(f, "JSON"),
            ExportFormat::Xml => write!(f, "XML"),
            ExportFormat::GeoJson => write!(f, "GeoJSON"),
            ExportFormat::Kml => write!(f, "KML"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_format_from_extension() {
        assert_eq!(ImportFormat::from_file_name("trip.GeoJSON").unwrap(), ImportFormat::GeoJson);
        assert_eq!(ImportFormat::from_file_name("trip.json").unwrap(), ImportFormat::GeoJson);
        assert_eq!(ImportFormat::from_file_name("Trip.KML").unwrap(), ImportFormat::Kml);
    }

    #[test]
    fn test_unknown_extension_rejected() {
        let err = ImportFormat::from_file_name("trip.gpx").unwrap_err();
        assert_eq!(err, SurveyError::InvalidFileType("trip.gpx".to_string()));
    }

    #[test]
    fn test_export_format_parse() {
        assert_eq!(ExportFormat::from_str("KML"), Some(ExportFormat::Kml));
        assert_eq!(ExportFormat::from_str("csv"), None);
    }
}
