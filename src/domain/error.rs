//! Domain Errors
//!
//! Every failure a survey operation can surface. All variants are recovered
//! at the UI boundary (see `notice`), none leave a partial mutation behind.

use thiserror::Error;

use super::format::ImportFormat;
use super::waypoint::LocalId;

/// Common result type for survey operations
pub type SurveyResult<T> = Result<T, SurveyError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SurveyError {
    /// Unknown local identifier
    #[error("Waypoint {0} not found")]
    NotFound(LocalId),

    /// Delete or rename attempted on the sentinel default record
    #[error("Cannot delete or rename \"Default Location\"")]
    Protected,

    /// Remote store rejected the call for lack of a session
    #[error("Authentication required")]
    Unauthenticated,

    /// Remote store rejected the payload
    #[error("{0}")]
    ValidationRejected(String),

    /// Network or server-side failure
    #[error("Network error: {0}")]
    TransportFailure(String),

    /// Import document could not be decoded
    #[error("Invalid {format} file format: {reason}")]
    Format { format: ImportFormat, reason: String },

    #[error("Invalid file type: {0}. Please select KML or GeoJSON files")]
    InvalidFileType(String),

    #[error("{0}")]
    InvalidImage(String),

    #[error("Invalid coordinates: latitude {lat}, longitude {lng}")]
    InvalidCoordinates { lat: f64, lng: f64 },

    /// Missing or placeholder configuration, never retried
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Waypoint {0} is already being saved")]
    SaveInFlight(LocalId),

    #[error("Survey mode is not active")]
    NotSurveying,

    #[error("No waypoint selected")]
    NothingSelected,
}

impl SurveyError {
    pub fn format(format: ImportFormat, reason: impl Into<String>) -> Self {
        SurveyError::Format {
            format,
            reason: reason.into(),
        }
    }

    /// Whether the caller should prompt for a new session
    pub fn needs_login(&self) -> bool {
        matches!(self, SurveyError::Unauthenticated)
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, SurveyError::TransportFailure(_))
    }
}
