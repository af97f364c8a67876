//! Transient user notices. Every operation outcome, success or failure,
//! surfaces as exactly one of these.

use crate::domain::SurveyError;
use crate::geocoding::Place;
use crate::routing::Route;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub message: String,
    pub severity: Severity,
    /// Show the login prompt alongside the message
    pub prompt_login: bool,
}

fn plural(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}

impl Notice {
    pub fn new(message: impl Into<String>, severity: Severity) -> Self {
        Self {
            message: message.into(),
            severity,
            prompt_login: false,
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(message, Severity::Success)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(message, Severity::Info)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(message, Severity::Warning)
    }

    pub fn saved(created: bool) -> Self {
        if created {
            Self::success("Waypoint saved successfully!")
        } else {
            Self::success("Waypoint updated successfully!")
        }
    }

    pub fn removed(was_persisted: bool) -> Self {
        if was_persisted {
            Self::success("Waypoint deleted successfully!")
        } else {
            Self::success("Waypoint removed!")
        }
    }

    /// An import that found nothing is a warning, not a failure
    pub fn imported(count: usize, file_name: &str) -> Self {
        if count == 0 {
            Self::warning("No valid waypoints found in the file")
        } else {
            Self::success(format!("Imported {} waypoint{} from {}", count, plural(count), file_name))
        }
    }

    pub fn exported(count: usize, format: impl std::fmt::Display) -> Self {
        Self::success(format!("Exported {} waypoint{} to {}", count, plural(count), format))
    }

    pub fn low_accuracy(accuracy_m: f64) -> Self {
        Self::warning(format!(
            "Low GPS accuracy: ±{}m, location may be imprecise",
            accuracy_m.round()
        ))
    }

    pub fn route_found(route: &Route) -> Self {
        Self::success(format!(
            "Route found! Distance: {:.2} km, Duration: {} min",
            route.distance_m / 1000.0,
            (route.duration_s / 60.0).round()
        ))
    }

    pub fn found(place: &Place) -> Self {
        Self::success(format!("Found: {}", place.display_name))
    }
}

impl From<&SurveyError> for Notice {
    fn from(error: &SurveyError) -> Self {
        let mut notice = Notice::new(error.to_string(), Severity::Error);
        notice.prompt_login = error.needs_login();
        notice
    }
}
