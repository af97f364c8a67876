//! Display-name rules: positional labels, default-ish names and the
//! protected "Default Location" sentinel.

use std::sync::OnceLock;

use regex::Regex;

pub const DEFAULT_LOCATION_NAME: &str = "Default Location";

/// Name given to imported points that carry no name of their own
pub const IMPORTED_POINT_NAME: &str = "Imported Point";

/// Sentinel check: trimmed, case-insensitive match on "default location"
pub fn is_default_location(name: &str) -> bool {
    name.trim().eq_ignore_ascii_case(DEFAULT_LOCATION_NAME)
}

/// Label for the record at `index` (zero-based) in the collection
pub fn positional_label(index: usize) -> String {
    format!("Point {}", index + 1)
}

/// Names that should be replaced by a positional label:
/// empty, "Point", "Point 7", "Imported Point", "imported point 3", ...
pub fn is_default_ish(name: &str) -> bool {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| {
        Regex::new(r"(?i)^(point|imported point)(\s*\d*)?$").expect("static pattern is valid")
    });

    let trimmed = name.trim();
    trimmed.is_empty() || pattern.is_match(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_location_is_trimmed_and_case_insensitive() {
        assert!(is_default_location("Default Location"));
        assert!(is_default_location("  default LOCATION "));
        assert!(!is_default_location("Default Locations"));
        assert!(!is_default_location("Point 1"));
    }

    #[test]
    fn test_default_ish_names() {
        for name in ["", "  ", "Point", "Point 3", "point12", "Imported Point", "IMPORTED POINT 4"] {
            assert!(is_default_ish(name), "{name:?} should be default-ish");
        }
        for name in ["Camp", "Point of interest", "Pointe 3", "Default Location"] {
            assert!(!is_default_ish(name), "{name:?} should be custom");
        }
    }

    #[test]
    fn test_positional_label_is_one_based() {
        assert_eq!(positional_label(0), "Point 1");
        assert_eq!(positional_label(9), "Point 10");
    }
}
