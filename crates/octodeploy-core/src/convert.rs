// ── Value conversions shared by expand/flatten mappings ──
//
// Octopus stores most action settings as strings in a property bag:
// lists are comma-joined, booleans are "True"/"False", durations are
// TimeSpans. These helpers keep the encodings in one place.

use std::time::Duration;

use crate::error::CoreError;

/// Split a comma-joined list, trimming entries and dropping empty ones.
pub fn split_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

pub fn join_csv(values: &[String]) -> String {
    values.join(",")
}

/// Case-insensitive parse of an Octopus boolean property.
pub fn parse_bool(raw: &str) -> bool {
    raw.trim().eq_ignore_ascii_case("true")
}

/// Octopus spelling of a boolean property.
pub fn bool_str(value: bool) -> &'static str {
    if value { "True" } else { "False" }
}

/// `None` for empty strings.
pub fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|s| !s.is_empty()).map(str::to_owned)
}

/// Parse a human-readable duration (`90s`, `5m`, `1h 30m`).
pub fn parse_duration(field: &str, raw: &str) -> Result<Duration, CoreError> {
    humantime::parse_duration(raw)
        .map_err(|e| CoreError::validation(field, format!("invalid duration {raw:?}: {e}")))
}

/// Render a duration for state, keeping the prior spelling when it
/// denotes the same length of time.
pub fn format_duration(value: Duration, prior: Option<&str>) -> String {
    match prior {
        Some(p) if humantime::parse_duration(p).ok() == Some(value) => p.to_owned(),
        _ => humantime::format_duration(value).to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn csv_round_trips_and_trims() {
        assert_eq!(split_csv("web, db,,api "), vec!["web", "db", "api"]);
        assert_eq!(join_csv(&["web".into(), "db".into()]), "web,db");
        assert!(split_csv("").is_empty());
    }

    #[test]
    fn booleans_parse_case_insensitively() {
        assert!(parse_bool("True"));
        assert!(parse_bool("true"));
        assert!(parse_bool("TRUE"));
        assert!(!parse_bool("False"));
        assert!(!parse_bool("yes"));
        assert_eq!(bool_str(true), "True");
    }

    #[test]
    fn durations_keep_equivalent_prior_spelling() {
        let d = parse_duration("timeout", "90s").unwrap_or_default();
        assert_eq!(format_duration(d, Some("90s")), "90s");
        assert_eq!(format_duration(d, None), "1m 30s");
        assert_eq!(format_duration(d, Some("2m")), "1m 30s");
    }

    #[test]
    fn malformed_duration_names_the_field() {
        let err = parse_duration("connection_connect_timeout", "soon").unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation { ref field, .. } if field == "connection_connect_timeout"
        ));
    }
}
