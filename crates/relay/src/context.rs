//! Context Builder: the per-request situational brief.
//!
//! Turns an optional raw `{lat, lon}` pair and an optional ISO date into two
//! human-readable lines for the policy prompt. Building never fails; anything
//! missing or malformed degrades to a "not available" sentinel.

use agrishield_core::Coordinates;
use chrono::{DateTime, NaiveDate};

/// Sentinel used for any field that could not be determined.
pub const NOT_AVAILABLE: &str = "not available";

/// Location line used when no valid coordinates were supplied.
pub const LOCATION_NOT_AVAILABLE: &str = "location not available (coordinates not available)";

/// Ephemeral facts attached to one outgoing request. Never stored in history.
#[derive(Clone, PartialEq)]
pub struct SituationalContext {
    coordinates: Option<Coordinates>,
    location: String,
    date: String,
}

impl SituationalContext {
    /// Build the brief from raw request fields.
    pub fn build(location: Option<(f64, f64)>, date: Option<&str>) -> Self {
        let coordinates = location.and_then(|(lat, lon)| Coordinates::new(lat, lon));
        Self {
            location: describe_location(coordinates.as_ref()),
            date: date.and_then(format_date).unwrap_or_else(|| NOT_AVAILABLE.into()),
            coordinates,
        }
    }

    /// Human-readable location line. Never contains digits.
    pub fn location_descriptor(&self) -> &str {
        &self.location
    }

    /// Long-form date (e.g. "Sunday, October 18, 2026") or the sentinel.
    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn has_location(&self) -> bool {
        self.coordinates.is_some()
    }

    /// Raw coordinates, for the response scrubber only.
    pub(crate) fn coordinates(&self) -> Option<&Coordinates> {
        self.coordinates.as_ref()
    }
}

impl std::fmt::Debug for SituationalContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SituationalContext")
            .field("has_location", &self.has_location())
            .field("location", &self.location)
            .field("date", &self.date)
            .finish()
    }
}

fn describe_location(coordinates: Option<&Coordinates>) -> String {
    match coordinates.map(Coordinates::region) {
        None => LOCATION_NOT_AVAILABLE.into(),
        Some(agrishield_core::geo::UNKNOWN_REGION) => {
            "coordinates available; broad region not identified".into()
        }
        Some(region) => format!("coordinates available; the farmer is in {region}"),
    }
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp.
fn format_date(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))?;
    Some(date.format("%A, %B %-d, %Y").to_string())
}
