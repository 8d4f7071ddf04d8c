//! Weather reports for the AgriShield dashboard.
//!
//! A read-only sibling of the relay: a geolocation goes in, current
//! conditions, a five-day forecast and flood alerts come out. Reports are
//! labeled with the coarse region phrase, never with the coordinates.

pub mod mock;
pub mod open_meteo;
pub mod report;

use agrishield_config::WeatherConfig;
use agrishield_core::Coordinates;
use async_trait::async_trait;
use std::sync::Arc;

pub use mock::MockWeatherSource;
pub use open_meteo::OpenMeteoSource;
pub use report::{AlertPriority, CurrentConditions, DailyForecast, WeatherAlert, WeatherReport};

/// Number of forecast days in every report.
pub const FORECAST_DAYS: usize = 5;

/// A source of weather reports.
#[async_trait]
pub trait WeatherSource: Send + Sync {
    fn name(&self) -> &str;

    async fn report(&self, coordinates: Coordinates) -> Result<WeatherReport, WeatherError>;
}

/// Errors from a weather source.
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("Weather API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Weather network error: {0}")]
    Network(String),

    #[error("Malformed weather response: {0}")]
    Malformed(String),

    #[error("Weather source not configured: {0}")]
    NotConfigured(String),
}

/// Build the source named by `[weather].source`.
pub fn build_from_config(config: &WeatherConfig) -> Result<Arc<dyn WeatherSource>, WeatherError> {
    match config.source.as_str() {
        "mock" => Ok(Arc::new(MockWeatherSource::new())),
        "open-meteo" => {
            let source = match &config.api_url {
                Some(url) => OpenMeteoSource::with_base_url(url)?,
                None => OpenMeteoSource::new()?,
            };
            Ok(Arc::new(source))
        }
        other => Err(WeatherError::NotConfigured(format!(
            "unknown weather source '{other}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_default_mock_source() {
        let source = build_from_config(&WeatherConfig::default()).unwrap();
        assert_eq!(source.name(), "mock");
    }

    #[test]
    fn builds_open_meteo_source() {
        let config = WeatherConfig {
            source: "open-meteo".into(),
            api_url: None,
        };
        let source = build_from_config(&config).unwrap();
        assert_eq!(source.name(), "open-meteo");
    }

    #[test]
    fn unknown_source_is_rejected() {
        let config = WeatherConfig {
            source: "almanac".into(),
            api_url: None,
        };
        assert!(build_from_config(&config).is_err());
    }
}
