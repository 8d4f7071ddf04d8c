//! Open-Meteo forecast source (no API key required).

use crate::report::{CurrentConditions, DailyForecast, WeatherReport, condition_for_code, day_label};
use crate::{FORECAST_DAYS, WeatherError, WeatherSource};
use agrishield_core::Coordinates;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_BASE_URL: &str = "https://api.open-meteo.com/v1";

pub struct OpenMeteoSource {
    base_url: String,
    client: reqwest::Client,
}

impl OpenMeteoSource {
    pub fn new() -> Result<Self, WeatherError> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, WeatherError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| {
                WeatherError::NotConfigured(format!("Failed to create HTTP client: {e}"))
            })?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    fn query(coordinates: &Coordinates) -> Vec<(&'static str, String)> {
        vec![
            ("latitude", format!("{:.4}", coordinates.lat())),
            ("longitude", format!("{:.4}", coordinates.lon())),
            (
                "current",
                "temperature_2m,relative_humidity_2m,wind_speed_10m,precipitation,weather_code".into(),
            ),
            (
                "daily",
                "temperature_2m_max,temperature_2m_min,precipitation_probability_max,weather_code".into(),
            ),
            ("forecast_days", FORECAST_DAYS.to_string()),
            ("timezone", "auto".into()),
        ]
    }

    fn to_report(
        response: ForecastResponse,
        location: &str,
    ) -> Result<WeatherReport, WeatherError> {
        let daily = response.daily;
        let today = daily
            .time
            .first()
            .and_then(|t| NaiveDate::parse_from_str(t, "%Y-%m-%d").ok())
            .ok_or_else(|| WeatherError::Malformed("daily.time is empty or not a date".into()))?;

        let days = daily.time.len().min(FORECAST_DAYS);
        let forecast = (0..days)
            .map(|i| DailyForecast {
                day: day_label(today, i),
                high_c: daily.temperature_2m_max.get(i).copied().flatten().unwrap_or_default(),
                low_c: daily.temperature_2m_min.get(i).copied().flatten().unwrap_or_default(),
                condition: condition_for_code(
                    daily.weather_code.get(i).copied().flatten().unwrap_or(u8::MAX),
                )
                .into(),
                rain_probability_pct: daily
                    .precipitation_probability_max
                    .get(i)
                    .copied()
                    .flatten()
                    .map(|p| p.clamp(0.0, 100.0).round() as u8)
                    .unwrap_or(0),
            })
            .collect();

        let current = response.current;
        let current = CurrentConditions {
            temperature_c: current.temperature_2m,
            condition: condition_for_code(current.weather_code.unwrap_or(u8::MAX)).into(),
            humidity_pct: current.relative_humidity_2m.clamp(0.0, 100.0).round() as u8,
            wind_kmh: current.wind_speed_10m,
            precipitation_mm: current.precipitation,
        };

        Ok(WeatherReport::new(location, current, forecast))
    }
}

#[async_trait]
impl WeatherSource for OpenMeteoSource {
    fn name(&self) -> &str {
        "open-meteo"
    }

    async fn report(&self, coordinates: Coordinates) -> Result<WeatherReport, WeatherError> {
        let url = format!("{}/forecast", self.base_url);
        debug!(region = coordinates.region(), "Requesting Open-Meteo forecast");

        let response = self
            .client
            .get(&url)
            .query(&Self::query(&coordinates))
            .send()
            .await
            .map_err(|e| WeatherError::Network(e.without_url().to_string()))?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            let message = response.text().await.unwrap_or_default();
            warn!(status, "Open-Meteo returned error");
            return Err(WeatherError::Api { status, message });
        }

        let body: ForecastResponse = response
            .json()
            .await
            .map_err(|e| WeatherError::Malformed(e.without_url().to_string()))?;

        Self::to_report(body, coordinates.region())
    }
}

// --- Open-Meteo API types ---

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current: CurrentBlock,
    daily: DailyBlock,
}

#[derive(Debug, Deserialize)]
struct CurrentBlock {
    temperature_2m: f64,
    relative_humidity_2m: f64,
    wind_speed_10m: f64,
    #[serde(default)]
    precipitation: f64,
    #[serde(default)]
    weather_code: Option<u8>,
}

#[derive(Debug, Deserialize)]
struct DailyBlock {
    time: Vec<String>,
    #[serde(default)]
    temperature_2m_max: Vec<Option<f64>>,
    #[serde(default)]
    temperature_2m_min: Vec<Option<f64>>,
    #[serde(default)]
    precipitation_probability_max: Vec<Option<f64>>,
    #[serde(default)]
    weather_code: Vec<Option<u8>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::AlertPriority;

    const SAMPLE: &str = r#"{
        "latitude": 26.125, "longitude": 91.75,
        "current": {"time": "2026-07-14T10:00", "temperature_2m": 29.4, "relative_humidity_2m": 84,
                    "wind_speed_10m": 11.2, "precipitation": 3.1, "weather_code": 63},
        "daily": {
            "time": ["2026-07-14", "2026-07-15", "2026-07-16", "2026-07-17", "2026-07-18"],
            "temperature_2m_max": [31.2, 30.1, 29.0, 31.5, 33.0],
            "temperature_2m_min": [24.0, 23.8, 23.1, 24.2, 25.0],
            "precipitation_probability_max": [85, 95, 90, 60, null],
            "weather_code": [63, 65, 65, 61, 2]
        }
    }"#;

    #[test]
    fn converts_forecast_response() {
        let parsed: ForecastResponse = serde_json::from_str(SAMPLE).unwrap();
        let report = OpenMeteoSource::to_report(parsed, "the Brahmaputra valley").unwrap();

        assert_eq!(report.location, "the Brahmaputra valley");
        assert_eq!(report.current.humidity_pct, 84);
        assert_eq!(report.current.condition, "Rain");
        assert_eq!(report.forecast.len(), 5);
        assert_eq!(report.forecast[0].day, "Today");
        assert_eq!(report.forecast[2].day, "Thursday");
        assert_eq!(report.forecast[1].condition, "Heavy Rain");
        assert_eq!(report.forecast[4].rain_probability_pct, 0);

        assert_eq!(report.alerts.len(), 2);
        assert_eq!(report.alerts[0].priority, AlertPriority::High);
    }

    #[test]
    fn empty_daily_block_is_malformed() {
        let data = r#"{
            "current": {"temperature_2m": 20.0, "relative_humidity_2m": 50, "wind_speed_10m": 3.0},
            "daily": {"time": []}
        }"#;
        let parsed: ForecastResponse = serde_json::from_str(data).unwrap();
        let err = OpenMeteoSource::to_report(parsed, "your area").unwrap_err();
        assert!(matches!(err, WeatherError::Malformed(_)));
    }

    #[test]
    fn query_rounds_coordinates() {
        let query = OpenMeteoSource::query(&Coordinates::new(26.141_234_5, 91.74).unwrap());
        assert_eq!(query[0], ("latitude", "26.1412".to_string()));
        assert_eq!(query[4], ("forecast_days", "5".to_string()));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_network_error() {
        let source = OpenMeteoSource::with_base_url("http://127.0.0.1:9/v1").unwrap();
        let err = source
            .report(Coordinates::new(26.14, 91.74).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, WeatherError::Network(_)));
    }
}
