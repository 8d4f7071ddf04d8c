//! Deterministic mock weather, for offline demos and tests.
//!
//! Values are derived from a hash of the coordinates rounded to two
//! decimals, so nearby points and repeated calls get the same report.

use crate::report::{CurrentConditions, DailyForecast, WeatherReport, condition_for_code, day_label};
use crate::{FORECAST_DAYS, WeatherError, WeatherSource};
use agrishield_core::Coordinates;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};

/// WMO codes the mock cycles through, driest first.
const CODES: [u8; 6] = [0, 2, 3, 61, 63, 65];

#[derive(Debug, Clone, Default)]
pub struct MockWeatherSource {
    today: Option<NaiveDate>,
}

impl MockWeatherSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin the first forecast day (for reproducible labels).
    pub fn with_today(today: NaiveDate) -> Self {
        Self { today: Some(today) }
    }

    fn generate(&self, coordinates: &Coordinates) -> WeatherReport {
        let seed = hash(coordinates);
        let today = self.today.unwrap_or_else(|| Utc::now().date_naive());

        let forecast = (0..FORECAST_DAYS)
            .map(|offset| {
                let day_seed = seed.wrapping_mul(31).wrapping_add(offset as u32 * 7919);
                let rain = (day_seed % 101) as u8;
                let code = CODES[(rain as usize * CODES.len() / 101).min(CODES.len() - 1)];
                let high = 26.0 + (day_seed % 10) as f64;
                DailyForecast {
                    day: day_label(today, offset),
                    high_c: high,
                    low_c: high - 8.0 - (day_seed % 3) as f64,
                    condition: condition_for_code(code).into(),
                    rain_probability_pct: rain,
                }
            })
            .collect::<Vec<_>>();

        let current = CurrentConditions {
            temperature_c: 22.0 + (seed % 12) as f64,
            condition: forecast
                .first()
                .map(|d| d.condition.clone())
                .unwrap_or_else(|| "Partly Cloudy".into()),
            humidity_pct: 55 + (seed % 40) as u8,
            wind_kmh: 5.0 + (seed % 20) as f64,
            precipitation_mm: ((seed % 300) as f64) / 10.0,
        };

        WeatherReport::new(coordinates.region(), current, forecast)
    }
}

/// Simple hash for deterministic but varied results.
fn hash(coordinates: &Coordinates) -> u32 {
    let key = format!("{:.2},{:.2}", coordinates.lat(), coordinates.lon());
    key.bytes()
        .fold(0u32, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u32))
}

#[async_trait]
impl WeatherSource for MockWeatherSource {
    fn name(&self) -> &str {
        "mock"
    }

    async fn report(&self, coordinates: Coordinates) -> Result<WeatherReport, WeatherError> {
        Ok(self.generate(&coordinates))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::derive_alerts;

    fn source() -> MockWeatherSource {
        MockWeatherSource::with_today(NaiveDate::from_ymd_opt(2026, 10, 18).unwrap())
    }

    fn guwahati() -> Coordinates {
        Coordinates::new(26.14, 91.74).unwrap()
    }

    #[tokio::test]
    async fn report_has_five_days_and_region_label() {
        let report = source().report(guwahati()).await.unwrap();
        assert_eq!(report.forecast.len(), FORECAST_DAYS);
        assert_eq!(report.forecast[0].day, "Today");
        assert_eq!(report.forecast[1].day, "Tomorrow");
        assert_eq!(report.location, "the Brahmaputra valley and north-eastern hills");
    }

    #[tokio::test]
    async fn deterministic_results() {
        let r1 = source().report(guwahati()).await.unwrap();
        let r2 = source().report(Coordinates::new(26.141, 91.739).unwrap()).await.unwrap();
        assert_eq!(r1, r2);
    }

    #[tokio::test]
    async fn values_are_plausible() {
        let report = source().report(guwahati()).await.unwrap();
        assert!((0..=100).contains(&report.current.humidity_pct));
        for day in &report.forecast {
            assert!(day.rain_probability_pct <= 100);
            assert!(day.low_c < day.high_c);
        }
        assert_eq!(report.alerts, derive_alerts(&report.forecast));
    }

    #[tokio::test]
    async fn report_never_contains_coordinates() {
        let report = source().report(guwahati()).await.unwrap();
        let json = serde_json::to_string(&report).unwrap();
        assert!(!json.contains("26.14"));
        assert!(!json.contains("91.74"));
    }
}
