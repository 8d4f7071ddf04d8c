//! Report types and the flood-alert rules shared by every source.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// Rain probability (%) on any single day that raises a heavy-rainfall alert.
pub const HEAVY_RAIN_THRESHOLD: u8 = 80;

/// Rain probability (%) that counts a day toward the flood-risk alert.
pub const FLOOD_RISK_THRESHOLD: u8 = 60;

/// Wet days at or above [`FLOOD_RISK_THRESHOLD`] needed for a flood-risk alert.
pub const FLOOD_RISK_MIN_DAYS: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    /// Coarse region phrase; never coordinates.
    pub location: String,
    pub current: CurrentConditions,
    pub forecast: Vec<DailyForecast>,
    pub alerts: Vec<WeatherAlert>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub temperature_c: f64,
    pub condition: String,
    pub humidity_pct: u8,
    pub wind_kmh: f64,
    pub precipitation_mm: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyForecast {
    /// "Today", "Tomorrow", then weekday names.
    pub day: String,
    pub high_c: f64,
    pub low_c: f64,
    pub condition: String,
    pub rain_probability_pct: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertPriority {
    High,
    Medium,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherAlert {
    pub title: String,
    pub message: String,
    pub priority: AlertPriority,
}

impl WeatherReport {
    /// Assemble a report, deriving alerts from the forecast.
    pub fn new(
        location: impl Into<String>,
        current: CurrentConditions,
        forecast: Vec<DailyForecast>,
    ) -> Self {
        let alerts = derive_alerts(&forecast);
        Self {
            location: location.into(),
            current,
            forecast,
            alerts,
        }
    }
}

/// Flood-related alerts for a forecast, most urgent first.
pub fn derive_alerts(forecast: &[DailyForecast]) -> Vec<WeatherAlert> {
    let mut alerts = Vec::new();

    if let Some(day) = forecast
        .iter()
        .find(|d| d.rain_probability_pct >= HEAVY_RAIN_THRESHOLD)
    {
        alerts.push(WeatherAlert {
            title: "Heavy Rainfall Alert".into(),
            message: format!(
                "{}% chance of rain {}. Clear field drainage channels and delay fertilizer application.",
                day.rain_probability_pct,
                when(&day.day)
            ),
            priority: AlertPriority::High,
        });
    }

    let wet_days = forecast
        .iter()
        .filter(|d| d.rain_probability_pct >= FLOOD_RISK_THRESHOLD)
        .count();
    if wet_days >= FLOOD_RISK_MIN_DAYS {
        alerts.push(WeatherAlert {
            title: "Flood Risk Assessment".into(),
            message: format!(
                "{wet_days} wet days ahead. Flood risk in low-lying fields; consider delayed planting \
                 or flood-tolerant varieties."
            ),
            priority: AlertPriority::Medium,
        });
    }

    alerts
}

fn when(day: &str) -> String {
    match day {
        "Today" | "Tomorrow" => day.to_lowercase(),
        other => format!("on {other}"),
    }
}

/// Label for the forecast day `offset` days after `today`.
pub fn day_label(today: NaiveDate, offset: usize) -> String {
    match offset {
        0 => "Today".into(),
        1 => "Tomorrow".into(),
        n => {
            let date = today + chrono::Days::new(n as u64);
            weekday_name(date.weekday()).into()
        }
    }
}

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// WMO weather interpretation code to a short condition.
pub fn condition_for_code(code: u8) -> &'static str {
    match code {
        0 => "Sunny",
        1 | 2 => "Partly Cloudy",
        3 => "Cloudy",
        45 | 48 => "Foggy",
        51..=57 => "Drizzle",
        61 | 63 | 80 | 81 => "Rain",
        65 | 82 => "Heavy Rain",
        66 | 67 => "Freezing Rain",
        71..=77 | 85 | 86 => "Snow",
        95..=99 => "Thunderstorms",
        _ => "Unknown",
    }
}
