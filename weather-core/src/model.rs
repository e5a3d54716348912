use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// One normalized observation.
///
/// Built once per successful refresh cycle and never mutated afterwards; the
/// worker hands one clone to the history store and one to the status sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    /// Query string exactly as submitted.
    pub location: String,
    /// Capture time assigned at normalization, not the provider's clock.
    pub observed_at: DateTime<Utc>,
    pub temperature_c: f64,
    pub feels_like_c: f64,
    pub condition: String,
    pub humidity_pct: u8,
    pub wind_kph: f64,
    pub pressure_mb: f64,
    /// Opaque icon reference for the presentation layer.
    pub icon_ref: String,
}

/// A location submitted for refresh, tagged with its submission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshRequest {
    pub location: String,
    pub seq: u64,
}

/// Undigested provider response: the current-conditions body and the
/// forecast body, both required.
#[derive(Debug, Clone)]
pub struct RawWeatherPayload {
    pub location: String,
    pub current: serde_json::Value,
    pub forecast: serde_json::Value,
}

/// One hourly point of the forecast chart. Times are provider-local.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub time: NaiveDateTime,
    pub temperature_c: f64,
}

/// Next-day hourly temperatures, produced per refresh for rendering only.
pub type ForecastSeries = Vec<ForecastPoint>;
