//! Turns raw WeatherAPI.com documents into [`WeatherRecord`]s and forecast
//! series. Values pass through in provider units (°C, km/h, mb).

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;

use crate::{
    error::NormalizationError,
    model::{ForecastPoint, ForecastSeries, RawWeatherPayload, WeatherRecord},
};

const FORECAST_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

#[derive(Debug, Deserialize)]
struct WaCondition {
    text: String,
    icon: String,
}

#[derive(Debug, Deserialize)]
struct WaCurrent {
    temp_c: f64,
    feelslike_c: f64,
    humidity: i64,
    wind_kph: f64,
    pressure_mb: f64,
    condition: WaCondition,
}

#[derive(Debug, Deserialize)]
struct WaCurrentResponse {
    current: WaCurrent,
}

#[derive(Debug, Deserialize)]
struct WaForecastHour {
    time: String,
    temp_c: f64,
}

#[derive(Debug, Deserialize)]
struct WaForecastDay {
    hour: Vec<WaForecastHour>,
}

#[derive(Debug, Deserialize)]
struct WaForecast {
    forecastday: Vec<WaForecastDay>,
}

#[derive(Debug, Deserialize)]
struct WaForecastResponse {
    forecast: WaForecast,
}

/// Builds the record from the current-conditions body, stamping `observed_at`.
pub fn normalize(
    payload: &RawWeatherPayload,
    observed_at: DateTime<Utc>,
) -> Result<WeatherRecord, NormalizationError> {
    let parsed = WaCurrentResponse::deserialize(&payload.current)
        .map_err(|source| NormalizationError::Malformed { section: "current", source })?;
    let current = parsed.current;

    let humidity_pct = u8::try_from(current.humidity)
        .ok()
        .filter(|h| *h <= 100)
        .ok_or_else(|| out_of_range("humidity", current.humidity))?;

    if current.wind_kph < 0.0 {
        return Err(out_of_range("wind_kph", current.wind_kph));
    }
    if current.pressure_mb <= 0.0 {
        return Err(out_of_range("pressure_mb", current.pressure_mb));
    }

    Ok(WeatherRecord {
        location: payload.location.clone(),
        observed_at,
        temperature_c: current.temp_c,
        feels_like_c: current.feelslike_c,
        condition: current.condition.text,
        humidity_pct,
        wind_kph: current.wind_kph,
        pressure_mb: current.pressure_mb,
        icon_ref: icon_ref(current.condition.icon),
    })
}

/// [`normalize`] with the capture time taken from the wall clock.
pub fn normalize_now(payload: &RawWeatherPayload) -> Result<WeatherRecord, NormalizationError> {
    normalize(payload, Utc::now())
}

/// Hourly temperatures of the first forecast day, in provider order.
pub fn forecast_series(payload: &RawWeatherPayload) -> Result<ForecastSeries, NormalizationError> {
    let parsed = WaForecastResponse::deserialize(&payload.forecast)
        .map_err(|source| NormalizationError::Malformed { section: "forecast", source })?;

    let day = parsed
        .forecast
        .forecastday
        .into_iter()
        .next()
        .ok_or(NormalizationError::MissingField("forecast.forecastday[0]"))?;

    day.hour
        .into_iter()
        .map(|h| {
            let time = NaiveDateTime::parse_from_str(&h.time, FORECAST_TIME_FORMAT)
                .map_err(|_| NormalizationError::BadTime(h.time.clone()))?;
            Ok(ForecastPoint { time, temperature_c: h.temp_c })
        })
        .collect()
}

// WeatherAPI serves protocol-relative icon URLs ("//cdn.weatherapi.com/...").
fn icon_ref(icon: String) -> String {
    if icon.starts_with("//") { format!("http:{icon}") } else { icon }
}

fn out_of_range(field: &'static str, value: impl ToString) -> NormalizationError {
    NormalizationError::OutOfRange { field, value: value.to_string() }
}
