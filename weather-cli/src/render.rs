use chrono::Local;
use weather_core::{ErrorKind, ForecastSeries, StatusEvent, WeatherRecord};

const BAR_WIDTH: f64 = 30.0;

pub fn event(event: &StatusEvent) -> String {
    match event {
        StatusEvent::StatusText(text) => format!("[status] {text}"),
        StatusEvent::Failure { location, kind, message } => failure(location, *kind, message),
        StatusEvent::Result { record, forecast, .. } => {
            format!("{}\n{}", record_block(record), forecast_chart(forecast))
        }
    }
}

fn failure(location: &str, kind: ErrorKind, message: &str) -> String {
    format!("[error] {location}: {kind} failed: {message}")
}

pub fn record_block(record: &WeatherRecord) -> String {
    let observed = record.observed_at.with_timezone(&Local).format("%Y-%m-%d %H:%M");
    [
        format!("== {} ({observed}) ==", record.location),
        format!("Temperature: {}°C (feels like {}°C)", record.temperature_c, record.feels_like_c),
        format!("Condition:   {}", record.condition),
        format!("Humidity:    {}%", record.humidity_pct),
        format!("Wind Speed:  {} km/h", record.wind_kph),
        format!("Pressure:    {} mb", record.pressure_mb),
        format!("Icon:        {}", record.icon_ref),
    ]
    .join("\n")
}

/// Horizontal bar per hour, scaled between the day's min and max.
pub fn forecast_chart(series: &ForecastSeries) -> String {
    if series.is_empty() {
        return "24-Hour Forecast: no data".to_string();
    }

    let min = series.iter().map(|p| p.temperature_c).fold(f64::INFINITY, f64::min);
    let max = series.iter().map(|p| p.temperature_c).fold(f64::NEG_INFINITY, f64::max);
    let span = (max - min).max(f64::EPSILON);

    let mut out = String::from("24-Hour Forecast (°C)");
    for point in series {
        let len = 1 + ((point.temperature_c - min) / span * BAR_WIDTH).round() as usize;
        out.push_str(&format!(
            "\n{}  {:>6.1}  {}",
            point.time.format("%H:%M"),
            point.temperature_c,
            "#".repeat(len)
        ));
    }
    out
}
