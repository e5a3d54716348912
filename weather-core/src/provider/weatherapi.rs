use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::{error::FetchError, model::RawWeatherPayload};

use super::WeatherFetcher;

/// WeatherAPI.com client for `current.json` and `forecast.json`.
#[derive(Debug, Clone)]
pub struct WeatherApiFetcher {
    base_url: String,
    api_key: String,
    http: Client,
}

impl WeatherApiFetcher {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            http: Client::new(),
        }
    }

    async fn get_json(
        &self,
        call: &'static str,
        location: &str,
        extra: &[(&str, &str)],
    ) -> Result<serde_json::Value, FetchError> {
        let url = format!("{}/{call}.json", self.base_url);

        let res = self
            .http
            .get(&url)
            .query(&[("key", self.api_key.as_str()), ("q", location), ("aqi", "yes")])
            .query(extra)
            .send()
            .await
            .map_err(|source| transport_error(call, location, source))?;

        let status = res.status();
        let body = res.text().await.map_err(|source| transport_error(call, location, source))?;

        if !status.is_success() {
            return Err(FetchError::Status { call, status, body: truncate_body(&body) });
        }

        debug!(call, location, bytes = body.len(), "provider responded");

        serde_json::from_str(&body).map_err(|source| FetchError::Body { call, source })
    }
}

#[async_trait]
impl WeatherFetcher for WeatherApiFetcher {
    async fn fetch(&self, location: &str) -> Result<RawWeatherPayload, FetchError> {
        let current = self.get_json("current", location, &[]).await?;
        let forecast = self.get_json("forecast", location, &[("days", "1")]).await?;

        Ok(RawWeatherPayload { location: location.to_string(), current, forecast })
    }
}

// The request URL carries the API key in its query string; never let it into messages.
fn transport_error(call: &'static str, location: &str, source: reqwest::Error) -> FetchError {
    FetchError::Transport { call, location: location.to_string(), source: source.without_url() }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_body_limits_long_bodies() {
        let long = "x".repeat(500);
        let out = truncate_body(&long);
        assert_eq!(out.len(), 203);
        assert!(out.ends_with("..."));
    }

    #[test]
    fn truncate_body_respects_char_boundaries() {
        let long = "é".repeat(300);
        let out = truncate_body(&long);
        assert_eq!(out.chars().count(), 203);
    }

    #[test]
    fn short_body_is_untouched() {
        assert_eq!(truncate_body("oops"), "oops");
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let f = WeatherApiFetcher::new("http://localhost:1/v1/".into(), "k".into());
        assert_eq!(f.base_url, "http://localhost:1/v1");
    }
}
