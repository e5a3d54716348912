use async_trait::async_trait;
use std::fmt::Debug;

use crate::{Config, error::FetchError, model::RawWeatherPayload};

pub mod weatherapi;

pub use weatherapi::WeatherApiFetcher;

/// Remote source of current conditions plus a one-day forecast.
///
/// Stateless request/response: one attempt per call, no retries, no timeout
/// beyond whatever the transport imposes. Both documents are required, so a
/// failure of either call fails the whole fetch.
#[async_trait]
pub trait WeatherFetcher: Send + Sync + Debug {
    async fn fetch(&self, location: &str) -> Result<RawWeatherPayload, FetchError>;
}

/// Construct the WeatherAPI.com fetcher from config.
pub fn fetcher_from_config(config: &Config) -> anyhow::Result<Box<dyn WeatherFetcher>> {
    let api_key = config.api_key().ok_or_else(|| {
        anyhow::anyhow!(
            "No API key configured.\n\
                 Hint: run `weather configure` and enter your WeatherAPI.com key."
        )
    })?;

    Ok(Box::new(WeatherApiFetcher::new(config.api.base_url.clone(), api_key.to_owned())))
}
