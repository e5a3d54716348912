//! Core library for the `weather` dashboard.
//!
//! This crate defines the asynchronous refresh pipeline:
//! - [`RefreshQueue`]: FIFO of locations submitted by the UI or a timer
//! - [`RefreshWorker`]: the single background task that fetches, normalizes,
//!   appends history and reports
//! - [`WeatherFetcher`]: the WeatherAPI.com client seam
//! - [`HistoryStore`]: append-only CSV history
//! - [`StatusSink`]: how outcomes reach the presentation layer
//!
//! Configuration lives here too, but is only read by the binary at startup.

pub mod config;
pub mod error;
pub mod history;
pub mod model;
pub mod normalize;
pub mod provider;
pub mod queue;
pub mod sink;
pub mod worker;

pub use config::{ApiConfig, AppConfig, Config};
pub use error::{ErrorKind, FetchError, NormalizationError, PersistenceError, RefreshError};
pub use history::{CsvHistoryStore, HistoryRow, HistoryStore};
pub use model::{ForecastPoint, ForecastSeries, RawWeatherPayload, RefreshRequest, WeatherRecord};
pub use provider::{WeatherApiFetcher, WeatherFetcher, fetcher_from_config};
pub use queue::{RefreshQueue, RefreshReceiver, refresh_queue};
pub use sink::{ChannelSink, StatusEvent, StatusSink};
pub use worker::{CycleOutcome, RefreshWorker, WorkerState};
