use std::{future::Future, path::PathBuf, sync::Arc};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use inquire::{CustomType, Password, PasswordDisplayMode, Text};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc::UnboundedReceiver,
    task::JoinHandle,
};
use tracing::{info, warn};
use weather_core::{
    ChannelSink, Config, CsvHistoryStore, ErrorKind, HistoryStore, RefreshQueue, RefreshWorker,
    StatusEvent, WeatherFetcher, fetcher_from_config, refresh_queue,
};

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather", version, about = "Weather dashboard")]
pub struct Cli {
    /// Use this config file instead of the platform default.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Set the API key, default location and refresh interval.
    Configure,

    /// Refresh one location once and print it.
    Show {
        /// Location query; defaults to the configured default location.
        location: Option<String>,
    },

    /// Live dashboard: type a location and press enter to switch.
    Watch {
        /// Initial location; defaults to the configured default location.
        location: Option<String>,
    },
}

impl Cli {
    /// Read the config named by `--config`, or the platform default.
    pub fn load_config(&self) -> Result<Config> {
        match &self.config {
            Some(path) => Config::load_from(path),
            None => Config::load(),
        }
    }

    pub async fn run(self, config: Config) -> Result<()> {
        match self.command {
            Command::Configure => configure(config, self.config.as_deref()),
            Command::Show { location } => {
                let location = location.unwrap_or_else(|| config.app.default_location.clone());
                show(&config, location).await
            }
            Command::Watch { location } => {
                let location = location.unwrap_or_else(|| config.app.default_location.clone());
                watch(&config, location).await
            }
        }
    }
}

/// What the worker reported while the pipeline was winding down.
#[derive(Debug, Default, PartialEq, Eq)]
struct RefreshSummary {
    /// Fetch or normalization failures; history write failures are only warnings.
    failures: usize,
    interrupted: bool,
}

impl RefreshSummary {
    fn observe(&mut self, event: &StatusEvent) {
        match event {
            StatusEvent::Failure { kind: ErrorKind::Persistence, .. } => {}
            StatusEvent::Failure { .. } => self.failures += 1,
            _ => {}
        }
    }
}

struct Pipeline {
    queue: RefreshQueue,
    events: UnboundedReceiver<StatusEvent>,
    worker: JoinHandle<()>,
}

impl Pipeline {
    fn start(config: &Config) -> Result<Self> {
        let fetcher = fetcher_from_config(config)?;
        let history = config.history_path()?;
        info!(history = %history.display(), "appending history");

        Ok(Self::new(fetcher, Box::new(CsvHistoryStore::new(history))))
    }

    fn new(fetcher: Box<dyn WeatherFetcher>, store: Box<dyn HistoryStore>) -> Self {
        let (sink, events) = ChannelSink::new();
        let (queue, requests) = refresh_queue();
        let worker = RefreshWorker::new(fetcher, store, Arc::new(sink)).spawn(requests);

        Self { queue, events, worker }
    }

    /// Let the worker finish what is queued, printing whatever it reports.
    /// If `interrupt` completes first the worker is aborted mid-cycle.
    async fn finish(mut self, interrupt: impl Future<Output = ()>) -> Result<RefreshSummary> {
        self.queue.shutdown();
        let mut summary = RefreshSummary::default();
        tokio::pin!(interrupt);

        loop {
            tokio::select! {
                event = self.events.recv() => {
                    let Some(event) = event else { break };
                    summary.observe(&event);
                    println!("{}", render::event(&event));
                }
                () = &mut interrupt => {
                    warn!("interrupted, abandoning queued refreshes");
                    self.worker.abort();
                    // Cancelled is the expected join result here.
                    let _ = (&mut self.worker).await;
                    summary.interrupted = true;
                    return Ok(summary);
                }
            }
        }

        self.worker.await.context("refresh worker panicked")?;
        Ok(summary)
    }
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

fn configure(mut config: Config, path: Option<&std::path::Path>) -> Result<()> {
    let key = Password::new("WeatherAPI.com API key:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()?;
    config.set_api_key(key.trim().to_string());

    config.api.base_url = Text::new("API base URL:")
        .with_default(&config.api.base_url)
        .prompt()?;

    config.app.default_location = Text::new("Default location:")
        .with_default(&config.app.default_location)
        .prompt()?;

    config.app.update_interval_secs = CustomType::<u64>::new("Refresh interval (seconds):")
        .with_default(config.app.update_interval_secs)
        .with_error_message("Please enter a whole number of seconds")
        .prompt()?;

    match path {
        Some(path) => config.save_to(path)?,
        None => config.save()?,
    }

    println!("Configuration saved.");
    Ok(())
}

async fn show(config: &Config, location: String) -> Result<()> {
    refresh_once(Pipeline::start(config)?, location).await
}

async fn refresh_once(pipeline: Pipeline, location: String) -> Result<()> {
    pipeline.queue.enqueue(location.clone());

    // No Ctrl-C listener here, so SIGINT keeps its default behaviour.
    let summary = pipeline.finish(std::future::pending::<()>()).await?;
    if summary.failures > 0 {
        bail!("refresh failed for {location}");
    }
    Ok(())
}

async fn watch(config: &Config, location: String) -> Result<()> {
    let mut pipeline = Pipeline::start(config)?;
    let mut last_location = location;
    pipeline.queue.enqueue(last_location.clone());

    let mut ticker = tokio::time::interval(config.update_interval());
    // The first tick fires immediately; the initial refresh is already queued.
    ticker.tick().await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("Type a location and press enter. Ctrl-C or EOF to quit.");

    // One listener for the whole loop so a signal is never missed between iterations.
    let interrupted = ctrl_c();
    tokio::pin!(interrupted);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else { break };
                let line = line.trim();
                if line.is_empty() {
                    println!("Please enter a city name");
                    continue;
                }
                last_location = line.to_string();
                pipeline.queue.enqueue(line);
                ticker.reset();
            }
            _ = ticker.tick() => {
                pipeline.queue.enqueue(last_location.clone());
            }
            Some(event) = pipeline.events.recv() => {
                println!("{}", render::event(&event));
            }
            () = &mut interrupted => {
                println!("Finishing queued refreshes, press Ctrl-C again to quit now.");
                break;
            }
        }
    }

    pipeline.finish(ctrl_c()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn parses_global_config_flag_after_subcommand() {
        let cli = Cli::try_parse_from(["weather", "show", "Paris", "--config", "/tmp/w.toml"])
            .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("/tmp/w.toml")));
        assert!(matches!(cli.command, Command::Show { location: Some(ref l) } if l == "Paris"));
    }

    #[test]
    fn watch_location_is_optional() {
        let cli = Cli::try_parse_from(["weather", "watch"]).unwrap();
        assert!(matches!(cli.command, Command::Watch { location: None }));
    }

    #[tokio::test]
    async fn show_without_api_key_fails_with_hint() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let cli = Cli::try_parse_from([
            "weather",
            "--config",
            path.to_str().unwrap(),
            "show",
            "London",
        ])
        .unwrap();

        let config = cli.load_config().unwrap();
        let err = cli.run(config).await.unwrap_err();
        assert!(err.to_string().contains("No API key configured"));
    }

    #[tokio::test]
    async fn show_fails_when_provider_is_unreachable() {
        let dir = tempfile::tempdir().unwrap();
        let history = dir.path().join("weather_history.csv");

        let mut config = Config::default();
        config.set_api_key("KEY".into());
        config.api.base_url = "http://127.0.0.1:1/v1".into();
        config.app.history_path = Some(history.clone());

        let cli = Cli::try_parse_from(["weather", "show", "Paris"]).unwrap();
        let err = cli.run(config).await.unwrap_err();

        assert_eq!(err.to_string(), "refresh failed for Paris");
        assert!(!history.exists());
    }

    #[test]
    fn history_write_failure_is_not_counted_as_failed_refresh() {
        let mut summary = RefreshSummary::default();
        summary.observe(&StatusEvent::Failure {
            location: "Rome".into(),
            kind: ErrorKind::Persistence,
            message: "disk full".into(),
        });
        summary.observe(&StatusEvent::StatusText("Weather updated for Rome".into()));
        assert_eq!(summary.failures, 0);

        summary.observe(&StatusEvent::Failure {
            location: "Oslo".into(),
            kind: ErrorKind::Normalization,
            message: "missing field".into(),
        });
        assert_eq!(summary.failures, 1);
    }

    /// Never answers, like a provider that hangs forever.
    #[derive(Debug)]
    struct StalledFetcher;

    #[async_trait::async_trait]
    impl WeatherFetcher for StalledFetcher {
        async fn fetch(
            &self,
            _location: &str,
        ) -> Result<weather_core::RawWeatherPayload, weather_core::FetchError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn interrupt_abandons_stalled_refreshes() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new(
            Box::new(StalledFetcher),
            Box::new(CsvHistoryStore::new(dir.path().join("h.csv"))),
        );
        pipeline.queue.enqueue("Paris");
        pipeline.queue.enqueue("London");

        let summary = tokio::time::timeout(Duration::from_secs(5), pipeline.finish(async {}))
            .await
            .expect("finish returned after the interrupt")
            .unwrap();

        assert!(summary.interrupted);
        assert_eq!(summary.failures, 0);
    }
}
