//! The single background executor of refresh cycles.

use std::{any::Any, fmt, panic::AssertUnwindSafe, sync::Arc};

use futures::FutureExt;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::{
    error::{ErrorKind, RefreshError},
    history::HistoryStore,
    model::RefreshRequest,
    normalize::{forecast_series, normalize_now},
    provider::WeatherFetcher,
    queue::RefreshReceiver,
    sink::StatusSink,
};

/// Where the worker is within a refresh cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Fetching,
    Normalizing,
    Persisting,
    Reporting,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WorkerState::Idle => "idle",
            WorkerState::Fetching => "fetching",
            WorkerState::Normalizing => "normalizing",
            WorkerState::Persisting => "persisting",
            WorkerState::Reporting => "reporting",
        };
        f.write_str(s)
    }
}

/// How a single cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// A result was reported; `persisted` is false when the history append failed.
    Reported { persisted: bool },
    /// The cycle stopped early and only a failure was reported.
    Failed(ErrorKind),
}

/// Drains the refresh queue one request at a time: fetch, normalize, append to
/// history, report. At most one fetch is ever in flight, which also makes the
/// worker the sole writer of the history store.
pub struct RefreshWorker {
    fetcher: Box<dyn WeatherFetcher>,
    store: Box<dyn HistoryStore>,
    sink: Arc<dyn StatusSink>,
    state: WorkerState,
}

impl RefreshWorker {
    pub fn new(
        fetcher: Box<dyn WeatherFetcher>,
        store: Box<dyn HistoryStore>,
        sink: Arc<dyn StatusSink>,
    ) -> Self {
        Self { fetcher, store, sink, state: WorkerState::Idle }
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// Run the loop on its own task.
    pub fn spawn(self, requests: RefreshReceiver) -> JoinHandle<()> {
        tokio::spawn(self.run(requests))
    }

    /// Process requests in submission order until the queue is stopped or
    /// every submitter is gone. A failed cycle never ends the loop, not even
    /// one where a fetcher or store panics.
    pub async fn run(mut self, mut requests: RefreshReceiver) {
        info!("refresh worker started");

        while let Some(request) = requests.dequeue().await {
            let location = request.location.clone();
            match AssertUnwindSafe(self.process(request)).catch_unwind().await {
                Ok(outcome) => debug!(?outcome, "cycle finished"),
                Err(panic) => self.recover(&location, panic.as_ref()),
            }
        }

        info!("refresh worker stopped");
    }

    /// One complete refresh cycle, always ending back in `Idle`.
    pub async fn process(&mut self, request: RefreshRequest) -> CycleOutcome {
        let location = request.location.as_str();
        info!(location, seq = request.seq, "refresh started");

        self.enter(WorkerState::Fetching);
        self.sink.on_status_text(&format!("Fetching weather data for {location}..."));

        let payload = match self.fetcher.fetch(location).await {
            Ok(payload) => payload,
            Err(e) => return self.abort(location, e.into()),
        };

        self.enter(WorkerState::Normalizing);
        let normalized = normalize_now(&payload)
            .and_then(|record| forecast_series(&payload).map(|forecast| (record, forecast)));
        let (record, forecast) = match normalized {
            Ok(pair) => pair,
            Err(e) => return self.abort(location, e.into()),
        };

        self.enter(WorkerState::Persisting);
        let persisted = match self.store.append(&record).await {
            Ok(()) => true,
            Err(e) => {
                // Display still wins: report the failure, then carry on to the result.
                self.report_failure(location, &RefreshError::from(e));
                false
            }
        };

        self.enter(WorkerState::Reporting);
        self.sink.on_result(location, record, forecast);
        self.sink.on_status_text(&format!("Weather updated for {location}"));

        self.enter(WorkerState::Idle);
        info!(location, persisted, "refresh complete");
        CycleOutcome::Reported { persisted }
    }

    fn enter(&mut self, next: WorkerState) {
        debug!(from = %self.state, to = %next, "worker state");
        self.state = next;
    }

    fn report_failure(&self, location: &str, err: &RefreshError) {
        warn!(location, kind = %err.kind(), error = %err, "refresh failed");
        self.sink.on_failure(location, err.kind(), &err.to_string());
        self.sink.on_status_text(failure_status(err.kind()));
    }

    fn abort(&mut self, location: &str, err: RefreshError) -> CycleOutcome {
        self.report_failure(location, &err);
        self.enter(WorkerState::Idle);
        CycleOutcome::Failed(err.kind())
    }

    /// Report a cycle that unwound, blaming the stage it was in.
    fn recover(&mut self, location: &str, panic: &(dyn Any + Send)) {
        let kind = match self.state {
            WorkerState::Fetching => ErrorKind::Fetch,
            WorkerState::Persisting => ErrorKind::Persistence,
            _ => ErrorKind::Normalization,
        };
        let reason = panic
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
            .unwrap_or("unknown panic");
        let message = format!("refresh panicked while {}: {reason}", self.state);

        error!(location, %kind, %message, "refresh cycle panicked");
        self.sink.on_failure(location, kind, &message);
        self.sink.on_status_text(failure_status(kind));
        self.enter(WorkerState::Idle);
    }
}

fn failure_status(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::Fetch => "Failed to fetch weather data",
        ErrorKind::Normalization => "Failed to process weather data",
        ErrorKind::Persistence => "Failed to save weather history",
    }
}

impl fmt::Debug for RefreshWorker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshWorker")
            .field("fetcher", &self.fetcher)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
