//! Outbound events for the presentation layer.

use tokio::sync::mpsc;
use tracing::error;

use crate::{
    error::ErrorKind,
    model::{ForecastSeries, WeatherRecord},
};

/// Observer of refresh outcomes.
///
/// Called from the worker task. Implementations must not block for long and
/// are responsible for moving events onto whatever thread renders them.
pub trait StatusSink: Send + Sync {
    fn on_result(&self, location: &str, record: WeatherRecord, forecast: ForecastSeries);
    fn on_failure(&self, location: &str, kind: ErrorKind, message: &str);
    fn on_status_text(&self, text: &str);
}

/// Event form of the [`StatusSink`] callbacks.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusEvent {
    Result { location: String, record: WeatherRecord, forecast: ForecastSeries },
    Failure { location: String, kind: ErrorKind, message: String },
    StatusText(String),
}

/// Forwards every callback as a [`StatusEvent`] over an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<StatusEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<StatusEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, event: StatusEvent) {
        if self.tx.send(event).is_err() {
            error!("status receiver dropped, event lost");
        }
    }
}

impl StatusSink for ChannelSink {
    fn on_result(&self, location: &str, record: WeatherRecord, forecast: ForecastSeries) {
        self.send(StatusEvent::Result { location: location.to_string(), record, forecast });
    }

    fn on_failure(&self, location: &str, kind: ErrorKind, message: &str) {
        self.send(StatusEvent::Failure {
            location: location.to_string(),
            kind,
            message: message.to_string(),
        });
    }

    fn on_status_text(&self, text: &str) {
        self.send(StatusEvent::StatusText(text.to_string()));
    }
}
