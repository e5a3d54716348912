use std::fmt;

use thiserror::Error;

/// Transport, status or body failure from either provider call.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to send {call} request for '{location}': {source}")]
    Transport {
        call: &'static str,
        location: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{call} request failed with status {status}: {body}")]
    Status {
        call: &'static str,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("{call} response is not valid JSON: {source}")]
    Body {
        call: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Provider document does not have the expected shape.
#[derive(Debug, Error)]
pub enum NormalizationError {
    #[error("malformed {section} section: {source}")]
    Malformed {
        section: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("missing field '{0}'")]
    MissingField(&'static str),

    #[error("field '{field}' out of range: {value}")]
    OutOfRange { field: &'static str, value: String },

    #[error("invalid forecast time '{0}'")]
    BadTime(String),
}

/// History append failed; nothing was recorded for the cycle.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("history file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode history row: {0}")]
    Csv(#[from] csv::Error),
}

/// Category reported to the status sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Fetch,
    Normalization,
    Persistence,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Fetch => "fetch",
            ErrorKind::Normalization => "normalization",
            ErrorKind::Persistence => "persistence",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Any failure inside one refresh cycle.
#[derive(Debug, Error)]
pub enum RefreshError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Normalization(#[from] NormalizationError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

impl RefreshError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RefreshError::Fetch(_) => ErrorKind::Fetch,
            RefreshError::Normalization(_) => ErrorKind::Normalization,
            RefreshError::Persistence(_) => ErrorKind::Persistence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_error_maps_to_kind() {
        let err: RefreshError = NormalizationError::MissingField("current").into();
        assert_eq!(err.kind(), ErrorKind::Normalization);
        assert_eq!(err.to_string(), "missing field 'current'");

        let err: RefreshError = PersistenceError::Io {
            path: "h.csv".into(),
            source: std::io::Error::other("disk full"),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::Persistence);
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn kind_display() {
        assert_eq!(ErrorKind::Fetch.to_string(), "fetch");
    }
}
