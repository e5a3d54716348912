//! Append-only refresh history.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::{fs, io::AsyncWriteExt};

use crate::{error::PersistenceError, model::WeatherRecord};

/// Persists one row per successful refresh.
///
/// Single writer: `append` takes `&mut self`, so only the owner (the refresh
/// worker) can write. There is no update or delete.
#[async_trait]
pub trait HistoryStore: Send {
    /// Writes the whole record or nothing.
    async fn append(&mut self, record: &WeatherRecord) -> Result<(), PersistenceError>;
}

/// Persisted columns, in file order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRow {
    pub timestamp: DateTime<Utc>,
    pub location: String,
    pub temperature_c: f64,
    pub condition: String,
    pub humidity_pct: u8,
    pub wind_kph: f64,
    pub pressure_mb: f64,
}

impl From<&WeatherRecord> for HistoryRow {
    fn from(r: &WeatherRecord) -> Self {
        Self {
            timestamp: r.observed_at,
            location: r.location.clone(),
            temperature_c: r.temperature_c,
            condition: r.condition.clone(),
            humidity_pct: r.humidity_pct,
            wind_kph: r.wind_kph,
            pressure_mb: r.pressure_mb,
        }
    }
}

/// CSV file with a header row written once, when the file is first created.
#[derive(Debug, Clone)]
pub struct CsvHistoryStore {
    path: PathBuf,
}

impl CsvHistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads every stored row back, oldest first. Missing file means no rows.
    pub fn read_all(&self) -> Result<Vec<HistoryRow>, PersistenceError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(&self.path)?;

        reader
            .deserialize::<HistoryRow>()
            .map(|row| row.map_err(PersistenceError::from))
            .collect()
    }

    fn encode(record: &WeatherRecord, with_header: bool) -> Result<Vec<u8>, PersistenceError> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(with_header)
            .from_writer(Vec::new());

        writer.serialize(HistoryRow::from(record))?;

        writer
            .into_inner()
            .map_err(|e| PersistenceError::Csv(csv::Error::from(e.into_error())))
    }

    fn io_err(&self, source: std::io::Error) -> PersistenceError {
        PersistenceError::Io { path: self.path.display().to_string(), source }
    }
}

#[async_trait]
impl HistoryStore for CsvHistoryStore {
    async fn append(&mut self, record: &WeatherRecord) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(|e| self.io_err(e))?;
        }

        let needs_header = match fs::metadata(&self.path).await {
            Ok(meta) => meta.len() == 0,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
            Err(e) => return Err(self.io_err(e)),
        };

        // Encode fully before touching the file so a bad row never lands half-written.
        let bytes = Self::encode(record, needs_header)?;

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| self.io_err(e))?;

        file.write_all(&bytes).await.map_err(|e| self.io_err(e))?;
        file.flush().await.map_err(|e| self.io_err(e))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(location: &str, minute: u32) -> WeatherRecord {
        WeatherRecord {
            location: location.into(),
            observed_at: Utc.with_ymd_and_hms(2024, 11, 4, 12, minute, 0).unwrap(),
            temperature_c: 15.0,
            feels_like_c: 14.2,
            condition: "Cloudy, light rain".into(),
            humidity_pct: 80,
            wind_kph: 10.0,
            pressure_mb: 1012.0,
            icon_ref: "http://cdn/icon.png".into(),
        }
    }

    #[tokio::test]
    async fn append_then_read_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = CsvHistoryStore::new(dir.path().join("data").join("weather_history.csv"));

        let rec = record("London", 0);
        store.append(&rec).await.unwrap();

        let rows = store.read_all().unwrap();
        assert_eq!(rows, vec![HistoryRow::from(&rec)]);
    }

    #[tokio::test]
    async fn header_written_exactly_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = CsvHistoryStore::new(dir.path().join("h.csv"));

        for minute in 0..5 {
            store.append(&record("Paris", minute)).await.unwrap();
        }

        let text = std::fs::read_to_string(store.path()).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 6);
        assert_eq!(
            lines[0],
            "timestamp,location,temperature_c,condition,humidity_pct,wind_kph,pressure_mb"
        );
        assert_eq!(text.matches("timestamp,location").count(), 1);
        assert_eq!(store.read_all().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn reopened_store_does_not_repeat_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("h.csv");

        CsvHistoryStore::new(&path).append(&record("Oslo", 1)).await.unwrap();
        CsvHistoryStore::new(&path).append(&record("Oslo", 2)).await.unwrap();

        let rows = CsvHistoryStore::new(&path).read_all().unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].timestamp < rows[1].timestamp);
    }

    #[tokio::test]
    async fn empty_existing_file_gets_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("h.csv");
        std::fs::write(&path, "").unwrap();

        let mut store = CsvHistoryStore::new(&path);
        store.append(&record("Rome", 0)).await.unwrap();

        assert_eq!(store.read_all().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unwritable_path_reports_persistence_error() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should be.
        let mut store = CsvHistoryStore::new(dir.path());

        let err = store.append(&record("Rome", 0)).await.unwrap_err();
        assert!(matches!(err, PersistenceError::Io { .. }));
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let store = CsvHistoryStore::new("/nonexistent/dir/h.csv");
        assert!(store.read_all().unwrap().is_empty());
    }
}
