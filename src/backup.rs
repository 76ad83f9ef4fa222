//! Logbook backup
//!
//! A backup is a point-in-time JSON snapshot of the locally cached flights
//! and statistics. It is handed to a [`BackupSink`] for export and can be
//! read back with [`parse_backup`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::models::{FlightRecord, FlightStatistics};

pub const BACKUP_FILE_NAME: &str = "pilot_logbook_backup.json";

/// Top-level fields every backup must carry
const REQUIRED_FIELDS: [&str; 3] = ["recentFlights", "upcomingFlights", "flightStats"];

#[derive(Debug, Error)]
pub enum BackupError {
    #[error("backup is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("invalid backup data format: missing {0}")]
    MissingField(&'static str),
    #[error("invalid backup data format: {0}")]
    Malformed(String),
    #[error("failed to export backup: {0}")]
    Export(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Backup {
    pub recent_flights: Vec<FlightRecord>,
    pub upcoming_flights: Vec<FlightRecord>,
    pub flight_stats: FlightStatistics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Backup {
    pub fn new(
        recent_flights: Vec<FlightRecord>,
        upcoming_flights: Vec<FlightRecord>,
        flight_stats: FlightStatistics,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            recent_flights,
            upcoming_flights,
            flight_stats,
            timestamp: Some(timestamp),
        }
    }

    /// Pretty-printed JSON, as written to disk
    pub fn to_json(&self) -> Result<String, BackupError> {
        serde_json::to_string_pretty(self).map_err(|e| BackupError::Malformed(e.to_string()))
    }

    pub fn flight_count(&self) -> usize {
        self.recent_flights.len() + self.upcoming_flights.len()
    }
}

/// Parse and validate a backup blob
///
/// The three collection fields must be present and non-null before the
/// contents are decoded.
pub fn parse_backup(data: &str) -> Result<Backup, BackupError> {
    let value: serde_json::Value =
        serde_json::from_str(data).map_err(|e| BackupError::InvalidJson(e.to_string()))?;

    for field in REQUIRED_FIELDS {
        if value.get(field).map_or(true, |v| v.is_null()) {
            return Err(BackupError::MissingField(field));
        }
    }

    serde_json::from_value(value).map_err(|e| BackupError::Malformed(e.to_string()))
}

/// Destination for exported backups (file system, share sheet, ...)
#[async_trait]
pub trait BackupSink: Send + Sync {
    /// Export the serialized backup; returns where it went
    async fn export(&self, contents: &str) -> Result<String, BackupError>;
}

/// Writes `pilot_logbook_backup.json` into a directory
#[derive(Debug, Clone)]
pub struct FileBackupSink {
    dir: PathBuf,
}

impl FileBackupSink {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(BACKUP_FILE_NAME)
    }
}

#[async_trait]
impl BackupSink for FileBackupSink {
    async fn export(&self, contents: &str) -> Result<String, BackupError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| BackupError::Export(format!("failed to create {}: {}", self.dir.display(), e)))?;

        let path = self.path();
        tokio::fs::write(&path, contents)
            .await
            .map_err(|e| BackupError::Export(format!("failed to write {}: {}", path.display(), e)))?;

        log::info!("Backup written to {} ({} bytes)", path.display(), contents.len());
        Ok(path.display().to_string())
    }
}
