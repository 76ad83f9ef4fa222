// Pilot Logbook Library
// Flight aggregation core, store clients and backup, shared with main.rs

pub mod backup;
pub mod config;
pub mod error;
pub mod logbook;
pub mod models;
pub mod remote;
pub mod time_utils;
pub mod views;

pub use backup::{parse_backup, Backup, BackupError, BackupSink, FileBackupSink};
pub use config::{AppConfig, ConfigError};
pub use error::LogbookError;
pub use logbook::{BackupReceipt, Logbook, LogbookSnapshot, RestoreReport, RestoreTarget};
pub use models::{FlightRecord, FlightStatistics, FlightStatus, NewFlight, UserIdentity};
pub use remote::{FlightStore, HttpFlightStore, MemoryFlightStore, StoreError};
