//! Errors surfaced by the logbook core
//!
//! Each operation has its own variant so callers can show a generic
//! message, while the underlying store or backup error stays reachable
//! through `source()`.

use thiserror::Error;

use crate::backup::BackupError;
use crate::remote::StoreError;

#[derive(Debug, Error)]
pub enum LogbookError {
    #[error("failed to refresh flights: {0}")]
    RefreshFailed(#[source] StoreError),

    #[error("failed to add flight log: {0}")]
    AddFailed(#[source] StoreError),

    #[error("failed to schedule flight: {0}")]
    ScheduleFailed(#[source] StoreError),

    #[error("failed to delete flight {id}: {source}")]
    DeleteFailed {
        id: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to back up logbook: {0}")]
    BackupFailed(#[source] BackupError),

    #[error("failed to restore logbook: {0}")]
    RestoreFailed(#[source] StoreError),

    #[error("no signed-in user")]
    NotAuthenticated,

    #[error("invalid backup: {0}")]
    InvalidBackup(#[source] BackupError),
}

impl LogbookError {
    /// The store error behind this failure, if it came from the store
    pub fn store_error(&self) -> Option<&StoreError> {
        match self {
            Self::RefreshFailed(e)
            | Self::AddFailed(e)
            | Self::ScheduleFailed(e)
            | Self::RestoreFailed(e)
            | Self::DeleteFailed { source: e, .. } => Some(e),
            _ => None,
        }
    }

    /// What the user can check, for store failures that have an obvious cause
    pub fn hint(&self) -> Option<&'static str> {
        match self.store_error()? {
            StoreError::Auth(_) => Some("check PILOT_LOGBOOK_API_TOKEN"),
            StoreError::Network(_) => Some("is the backend at PILOT_LOGBOOK_API_URL running?"),
            _ => None,
        }
    }
}
