//! Remote flight store
//!
//! The backend is the source of truth for all flight data. The logbook core
//! talks to it only through the [`FlightStore`] trait:
//! - `client` - REST implementation over reqwest
//! - `memory` - in-process implementation for tests and offline use

pub mod client;
pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Analytics, FlightRecord, UserIdentity};

// Re-export commonly used types
pub use client::HttpFlightStore;
pub use memory::{MemoryFlightStore, StoreOp};

/// Error types for flight store operations
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StoreError {
    /// Request never reached the store or the response never came back
    #[error("network error: {0}")]
    Network(String),
    /// The store refused the request (validation failure, server error)
    #[error("store rejected request (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },
    /// The addressed record does not exist
    #[error("not found: {0}")]
    NotFound(String),
    /// Response body could not be decoded
    #[error("parse error: {0}")]
    Parse(String),
    /// Missing or invalid credentials
    #[error("authentication error: {0}")]
    Auth(String),
}

/// Operations the logbook needs from the remote store
#[async_trait]
pub trait FlightStore: Send + Sync {
    /// All logged flights
    async fn list_flights(&self) -> Result<Vec<FlightRecord>, StoreError>;

    /// Aggregate totals and the per-aircraft breakdown
    async fn get_analytics(&self) -> Result<Analytics, StoreError>;

    /// Submit a completed flight; returns the canonical stored record
    async fn create_flight_log(&self, record: &FlightRecord) -> Result<FlightRecord, StoreError>;

    /// Submit a scheduled flight owned by `owner`; returns the canonical stored record
    async fn create_scheduled_flight(
        &self,
        record: &FlightRecord,
        owner: &UserIdentity,
    ) -> Result<FlightRecord, StoreError>;

    /// Delete a flight by id
    async fn delete_flight(&self, id: &str) -> Result<(), StoreError>;
}
