//! Data types shared by the store clients and the logbook core
//!
//! - `flight` - flight records, status and the new-flight builder
//! - `analytics` - store analytics and derived statistics
//! - `wire` - lenient decoding of backend fields

mod analytics;
mod flight;
pub(crate) mod wire;

pub use analytics::{AircraftHours, Analytics, FlightStatistics};
pub use flight::{FlightInputError, FlightRecord, FlightStatus, NewFlight};

use serde::{Deserialize, Serialize};

/// The signed-in pilot, as provided by the session layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl UserIdentity {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            email: None,
        }
    }
}
