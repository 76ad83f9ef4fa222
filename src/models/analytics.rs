// Aggregate analytics and derived statistics

use serde::{Deserialize, Serialize};

use super::wire::{de_count, de_hours};
use crate::time_utils::round_to_tenth;

/// Hours flown on one aircraft
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AircraftHours {
    #[serde(alias = "name")]
    pub aircraft: String,
    #[serde(alias = "total_hours", alias = "totalHours", default, deserialize_with = "de_hours")]
    pub hours: f64,
}

/// Aggregate totals as reported by the flight store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analytics {
    #[serde(alias = "total_hours", default, deserialize_with = "de_hours")]
    pub total_hours: f64,
    #[serde(alias = "total_flights", default, deserialize_with = "de_count")]
    pub total_flights: u64,
    #[serde(alias = "aircraft_hours", default)]
    pub aircraft_hours: Vec<AircraftHours>,
}

/// Headline numbers shown on the dashboard
///
/// `total_hours` and `total_flights` come from the store's analytics,
/// `month_hours` is computed locally from the logged flights and
/// `aircraft_count` from the analytics per-aircraft breakdown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightStatistics {
    #[serde(default, deserialize_with = "de_hours")]
    pub total_hours: f64,
    #[serde(default, deserialize_with = "de_count")]
    pub total_flights: u64,
    #[serde(default, deserialize_with = "de_hours")]
    pub month_hours: f64,
    #[serde(default, deserialize_with = "de_count")]
    pub aircraft_count: u64,
}

impl std::fmt::Display for FlightStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:.1} h total, {} flights, {:.1} h this month, {} aircraft",
            round_to_tenth(self.total_hours),
            self.total_flights,
            round_to_tenth(self.month_hours),
            self.aircraft_count
        )
    }
}
