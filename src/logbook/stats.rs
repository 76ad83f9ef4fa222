//! Derived statistics
//!
//! Pure functions over flight slices. Nothing here touches the store; the
//! logbook calls them whenever it commits a new snapshot.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

use crate::models::{Analytics, FlightRecord, FlightStatistics};
use crate::time_utils::{is_same_month, month_label, month_start_before, round_to_tenth};

// ============================================================================
// Data Types
// ============================================================================

/// Hours on one aircraft and their share of the reference total
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AircraftShare {
    pub aircraft: String,
    pub hours: f64,
    /// 0.0..=1.0, for proportional bars
    pub share: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeHours {
    pub flight_type: String,
    pub hours: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyHours {
    /// First day of the month
    pub month: NaiveDate,
    pub label: String,
    pub hours: f64,
}

// ============================================================================
// Aggregations
// ============================================================================

/// Hours flown in the calendar month of `today`, rounded to one decimal
pub fn month_hours(flights: &[FlightRecord], today: NaiveDate) -> f64 {
    let sum: f64 = flights
        .iter()
        .filter(|f| is_same_month(f.date, today))
        .map(|f| f.total_hours)
        .sum();
    round_to_tenth(sum)
}

/// Distinct non-empty aircraft in the store's per-aircraft breakdown
pub fn aircraft_count(analytics: &Analytics) -> u64 {
    analytics
        .aircraft_hours
        .iter()
        .map(|a| a.aircraft.trim())
        .filter(|a| !a.is_empty())
        .collect::<HashSet<_>>()
        .len() as u64
}

/// Combine store analytics with locally computed figures
pub fn build_statistics(recent: &[FlightRecord], analytics: &Analytics, today: NaiveDate) -> FlightStatistics {
    FlightStatistics {
        total_hours: analytics.total_hours,
        total_flights: analytics.total_flights,
        month_hours: month_hours(recent, today),
        aircraft_count: aircraft_count(analytics),
    }
}

/// Hours grouped by aircraft, most-flown first
///
/// `share` is relative to `reference_total` (usually the store's total
/// hours) and is 0 when that total is not positive.
pub fn hours_by_aircraft(flights: &[FlightRecord], reference_total: f64) -> Vec<AircraftShare> {
    let mut totals: Vec<(String, f64)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for flight in flights {
        let aircraft = flight.aircraft.trim();
        match index.get(aircraft) {
            Some(&i) => totals[i].1 += flight.total_hours,
            None => {
                index.insert(aircraft, totals.len());
                totals.push((aircraft.to_string(), flight.total_hours));
            }
        }
    }

    // Stable sort keeps first-seen order among equal totals
    totals.sort_by(|a, b| b.1.total_cmp(&a.1));

    totals
        .into_iter()
        .map(|(aircraft, hours)| AircraftShare {
            share: if reference_total > 0.0 {
                (hours / reference_total).clamp(0.0, 1.0)
            } else {
                0.0
            },
            hours: round_to_tenth(hours),
            aircraft,
        })
        .collect()
}

/// Hours grouped by lower-cased flight type; untyped flights count as "other"
pub fn hours_by_type(flights: &[FlightRecord]) -> Vec<TypeHours> {
    let mut totals: HashMap<String, f64> = HashMap::new();
    for flight in flights {
        let key = flight
            .flight_type
            .as_deref()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "other".to_string());
        *totals.entry(key).or_insert(0.0) += flight.total_hours;
    }

    let mut result: Vec<TypeHours> = totals
        .into_iter()
        .map(|(flight_type, hours)| TypeHours {
            flight_type,
            hours: round_to_tenth(hours),
        })
        .collect();
    result.sort_by(|a, b| b.hours.total_cmp(&a.hours).then_with(|| a.flight_type.cmp(&b.flight_type)));
    result
}

/// Hours per month for the `months` months ending with the month of `today`
///
/// Oldest month first; months without flights are present with 0 hours.
pub fn monthly_hours(flights: &[FlightRecord], today: NaiveDate, months: u32) -> Vec<MonthlyHours> {
    (0..months)
        .rev()
        .filter_map(|back| month_start_before(today, back))
        .map(|month| {
            let hours = flights
                .iter()
                .filter(|f| is_same_month(f.date, month))
                .map(|f| f.total_hours)
                .sum();
            MonthlyHours {
                month,
                label: month_label(month),
                hours: round_to_tenth(hours),
            }
        })
        .collect()
}
