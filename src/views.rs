//! Read-only projections used by the logbook, history and schedule screens

use chrono::NaiveDate;

use crate::models::FlightRecord;
use crate::time_utils::month_label;

pub use crate::time_utils::format_duration;

/// Logbook filter; unset criteria match everything
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlightFilter {
    /// Substring of departure, arrival or aircraft (case-insensitive)
    pub search: Option<String>,
    pub date: Option<NaiveDate>,
    /// Substring of the aircraft (case-insensitive)
    pub aircraft: Option<String>,
    /// Exact flight type (case-insensitive)
    pub flight_type: Option<String>,
}

impl FlightFilter {
    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.search = non_empty(text.into());
        self
    }

    pub fn date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn aircraft(mut self, aircraft: impl Into<String>) -> Self {
        self.aircraft = non_empty(aircraft.into());
        self
    }

    pub fn flight_type(mut self, flight_type: impl Into<String>) -> Self {
        self.flight_type = non_empty(flight_type.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.search.is_none() && self.date.is_none() && self.aircraft.is_none() && self.flight_type.is_none()
    }

    pub fn matches(&self, flight: &FlightRecord) -> bool {
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let hit = [&flight.departure, &flight.arrival, &flight.aircraft]
                .iter()
                .any(|field| field.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }

        if let Some(date) = self.date {
            if flight.date != date {
                return false;
            }
        }

        if let Some(aircraft) = &self.aircraft {
            if !flight.aircraft.to_lowercase().contains(&aircraft.to_lowercase()) {
                return false;
            }
        }

        match &self.flight_type {
            Some(flight_type) => flight.has_type(flight_type),
            None => true,
        }
    }

    /// Matching flights, input order preserved
    pub fn apply(&self, flights: &[FlightRecord]) -> Vec<FlightRecord> {
        flights.iter().filter(|f| self.matches(f)).cloned().collect()
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Group flights under "Month Year" headings
///
/// Groups appear in the order their first flight appears in the input, so
/// passing a newest-first list yields newest-first sections.
pub fn group_by_month(flights: &[FlightRecord]) -> Vec<(String, Vec<FlightRecord>)> {
    let mut groups: Vec<(String, Vec<FlightRecord>)> = Vec::new();
    for flight in flights {
        let label = month_label(flight.date);
        match groups.iter_mut().find(|(l, _)| *l == label) {
            Some((_, members)) => members.push(flight.clone()),
            None => groups.push((label, vec![flight.clone()])),
        }
    }
    groups
}

/// Flights on one calendar day, for the schedule view
pub fn flights_on(flights: &[FlightRecord], day: NaiveDate) -> Vec<FlightRecord> {
    flights.iter().filter(|f| f.date == day).cloned().collect()
}

pub fn find_flight<'a>(flights: &'a [FlightRecord], id: &str) -> Option<&'a FlightRecord> {
    flights.iter().find(|f| f.id == id)
}
