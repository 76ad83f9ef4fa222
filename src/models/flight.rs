//! Flight records
//!
//! One struct covers both completed log entries and scheduled flights; the
//! `status` field tells them apart. Field names on the wire are snake_case
//! to match the backend, with camelCase aliases for payloads written by
//! older clients.

use chrono::NaiveDate;
use serde::{de, Deserialize, Deserializer, Serialize};
use thiserror::Error;

use super::wire::{de_hours, de_id, flight_date};
use crate::time_utils::{hours_between, normalize_time_to_hhmm, parse_time_of_day, round_to_tenth};

// ============================================================================
// Data Types
// ============================================================================

/// Lifecycle status of a flight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum FlightStatus {
    /// Flown and logged
    #[default]
    Completed,
    /// Scheduled and confirmed
    Confirmed,
    /// Scheduled, awaiting confirmation
    Pending,
}

impl FlightStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlightStatus::Completed => "Completed",
            FlightStatus::Confirmed => "Confirmed",
            FlightStatus::Pending => "Pending",
        }
    }

    /// True for flights that have not been flown yet
    pub fn is_scheduled(&self) -> bool {
        !matches!(self, FlightStatus::Completed)
    }
}

impl std::fmt::Display for FlightStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FlightStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        match raw.trim().to_lowercase().as_str() {
            "completed" => Ok(FlightStatus::Completed),
            "confirmed" => Ok(FlightStatus::Confirmed),
            "pending" => Ok(FlightStatus::Pending),
            _ => Err(de::Error::unknown_variant(&raw, &["Completed", "Confirmed", "Pending"])),
        }
    }
}

/// A single flight, either logged or scheduled
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightRecord {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    #[serde(with = "flight_date")]
    pub date: NaiveDate,
    pub departure: String,
    pub arrival: String,
    pub aircraft: String,
    #[serde(alias = "departureTime", default)]
    pub departure_time: String,
    #[serde(alias = "arrivalTime", default)]
    pub arrival_time: String,
    #[serde(alias = "totalHours", default, deserialize_with = "de_hours")]
    pub total_hours: f64,
    #[serde(default)]
    pub status: FlightStatus,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub flight_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
    /// Reminder lead time label, e.g. "1 hour before" (scheduled flights only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification: Option<String>,
}

impl FlightRecord {
    /// Client-side placeholder id; the store may replace it
    pub fn placeholder_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    /// Case-insensitive match on the flight type
    pub fn has_type(&self, flight_type: &str) -> bool {
        self.flight_type
            .as_deref()
            .is_some_and(|t| t.eq_ignore_ascii_case(flight_type.trim()))
    }

    /// "HTDA → HTKJ"
    pub fn route(&self) -> String {
        format!("{} → {}", self.departure, self.arrival)
    }
}

// ============================================================================
// Builder
// ============================================================================

#[derive(Debug, Error, PartialEq)]
pub enum FlightInputError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("invalid time: {0}")]
    InvalidTime(String),
    #[error("arrival time must be after departure time")]
    ArrivalNotAfterDeparture,
}

/// Form input for a new flight
///
/// Builds a [`FlightRecord`] with a placeholder id, normalized "HH:MM"
/// times and `total_hours` derived from the two times.
#[derive(Debug, Clone)]
pub struct NewFlight {
    pub date: NaiveDate,
    pub departure: String,
    pub arrival: String,
    pub aircraft: String,
    pub departure_time: String,
    pub arrival_time: String,
    pub flight_type: Option<String>,
    pub remarks: Option<String>,
    pub notification: Option<String>,
}

impl NewFlight {
    pub fn new(
        date: NaiveDate,
        departure: impl Into<String>,
        arrival: impl Into<String>,
        aircraft: impl Into<String>,
        departure_time: impl Into<String>,
        arrival_time: impl Into<String>,
    ) -> Self {
        Self {
            date,
            departure: departure.into(),
            arrival: arrival.into(),
            aircraft: aircraft.into(),
            departure_time: departure_time.into(),
            arrival_time: arrival_time.into(),
            flight_type: None,
            remarks: None,
            notification: None,
        }
    }

    pub fn flight_type(mut self, flight_type: impl Into<String>) -> Self {
        self.flight_type = Some(flight_type.into());
        self
    }

    pub fn remarks(mut self, remarks: impl Into<String>) -> Self {
        self.remarks = Some(remarks.into());
        self
    }

    pub fn notification(mut self, notification: impl Into<String>) -> Self {
        self.notification = Some(notification.into());
        self
    }

    /// Build a completed log entry
    pub fn completed(self) -> Result<FlightRecord, FlightInputError> {
        self.build(FlightStatus::Completed)
    }

    /// Build a scheduled flight with the given (non-completed) status
    pub fn scheduled(self, status: FlightStatus) -> Result<FlightRecord, FlightInputError> {
        let status = if status.is_scheduled() { status } else { FlightStatus::Confirmed };
        self.build(status)
    }

    fn build(self, status: FlightStatus) -> Result<FlightRecord, FlightInputError> {
        let departure = required(self.departure, "departure")?.to_uppercase();
        let arrival = required(self.arrival, "arrival")?.to_uppercase();
        let aircraft = required(self.aircraft, "aircraft")?;

        let dep = parse_time_of_day(&self.departure_time)
            .ok_or_else(|| FlightInputError::InvalidTime(self.departure_time.clone()))?;
        let arr = parse_time_of_day(&self.arrival_time)
            .ok_or_else(|| FlightInputError::InvalidTime(self.arrival_time.clone()))?;
        let hours = hours_between(dep, arr).ok_or(FlightInputError::ArrivalNotAfterDeparture)?;

        Ok(FlightRecord {
            id: FlightRecord::placeholder_id(),
            date: self.date,
            departure,
            arrival,
            aircraft,
            departure_time: normalize_time_to_hhmm(&self.departure_time).unwrap_or_default(),
            arrival_time: normalize_time_to_hhmm(&self.arrival_time).unwrap_or_default(),
            total_hours: round_to_tenth(hours),
            status,
            flight_type: non_empty(self.flight_type).map(|t| t.to_lowercase()),
            remarks: non_empty(self.remarks),
            notification: if status.is_scheduled() { non_empty(self.notification) } else { None },
        })
    }
}

fn required(value: String, field: &'static str) -> Result<String, FlightInputError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(FlightInputError::MissingField(field));
    }
    Ok(trimmed.to_string())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn may(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, day).unwrap()
    }

    #[test]
    fn test_deserialize_backend_record() {
        let record: FlightRecord = serde_json::from_value(json!({
            "id": 42,
            "date": "2025-05-15T00:00:00.000Z",
            "departure": "HTDA",
            "arrival": "HTKJ",
            "aircraft": "Cessna 172 (5H-AAA)",
            "departure_time": "08:30:00",
            "arrival_time": "10:15:00",
            "total_hours": "1.8",
            "status": "completed",
            "type": "training"
        }))
        .unwrap();

        assert_eq!(record.id, "42");
        assert_eq!(record.date, may(15));
        assert_eq!(record.total_hours, 1.8);
        assert_eq!(record.status, FlightStatus::Completed);
        assert!(record.has_type("Training"));
        assert_eq!(record.remarks, None);
    }

    #[test]
    fn test_deserialize_legacy_camel_case_record() {
        let record: FlightRecord = serde_json::from_value(json!({
            "id": "1",
            "date": "May 12, 2025",
            "departure": "HTKJ",
            "arrival": "HTDA",
            "aircraft": "Cessna 172 (5H-AAA)",
            "departureTime": "14:45",
            "arrivalTime": "16:30",
            "totalHours": "1h 45m",
            "status": "Completed"
        }))
        .unwrap();

        assert_eq!(record.date, may(12));
        assert_eq!(record.departure_time, "14:45");
        assert_eq!(record.total_hours, 1.75);
    }

    #[test]
    fn test_malformed_hours_count_as_zero() {
        let record: FlightRecord = serde_json::from_value(json!({
            "id": "x",
            "date": "2025-05-01",
            "departure": "A",
            "arrival": "B",
            "aircraft": "C",
            "total_hours": "about two",
            "status": "Pending"
        }))
        .unwrap();
        assert_eq!(record.total_hours, 0.0);
        assert!(record.status.is_scheduled());
    }

    #[test]
    fn test_unknown_status_rejected() {
        let result: Result<FlightRecord, _> = serde_json::from_value(json!({
            "id": "x",
            "date": "2025-05-01",
            "departure": "A",
            "arrival": "B",
            "aircraft": "C",
            "status": "Cancelled"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_serialize_uses_backend_field_names() {
        let record = NewFlight::new(may(10), "htda", "htkj", "C172", "08:30", "10:00")
            .flight_type("Training")
            .completed()
            .unwrap();
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["date"], "2025-05-10");
        assert_eq!(value["departure_time"], "08:30");
        assert_eq!(value["total_hours"], 1.5);
        assert_eq!(value["type"], "training");
        assert_eq!(value["status"], "Completed");
        assert!(value.get("notification").is_none());
    }

    #[test]
    fn test_new_flight_computes_hours() {
        let record = NewFlight::new(may(10), "HTDA", "HTKJ", "C172", "9:00 AM", "11:30 AM")
            .notification("1 hour before")
            .scheduled(FlightStatus::Confirmed)
            .unwrap();

        assert_eq!(record.total_hours, 2.5);
        assert_eq!(record.departure_time, "09:00");
        assert_eq!(record.arrival_time, "11:30");
        assert_eq!(record.status, FlightStatus::Confirmed);
        assert_eq!(record.notification.as_deref(), Some("1 hour before"));
        assert!(!record.id.is_empty());
    }

    #[test]
    fn test_new_flight_rejects_bad_input() {
        let base = || NewFlight::new(may(10), "HTDA", "HTKJ", "C172", "10:00", "09:00");
        assert_eq!(base().completed(), Err(FlightInputError::ArrivalNotAfterDeparture));

        let missing = NewFlight::new(may(10), "HTDA", " ", "C172", "08:00", "09:00").completed();
        assert_eq!(missing, Err(FlightInputError::MissingField("arrival")));

        let bad_time = NewFlight::new(may(10), "HTDA", "HTKJ", "C172", "25:00", "09:00").completed();
        assert_eq!(bad_time, Err(FlightInputError::InvalidTime("25:00".to_string())));
    }

    #[test]
    fn test_completed_drops_notification() {
        let record = NewFlight::new(may(10), "HTDA", "HTKJ", "C172", "08:00", "09:00")
            .notification("1 day before")
            .completed()
            .unwrap();
        assert_eq!(record.notification, None);
    }
}
