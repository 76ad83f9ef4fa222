//! Time Utilities
//!
//! Functions for parsing, normalizing, and formatting flight dates, wall-clock
//! times and durations. Durations are decimal hours everywhere inside the
//! crate; the "1h 45m" form only exists at the input and display edges.

use chrono::{Datelike, NaiveDate, NaiveTime, Timelike};

/// Parse a wall-clock time of day
///
/// # Arguments
/// * `time_str` - Time string in various formats:
///   - "HH:MM" or "HH:MM:SS" (24-hour, as sent by the backend)
///   - "HHMM" or "HHMMSS" (compact)
///   - "h:mm AM" / "h:mm PM" (12-hour, as produced by time pickers)
///
/// # Returns
/// * `Some(NaiveTime)` when the string is a valid time, `None` otherwise
pub fn parse_time_of_day(time_str: &str) -> Option<NaiveTime> {
    let clean = time_str.trim();
    if clean.is_empty() {
        return None;
    }

    // 12-hour clock with AM/PM suffix
    let upper = clean.to_uppercase();
    if let Some(body) = upper.strip_suffix("AM").or_else(|| upper.strip_suffix("PM")) {
        let is_pm = upper.ends_with("PM");
        let t = parse_time_of_day(body.trim())?;
        let hour12 = t.hour();
        if hour12 == 0 || hour12 > 12 {
            return None;
        }
        let hour = match (hour12, is_pm) {
            (12, false) => 0,
            (12, true) => 12,
            (h, false) => h,
            (h, true) => h + 12,
        };
        return NaiveTime::from_hms_opt(hour, t.minute(), t.second());
    }

    let digits: String = if clean.contains(':') {
        let parts: Vec<&str> = clean.split(':').collect();
        if parts.len() < 2 || parts.len() > 3 || parts.iter().any(|p| p.is_empty() || p.len() > 2) {
            return None;
        }
        parts.iter().map(|p| format!("{:0>2}", p)).collect()
    } else {
        clean.to_string()
    };

    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let (hours, minutes, seconds) = match digits.len() {
        4 => (&digits[..2], &digits[2..4], "0"),
        6 => (&digits[..2], &digits[2..4], &digits[4..6]),
        _ => return None,
    };

    NaiveTime::from_hms_opt(
        hours.parse().ok()?,
        minutes.parse().ok()?,
        seconds.parse().ok()?,
    )
}

/// Normalize a time string to the "HH:MM" form the backend stores
pub fn normalize_time_to_hhmm(time_str: &str) -> Option<String> {
    parse_time_of_day(time_str).map(|t| t.format("%H:%M").to_string())
}

/// Hours elapsed between a departure and an arrival time on the same day
///
/// Returns `None` unless arrival is strictly after departure.
pub fn hours_between(departure: NaiveTime, arrival: NaiveTime) -> Option<f64> {
    if arrival <= departure {
        return None;
    }
    let seconds = (arrival - departure).num_seconds();
    Some(seconds as f64 / 3600.0)
}

/// Round to one decimal place, halves away from zero (3.75 -> 3.8)
pub fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Parse a duration in hours
///
/// Accepts a plain decimal ("1.5") or the legacy display form
/// ("1h 45m", "2h", "45m"). Negative and non-finite values are rejected.
pub fn parse_hours(input: &str) -> Option<f64> {
    let clean = input.trim();
    if clean.is_empty() {
        return None;
    }

    if let Ok(v) = clean.parse::<f64>() {
        return (v.is_finite() && v >= 0.0).then_some(v);
    }

    let lower = clean.to_lowercase();
    let mut hours = 0.0;
    let mut seen = false;
    for part in lower.split_whitespace() {
        if let Some(h) = part.strip_suffix('h') {
            hours += h.parse::<f64>().ok()?;
            seen = true;
        } else if let Some(m) = part.strip_suffix('m') {
            hours += m.parse::<f64>().ok()? / 60.0;
            seen = true;
        } else {
            return None;
        }
    }

    (seen && hours.is_finite() && hours >= 0.0).then_some(hours)
}

/// Format decimal hours for display as "Xh Ym"
pub fn format_duration(hours: f64) -> String {
    let total_minutes = (hours.max(0.0) * 60.0).round() as u64;
    format!("{}h {}m", total_minutes / 60, total_minutes % 60)
}

/// Parse a flight date
///
/// # Arguments
/// * `date_str` - Date string in one of:
///   - "YYYY-MM-DD" (backend wire format)
///   - RFC 3339 / ISO timestamp, date part taken ("2025-05-10T00:00:00.000Z")
///   - "May 15, 2025" or "March 3, 2025" (legacy display form)
pub fn parse_flight_date(date_str: &str) -> Option<NaiveDate> {
    let clean = date_str.trim();

    if clean.len() >= 10 && clean.is_char_boundary(10) {
        if let Ok(d) = NaiveDate::parse_from_str(&clean[..10], "%Y-%m-%d") {
            return Some(d);
        }
    }

    NaiveDate::parse_from_str(clean, "%b %d, %Y")
        .or_else(|_| NaiveDate::parse_from_str(clean, "%B %d, %Y"))
        .ok()
}

/// True when both dates fall in the same calendar month of the same year
pub fn is_same_month(a: NaiveDate, b: NaiveDate) -> bool {
    a.year() == b.year() && a.month() == b.month()
}

/// Month grouping label, e.g. "May 2025"
pub fn month_label(date: NaiveDate) -> String {
    date.format("%B %Y").to_string()
}

/// First day of the month `months_back` months before the month of `date`
pub fn month_start_before(date: NaiveDate, months_back: u32) -> Option<NaiveDate> {
    let index = date.year() * 12 + date.month0() as i32 - months_back as i32;
    NaiveDate::from_ymd_opt(index.div_euclid(12), index.rem_euclid(12) as u32 + 1, 1)
}
