// Lenient field decoding for backend payloads
//
// The backend has sent hours as JSON numbers, as numeric strings ("1.5") and
// as the old display form ("1h 45m"), and ids as both strings and integers.
// These helpers accept all of them. A malformed duration or count decodes to
// zero instead of failing the whole payload.

use chrono::NaiveDate;
use serde::{de, Deserialize, Deserializer, Serializer};
use serde_json::Value;

use crate::time_utils::{parse_flight_date, parse_hours};

/// Interpret a JSON value as non-negative decimal hours
pub fn hours_from_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|h| h.is_finite() && *h >= 0.0),
        Value::String(s) => parse_hours(s),
        _ => None,
    }
}

/// Interpret a JSON value as a non-negative count
pub fn count_from_value(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f >= 0.0 && f.fract() == 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub fn de_hours<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(hours_from_value(&value).unwrap_or_else(|| {
        log::warn!("Malformed duration {}, counting it as 0 hours", value);
        0.0
    }))
}

pub fn de_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(count_from_value(&value).unwrap_or_else(|| {
        log::warn!("Malformed count {}, using 0", value);
        0
    }))
}

pub fn de_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!("invalid flight id: {}", other))),
    }
}

pub mod flight_date {
    use super::*;

    pub fn serialize<S>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&date.format("%Y-%m-%d"))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse_flight_date(&raw).ok_or_else(|| de::Error::custom(format!("invalid flight date: {}", raw)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_hours_from_value() {
        assert_eq!(hours_from_value(&json!(1.5)), Some(1.5));
        assert_eq!(hours_from_value(&json!("2.3")), Some(2.3));
        assert_eq!(hours_from_value(&json!("1h 45m")), Some(1.75));
        assert_eq!(hours_from_value(&json!(-2)), None);
        assert_eq!(hours_from_value(&json!("n/a")), None);
        assert_eq!(hours_from_value(&Value::Null), None);
    }

    #[test]
    fn test_count_from_value() {
        assert_eq!(count_from_value(&json!(78)), Some(78));
        assert_eq!(count_from_value(&json!("78")), Some(78));
        assert_eq!(count_from_value(&json!(4.0)), Some(4));
        assert_eq!(count_from_value(&json!(4.5)), None);
        assert_eq!(count_from_value(&json!(true)), None);
    }
}
