use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::errors::{Error, Result};

/// Device firmware is not trustworthy about types: a field documented as a
/// boolean may arrive as a string or number. Anything that is not strictly
/// a JSON boolean coerces to `false`.
pub fn lenient_bool<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(matches!(value, Value::Bool(true)))
}

/// Non-numeric readings (strings, null, objects) coerce to `0`.
pub fn lenient_f64<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_f64().unwrap_or(0.0))
}

/// Reservoir level falls back to "LOW" when absent, empty, or not a string.
pub fn lenient_level<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) if !s.is_empty() => s,
        _ => default_reservoir_level(),
    })
}

pub fn default_reservoir_level() -> String {
    "LOW".to_string()
}

/// Device labels are owner-chosen but must not be empty. The literal
/// `online` is a fixed path segment under `/api/v1/devices`, so a device
/// carrying that label could never be fetched back.
pub fn require_label(label: &str) -> Result<()> {
    if label.is_empty() || label == "online" {
        return Err(Error::Validation("Invalid Device ID!".to_string()));
    }
    Ok(())
}

/// Mobile clients send an empty string or the literal "null" when the device
/// picker is cleared; both mean "no device filter".
pub fn device_filter(raw: Option<&str>) -> Option<&str> {
    match raw {
        Some(s) if !s.trim().is_empty() && s != "null" => Some(s),
        _ => None,
    }
}

/// First instant of the calendar day, UTC.
pub fn day_start(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Last represented millisecond of the calendar day, UTC (23:59:59.999).
pub fn day_end(date: NaiveDate) -> DateTime<Utc> {
    // NaiveTime arithmetic wraps at midnight and cannot overflow, unlike
    // DateTime arithmetic at the calendar bounds.
    date.and_time(NaiveTime::MIN - Duration::milliseconds(1)).and_utc()
}
