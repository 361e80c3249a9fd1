use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::validate::{default_reservoir_level, lenient_bool, lenient_f64, lenient_level};

/// A registered physical unit and its live sensor snapshot.
///
/// Wire field names follow the device firmware's JSON, which predates this
/// service and cannot change (`deviceID`, `LockControl`, `dryhascontents`...).
/// Timestamps serialize as epoch milliseconds.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Device {
    pub id: Uuid,
    #[serde(rename = "deviceID")]
    pub device_id: String,
    #[serde(rename = "owner")]
    pub owner_id: Uuid,
    #[serde(rename = "isOnline")]
    pub is_online: bool,
    #[serde(rename = "lastUpdate", with = "chrono::serde::ts_milliseconds")]
    pub last_update: DateTime<Utc>,

    // Vault compartments
    #[serde(rename = "LockControl")]
    pub lock_control: bool,
    pub temperature1: f64,
    pub temperature2: f64,
    #[serde(rename = "dryhascontents")]
    pub dry_has_contents: bool,
    #[serde(rename = "wethascontents")]
    pub wet_has_contents: bool,

    // Irrigation monitor
    pub temperature: f64,
    pub humidity: f64,
    #[serde(rename = "reservoirLevel")]
    pub reservoir_level: String,
    #[serde(rename = "soilMoisture1")]
    pub soil_moisture1: bool,
    #[serde(rename = "soilMoisture2")]
    pub soil_moisture2: bool,
    #[serde(rename = "soilMoisture3")]
    pub soil_moisture3: bool,
    #[serde(rename = "waterLevel1")]
    pub water_level1: bool,
    #[serde(rename = "waterLevel2")]
    pub water_level2: bool,
    #[serde(rename = "waterLevel3")]
    pub water_level3: bool,
}

/// Closed set of event kinds a device may submit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EventType {
    #[default]
    #[serde(rename = "Data Submission")]
    DataSubmission,
    #[serde(rename = "Seedling Sow")]
    SeedlingSow,
    #[serde(rename = "Seedling Ready")]
    SeedlingReady,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::DataSubmission => "Data Submission",
            EventType::SeedlingSow => "Seedling Sow",
            EventType::SeedlingReady => "Seedling Ready",
        }
    }
}

/// Registration and rename both carry just the owner-chosen label.
#[derive(Debug, Deserialize)]
pub struct DeviceIdBody {
    #[serde(rename = "deviceID")]
    pub device_id: String,
}

/// Device-originated telemetry report. Every snapshot field is optional on
/// the wire and coerced per the firmware contract: absent or non-numeric
/// readings become 0, absent or non-boolean flags become false, an absent
/// reservoir level becomes "LOW".
#[derive(Debug, Clone, Deserialize)]
pub struct ReportRequest {
    #[serde(rename = "deviceID")]
    pub device_id: String,

    #[serde(rename = "LockControl", default, deserialize_with = "lenient_bool")]
    pub lock_control: bool,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub temperature1: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub temperature2: f64,
    #[serde(rename = "dryhascontents", default, deserialize_with = "lenient_bool")]
    pub dry_has_contents: bool,
    #[serde(rename = "wethascontents", default, deserialize_with = "lenient_bool")]
    pub wet_has_contents: bool,

    #[serde(default, deserialize_with = "lenient_f64")]
    pub temperature: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub humidity: f64,
    #[serde(
        rename = "reservoirLevel",
        default = "default_reservoir_level",
        deserialize_with = "lenient_level"
    )]
    pub reservoir_level: String,
    #[serde(rename = "soilMoisture1", default, deserialize_with = "lenient_bool")]
    pub soil_moisture1: bool,
    #[serde(rename = "soilMoisture2", default, deserialize_with = "lenient_bool")]
    pub soil_moisture2: bool,
    #[serde(rename = "soilMoisture3", default, deserialize_with = "lenient_bool")]
    pub soil_moisture3: bool,
    #[serde(rename = "waterLevel1", default, deserialize_with = "lenient_bool")]
    pub water_level1: bool,
    #[serde(rename = "waterLevel2", default, deserialize_with = "lenient_bool")]
    pub water_level2: bool,
    #[serde(rename = "waterLevel3", default, deserialize_with = "lenient_bool")]
    pub water_level3: bool,
}

/// Device-originated history submission. `eventDate` is epoch milliseconds
/// and defaults to submission time when absent.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitRequest {
    #[serde(rename = "deviceID")]
    pub device_id: String,
    #[serde(rename = "eventType", default)]
    pub event_type: EventType,
    #[serde(
        rename = "eventDate",
        default,
        with = "chrono::serde::ts_milliseconds_option"
    )]
    pub event_date: Option<DateTime<Utc>>,

    #[serde(rename = "LockControl", default, deserialize_with = "lenient_bool")]
    pub lock_control: bool,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub temperature1: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub temperature2: f64,
    #[serde(rename = "dryhascontents", default, deserialize_with = "lenient_bool")]
    pub dry_has_contents: bool,
    #[serde(rename = "wethascontents", default, deserialize_with = "lenient_bool")]
    pub wet_has_contents: bool,
}

/// Echo of an accepted submission, with defaults resolved.
#[derive(Debug, Clone, Serialize)]
pub struct SubmittedEvent {
    #[serde(rename = "deviceID")]
    pub device_id: String,
    #[serde(rename = "eventType")]
    pub event_type: EventType,
    #[serde(rename = "eventDate", with = "chrono::serde::ts_milliseconds")]
    pub event_date: DateTime<Utc>,
    #[serde(rename = "LockControl")]
    pub lock_control: bool,
    pub temperature1: f64,
    pub temperature2: f64,
    #[serde(rename = "dryhascontents")]
    pub dry_has_contents: bool,
    #[serde(rename = "wethascontents")]
    pub wet_has_contents: bool,
}

/// Device identity embedded in a search hit.
#[derive(Debug, Clone, Serialize)]
pub struct EventDeviceRef {
    pub id: Uuid,
    #[serde(rename = "deviceID")]
    pub device_id: String,
    pub owner: Uuid,
}

/// One event joined to its device, as returned by record search.
#[derive(Debug, Clone, Serialize)]
pub struct EventHit {
    pub id: Uuid,
    pub device: EventDeviceRef,
    pub owner: Uuid,
    #[serde(rename = "eventDate", with = "chrono::serde::ts_milliseconds")]
    pub event_date: DateTime<Utc>,
    #[serde(rename = "eventType")]
    pub event_type: String,
    #[serde(rename = "LockControl")]
    pub lock_control: bool,
    pub temperature1: f64,
    pub temperature2: f64,
    #[serde(rename = "dryhascontents")]
    pub dry_has_contents: bool,
    #[serde(rename = "wethascontents")]
    pub wet_has_contents: bool,
}

/// Online/offline split over one owner's fleet.
#[derive(Debug, Clone, Copy, Serialize, sqlx::FromRow)]
pub struct OnlineBreakdown {
    pub online: i64,
    pub offline: i64,
}

/// Device identity attached to an hourly series.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceRef {
    pub id: Uuid,
    #[serde(rename = "deviceID")]
    pub device_id: String,
}

/// One point of the dense hourly axis: two-digit wall-clock hour plus the
/// average temperature for that bucket (0 when no readings landed in it).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourPoint {
    pub hour: String,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeviceSeries {
    pub device: DeviceRef,
    pub temperatures: Vec<HourPoint>,
}

/// Uniform response envelope: `{ success, message?, data? }`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    pub fn ok_with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            data: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_device() -> Device {
        Device {
            id: Uuid::nil(),
            device_id: "V-100".to_string(),
            owner_id: Uuid::nil(),
            is_online: true,
            last_update: DateTime::from_timestamp_millis(1_700_000_000_000).unwrap(),
            lock_control: true,
            temperature1: 21.0,
            temperature2: 4.5,
            dry_has_contents: true,
            wet_has_contents: false,
            temperature: 19.2,
            humidity: 55.0,
            reservoir_level: "LOW".to_string(),
            soil_moisture1: true,
            soil_moisture2: false,
            soil_moisture3: false,
            water_level1: false,
            water_level2: false,
            water_level3: true,
        }
    }

    #[test]
    fn test_device_wire_names() {
        let v = serde_json::to_value(sample_device()).unwrap();
        assert_eq!(v["deviceID"], "V-100");
        assert_eq!(v["isOnline"], true);
        assert_eq!(v["lastUpdate"], 1_700_000_000_000_i64);
        assert_eq!(v["LockControl"], true);
        assert_eq!(v["dryhascontents"], true);
        assert_eq!(v["wethascontents"], false);
        assert_eq!(v["reservoirLevel"], "LOW");
        assert_eq!(v["soilMoisture1"], true);
        assert_eq!(v["waterLevel3"], true);
        assert_eq!(v["temperature1"], 21.0);
        // Internal snake_case names must not leak.
        assert!(v.get("device_id").is_none());
        assert!(v.get("lock_control").is_none());
    }

    #[test]
    fn test_event_type_defaults_and_labels() {
        assert_eq!(EventType::default(), EventType::DataSubmission);
        assert_eq!(EventType::DataSubmission.as_str(), "Data Submission");

        let t: EventType = serde_json::from_str(r#""Seedling Sow""#).unwrap();
        assert_eq!(t, EventType::SeedlingSow);
        assert_eq!(serde_json::to_string(&t).unwrap(), r#""Seedling Sow""#);

        assert!(serde_json::from_str::<EventType>(r#""Harvest""#).is_err());
    }

    #[test]
    fn test_report_request_coercion() {
        let req: ReportRequest = serde_json::from_str(
            r#"{"deviceID": "V-100", "temperature1": 21, "LockControl": true}"#,
        )
        .unwrap();
        assert_eq!(req.device_id, "V-100");
        assert_eq!(req.temperature1, 21.0);
        assert!(req.lock_control);
        assert_eq!(req.temperature2, 0.0);
        assert_eq!(req.humidity, 0.0);
        assert_eq!(req.reservoir_level, "LOW");
        assert!(!req.soil_moisture1);
        assert!(!req.water_level2);

        let req: ReportRequest = serde_json::from_str(
            r#"{"deviceID": "M-7", "temperature": "21", "soilMoisture1": "wet", "reservoirLevel": ""}"#,
        )
        .unwrap();
        assert_eq!(req.temperature, 0.0);
        assert!(!req.soil_moisture1);
        assert_eq!(req.reservoir_level, "LOW");
    }

    #[test]
    fn test_submit_request_event_date() {
        let req: SubmitRequest =
            serde_json::from_str(r#"{"deviceID": "V-100", "eventDate": 1700000000000}"#).unwrap();
        assert_eq!(
            req.event_date.unwrap().timestamp_millis(),
            1_700_000_000_000
        );
        assert_eq!(req.event_type, EventType::DataSubmission);

        let req: SubmitRequest = serde_json::from_str(r#"{"deviceID": "V-100"}"#).unwrap();
        assert!(req.event_date.is_none());
    }

    #[test]
    fn test_submitted_event_echo() {
        let echo = SubmittedEvent {
            device_id: "V-100".to_string(),
            event_type: EventType::SeedlingReady,
            event_date: DateTime::from_timestamp_millis(1_700_000_000_000).unwrap(),
            lock_control: false,
            temperature1: 3.5,
            temperature2: 0.0,
            dry_has_contents: false,
            wet_has_contents: true,
        };
        let v = serde_json::to_value(echo).unwrap();
        assert_eq!(v["eventType"], "Seedling Ready");
        assert_eq!(v["eventDate"], 1_700_000_000_000_i64);
        assert_eq!(v["wethascontents"], true);
    }

    #[test]
    fn test_envelope_skips_empty_fields() {
        let ok = serde_json::to_value(ApiResponse::ok(1)).unwrap();
        assert_eq!(ok["success"], true);
        assert!(ok.get("message").is_none());
        assert_eq!(ok["data"], 1);

        let fail = serde_json::to_value(ApiResponse::<()>::fail("Server Error")).unwrap();
        assert_eq!(fail["success"], false);
        assert_eq!(fail["message"], "Server Error");
        assert!(fail.get("data").is_none());
    }
}
