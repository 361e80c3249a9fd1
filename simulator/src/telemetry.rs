use rand::Rng;
use serde::Serialize;

/// Snapshot report from a storage vault. Vault firmware only sends its own
/// sensor block; the hub fills the rest with defaults.
#[derive(Debug, Clone, Serialize)]
pub struct VaultReport {
    #[serde(rename = "deviceID")]
    pub device_id: String,
    #[serde(rename = "LockControl")]
    pub lock_control: bool,
    pub temperature1: f64,
    pub temperature2: f64,
    #[serde(rename = "dryhascontents")]
    pub dry_has_contents: bool,
    #[serde(rename = "wethascontents")]
    pub wet_has_contents: bool,
}

/// Snapshot report from an irrigation monitor.
#[derive(Debug, Clone, Serialize)]
pub struct MonitorReport {
    #[serde(rename = "deviceID")]
    pub device_id: String,
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

/// History record pushed by vault firmware. No eventDate; the hub stamps
/// submission time.
#[derive(Debug, Clone, Serialize)]
pub struct VaultEvent {
    #[serde(rename = "deviceID")]
    pub device_id: String,
    #[serde(rename = "eventType")]
    pub event_type: &'static str,
    #[serde(rename = "LockControl")]
    pub lock_control: bool,
    pub temperature1: f64,
    pub temperature2: f64,
    #[serde(rename = "dryhascontents")]
    pub dry_has_contents: bool,
    #[serde(rename = "wethascontents")]
    pub wet_has_contents: bool,
}

fn compartment_temp(rng: &mut impl Rng) -> f64 {
    if rng.gen_bool(0.05) {
        rng.gen_range(-50.0..100.0) // 5% outliers
    } else {
        rng.gen_range(15.0..35.0) // Normal range
    }
}

pub fn vault_report(rng: &mut impl Rng, device_id: String) -> VaultReport {
    VaultReport {
        device_id,
        lock_control: rng.gen_bool(0.8),
        temperature1: compartment_temp(rng),
        temperature2: compartment_temp(rng),
        dry_has_contents: rng.gen_bool(0.5),
        wet_has_contents: rng.gen_bool(0.5),
    }
}

pub fn monitor_report(rng: &mut impl Rng, device_id: String) -> MonitorReport {
    let humidity = if rng.gen_bool(0.05) {
        rng.gen_range(0.0..100.0) // 5% outliers
    } else {
        rng.gen_range(30.0..80.0) // Normal range
    };
    let reservoir_level = if rng.gen_bool(0.2) { "LOW" } else { "HIGH" };

    MonitorReport {
        device_id,
        temperature: compartment_temp(rng),
        humidity,
        reservoir_level: reservoir_level.to_string(),
        soil_moisture1: rng.gen_bool(0.6),
        soil_moisture2: rng.gen_bool(0.6),
        soil_moisture3: rng.gen_bool(0.6),
        water_level1: rng.gen_bool(0.5),
        water_level2: rng.gen_bool(0.5),
        water_level3: rng.gen_bool(0.5),
    }
}

pub fn vault_event(rng: &mut impl Rng, device_id: String) -> VaultEvent {
    let event_type = if rng.gen_bool(0.1) {
        if rng.gen_bool(0.5) {
            "Seedling Sow"
        } else {
            "Seedling Ready"
        }
    } else {
        "Data Submission"
    };

    VaultEvent {
        device_id,
        event_type,
        lock_control: rng.gen_bool(0.8),
        temperature1: compartment_temp(rng),
        temperature2: compartment_temp(rng),
        dry_has_contents: rng.gen_bool(0.5),
        wet_has_contents: rng.gen_bool(0.5),
    }
}
