use sqlx::PgPool;

use crate::errors::{Error, Result};
use crate::model::{Device, ReportRequest};

/// Applies a telemetry report to the device snapshot. The whole payload
/// overwrites the previous snapshot in one conditional UPDATE keyed on the
/// label, which also flips the device online and stamps `last_update`.
/// Unknown labels are rejected; reporting never registers a device.
pub async fn report(pool: &PgPool, req: &ReportRequest) -> Result<Device> {
    sqlx::query_as::<_, Device>(
        "UPDATE devices SET
             is_online = TRUE,
             last_update = now(),
             lock_control = $2,
             temperature1 = $3,
             temperature2 = $4,
             dry_has_contents = $5,
             wet_has_contents = $6,
             temperature = $7,
             humidity = $8,
             reservoir_level = $9,
             soil_moisture1 = $10,
             soil_moisture2 = $11,
             soil_moisture3 = $12,
             water_level1 = $13,
             water_level2 = $14,
             water_level3 = $15
         WHERE device_id = $1
         RETURNING *",
    )
    .bind(&req.device_id)
    .bind(req.lock_control)
    .bind(req.temperature1)
    .bind(req.temperature2)
    .bind(req.dry_has_contents)
    .bind(req.wet_has_contents)
    .bind(req.temperature)
    .bind(req.humidity)
    .bind(&req.reservoir_level)
    .bind(req.soil_moisture1)
    .bind(req.soil_moisture2)
    .bind(req.soil_moisture3)
    .bind(req.water_level1)
    .bind(req.water_level2)
    .bind(req.water_level3)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| Error::NotFound("Device Not found!".to_string()))
}
