use sqlx::PgPool;
use uuid::Uuid;

use crate::db::is_unique_violation;
use crate::errors::{Error, Result};
use crate::model::{Device, OnlineBreakdown};

fn label_conflict(err: sqlx::Error) -> Error {
    if is_unique_violation(&err) {
        Error::Conflict("Device ID is already in use!".to_string())
    } else {
        Error::Database(err)
    }
}

/// Registers a label for the calling account. The unique index on
/// `device_id` is the only arbiter: two concurrent registrations of the
/// same label cannot both succeed, the loser gets a conflict.
pub async fn register(pool: &PgPool, owner: Uuid, label: &str) -> Result<Device> {
    sqlx::query_as::<_, Device>(
        "INSERT INTO devices (device_id, owner_id) VALUES ($1, $2) RETURNING *",
    )
    .bind(label)
    .bind(owner)
    .fetch_one(pool)
    .await
    .map_err(label_conflict)
}

/// Renames a device by its system id. Runs in one transaction with the row
/// locked, so a rename cannot interleave with another rename or register of
/// the same label. Renaming to the current label is a no-op success.
pub async fn rename(
    pool: &PgPool,
    owner: Uuid,
    device_db_id: Uuid,
    new_label: &str,
) -> Result<Device> {
    let mut tx = pool.begin().await?;

    let device = sqlx::query_as::<_, Device>("SELECT * FROM devices WHERE id = $1 FOR UPDATE")
        .bind(device_db_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| Error::NotFound("Invalid Device DB ID!".to_string()))?;

    if device.owner_id != owner {
        return Err(Error::unauthorized());
    }

    if device.device_id == new_label {
        tx.commit().await?;
        return Ok(device);
    }

    let renamed =
        sqlx::query_as::<_, Device>("UPDATE devices SET device_id = $1 WHERE id = $2 RETURNING *")
            .bind(new_label)
            .bind(device_db_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(label_conflict)?;

    tx.commit().await?;
    Ok(renamed)
}

/// All devices registered to one account. No guaranteed order; an empty
/// fleet is an empty list, not a failure.
pub async fn list_by_owner(pool: &PgPool, owner: Uuid) -> Result<Vec<Device>> {
    let devices = sqlx::query_as::<_, Device>("SELECT * FROM devices WHERE owner_id = $1")
        .bind(owner)
        .fetch_all(pool)
        .await?;
    Ok(devices)
}

/// Looks a device up by label, scoped to the caller. A label that does not
/// exist and a label owned by another account produce the same failure, so
/// the endpoint cannot be used to enumerate the label namespace.
pub async fn get_by_label(pool: &PgPool, owner: Uuid, label: &str) -> Result<Device> {
    let device = sqlx::query_as::<_, Device>("SELECT * FROM devices WHERE device_id = $1")
        .bind(label)
        .fetch_optional(pool)
        .await?;

    match device {
        Some(d) if d.owner_id == owner => Ok(d),
        _ => Err(Error::unauthorized()),
    }
}

/// Online/offline split over the caller's fleet, computed in one grouped
/// scan. An account with no devices at all is a failure, matching what the
/// dashboards expect.
pub async fn online_breakdown(pool: &PgPool, owner: Uuid) -> Result<OnlineBreakdown> {
    let counts: OnlineBreakdown = sqlx::query_as(
        "SELECT COUNT(*) FILTER (WHERE is_online) AS online,
                COUNT(*) FILTER (WHERE NOT is_online) AS offline
         FROM devices
         WHERE owner_id = $1",
    )
    .bind(owner)
    .fetch_one(pool)
    .await?;

    if counts.online + counts.offline == 0 {
        return Err(Error::NotFound("No device found!".to_string()));
    }
    Ok(counts)
}
