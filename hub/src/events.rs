use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::{Error, Result};
use crate::model::{EventDeviceRef, EventHit, SubmitRequest, SubmittedEvent};
use crate::validate::{day_end, day_start};

/// Appends one history record for the device carrying the given label.
/// The `INSERT ... SELECT` resolves the label and copies the device's
/// current owner into the record in the same statement, so a concurrent
/// rename cannot produce an event pointing at a half-updated device.
pub async fn submit(pool: &PgPool, req: &SubmitRequest) -> Result<SubmittedEvent> {
    let event_date = req.event_date.unwrap_or_else(Utc::now);

    let inserted: Option<Uuid> = sqlx::query_scalar(
        "INSERT INTO events
             (device_db_id, owner_id, event_date, event_type,
              lock_control, temperature1, temperature2, dry_has_contents, wet_has_contents)
         SELECT d.id, d.owner_id, $2, $3, $4, $5, $6, $7, $8
         FROM devices d
         WHERE d.device_id = $1
         RETURNING id",
    )
    .bind(&req.device_id)
    .bind(event_date)
    .bind(req.event_type.as_str())
    .bind(req.lock_control)
    .bind(req.temperature1)
    .bind(req.temperature2)
    .bind(req.dry_has_contents)
    .bind(req.wet_has_contents)
    .fetch_optional(pool)
    .await?;

    if inserted.is_none() {
        return Err(Error::NotFound("Device not found!".to_string()));
    }

    Ok(SubmittedEvent {
        device_id: req.device_id.clone(),
        event_type: req.event_type,
        event_date,
        lock_control: req.lock_control,
        temperature1: req.temperature1,
        temperature2: req.temperature2,
        dry_has_contents: req.dry_has_contents,
        wet_has_contents: req.wet_has_contents,
    })
}

#[derive(Debug, sqlx::FromRow)]
struct SearchRow {
    id: Uuid,
    device_db_id: Uuid,
    device_label: String,
    device_owner: Uuid,
    owner_id: Uuid,
    event_date: DateTime<Utc>,
    event_type: String,
    lock_control: bool,
    temperature1: f64,
    temperature2: f64,
    dry_has_contents: bool,
    wet_has_contents: bool,
}

impl SearchRow {
    fn into_hit(self) -> EventHit {
        EventHit {
            id: self.id,
            device: EventDeviceRef {
                id: self.device_db_id,
                device_id: self.device_label,
                owner: self.device_owner,
            },
            owner: self.owner_id,
            event_date: self.event_date,
            event_type: self.event_type,
            lock_control: self.lock_control,
            temperature1: self.temperature1,
            temperature2: self.temperature2,
            dry_has_contents: self.dry_has_contents,
            wet_has_contents: self.wet_has_contents,
        }
    }
}

/// Searches the caller's history. Ownership is always the first filter;
/// label and day bounds are appended when present. Day bounds are whole
/// UTC calendar days, inclusive on both ends. Zero matches is an empty
/// list, not a failure.
pub async fn search(
    pool: &PgPool,
    owner: Uuid,
    device_label: Option<&str>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
) -> Result<Vec<EventHit>> {
    let mut conditions = vec!["e.owner_id = $1".to_string()];
    let mut param = 1;

    if device_label.is_some() {
        param += 1;
        conditions.push(format!("d.device_id = ${}", param));
    }
    if start_date.is_some() {
        param += 1;
        conditions.push(format!("e.event_date >= ${}", param));
    }
    if end_date.is_some() {
        param += 1;
        conditions.push(format!("e.event_date <= ${}", param));
    }

    let query = format!(
        "SELECT e.id, e.device_db_id,
                d.device_id AS device_label, d.owner_id AS device_owner,
                e.owner_id, e.event_date, e.event_type,
                e.lock_control, e.temperature1, e.temperature2,
                e.dry_has_contents, e.wet_has_contents
         FROM events e
         JOIN devices d ON d.id = e.device_db_id
         WHERE {}
         ORDER BY e.event_date",
        conditions.join(" AND ")
    );

    let mut query_builder = sqlx::query_as::<_, SearchRow>(&query).bind(owner);
    if let Some(label) = device_label {
        query_builder = query_builder.bind(label);
    }
    if let Some(start) = start_date {
        query_builder = query_builder.bind(day_start(start));
    }
    if let Some(end) = end_date {
        query_builder = query_builder.bind(day_end(end));
    }

    let rows = query_builder.fetch_all(pool).await?;
    Ok(rows.into_iter().map(SearchRow::into_hit).collect())
}
