use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::Result;
use crate::model::{DeviceRef, DeviceSeries, HourPoint};

#[derive(Debug, sqlx::FromRow)]
struct TempSample {
    device_db_id: Uuid,
    device_label: String,
    event_date: DateTime<Utc>,
    temperature1: f64,
}

/// Average `temperature1` per device per hour over the trailing 24 hours.
///
/// The storage query only fetches the raw in-window samples; bucketing,
/// averaging and densification happen here so the hour axis is identical
/// for every device regardless of when each one reported.
pub async fn hourly_temperature(pool: &PgPool, owner: Uuid) -> Result<Vec<DeviceSeries>> {
    let now = Utc::now();
    let from = now - Duration::hours(24);

    let samples = sqlx::query_as::<_, TempSample>(
        "SELECT e.device_db_id, d.device_id AS device_label, e.event_date, e.temperature1
         FROM events e
         JOIN devices d ON d.id = e.device_db_id
         WHERE e.owner_id = $1 AND e.event_date >= $2 AND e.event_date <= $3",
    )
    .bind(owner)
    .bind(from)
    .bind(now)
    .fetch_all(pool)
    .await?;

    Ok(densify_hourly(samples, from, now))
}

fn trunc_hour(t: DateTime<Utc>) -> DateTime<Utc> {
    t - Duration::milliseconds(t.timestamp_millis().rem_euclid(3_600_000))
}

/// Every hour bucket from `trunc(from)` to `trunc(to)`, inclusive. For a
/// trailing 24 hour window this is 25 slots, so a sample sitting right at
/// either edge still lands on the axis.
fn hour_slots(from: DateTime<Utc>, to: DateTime<Utc>) -> Vec<DateTime<Utc>> {
    let mut slots = Vec::new();
    let mut slot = trunc_hour(from);
    let last = trunc_hour(to);
    while slot <= last {
        slots.push(slot);
        slot += Duration::hours(1);
    }
    slots
}

/// Partitions samples per device, averages within each hour bucket and
/// fills every empty bucket with 0 so charts get one dense series per
/// device. Hours are labeled with the two-digit wall clock hour and
/// averages round to 2 decimals.
fn densify_hourly(
    samples: Vec<TempSample>,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Vec<DeviceSeries> {
    let slots = hour_slots(from, to);

    // (sum, count) per bucket, partitioned per device. BTreeMap keeps the
    // series order stable across runs.
    let mut per_device: BTreeMap<Uuid, (String, HashMap<DateTime<Utc>, (f64, u32)>)> =
        BTreeMap::new();

    for sample in samples {
        let bucket = trunc_hour(sample.event_date);
        let entry = per_device
            .entry(sample.device_db_id)
            .or_insert_with(|| (sample.device_label.clone(), HashMap::new()));
        let (sum, count) = entry.1.entry(bucket).or_insert((0.0, 0));
        *sum += sample.temperature1;
        *count += 1;
    }

    per_device
        .into_iter()
        .map(|(id, (label, buckets))| DeviceSeries {
            device: DeviceRef {
                id,
                device_id: label,
            },
            temperatures: slots
                .iter()
                .map(|slot| {
                    let value = buckets
                        .get(slot)
                        .map(|(sum, count)| sum / *count as f64)
                        .unwrap_or(0.0);
                    HourPoint {
                        hour: slot.format("%H").to_string(),
                        value: (value * 100.0).round() / 100.0,
                    }
                })
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, h, m, 0).unwrap()
    }

    fn sample(id: Uuid, label: &str, when: DateTime<Utc>, temp: f64) -> TempSample {
        TempSample {
            device_db_id: id,
            device_label: label.to_string(),
            event_date: when,
            temperature1: temp,
        }
    }

    #[test]
    fn test_trunc_hour_floors_to_the_hour() {
        let t = Utc.with_ymd_and_hms(2025, 3, 14, 12, 34, 56).unwrap();
        assert_eq!(trunc_hour(t), at(12, 0));
        assert_eq!(trunc_hour(at(12, 0)), at(12, 0));
    }

    #[test]
    fn test_trailing_window_has_25_slots() {
        let now = Utc.with_ymd_and_hms(2025, 3, 14, 15, 26, 53).unwrap();
        let slots = hour_slots(now - Duration::hours(24), now);
        assert_eq!(slots.len(), 25);
        assert_eq!(slots[0], trunc_hour(now - Duration::hours(24)));
        assert_eq!(slots[24], trunc_hour(now));

        // Exactly on the hour boundary the window still spans 25 buckets.
        let slots = hour_slots(at(15, 0) - Duration::hours(24), at(15, 0));
        assert_eq!(slots.len(), 25);
    }

    #[test]
    fn test_missing_hours_fill_with_zero() {
        let now = at(23, 30);
        let from = now - Duration::hours(24);
        let dev = Uuid::new_v4();

        let series = densify_hourly(
            vec![
                sample(dev, "V-100", at(2, 10), 20.0),
                sample(dev, "V-100", at(2, 50), 22.0),
                sample(dev, "V-100", at(14, 5), 18.0),
            ],
            from,
            now,
        );

        assert_eq!(series.len(), 1);
        let points = &series[0].temperatures;
        assert_eq!(points.len(), 25);

        let two = points.iter().find(|p| p.hour == "02").unwrap();
        assert_eq!(two.value, 21.0);
        let fourteen = points.iter().find(|p| p.hour == "14").unwrap();
        assert_eq!(fourteen.value, 18.0);

        let zeros = points.iter().filter(|p| p.value == 0.0).count();
        assert_eq!(zeros, 23);
    }

    #[test]
    fn test_devices_do_not_share_buckets() {
        let now = at(20, 0);
        let from = now - Duration::hours(24);
        let vault = Uuid::new_v4();
        let monitor = Uuid::new_v4();

        let series = densify_hourly(
            vec![
                sample(vault, "V-100", at(5, 0), 4.0),
                sample(monitor, "M-7", at(9, 0), 26.0),
            ],
            from,
            now,
        );

        assert_eq!(series.len(), 2);
        for s in &series {
            assert_eq!(s.temperatures.len(), 25);
            let five = s.temperatures.iter().find(|p| p.hour == "05").unwrap();
            let nine = s.temperatures.iter().find(|p| p.hour == "09").unwrap();
            match s.device.device_id.as_str() {
                "V-100" => {
                    assert_eq!(five.value, 4.0);
                    assert_eq!(nine.value, 0.0);
                }
                "M-7" => {
                    assert_eq!(five.value, 0.0);
                    assert_eq!(nine.value, 26.0);
                }
                other => panic!("unexpected device {}", other),
            }
        }
    }

    #[test]
    fn test_averages_round_to_two_decimals() {
        let now = at(12, 0);
        let from = now - Duration::hours(24);
        let dev = Uuid::new_v4();

        let series = densify_hourly(
            vec![
                sample(dev, "V-100", at(3, 1), 20.0),
                sample(dev, "V-100", at(3, 2), 20.0),
                sample(dev, "V-100", at(3, 3), 21.0),
            ],
            from,
            now,
        );

        let three = series[0]
            .temperatures
            .iter()
            .find(|p| p.hour == "03")
            .unwrap();
        assert_eq!(three.value, 20.33);
    }

    #[test]
    fn test_hour_labels_are_wall_clock() {
        let now = at(15, 45);
        let from = now - Duration::hours(24);
        let dev = Uuid::new_v4();

        let series = densify_hourly(vec![sample(dev, "V-100", at(15, 30), 1.0)], from, now);
        let labels: Vec<&str> = series[0]
            .temperatures
            .iter()
            .map(|p| p.hour.as_str())
            .collect();

        // Yesterday 15:00 through today 15:00 inclusive.
        assert_eq!(labels.first(), Some(&"15"));
        assert_eq!(labels.last(), Some(&"15"));
        assert_eq!(labels[1], "16");
        assert_eq!(labels[9], "00");
    }

    #[test]
    fn test_no_samples_means_no_series() {
        let now = at(10, 0);
        assert!(densify_hourly(Vec::new(), now - Duration::hours(24), now).is_empty());
    }
}
