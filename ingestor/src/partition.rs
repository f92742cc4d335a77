//! Time-partitioned object keys for persisted batches.
//!
//! Layout is append-only and scanned by external analytics tooling, so the
//! path shape is part of the storage contract:
//! `events/year=<Y>/month=<MM>/day=<DD>/hour=<HH>/events_<ns>.json`.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Datelike, Timelike, Utc};

// Last nanosecond value issued by this process. Coarse platform clocks can
// return the same wall reading twice; bumping past the previous value keeps
// sibling object names distinct without changing the layout.
static LAST_OBJECT_NANOS: AtomicI64 = AtomicI64::new(0);

/// Builds the storage key for a batch received at `received_at`.
pub(crate) fn partition_key(received_at: DateTime<Utc>) -> String {
    format!(
        "events/year={}/month={:02}/day={:02}/hour={:02}/events_{}.json",
        received_at.year(),
        received_at.month(),
        received_at.day(),
        received_at.hour(),
        unique_object_nanos(received_at)
    )
}

fn unique_object_nanos(received_at: DateTime<Utc>) -> i64 {
    let wall = received_at
        .timestamp_nanos_opt()
        .unwrap_or_else(|| received_at.timestamp_micros().saturating_mul(1_000));

    let mut last = LAST_OBJECT_NANOS.load(Ordering::Relaxed);
    loop {
        let candidate = wall.max(last + 1);
        match LAST_OBJECT_NANOS.compare_exchange_weak(
            last,
            candidate,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => return candidate,
            Err(observed) => last = observed,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use chrono::TimeZone;

    use super::*;

    #[test]
    fn key_components_follow_the_documented_layout() {
        let received_at = Utc.with_ymd_and_hms(2024, 3, 7, 9, 5, 42).unwrap();
        let key = partition_key(received_at);

        assert!(key.starts_with("events/year=2024/month=03/day=07/hour=09/events_"));
        assert!(key.ends_with(".json"));
    }

    #[test]
    fn month_day_and_hour_are_zero_padded() {
        let received_at = Utc.with_ymd_and_hms(2025, 12, 31, 23, 0, 0).unwrap();
        let key = partition_key(received_at);
        assert!(key.starts_with("events/year=2025/month=12/day=31/hour=23/events_"));
    }

    #[test]
    fn filename_component_is_a_nanosecond_integer() {
        let key = partition_key(Utc::now());
        let nanos = key
            .rsplit("events_")
            .next()
            .and_then(|tail| tail.strip_suffix(".json"))
            .unwrap();
        assert!(nanos.parse::<i64>().is_ok());
    }

    #[test]
    fn repeated_wall_clock_readings_still_get_distinct_keys() {
        let received_at = Utc.with_ymd_and_hms(2024, 3, 7, 9, 5, 42).unwrap();
        assert_ne!(partition_key(received_at), partition_key(received_at));
    }

    #[test]
    fn issued_nanos_are_strictly_increasing_within_the_process() {
        let mut issued = Vec::new();
        for _ in 0..100 {
            issued.push(unique_object_nanos(Utc::now()));
        }

        let unique: HashSet<i64> = issued.iter().copied().collect();
        assert_eq!(unique.len(), issued.len());
        for pair in issued.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }
}
