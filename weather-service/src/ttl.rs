//! Cache expiry aligned to calendar boundaries in UTC.

use chrono::{DateTime, Utc};
use common::models::WeatherKind;

const MILLIS_PER_HOUR: i64 = 3_600_000;
const MILLIS_PER_DAY: i64 = 86_400_000;

/// Seconds from now until the start of the next UTC hour.
pub fn ttl_until_next_hour() -> u64 {
    ttl_until_next_hour_at(Utc::now())
}

pub fn ttl_until_next_hour_at(now: DateTime<Utc>) -> u64 {
    let into_hour = now.timestamp_millis().rem_euclid(MILLIS_PER_HOUR);
    let ttl = ((MILLIS_PER_HOUR - into_hour) / 1000) as u64;
    // A zero TTL is ambiguous for the store, so a full hour is used instead
    if ttl == 0 { 3600 } else { ttl }
}

/// Seconds from now until 23:59:59 UTC of the current day.
pub fn ttl_until_end_of_day() -> u64 {
    ttl_until_end_of_day_at(Utc::now())
}

pub fn ttl_until_end_of_day_at(now: DateTime<Utc>) -> u64 {
    let into_day = now.timestamp_millis().rem_euclid(MILLIS_PER_DAY);
    ((MILLIS_PER_DAY - 1 - into_day) / 1000) as u64
}

/// Expiry for a cache entry of the given kind written at `now`.
pub fn ttl_for(kind: WeatherKind, now: DateTime<Utc>) -> u64 {
    match kind {
        WeatherKind::Current => ttl_until_next_hour_at(now),
        WeatherKind::Forecast => ttl_until_end_of_day_at(now),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 12, 30, h, m, s).unwrap()
    }

    #[test]
    fn test_next_hour_on_the_hour() {
        assert_eq!(ttl_until_next_hour_at(at(10, 0, 0)), 3600);
    }

    #[test]
    fn test_next_hour_last_second() {
        assert_eq!(ttl_until_next_hour_at(at(10, 59, 59)), 1);
    }

    #[test]
    fn test_next_hour_sub_second_remainder_uses_full_hour() {
        let now = at(10, 59, 59) + chrono::Duration::milliseconds(500);
        assert_eq!(ttl_until_next_hour_at(now), 3600);
    }

    #[test]
    fn test_next_hour_midway() {
        assert_eq!(ttl_until_next_hour_at(at(14, 30, 0)), 1800);
    }

    #[test]
    fn test_end_of_day_last_minute() {
        assert_eq!(ttl_until_end_of_day_at(at(23, 59, 0)), 59);
    }

    #[test]
    fn test_end_of_day_from_midnight() {
        assert_eq!(ttl_until_end_of_day_at(at(0, 0, 0)), 86_399);
    }

    #[test]
    fn test_ttl_for_kind() {
        let now = at(12, 0, 0);
        assert_eq!(ttl_for(WeatherKind::Current, now), 3600);
        assert_eq!(ttl_for(WeatherKind::Forecast, now), 43_199);
    }
}
