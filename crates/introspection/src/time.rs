//! Time conversion and display helpers

use std::fmt::Display;

use chrono::{DateTime, TimeDelta, TimeZone, Utc};

/// Convert integer milliseconds since the epoch
pub fn from_millis(millis: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
}

/// Clamp negative durations (clock skew) to zero
pub fn non_negative(delta: TimeDelta) -> TimeDelta {
    delta.max(TimeDelta::zero())
}

/// Wall-clock time of day with milliseconds: `HH:MM:SS.mmm`
pub fn format_abs_time<Tz>(when: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    when.format("%H:%M:%S%.3f").to_string()
}

/// Compact elapsed time: `S.mmm`, `M:SS.mmm` or `H:MM:SS.mmm`
///
/// Negative durations render as zero.
pub fn format_rel_time(delta: TimeDelta) -> String {
    let total_ms = non_negative(delta).num_milliseconds();
    let hours = total_ms / 3_600_000;
    let minutes = total_ms % 3_600_000 / 60_000;
    let seconds = total_ms % 60_000 / 1000;
    let millis = total_ms % 1000;

    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}.{millis:03}")
    } else if minutes > 0 {
        format!("{minutes}:{seconds:02}.{millis:03}")
    } else {
        format!("{seconds}.{millis:03}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rel_time_shapes() {
        assert_eq!(format_rel_time(TimeDelta::milliseconds(5)), "0.005");
        assert_eq!(format_rel_time(TimeDelta::milliseconds(12_345)), "12.345");
        assert_eq!(format_rel_time(TimeDelta::milliseconds(61_002)), "1:01.002");
        assert_eq!(format_rel_time(TimeDelta::milliseconds(3_723_004)), "1:02:03.004");
    }

    #[test]
    fn test_rel_time_clamps_negative() {
        assert_eq!(format_rel_time(TimeDelta::milliseconds(-250)), "0.000");
    }

    #[test]
    fn test_abs_time() {
        let when = Utc.with_ymd_and_hms(2024, 3, 1, 13, 4, 5).unwrap() + TimeDelta::milliseconds(7);
        assert_eq!(format_abs_time(&when), "13:04:05.007");
    }

    #[test]
    fn test_from_millis() {
        let when = from_millis(1_700_000_000_123).unwrap();
        assert_eq!(when.timestamp_millis(), 1_700_000_000_123);
    }
}
