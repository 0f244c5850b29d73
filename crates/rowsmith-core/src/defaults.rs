//! Fallback bounds and granularities applied when a profile leaves one
//! side of a linear restriction open.

use chrono::{NaiveDate, NaiveDateTime};

use crate::granularity::{NumericGranularity, TimeUnit};

/// Widest numeric magnitude the generator will emit.
pub const NUMERIC_MAX: f64 = 1e20;
pub const NUMERIC_MIN: f64 = -1e20;

/// Longest string the generator will emit when no length cap is given.
pub const MAX_STRING_LENGTH: u32 = 1000;

/// Earliest emittable instant: year 1, midnight.
pub fn datetime_min() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1, 1, 1)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .unwrap_or(NaiveDateTime::MIN)
}

/// Latest emittable instant: end of year 9999 at millisecond precision.
pub fn datetime_max() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(9999, 12, 31)
        .and_then(|date| date.and_hms_milli_opt(23, 59, 59, 999))
        .unwrap_or(NaiveDateTime::MAX)
}

/// Per-type fallbacks used to complete half-open restrictions.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearDefaults {
    pub numeric_min: f64,
    pub numeric_max: f64,
    pub numeric_granularity: NumericGranularity,
    pub datetime_min: NaiveDateTime,
    pub datetime_max: NaiveDateTime,
    pub datetime_granularity: TimeUnit,
    pub max_string_length: u32,
}

impl Default for LinearDefaults {
    fn default() -> Self {
        LinearDefaults {
            numeric_min: NUMERIC_MIN,
            numeric_max: NUMERIC_MAX,
            numeric_granularity: NumericGranularity::WHOLE,
            datetime_min: datetime_min(),
            datetime_max: datetime_max(),
            datetime_granularity: TimeUnit::Millis,
            max_string_length: MAX_STRING_LENGTH,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn datetime_bounds_span_years_one_through_9999() {
        let min = datetime_min();
        let max = datetime_max();
        assert_eq!(min.year(), 1);
        assert_eq!(max.year(), 9999);
        assert_eq!(max.month(), 12);
        assert_eq!(max.day(), 31);
        assert_eq!(max.nanosecond(), 999_000_000);
        assert!(min < max);
    }
}
