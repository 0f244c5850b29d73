//! Step units for numeric and datetime restrictions.
//!
//! A granularity defines the grid of emittable values: linear restrictions
//! keep their bounds aligned to it and samplers trim drawn values onto it.
//! Merging two granularities keeps the finer one.

use chrono::{Datelike, Duration, Months, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

/// Tolerance for float alignment checks after scaling.
const ALIGN_EPSILON: f64 = 1e-9;

/// Largest decimal-place count accepted from a profile literal.
pub const MAX_DECIMAL_PLACES: u32 = 20;

/// Numeric step size expressed as a count of decimal places.
///
/// Zero places steps in whole numbers, two places in hundredths. Profile
/// literals must be `1` or a negative power of ten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NumericGranularity(u32);

impl NumericGranularity {
    /// Whole-number steps.
    pub const WHOLE: NumericGranularity = NumericGranularity(0);

    pub fn new(decimal_places: u32) -> Self {
        NumericGranularity(decimal_places.min(MAX_DECIMAL_PLACES))
    }

    /// Parses a profile literal: `1` or a negative power of ten such as
    /// `0.01`. Anything else is rejected.
    pub fn parse(raw: f64) -> Option<Self> {
        if raw <= 0.0 {
            return None;
        }
        if (raw - 1.0).abs() < f64::EPSILON {
            return Some(NumericGranularity(0));
        }
        for places in 1..=MAX_DECIMAL_PLACES {
            let step = 10f64.powi(-(places as i32));
            if (raw - step).abs() <= step * ALIGN_EPSILON {
                return Some(NumericGranularity(places));
            }
        }
        None
    }

    pub fn decimal_places(&self) -> u32 {
        self.0
    }

    /// The distance between adjacent aligned values.
    pub fn step(&self) -> f64 {
        10f64.powi(-(self.0 as i32))
    }

    pub fn is_aligned(&self, value: f64) -> bool {
        let scaled = value * 10f64.powi(self.0 as i32);
        (scaled - scaled.round()).abs() < ALIGN_EPSILON
    }

    /// Largest aligned value less than or equal to `value`.
    pub fn trim(&self, value: f64) -> f64 {
        let factor = 10f64.powi(self.0 as i32);
        let scaled = value * factor;
        let snapped = scaled.round();
        if (scaled - snapped).abs() < ALIGN_EPSILON {
            snapped / factor
        } else {
            scaled.floor() / factor
        }
    }

    /// Smallest aligned value greater than or equal to `value`.
    pub fn trim_up(&self, value: f64) -> f64 {
        let factor = 10f64.powi(self.0 as i32);
        let scaled = value * factor;
        let snapped = scaled.round();
        if (scaled - snapped).abs() < ALIGN_EPSILON {
            snapped / factor
        } else {
            scaled.ceil() / factor
        }
    }

    /// Smallest aligned value strictly greater than `value`.
    pub fn next(&self, value: f64) -> f64 {
        if self.is_aligned(value) {
            self.trim(value) + self.step()
        } else {
            self.trim_up(value)
        }
    }

    /// Largest aligned value strictly less than `value`.
    pub fn previous(&self, value: f64) -> f64 {
        if self.is_aligned(value) {
            self.trim(value) - self.step()
        } else {
            self.trim(value)
        }
    }

    /// Moves `value` by a signed number of steps without re-aligning it.
    pub fn step_by(&self, value: f64, steps: i64) -> f64 {
        value + steps as f64 * self.step()
    }

    /// Keeps the finer of the two step sizes.
    pub fn merge(&self, other: &NumericGranularity) -> NumericGranularity {
        NumericGranularity(self.0.max(other.0))
    }
}

impl std::fmt::Display for NumericGranularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.step())
    }
}

/// Calendar step unit for datetime restrictions, finest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Millis,
    Seconds,
    Minutes,
    Hours,
    Days,
    Months,
    Years,
}

impl TimeUnit {
    /// Parses a profile unit name, case-insensitively.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "millis" => Some(TimeUnit::Millis),
            "seconds" => Some(TimeUnit::Seconds),
            "minutes" => Some(TimeUnit::Minutes),
            "hours" => Some(TimeUnit::Hours),
            "days" => Some(TimeUnit::Days),
            "months" => Some(TimeUnit::Months),
            "years" => Some(TimeUnit::Years),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TimeUnit::Millis => "millis",
            TimeUnit::Seconds => "seconds",
            TimeUnit::Minutes => "minutes",
            TimeUnit::Hours => "hours",
            TimeUnit::Days => "days",
            TimeUnit::Months => "months",
            TimeUnit::Years => "years",
        }
    }

    /// Largest unit-aligned instant less than or equal to `value`.
    pub fn trim(&self, value: NaiveDateTime) -> NaiveDateTime {
        let trimmed = match self {
            TimeUnit::Millis => {
                value.with_nanosecond(value.nanosecond() / 1_000_000 * 1_000_000)
            }
            TimeUnit::Seconds => value.with_nanosecond(0),
            TimeUnit::Minutes => value.with_nanosecond(0).and_then(|v| v.with_second(0)),
            TimeUnit::Hours => value
                .with_nanosecond(0)
                .and_then(|v| v.with_second(0))
                .and_then(|v| v.with_minute(0)),
            TimeUnit::Days => Some(NaiveDateTime::new(value.date(), NaiveTime::MIN)),
            TimeUnit::Months => value
                .date()
                .with_day(1)
                .map(|d| NaiveDateTime::new(d, NaiveTime::MIN)),
            TimeUnit::Years => value
                .date()
                .with_day(1)
                .and_then(|d| d.with_month(1))
                .map(|d| NaiveDateTime::new(d, NaiveTime::MIN)),
        };
        trimmed.unwrap_or(value)
    }

    pub fn is_aligned(&self, value: NaiveDateTime) -> bool {
        self.trim(value) == value
    }

    /// Moves `value` by a signed number of units, saturating at the
    /// representable datetime range.
    pub fn step_by(&self, value: NaiveDateTime, steps: i64) -> NaiveDateTime {
        let stepped = match self {
            TimeUnit::Millis => value.checked_add_signed(Duration::milliseconds(steps)),
            TimeUnit::Seconds => value.checked_add_signed(Duration::seconds(steps)),
            TimeUnit::Minutes => value.checked_add_signed(Duration::minutes(steps)),
            TimeUnit::Hours => value.checked_add_signed(Duration::hours(steps)),
            TimeUnit::Days => value.checked_add_signed(Duration::days(steps)),
            TimeUnit::Months => step_months(value, steps),
            TimeUnit::Years => step_months(value, steps.saturating_mul(12)),
        };
        stepped.unwrap_or(if steps < 0 {
            NaiveDateTime::MIN
        } else {
            NaiveDateTime::MAX
        })
    }

    /// Smallest aligned instant strictly after `value`.
    pub fn next(&self, value: NaiveDateTime) -> NaiveDateTime {
        self.step_by(self.trim(value), 1)
    }

    /// Largest aligned instant strictly before `value`.
    pub fn previous(&self, value: NaiveDateTime) -> NaiveDateTime {
        if self.is_aligned(value) {
            self.step_by(value, -1)
        } else {
            self.trim(value)
        }
    }

    /// Keeps the finer of the two units.
    pub fn merge(&self, other: &TimeUnit) -> TimeUnit {
        if self <= other { *self } else { *other }
    }
}

fn step_months(value: NaiveDateTime, steps: i64) -> Option<NaiveDateTime> {
    let magnitude = steps.unsigned_abs().min(u32::MAX as u64) as u32;
    if steps >= 0 {
        value.checked_add_months(Months::new(magnitude))
    } else {
        value.checked_sub_months(Months::new(magnitude))
    }
}

impl std::fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .expect("valid date")
            .and_hms_opt(h, mi, s)
            .expect("valid time")
    }

    #[test]
    fn parses_only_unit_and_negative_powers_of_ten() {
        assert_eq!(NumericGranularity::parse(1.0), Some(NumericGranularity::WHOLE));
        assert_eq!(NumericGranularity::parse(0.1), Some(NumericGranularity::new(1)));
        assert_eq!(NumericGranularity::parse(0.001), Some(NumericGranularity::new(3)));
        assert_eq!(NumericGranularity::parse(0.3), None);
        assert_eq!(NumericGranularity::parse(2.0), None);
        assert_eq!(NumericGranularity::parse(-0.1), None);
        assert_eq!(NumericGranularity::parse(0.0), None);
    }

    #[test]
    fn merging_numeric_granularities_keeps_the_finer_step() {
        let tenths = NumericGranularity::new(1);
        let hundredths = NumericGranularity::new(2);
        assert_eq!(tenths.merge(&hundredths), hundredths);
        assert_eq!(hundredths.merge(&tenths), hundredths);
    }

    #[test]
    fn numeric_stepping_respects_alignment() {
        let tenths = NumericGranularity::new(1);
        assert!(tenths.is_aligned(2.5));
        assert!(!tenths.is_aligned(2.55));
        assert_eq!(tenths.trim(2.55), 2.5);
        assert_eq!(tenths.trim_up(2.55), 2.6);
        assert_eq!(tenths.next(2.5), 2.6);
        assert_eq!(tenths.next(2.55), 2.6);
        assert_eq!(tenths.previous(2.5), 2.4);
        assert_eq!(tenths.previous(2.55), 2.5);
    }

    #[test]
    fn numeric_step_by_moves_without_realigning() {
        let whole = NumericGranularity::WHOLE;
        assert_eq!(whole.step_by(10.0, -3), 7.0);
        assert_eq!(whole.step_by(10.0, 0), 10.0);
        assert_eq!(whole.step_by(10.0, 2), 12.0);
    }

    #[test]
    fn parses_time_units_case_insensitively() {
        assert_eq!(TimeUnit::parse("DAYS"), Some(TimeUnit::Days));
        assert_eq!(TimeUnit::parse("millis"), Some(TimeUnit::Millis));
        assert_eq!(TimeUnit::parse("fortnights"), None);
    }

    #[test]
    fn merging_time_units_keeps_the_finer_unit() {
        assert_eq!(TimeUnit::Days.merge(&TimeUnit::Seconds), TimeUnit::Seconds);
        assert_eq!(TimeUnit::Millis.merge(&TimeUnit::Years), TimeUnit::Millis);
    }

    #[test]
    fn trims_to_calendar_boundaries() {
        let value = at(2024, 3, 15, 13, 45, 30);
        assert_eq!(TimeUnit::Days.trim(value), at(2024, 3, 15, 0, 0, 0));
        assert_eq!(TimeUnit::Months.trim(value), at(2024, 3, 1, 0, 0, 0));
        assert_eq!(TimeUnit::Years.trim(value), at(2024, 1, 1, 0, 0, 0));
        assert_eq!(TimeUnit::Hours.trim(value), at(2024, 3, 15, 13, 0, 0));
    }

    #[test]
    fn month_steps_clamp_to_shorter_months() {
        let end_of_january = at(2023, 1, 31, 0, 0, 0);
        assert_eq!(
            TimeUnit::Months.step_by(end_of_january, 1),
            at(2023, 2, 28, 0, 0, 0)
        );
        assert_eq!(
            TimeUnit::Years.step_by(at(2024, 2, 29, 0, 0, 0), 1),
            at(2025, 2, 28, 0, 0, 0)
        );
    }

    #[test]
    fn previous_of_aligned_value_steps_one_unit_back() {
        let midnight = at(2024, 3, 15, 0, 0, 0);
        assert_eq!(TimeUnit::Days.previous(midnight), at(2024, 3, 14, 0, 0, 0));
        let noon = at(2024, 3, 15, 12, 0, 0);
        assert_eq!(TimeUnit::Days.previous(noon), at(2024, 3, 15, 0, 0, 0));
    }
}
