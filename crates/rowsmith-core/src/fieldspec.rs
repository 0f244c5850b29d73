//! Field specs: the set of values still permitted for one field.
//!
//! A `FieldSpec` is the value-set algebra everything else is built on.
//! Atomic constraints convert to specs, conjunction intersects them, and
//! negation computes complements where the shape allows it. Merging is
//! total: an impossible combination collapses to `Contradiction` instead of
//! failing.

use chrono::NaiveDateTime;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::granularity::{NumericGranularity, TimeUnit};
use crate::values::DataValue;
use crate::whitelist::WeightedSet;

/// One endpoint of a linear restriction before normalization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Limit<T> {
    pub value: T,
    pub inclusive: bool,
}

impl<T> Limit<T> {
    pub fn inclusive(value: T) -> Self {
        Limit {
            value,
            inclusive: true,
        }
    }

    pub fn exclusive(value: T) -> Self {
        Limit {
            value,
            inclusive: false,
        }
    }
}

/// Inclusive numeric range with bounds aligned to its granularity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NumericRange {
    pub min: f64,
    pub max: f64,
    pub granularity: NumericGranularity,
}

impl NumericRange {
    /// Normalizes both endpoints onto the granularity grid: exclusive
    /// aligned bounds step inward one unit, unaligned bounds snap inward.
    pub fn new(min: Limit<f64>, max: Limit<f64>, granularity: NumericGranularity) -> Self {
        let min_value = if granularity.is_aligned(min.value) {
            if min.inclusive {
                granularity.trim(min.value)
            } else {
                granularity.next(min.value)
            }
        } else {
            granularity.trim_up(min.value)
        };
        let max_value = if granularity.is_aligned(max.value) {
            if max.inclusive {
                granularity.trim(max.value)
            } else {
                granularity.previous(max.value)
            }
        } else {
            granularity.trim(max.value)
        };
        NumericRange {
            min: min_value,
            max: max_value,
            granularity,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min > self.max
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max && self.granularity.is_aligned(value)
    }

    /// Tightest bounds of both ranges on the finer grid, or `None` when the
    /// ranges no longer overlap.
    pub fn intersect(&self, other: &NumericRange) -> Option<NumericRange> {
        // a bound aligned on the coarser grid is aligned on the finer one,
        // so no re-trimming is needed
        let merged = NumericRange {
            min: self.min.max(other.min),
            max: self.max.min(other.max),
            granularity: self.granularity.merge(&other.granularity),
        };
        if merged.is_empty() { None } else { Some(merged) }
    }
}

/// Inclusive datetime range with bounds aligned to its unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DateTimeRange {
    pub min: NaiveDateTime,
    pub max: NaiveDateTime,
    pub granularity: TimeUnit,
}

impl DateTimeRange {
    pub fn new(
        min: Limit<NaiveDateTime>,
        max: Limit<NaiveDateTime>,
        granularity: TimeUnit,
    ) -> Self {
        let min_value = if granularity.is_aligned(min.value) {
            if min.inclusive {
                min.value
            } else {
                granularity.step_by(min.value, 1)
            }
        } else {
            granularity.next(min.value)
        };
        let max_value = if granularity.is_aligned(max.value) {
            if max.inclusive {
                max.value
            } else {
                granularity.step_by(max.value, -1)
            }
        } else {
            granularity.trim(max.value)
        };
        DateTimeRange {
            min: min_value,
            max: max_value,
            granularity,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min > self.max
    }

    pub fn contains(&self, value: NaiveDateTime) -> bool {
        value >= self.min && value <= self.max && self.granularity.is_aligned(value)
    }

    pub fn intersect(&self, other: &DateTimeRange) -> Option<DateTimeRange> {
        let merged = DateTimeRange {
            min: self.min.max(other.min),
            max: self.max.min(other.max),
            granularity: self.granularity.merge(&other.granularity),
        };
        if merged.is_empty() { None } else { Some(merged) }
    }
}

/// Inclusive string-length range; the length unit is always one character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LengthRange {
    pub min: u32,
    pub max: u32,
}

impl LengthRange {
    pub fn new(min: u32, max: u32) -> Self {
        LengthRange { min, max }
    }

    pub fn exactly(length: u32) -> Self {
        LengthRange {
            min: length,
            max: length,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min > self.max
    }

    pub fn contains(&self, length: u32) -> bool {
        length >= self.min && length <= self.max
    }

    pub fn intersect(&self, other: &LengthRange) -> Option<LengthRange> {
        let merged = LengthRange {
            min: self.min.max(other.min),
            max: self.max.min(other.max),
        };
        if merged.is_empty() { None } else { Some(merged) }
    }
}

/// How a regex pattern must match a candidate string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternMode {
    /// The whole string must match.
    Full,
    /// Some substring must match.
    Containing,
}

/// A regex obligation carried by a text restriction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextPattern {
    pub pattern: String,
    pub mode: PatternMode,
}

impl TextPattern {
    pub fn full(pattern: impl Into<String>) -> Self {
        TextPattern {
            pattern: pattern.into(),
            mode: PatternMode::Full,
        }
    }

    pub fn containing(pattern: impl Into<String>) -> Self {
        TextPattern {
            pattern: pattern.into(),
            mode: PatternMode::Containing,
        }
    }

    /// The pattern with anchoring applied for full-match mode.
    pub fn effective_pattern(&self) -> String {
        match self.mode {
            PatternMode::Full => format!("^(?:{})$", self.pattern),
            PatternMode::Containing => self.pattern.clone(),
        }
    }

    /// Whether `text` satisfies this obligation. Patterns are validated at
    /// profile read time; an uncompilable pattern rejects everything.
    pub fn matches(&self, text: &str) -> bool {
        Regex::new(&self.effective_pattern())
            .map(|re| re.is_match(text))
            .unwrap_or(false)
    }
}

/// The set of values still permitted for one field.
///
/// `nullable` on the non-terminal variants records whether the absent value
/// is also permitted; a present value is checked against the variant's own
/// restriction. `blacklist` holds individually excluded values from negated
/// equality and membership constraints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldSpec {
    /// Any type-valid value.
    Any {
        nullable: bool,
        blacklist: Vec<DataValue>,
    },
    /// A finite weighted set of candidate values.
    Whitelist { set: WeightedSet, nullable: bool },
    /// Aligned values inside an inclusive numeric range.
    Numeric {
        range: NumericRange,
        nullable: bool,
        blacklist: Vec<DataValue>,
    },
    /// Aligned instants inside an inclusive datetime range.
    DateTime {
        range: DateTimeRange,
        nullable: bool,
        blacklist: Vec<DataValue>,
    },
    /// Strings inside a length range satisfying every pattern.
    Text {
        lengths: LengthRange,
        patterns: Vec<TextPattern>,
        nullable: bool,
        blacklist: Vec<DataValue>,
    },
    /// Only the absent value.
    NullOnly,
    /// No value satisfies the accumulated constraints.
    Contradiction,
}

impl FieldSpec {
    /// Fully unconstrained: any value or null.
    pub fn any() -> Self {
        FieldSpec::Any {
            nullable: true,
            blacklist: Vec::new(),
        }
    }

    /// Any present value; null excluded.
    pub fn not_null() -> Self {
        FieldSpec::Any {
            nullable: false,
            blacklist: Vec::new(),
        }
    }

    pub fn null_only() -> Self {
        FieldSpec::NullOnly
    }

    pub fn contradiction() -> Self {
        FieldSpec::Contradiction
    }

    /// An empty set is already a contradiction.
    pub fn whitelist(set: WeightedSet) -> Self {
        seal_whitelist(set, true)
    }

    pub fn numeric(range: NumericRange) -> Self {
        if range.is_empty() {
            FieldSpec::Contradiction
        } else {
            FieldSpec::Numeric {
                range,
                nullable: true,
                blacklist: Vec::new(),
            }
        }
    }

    pub fn datetime(range: DateTimeRange) -> Self {
        if range.is_empty() {
            FieldSpec::Contradiction
        } else {
            FieldSpec::DateTime {
                range,
                nullable: true,
                blacklist: Vec::new(),
            }
        }
    }

    pub fn text(lengths: LengthRange) -> Self {
        FieldSpec::text_with(lengths, Vec::new())
    }

    pub fn text_with(lengths: LengthRange, patterns: Vec<TextPattern>) -> Self {
        if lengths.is_empty() {
            FieldSpec::Contradiction
        } else {
            FieldSpec::Text {
                lengths,
                patterns,
                nullable: true,
                blacklist: Vec::new(),
            }
        }
    }

    pub fn is_contradiction(&self) -> bool {
        matches!(self, FieldSpec::Contradiction)
    }

    pub fn is_null_only(&self) -> bool {
        matches!(self, FieldSpec::NullOnly)
    }

    /// Whether the absent value satisfies this spec.
    pub fn nullable(&self) -> bool {
        match self {
            FieldSpec::Any { nullable, .. }
            | FieldSpec::Whitelist { nullable, .. }
            | FieldSpec::Numeric { nullable, .. }
            | FieldSpec::DateTime { nullable, .. }
            | FieldSpec::Text { nullable, .. } => *nullable,
            FieldSpec::NullOnly => true,
            FieldSpec::Contradiction => false,
        }
    }

    /// Removes the absent value from the permitted set.
    pub fn with_not_null(self) -> FieldSpec {
        match self {
            FieldSpec::Any { blacklist, .. } => FieldSpec::Any {
                nullable: false,
                blacklist,
            },
            FieldSpec::Whitelist { set, .. } => FieldSpec::Whitelist {
                set,
                nullable: false,
            },
            FieldSpec::Numeric { range, blacklist, .. } => FieldSpec::Numeric {
                range,
                nullable: false,
                blacklist,
            },
            FieldSpec::DateTime { range, blacklist, .. } => FieldSpec::DateTime {
                range,
                nullable: false,
                blacklist,
            },
            FieldSpec::Text {
                lengths,
                patterns,
                blacklist,
                ..
            } => FieldSpec::Text {
                lengths,
                patterns,
                nullable: false,
                blacklist,
            },
            FieldSpec::NullOnly => FieldSpec::Contradiction,
            FieldSpec::Contradiction => FieldSpec::Contradiction,
        }
    }

    /// Whether a present value satisfies this spec, ignoring nullability.
    pub fn permits(&self, value: &DataValue) -> bool {
        match self {
            FieldSpec::Any { blacklist, .. } => !blacklist.contains(value),
            FieldSpec::Whitelist { set, .. } => set.contains(value),
            FieldSpec::Numeric { range, blacklist, .. } => {
                value.as_number().is_some_and(|number| range.contains(number))
                    && !blacklist.contains(value)
            }
            FieldSpec::DateTime { range, blacklist, .. } => {
                value
                    .as_datetime()
                    .is_some_and(|datetime| range.contains(datetime))
                    && !blacklist.contains(value)
            }
            FieldSpec::Text {
                lengths,
                patterns,
                blacklist,
                ..
            } => {
                value.as_text().is_some_and(|text| {
                    lengths.contains(text.chars().count() as u32)
                        && patterns.iter().all(|pattern| pattern.matches(text))
                }) && !blacklist.contains(value)
            }
            FieldSpec::NullOnly | FieldSpec::Contradiction => false,
        }
    }

    /// Intersects two specs into the spec permitting exactly the values
    /// both permit. Total and commutative up to whitelist weights, which
    /// are kept from the left operand.
    pub fn intersect(&self, other: &FieldSpec) -> FieldSpec {
        use FieldSpec::*;
        match (self, other) {
            (Contradiction, _) | (_, Contradiction) => Contradiction,
            (NullOnly, NullOnly) => NullOnly,
            (NullOnly, spec) | (spec, NullOnly) => {
                if spec.nullable() {
                    NullOnly
                } else {
                    Contradiction
                }
            }
            (Any { nullable, blacklist }, spec) | (spec, Any { nullable, blacklist }) => {
                restrict(spec.clone(), *nullable, blacklist)
            }
            (
                Whitelist {
                    set: left,
                    nullable: left_nullable,
                },
                Whitelist {
                    set: right,
                    nullable: right_nullable,
                },
            ) => seal_whitelist(left.intersect(right), *left_nullable && *right_nullable),
            (Whitelist { set, nullable }, spec) | (spec, Whitelist { set, nullable }) => {
                seal_whitelist(
                    set.filter(|value| spec.permits(value)),
                    *nullable && spec.nullable(),
                )
            }
            (
                Numeric {
                    range: left,
                    nullable: left_nullable,
                    blacklist: left_blacklist,
                },
                Numeric {
                    range: right,
                    nullable: right_nullable,
                    blacklist: right_blacklist,
                },
            ) => match left.intersect(right) {
                Some(range) => FieldSpec::Numeric {
                    range,
                    nullable: *left_nullable && *right_nullable,
                    blacklist: merge_blacklists(left_blacklist.clone(), right_blacklist),
                },
                None => Contradiction,
            },
            (
                DateTime {
                    range: left,
                    nullable: left_nullable,
                    blacklist: left_blacklist,
                },
                DateTime {
                    range: right,
                    nullable: right_nullable,
                    blacklist: right_blacklist,
                },
            ) => match left.intersect(right) {
                Some(range) => FieldSpec::DateTime {
                    range,
                    nullable: *left_nullable && *right_nullable,
                    blacklist: merge_blacklists(left_blacklist.clone(), right_blacklist),
                },
                None => Contradiction,
            },
            (
                Text {
                    lengths: left_lengths,
                    patterns: left_patterns,
                    nullable: left_nullable,
                    blacklist: left_blacklist,
                },
                Text {
                    lengths: right_lengths,
                    patterns: right_patterns,
                    nullable: right_nullable,
                    blacklist: right_blacklist,
                },
            ) => match left_lengths.intersect(right_lengths) {
                Some(lengths) => FieldSpec::Text {
                    lengths,
                    patterns: merge_patterns(left_patterns.clone(), right_patterns),
                    nullable: *left_nullable && *right_nullable,
                    blacklist: merge_blacklists(left_blacklist.clone(), right_blacklist),
                },
                None => Contradiction,
            },
            // typed restrictions of different kinds share no values
            _ => Contradiction,
        }
    }

    /// Complement of this spec, where the shape supports one.
    ///
    /// Linear restrictions have no closed complement in this algebra;
    /// negation is handled at the constraint level before specs are built,
    /// so reaching one here is unsupported.
    pub fn negate(&self) -> Result<FieldSpec> {
        match self {
            FieldSpec::Contradiction => Ok(FieldSpec::any()),
            FieldSpec::NullOnly => Ok(FieldSpec::not_null()),
            FieldSpec::Any { nullable, blacklist } => {
                if blacklist.is_empty() {
                    Ok(if *nullable {
                        FieldSpec::Contradiction
                    } else {
                        FieldSpec::NullOnly
                    })
                } else {
                    Ok(seal_whitelist(
                        WeightedSet::uniform(blacklist.iter().cloned()),
                        !*nullable,
                    ))
                }
            }
            FieldSpec::Whitelist { set, nullable } => Ok(FieldSpec::Any {
                nullable: !*nullable,
                blacklist: set.values().cloned().collect(),
            }),
            FieldSpec::Numeric { .. } => Err(Error::Unsupported(
                "cannot negate a numeric range restriction".into(),
            )),
            FieldSpec::DateTime { .. } => Err(Error::Unsupported(
                "cannot negate a datetime range restriction".into(),
            )),
            FieldSpec::Text { .. } => Err(Error::Unsupported(
                "cannot negate a text restriction".into(),
            )),
        }
    }
}

fn seal_whitelist(set: WeightedSet, nullable: bool) -> FieldSpec {
    if set.is_empty() {
        FieldSpec::Contradiction
    } else {
        FieldSpec::Whitelist { set, nullable }
    }
}

fn restrict(spec: FieldSpec, any_nullable: bool, extra: &[DataValue]) -> FieldSpec {
    match spec {
        FieldSpec::Any { nullable, blacklist } => FieldSpec::Any {
            nullable: nullable && any_nullable,
            blacklist: merge_blacklists(blacklist, extra),
        },
        FieldSpec::Whitelist { set, nullable } => seal_whitelist(
            set.filter(|value| !extra.contains(value)),
            nullable && any_nullable,
        ),
        FieldSpec::Numeric {
            range,
            nullable,
            blacklist,
        } => FieldSpec::Numeric {
            range,
            nullable: nullable && any_nullable,
            blacklist: merge_blacklists(blacklist, extra),
        },
        FieldSpec::DateTime {
            range,
            nullable,
            blacklist,
        } => FieldSpec::DateTime {
            range,
            nullable: nullable && any_nullable,
            blacklist: merge_blacklists(blacklist, extra),
        },
        FieldSpec::Text {
            lengths,
            patterns,
            nullable,
            blacklist,
        } => FieldSpec::Text {
            lengths,
            patterns,
            nullable: nullable && any_nullable,
            blacklist: merge_blacklists(blacklist, extra),
        },
        FieldSpec::NullOnly => {
            if any_nullable {
                FieldSpec::NullOnly
            } else {
                FieldSpec::Contradiction
            }
        }
        FieldSpec::Contradiction => FieldSpec::Contradiction,
    }
}

fn merge_blacklists(mut base: Vec<DataValue>, extra: &[DataValue]) -> Vec<DataValue> {
    for value in extra {
        if !base.contains(value) {
            base.push(value.clone());
        }
    }
    base
}

fn merge_patterns(mut base: Vec<TextPattern>, extra: &[TextPattern]) -> Vec<TextPattern> {
    for pattern in extra {
        if !base.contains(pattern) {
            base.push(pattern.clone());
        }
    }
    base
}
