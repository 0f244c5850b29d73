//! Cross-field relations deriving one field's restriction from another.
//!
//! A relation is directed: given the `other` field's resolved restriction
//! or sampled value, it produces a modifier restriction for `main` that is
//! then intersected into main's spec. Relations invert cleanly but refuse
//! negation, since "not within N units of X" has no single-restriction
//! representation in this algebra.

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::defaults::LinearDefaults;
use crate::error::{Error, Result};
use crate::fields::{Field, FieldType};
use crate::fieldspec::{DateTimeRange, FieldSpec, Limit, NumericRange};
use crate::granularity::{NumericGranularity, TimeUnit};
use crate::values::DataValue;
use crate::whitelist::WeightedSet;

/// Direction of an ordering relation between two fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationKind {
    Before,
    After,
    EqualTo,
}

/// Unit used to step a relation's offset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum OffsetUnit {
    Numeric(NumericGranularity),
    Time(TimeUnit),
}

impl fmt::Display for OffsetUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OffsetUnit::Numeric(granularity) if *granularity == NumericGranularity::WHOLE => {
                f.write_str("units")
            }
            OffsetUnit::Numeric(granularity) => write!(f, "units of {granularity}"),
            OffsetUnit::Time(unit) => f.write_str(unit.label()),
        }
    }
}

/// A directed cross-field rule between `main` and `other`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldRelation {
    main: Field,
    other: Field,
    kind: RelationKind,
    inclusive: bool,
    offset: i64,
    offset_unit: OffsetUnit,
}

impl FieldRelation {
    pub fn new(
        main: Field,
        other: Field,
        kind: RelationKind,
        inclusive: bool,
        offset: i64,
        offset_unit: OffsetUnit,
    ) -> Self {
        FieldRelation {
            main,
            other,
            kind,
            inclusive,
            offset,
            offset_unit,
        }
    }

    /// Equality relation: main mirrors other's restriction exactly.
    pub fn equal_to(main: Field, other: Field) -> Self {
        let offset_unit = match main.field_type {
            FieldType::DateTime => OffsetUnit::Time(TimeUnit::Millis),
            _ => OffsetUnit::Numeric(NumericGranularity::WHOLE),
        };
        FieldRelation {
            main,
            other,
            kind: RelationKind::EqualTo,
            inclusive: true,
            offset: 0,
            offset_unit,
        }
    }

    pub fn main(&self) -> &Field {
        &self.main
    }

    pub fn other(&self) -> &Field {
        &self.other
    }

    pub fn kind(&self) -> RelationKind {
        self.kind
    }

    pub fn inclusive(&self) -> bool {
        self.inclusive
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }

    pub fn offset_unit(&self) -> OffsetUnit {
        self.offset_unit
    }

    /// Swaps roles and negates the offset; an involution.
    pub fn inverse(&self) -> FieldRelation {
        let kind = match self.kind {
            RelationKind::Before => RelationKind::After,
            RelationKind::After => RelationKind::Before,
            RelationKind::EqualTo => RelationKind::EqualTo,
        };
        FieldRelation {
            main: self.other.clone(),
            other: self.main.clone(),
            kind,
            inclusive: self.inclusive,
            offset: -self.offset,
            offset_unit: self.offset_unit,
        }
    }

    /// Relations refuse negation in all cases.
    pub fn negate(&self) -> Result<FieldRelation> {
        Err(Error::Unsupported(format!("cannot negate relation `{self}`")))
    }

    /// Derives main's modifier restriction from other's resolved spec.
    pub fn modifier_from_spec(
        &self,
        other_spec: &FieldSpec,
        defaults: &LinearDefaults,
    ) -> Result<FieldSpec> {
        if self.kind == RelationKind::EqualTo {
            return Ok(other_spec.clone());
        }
        match other_spec {
            FieldSpec::NullOnly => Ok(FieldSpec::null_only()),
            FieldSpec::Contradiction => Ok(FieldSpec::contradiction()),
            FieldSpec::Whitelist { .. } => Err(Error::Unsupported(format!(
                "cannot combine a set restriction with ordering relation `{self}`"
            ))),
            FieldSpec::Any { .. } => self.from_default_bound(defaults),
            FieldSpec::Numeric { range, .. } => {
                let bound = match self.kind {
                    RelationKind::Before => range.max,
                    _ => range.min,
                };
                self.numeric_modifier(bound, defaults)
            }
            FieldSpec::DateTime { range, .. } => {
                let bound = match self.kind {
                    RelationKind::Before => range.max,
                    _ => range.min,
                };
                self.datetime_modifier(bound, defaults)
            }
            FieldSpec::Text { .. } => Err(Error::Unsupported(format!(
                "ordering relation `{self}` requires a numeric or datetime operand"
            ))),
        }
    }

    /// Derives main's modifier restriction from other's sampled value. An
    /// absent value imposes no ordering constraint.
    pub fn modifier_from_value(
        &self,
        other_value: Option<&DataValue>,
        defaults: &LinearDefaults,
    ) -> Result<FieldSpec> {
        let Some(value) = other_value else {
            return Ok(FieldSpec::any());
        };
        if self.kind == RelationKind::EqualTo {
            return Ok(FieldSpec::whitelist(WeightedSet::uniform([value.clone()])));
        }
        match value {
            DataValue::Number(number) => self.numeric_modifier(*number, defaults),
            DataValue::DateTime(datetime) => self.datetime_modifier(*datetime, defaults),
            DataValue::Text(_) => Err(Error::Unsupported(format!(
                "ordering relation `{self}` requires a numeric or datetime operand"
            ))),
        }
    }

    // offsetBound = step(bound, -offset) in the relation's own unit for
    // both directions; before bounds above, after bounds below
    fn numeric_modifier(&self, bound: f64, defaults: &LinearDefaults) -> Result<FieldSpec> {
        let OffsetUnit::Numeric(step_unit) = self.offset_unit else {
            return Err(Error::Unsupported(format!(
                "relation `{self}` steps in calendar units but its operand is numeric"
            )));
        };
        let offset_bound = Limit {
            value: step_unit.step_by(bound, -self.offset),
            inclusive: self.inclusive,
        };
        let range = match self.kind {
            RelationKind::Before => NumericRange::new(
                Limit::inclusive(defaults.numeric_min),
                offset_bound,
                defaults.numeric_granularity,
            ),
            _ => NumericRange::new(
                offset_bound,
                Limit::inclusive(defaults.numeric_max),
                defaults.numeric_granularity,
            ),
        };
        Ok(FieldSpec::numeric(range))
    }

    fn datetime_modifier(
        &self,
        bound: NaiveDateTime,
        defaults: &LinearDefaults,
    ) -> Result<FieldSpec> {
        let OffsetUnit::Time(step_unit) = self.offset_unit else {
            return Err(Error::Unsupported(format!(
                "relation `{self}` steps in numeric units but its operand is a datetime"
            )));
        };
        let offset_bound = Limit {
            value: step_unit.step_by(bound, -self.offset),
            inclusive: self.inclusive,
        };
        let range = match self.kind {
            RelationKind::Before => DateTimeRange::new(
                Limit::inclusive(defaults.datetime_min),
                offset_bound,
                defaults.datetime_granularity,
            ),
            _ => DateTimeRange::new(
                offset_bound,
                Limit::inclusive(defaults.datetime_max),
                defaults.datetime_granularity,
            ),
        };
        Ok(FieldSpec::datetime(range))
    }

    fn from_default_bound(&self, defaults: &LinearDefaults) -> Result<FieldSpec> {
        match self.main.field_type {
            FieldType::Numeric => {
                let bound = match self.kind {
                    RelationKind::Before => defaults.numeric_max,
                    _ => defaults.numeric_min,
                };
                self.numeric_modifier(bound, defaults)
            }
            FieldType::DateTime => {
                let bound = match self.kind {
                    RelationKind::Before => defaults.datetime_max,
                    _ => defaults.datetime_min,
                };
                self.datetime_modifier(bound, defaults)
            }
            FieldType::Text => Err(Error::Unsupported(format!(
                "ordering relation `{self}` requires a numeric or datetime field"
            ))),
        }
    }
}

impl fmt::Display for FieldRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self.kind {
            RelationKind::Before => "before",
            RelationKind::After => "after",
            RelationKind::EqualTo => "equal to",
        };
        write!(f, "`{}` is {verb} `{}`", self.main.name, self.other.name)?;
        if self.inclusive && self.kind != RelationKind::EqualTo {
            write!(f, " or at")?;
        }
        if self.offset != 0 {
            write!(f, " offset by {} {}", self.offset, self.offset_unit)?;
        }
        Ok(())
    }
}
