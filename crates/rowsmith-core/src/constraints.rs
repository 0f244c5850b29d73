//! Atomic constraints and the logical tree combining them.
//!
//! Every atomic converts to a [`FieldSpec`] through `to_field_spec`, and
//! most negate into a dual atomic. Negation of a grammar node pushes
//! inward with De Morgan's laws, so specs themselves never need linear
//! complements.

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::defaults::LinearDefaults;
use crate::error::{Error, Result};
use crate::fields::{Field, FieldType};
use crate::fieldspec::{DateTimeRange, FieldSpec, LengthRange, Limit, NumericRange, TextPattern};
use crate::granularity::{NumericGranularity, TimeUnit};
use crate::relations::FieldRelation;
use crate::values::DataValue;
use crate::whitelist::WeightedSet;

/// The restriction an atomic constraint places on its field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AtomicKind {
    IsNull,
    NotNull,
    EqualTo(DataValue),
    NotEqualTo(DataValue),
    InSet(WeightedSet),
    NotInSet(Vec<DataValue>),
    GreaterThan(f64),
    GreaterThanOrEqualTo(f64),
    LessThan(f64),
    LessThanOrEqualTo(f64),
    After(NaiveDateTime),
    AfterOrAt(NaiveDateTime),
    Before(NaiveDateTime),
    BeforeOrAt(NaiveDateTime),
    LongerThan(u32),
    ShorterThan(u32),
    OfLength(u32),
    MatchesRegex(String),
    ContainsRegex(String),
    GranularToNumeric(NumericGranularity),
    GranularToDate(TimeUnit),
    OfType(FieldType),
}

/// One atomic constraint bound to a declared field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtomicConstraint {
    pub field: Field,
    pub kind: AtomicKind,
}

impl AtomicConstraint {
    pub fn new(field: Field, kind: AtomicKind) -> Self {
        AtomicConstraint { field, kind }
    }

    /// Converts the atomic into the spec of values satisfying it, filling
    /// open range sides from the configured defaults.
    pub fn to_field_spec(&self, defaults: &LinearDefaults) -> FieldSpec {
        match &self.kind {
            AtomicKind::IsNull => FieldSpec::null_only(),
            AtomicKind::NotNull => FieldSpec::not_null(),
            AtomicKind::EqualTo(value) => {
                FieldSpec::whitelist(WeightedSet::uniform([value.clone()]))
            }
            AtomicKind::NotEqualTo(value) => FieldSpec::Any {
                nullable: true,
                blacklist: vec![value.clone()],
            },
            AtomicKind::InSet(set) => FieldSpec::whitelist(set.clone()),
            AtomicKind::NotInSet(values) => FieldSpec::Any {
                nullable: true,
                blacklist: values.clone(),
            },
            AtomicKind::GreaterThan(bound) => FieldSpec::numeric(NumericRange::new(
                Limit::exclusive(*bound),
                Limit::inclusive(defaults.numeric_max),
                defaults.numeric_granularity,
            )),
            AtomicKind::GreaterThanOrEqualTo(bound) => FieldSpec::numeric(NumericRange::new(
                Limit::inclusive(*bound),
                Limit::inclusive(defaults.numeric_max),
                defaults.numeric_granularity,
            )),
            AtomicKind::LessThan(bound) => FieldSpec::numeric(NumericRange::new(
                Limit::inclusive(defaults.numeric_min),
                Limit::exclusive(*bound),
                defaults.numeric_granularity,
            )),
            AtomicKind::LessThanOrEqualTo(bound) => FieldSpec::numeric(NumericRange::new(
                Limit::inclusive(defaults.numeric_min),
                Limit::inclusive(*bound),
                defaults.numeric_granularity,
            )),
            AtomicKind::After(bound) => FieldSpec::datetime(DateTimeRange::new(
                Limit::exclusive(*bound),
                Limit::inclusive(defaults.datetime_max),
                defaults.datetime_granularity,
            )),
            AtomicKind::AfterOrAt(bound) => FieldSpec::datetime(DateTimeRange::new(
                Limit::inclusive(*bound),
                Limit::inclusive(defaults.datetime_max),
                defaults.datetime_granularity,
            )),
            AtomicKind::Before(bound) => FieldSpec::datetime(DateTimeRange::new(
                Limit::inclusive(defaults.datetime_min),
                Limit::exclusive(*bound),
                defaults.datetime_granularity,
            )),
            AtomicKind::BeforeOrAt(bound) => FieldSpec::datetime(DateTimeRange::new(
                Limit::inclusive(defaults.datetime_min),
                Limit::inclusive(*bound),
                defaults.datetime_granularity,
            )),
            AtomicKind::LongerThan(length) => FieldSpec::text(LengthRange::new(
                length.saturating_add(1),
                defaults.max_string_length,
            )),
            AtomicKind::ShorterThan(length) => {
                FieldSpec::text(LengthRange::new(0, length.saturating_sub(1)))
            }
            AtomicKind::OfLength(length) => FieldSpec::text(LengthRange::exactly(*length)),
            AtomicKind::MatchesRegex(pattern) => FieldSpec::text_with(
                LengthRange::new(0, defaults.max_string_length),
                vec![TextPattern::full(pattern.clone())],
            ),
            AtomicKind::ContainsRegex(pattern) => FieldSpec::text_with(
                LengthRange::new(0, defaults.max_string_length),
                vec![TextPattern::containing(pattern.clone())],
            ),
            AtomicKind::GranularToNumeric(granularity) => FieldSpec::numeric(NumericRange::new(
                Limit::inclusive(defaults.numeric_min),
                Limit::inclusive(defaults.numeric_max),
                *granularity,
            )),
            AtomicKind::GranularToDate(unit) => FieldSpec::datetime(DateTimeRange::new(
                Limit::inclusive(defaults.datetime_min),
                Limit::inclusive(defaults.datetime_max),
                *unit,
            )),
            AtomicKind::OfType(field_type) => {
                if self.field.field_type == *field_type {
                    FieldSpec::any()
                } else {
                    FieldSpec::contradiction()
                }
            }
        }
    }

    /// The dual atomic satisfied by exactly the values this one rejects.
    ///
    /// Exact-shape constraints such as lengths, patterns, granularities and
    /// type assertions have no dual and cannot be negated.
    pub fn negate(&self) -> Result<AtomicConstraint> {
        let kind = match &self.kind {
            AtomicKind::IsNull => AtomicKind::NotNull,
            AtomicKind::NotNull => AtomicKind::IsNull,
            AtomicKind::EqualTo(value) => AtomicKind::NotEqualTo(value.clone()),
            AtomicKind::NotEqualTo(value) => AtomicKind::EqualTo(value.clone()),
            AtomicKind::InSet(set) => AtomicKind::NotInSet(set.values().cloned().collect()),
            AtomicKind::NotInSet(values) => {
                AtomicKind::InSet(WeightedSet::uniform(values.iter().cloned()))
            }
            AtomicKind::GreaterThan(bound) => AtomicKind::LessThanOrEqualTo(*bound),
            AtomicKind::GreaterThanOrEqualTo(bound) => AtomicKind::LessThan(*bound),
            AtomicKind::LessThan(bound) => AtomicKind::GreaterThanOrEqualTo(*bound),
            AtomicKind::LessThanOrEqualTo(bound) => AtomicKind::GreaterThan(*bound),
            AtomicKind::After(bound) => AtomicKind::BeforeOrAt(*bound),
            AtomicKind::AfterOrAt(bound) => AtomicKind::Before(*bound),
            AtomicKind::Before(bound) => AtomicKind::AfterOrAt(*bound),
            AtomicKind::BeforeOrAt(bound) => AtomicKind::After(*bound),
            AtomicKind::LongerThan(length) => AtomicKind::ShorterThan(length.saturating_add(1)),
            AtomicKind::ShorterThan(length) => AtomicKind::LongerThan(length.saturating_sub(1)),
            AtomicKind::OfLength(_)
            | AtomicKind::MatchesRegex(_)
            | AtomicKind::ContainsRegex(_)
            | AtomicKind::GranularToNumeric(_)
            | AtomicKind::GranularToDate(_)
            | AtomicKind::OfType(_) => {
                return Err(Error::Unsupported(format!("cannot negate `{self}`")));
            }
        };
        Ok(AtomicConstraint {
            field: self.field.clone(),
            kind,
        })
    }
}

fn preview(values: &mut dyn Iterator<Item = &DataValue>, total: usize) -> String {
    let mut parts: Vec<String> = values.take(5).map(|value| value.to_string()).collect();
    if total > 5 {
        parts.push(format!("... {} more", total - 5));
    }
    parts.join(", ")
}

impl fmt::Display for AtomicConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = &self.field.name;
        match &self.kind {
            AtomicKind::IsNull => write!(f, "`{name}` is null"),
            AtomicKind::NotNull => write!(f, "`{name}` is not null"),
            AtomicKind::EqualTo(value) => write!(f, "`{name}` = {value}"),
            AtomicKind::NotEqualTo(value) => write!(f, "`{name}` != {value}"),
            AtomicKind::InSet(set) => {
                write!(f, "`{name}` in {{{}}}", preview(&mut set.values(), set.len()))
            }
            AtomicKind::NotInSet(values) => write!(
                f,
                "`{name}` not in {{{}}}",
                preview(&mut values.iter(), values.len())
            ),
            AtomicKind::GreaterThan(bound) => write!(f, "`{name}` > {bound}"),
            AtomicKind::GreaterThanOrEqualTo(bound) => write!(f, "`{name}` >= {bound}"),
            AtomicKind::LessThan(bound) => write!(f, "`{name}` < {bound}"),
            AtomicKind::LessThanOrEqualTo(bound) => write!(f, "`{name}` <= {bound}"),
            AtomicKind::After(bound) => write!(f, "`{name}` > {bound}"),
            AtomicKind::AfterOrAt(bound) => write!(f, "`{name}` >= {bound}"),
            AtomicKind::Before(bound) => write!(f, "`{name}` < {bound}"),
            AtomicKind::BeforeOrAt(bound) => write!(f, "`{name}` <= {bound}"),
            AtomicKind::LongerThan(length) => write!(f, "`{name}` length > {length}"),
            AtomicKind::ShorterThan(length) => write!(f, "`{name}` length < {length}"),
            AtomicKind::OfLength(length) => write!(f, "`{name}` length = {length}"),
            AtomicKind::MatchesRegex(pattern) => write!(f, "`{name}` matches /{pattern}/"),
            AtomicKind::ContainsRegex(pattern) => write!(f, "`{name}` contains /{pattern}/"),
            AtomicKind::GranularToNumeric(granularity) => {
                write!(f, "`{name}` granular to {granularity}")
            }
            AtomicKind::GranularToDate(unit) => write!(f, "`{name}` granular to {unit}"),
            AtomicKind::OfType(field_type) => write!(f, "`{name}` of type {field_type}"),
        }
    }
}

/// A node of the profile's constraint grammar.
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    Atomic(AtomicConstraint),
    Relation(FieldRelation),
    And(Vec<Constraint>),
    Or(Vec<Constraint>),
    Not(Box<Constraint>),
    If {
        when: Box<Constraint>,
        then: Box<Constraint>,
        otherwise: Option<Box<Constraint>>,
    },
}

impl Constraint {
    pub fn atomic(field: Field, kind: AtomicKind) -> Self {
        Constraint::Atomic(AtomicConstraint::new(field, kind))
    }

    pub fn and(children: Vec<Constraint>) -> Self {
        Constraint::And(children)
    }

    pub fn or(children: Vec<Constraint>) -> Self {
        Constraint::Or(children)
    }

    pub fn not(inner: Constraint) -> Self {
        Constraint::Not(Box::new(inner))
    }

    pub fn if_then(when: Constraint, then: Constraint, otherwise: Option<Constraint>) -> Self {
        Constraint::If {
            when: Box::new(when),
            then: Box::new(then),
            otherwise: otherwise.map(Box::new),
        }
    }

    /// Logical complement, pushed down to the atomics.
    ///
    /// Fails when an atom under the negation has no dual, or when a
    /// relation is negated.
    pub fn negate(&self) -> Result<Constraint> {
        match self {
            Constraint::Atomic(atomic) => Ok(Constraint::Atomic(atomic.negate()?)),
            Constraint::Relation(relation) => Err(Error::Unsupported(format!(
                "cannot negate relation `{relation}`"
            ))),
            Constraint::And(children) => Ok(Constraint::Or(
                children
                    .iter()
                    .map(Constraint::negate)
                    .collect::<Result<Vec<_>>>()?,
            )),
            Constraint::Or(children) => Ok(Constraint::And(
                children
                    .iter()
                    .map(Constraint::negate)
                    .collect::<Result<Vec<_>>>()?,
            )),
            Constraint::Not(inner) => Ok((**inner).clone()),
            Constraint::If {
                when,
                then,
                otherwise,
            } => desugar_conditional(when, then, otherwise.as_deref())?.negate(),
        }
    }
}

/// Rewrites `if A then B else C` into `(A and B) or (not A and C)`; with no
/// else branch the alternative is just `not A`.
pub fn desugar_conditional(
    when: &Constraint,
    then: &Constraint,
    otherwise: Option<&Constraint>,
) -> Result<Constraint> {
    let negated_when = when.negate()?;
    let fulfilled = Constraint::And(vec![when.clone(), then.clone()]);
    let bypassed = match otherwise {
        Some(otherwise) => Constraint::And(vec![negated_when, otherwise.clone()]),
        None => negated_when,
    };
    Ok(Constraint::Or(vec![fulfilled, bypassed]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fieldspec::FieldSpec;

    fn numeric_field() -> Field {
        Field::new("age", FieldType::Numeric)
    }

    fn text_field() -> Field {
        Field::new("name", FieldType::Text)
    }

    #[test]
    fn greater_than_normalizes_to_an_inclusive_stepped_minimum() {
        let defaults = LinearDefaults::default();
        let atomic = AtomicConstraint::new(numeric_field(), AtomicKind::GreaterThan(17.0));
        match atomic.to_field_spec(&defaults) {
            FieldSpec::Numeric { range, .. } => {
                assert_eq!(range.min, 18.0);
                assert_eq!(range.max, defaults.numeric_max);
            }
            other => panic!("expected numeric spec, got {other:?}"),
        }
    }

    #[test]
    fn comparison_negation_flips_to_the_dual_operator() {
        let atomic = AtomicConstraint::new(numeric_field(), AtomicKind::GreaterThan(5.0));
        let negated = atomic.negate().expect("negatable");
        assert_eq!(negated.kind, AtomicKind::LessThanOrEqualTo(5.0));
        let back = negated.negate().expect("negatable");
        assert_eq!(back.kind, AtomicKind::GreaterThan(5.0));
    }

    #[test]
    fn length_negation_shifts_the_boundary() {
        let atomic = AtomicConstraint::new(text_field(), AtomicKind::LongerThan(5));
        assert_eq!(
            atomic.negate().expect("negatable").kind,
            AtomicKind::ShorterThan(6)
        );
    }

    #[test]
    fn membership_negation_becomes_a_blacklist() {
        let set = WeightedSet::uniform(vec![DataValue::from("a"), DataValue::from("b")]);
        let atomic = AtomicConstraint::new(text_field(), AtomicKind::InSet(set));
        match atomic.negate().expect("negatable").kind {
            AtomicKind::NotInSet(values) => assert_eq!(values.len(), 2),
            other => panic!("expected not-in-set, got {other:?}"),
        }
    }

    #[test]
    fn exact_shape_atomics_refuse_negation() {
        let atomic = AtomicConstraint::new(text_field(), AtomicKind::OfLength(4));
        assert!(atomic.negate().is_err());
        let atomic = AtomicConstraint::new(text_field(), AtomicKind::MatchesRegex("a+".into()));
        assert!(atomic.negate().is_err());
    }

    #[test]
    fn of_type_mismatch_contradicts() {
        let defaults = LinearDefaults::default();
        let matching = AtomicConstraint::new(numeric_field(), AtomicKind::OfType(FieldType::Numeric));
        assert_eq!(matching.to_field_spec(&defaults), FieldSpec::any());
        let clashing = AtomicConstraint::new(numeric_field(), AtomicKind::OfType(FieldType::Text));
        assert!(clashing.to_field_spec(&defaults).is_contradiction());
    }

    #[test]
    fn de_morgan_flips_grammar_nodes() {
        let a = Constraint::atomic(numeric_field(), AtomicKind::GreaterThan(1.0));
        let b = Constraint::atomic(numeric_field(), AtomicKind::LessThan(10.0));
        let negated = Constraint::and(vec![a, b]).negate().expect("negatable");
        match negated {
            Constraint::Or(children) => {
                assert_eq!(children.len(), 2);
                match &children[0] {
                    Constraint::Atomic(atomic) => {
                        assert_eq!(atomic.kind, AtomicKind::LessThanOrEqualTo(1.0));
                    }
                    other => panic!("expected atomic, got {other:?}"),
                }
            }
            other => panic!("expected or, got {other:?}"),
        }
    }

    #[test]
    fn double_negation_restores_the_inner_constraint() {
        let inner = Constraint::atomic(numeric_field(), AtomicKind::GreaterThan(3.0));
        let doubled = Constraint::not(inner.clone()).negate().expect("negatable");
        assert_eq!(doubled, inner);
    }

    #[test]
    fn conditional_desugars_to_covering_disjunction() {
        let when = Constraint::atomic(numeric_field(), AtomicKind::GreaterThan(18.0));
        let then = Constraint::atomic(text_field(), AtomicKind::EqualTo(DataValue::from("adult")));
        let otherwise =
            Constraint::atomic(text_field(), AtomicKind::EqualTo(DataValue::from("minor")));

        let desugared =
            desugar_conditional(&when, &then, Some(&otherwise)).expect("desugarable");
        match desugared {
            Constraint::Or(branches) => {
                assert_eq!(branches.len(), 2);
                assert!(matches!(&branches[0], Constraint::And(pair) if pair.len() == 2));
                assert!(matches!(&branches[1], Constraint::And(pair) if pair.len() == 2));
            }
            other => panic!("expected or, got {other:?}"),
        }

        let without_else = desugar_conditional(&when, &then, None).expect("desugarable");
        match without_else {
            Constraint::Or(branches) => {
                assert_eq!(branches.len(), 2);
                assert!(matches!(&branches[1], Constraint::Atomic(_)));
            }
            other => panic!("expected or, got {other:?}"),
        }
    }
}
