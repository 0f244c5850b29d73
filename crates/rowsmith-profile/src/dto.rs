//! Wire types for `profile.json` documents.
//!
//! These DTOs mirror the authored JSON shape; lowering into core
//! constraints happens in [`crate::reader`] after validation.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Top-level profile document.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ProfileDto {
    /// Contract version for the profile format.
    pub profile_version: String,
    /// Declared fields, in output column order.
    pub fields: Vec<FieldDto>,
    /// Top-level constraints, combined conjunctively.
    #[serde(default)]
    pub constraints: Vec<ConstraintDto>,
}

/// One declared field.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FieldDto {
    /// Unique field name.
    pub name: String,
    /// Semantic type: text, numeric, integer or datetime.
    #[serde(rename = "type")]
    pub field_type: String,
    /// Whether null values may be emitted for this field.
    #[serde(default = "default_true")]
    pub nullable: bool,
    /// Optional formatting pattern applied when rendering values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatting: Option<String>,
}

fn default_true() -> bool {
    true
}

/// Constraint union: logical combinators or a single atomic clause.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum ConstraintDto {
    /// Negation of the inner constraint.
    Not { not: Box<ConstraintDto> },
    /// Conjunction of all inner constraints.
    AllOf {
        #[serde(rename = "allOf")]
        all_of: Vec<ConstraintDto>,
    },
    /// Disjunction of the inner constraints.
    AnyOf {
        #[serde(rename = "anyOf")]
        any_of: Vec<ConstraintDto>,
    },
    /// Conditional: when `if` holds, `then` must hold; otherwise `else`.
    If {
        #[serde(rename = "if")]
        when: Box<ConstraintDto>,
        then: Box<ConstraintDto>,
        #[serde(
            rename = "else",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        otherwise: Option<Box<ConstraintDto>>,
    },
    /// A single field-scoped clause.
    Atomic(AtomicDto),
}

/// One atomic clause: `{ "field": ..., "is": ..., ...operand }`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AtomicDto {
    /// Name of the constrained field.
    pub field: String,
    /// Operator name, ex.: greaterThan, inSet, matchingRegex.
    pub is: String,
    /// Scalar operand for comparison and equality operators.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
    /// Set operand for inSet; entries are scalars or weighted objects.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<SetEntryDto>>,
    /// Path operand for fromFile, relative to the profile's directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// Other-field operand turning the clause into a cross-field relation.
    #[serde(
        rename = "otherField",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub other_field: Option<String>,
    /// Offset applied to a cross-field relation, in offsetUnit steps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
    /// Step unit for the relation offset, ex.: days or 0.1.
    #[serde(
        rename = "offsetUnit",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub offset_unit: Option<String>,
}

/// Entry of an inSet operand.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum SetEntryDto {
    /// Explicitly weighted value.
    Weighted {
        value: serde_json::Value,
        weight: f64,
    },
    /// Bare value with uniform weight.
    Plain(serde_json::Value),
}

impl SetEntryDto {
    pub fn value(&self) -> &serde_json::Value {
        match self {
            SetEntryDto::Weighted { value, .. } => value,
            SetEntryDto::Plain(value) => value,
        }
    }

    pub fn weight(&self) -> f64 {
        match self {
            SetEntryDto::Weighted { weight, .. } => *weight,
            SetEntryDto::Plain(_) => 1.0,
        }
    }
}
