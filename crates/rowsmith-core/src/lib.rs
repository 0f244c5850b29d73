//! Core contracts and value-set algebra for Rowsmith.
//!
//! This crate defines fields, concrete values, the restriction algebra
//! (field specs and their merge rules), atomic constraints, cross-field
//! relations, and the immutable decision tree walked by the generator.

pub mod constraints;
pub mod defaults;
pub mod error;
pub mod fields;
pub mod fieldspec;
pub mod granularity;
pub mod relations;
pub mod tree;
pub mod values;
pub mod whitelist;

pub use constraints::{AtomicConstraint, AtomicKind, Constraint, desugar_conditional};
pub use defaults::LinearDefaults;
pub use error::{Error, Result};
pub use fields::{Field, FieldType, Fields};
pub use fieldspec::{
    DateTimeRange, FieldSpec, LengthRange, Limit, NumericRange, PatternMode, TextPattern,
};
pub use granularity::{NumericGranularity, TimeUnit};
pub use relations::{FieldRelation, OffsetUnit, RelationKind};
pub use tree::{ConstraintNode, ConstraintNodeId, DecisionNode, DecisionNodeId, DecisionTree, TreeBuilder};
pub use values::DataValue;
pub use whitelist::{WeightedElement, WeightedSet};

/// Current profile contract version accepted by the reader.
pub const PROFILE_VERSION: &str = "0.1";
