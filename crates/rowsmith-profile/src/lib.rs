//! Profile documents: the JSON surface of the generator.
//!
//! A profile declares fields and constraints. This crate owns the DTO layer,
//! the JSON Schema derived from it, structural and semantic validation, and
//! the lowering into `rowsmith_core` fields, constraints and relations.

pub mod dto;
pub mod errors;
pub mod files;
pub mod reader;
pub mod schema;
pub mod validate;

pub use dto::{AtomicDto, ConstraintDto, FieldDto, ProfileDto, SetEntryDto};
pub use errors::{IssueSeverity, ProfileError, Result, ValidationIssue, ValidationReport};
pub use files::{FileEntry, load_value_list};
pub use reader::{Profile, lower_profile, parse_profile, read_profile};
pub use schema::profile_json_schema;
pub use validate::{
    ValidatedProfile, validate_profile, validate_profile_json, validate_profile_semantics,
};
