//! Constraint-aware row generation for Rowsmith.
//!
//! This crate compiles a parsed profile into a decision tree, walks the
//! tree lazily for satisfiable constraint combinations, samples concrete
//! rows from them, and writes deterministic datasets (CSV or JSON) with a
//! run report.

pub mod assemble;
pub mod compile;
pub mod engine;
pub mod errors;
pub mod model;
pub mod output;
pub mod rowspec;
pub mod sample;
pub mod walker;

pub use assemble::{Row, assemble_row, assembly_order};
pub use compile::compile_tree;
pub use engine::{GenerationEngine, GenerationResult};
pub use errors::GenerationError;
pub use model::{GenerateOptions, GenerationIssue, GenerationReport, OutputFormat};
pub use rowspec::RowSpec;
pub use walker::TreeWalker;
