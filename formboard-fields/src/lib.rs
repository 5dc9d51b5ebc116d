//! Field definition registry
//!
//! `formboard-fields` is a standalone, schema-only crate that manages field
//! definitions for the formboard layout engine. It knows nothing about layout
//! trees, rendering, or persistence — consumers hand it definitions as JSON or
//! YAML and look them up by id or key.
//!
//! # Architecture
//!
//! - **Schema-only**: Owns field definitions, not field values
//! - **Consumer-agnostic**: Ingests strings; storage lives with the caller
//! - **Indexed**: In-memory id and key indexes for O(1) lookup

pub mod error;
pub mod registry;
pub mod types;

pub use error::{FieldsError, Result};
pub use registry::DefinitionSet;
pub use types::{Condition, ConditionOp, FieldDefinition, FieldKind, SelectOption};
