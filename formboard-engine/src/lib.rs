//! Layout engine for dynamic forms: tree model, field resolution, derived
//! validation, runtime evaluation, and the builder mutation store.
//!
//! The pipeline is strictly layered. A [`FormLayout`] tree (authored in the
//! builder or loaded from persistence) is resolved once into a flat
//! [`Resolution`] of addressable fields; from that resolution a
//! [`StructuralValidator`] is derived for value checking, and
//! [`evaluate`] computes visibility and aggregate values against live form
//! state. Every stage downstream of the builder is a pure function of its
//! inputs.
//!
//! ```
//! use formboard_engine::builder::BuilderStore;
//! use formboard_engine::{evaluate, generate_schema, resolve};
//! use formboard_fields::{DefinitionSet, FieldKind};
//! use serde_json::json;
//!
//! let mut store = BuilderStore::new();
//! let section = store.section_ids()[0].clone();
//! store.add_field(&section, FieldKind::Text).unwrap();
//!
//! let layout = store.snapshot();
//! let defs = DefinitionSet::new();
//! let resolution = resolve(&layout, &defs);
//! let validator = generate_schema(&layout, &defs);
//!
//! let values = json!({"text": "hello"});
//! let evaluation = evaluate(&resolution, &values);
//! assert!(validator.validate(&values).is_empty());
//! assert!(!evaluation.is_hidden("text"));
//! ```

pub mod builder;
pub mod error;
pub mod eval;
pub mod resolve;
pub mod schema;
pub mod types;
pub mod values;

pub use builder::{AuthoringIssue, BuilderStore, Selected};
pub use error::{EngineError, Result};
pub use eval::{evaluate, Evaluation};
pub use resolve::{resolve, Binding, ResolvedField, Resolution};
pub use schema::{generate_schema, Constraint, FieldRule, StructuralValidator, ValueIssue};
pub use types::{
    clamp_span, FieldPath, FormLayout, LayoutNode, NodeId, PathSegment, Tab, FORM_LAYOUT_VERSION,
};
