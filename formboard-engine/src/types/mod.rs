//! Core types for the layout engine

mod ids;
mod layout;
mod path;

// Re-export all types
pub use ids::NodeId;
pub use layout::{
    clamp_span, FormLayout, LayoutNode, Tab, FORM_LAYOUT_VERSION, SPAN_MAX, SPAN_MIN,
};
pub use path::{FieldPath, PathSegment};
