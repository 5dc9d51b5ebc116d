//! The layout tree: a versioned, declarative description of form composition.
//!
//! Nodes form a tagged union discriminated by `type` on the wire. The tree is
//! pure data — resolution, validation, and evaluation each dispatch over it
//! exactly once, at their own boundary.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use formboard_fields::{Condition, FieldDefinition};

use super::ids::NodeId;
use crate::error::{EngineError, Result};

/// Version written into every persisted layout envelope.
pub const FORM_LAYOUT_VERSION: u32 = 1;

/// Valid span domain for columns and fields (12-column grid).
pub const SPAN_MIN: u8 = 1;
pub const SPAN_MAX: u8 = 12;

/// Clamp a span into the 1..=12 grid. Out-of-range input is clamped, not
/// rejected.
pub fn clamp_span(span: i32) -> u8 {
    span.clamp(SPAN_MIN as i32, SPAN_MAX as i32) as u8
}

fn default_span() -> u8 {
    SPAN_MAX
}

/// One tab header on a tabs node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tab {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl Tab {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// A node in the layout tree.
///
/// `Section.children` accepts any child node: rows for the grid layout, or
/// flat field nodes as the builder emits them. Rows likewise accept either
/// `columns` or legacy flat `children`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum LayoutNode {
    Section {
        id: NodeId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        /// Hide clauses. Wire name kept for compatibility with saved forms.
        #[serde(
            rename = "condicionesOcultar",
            default,
            skip_serializing_if = "Vec::is_empty"
        )]
        hide_when: Vec<Condition>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        children: Vec<LayoutNode>,
    },
    Row {
        id: NodeId,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        columns: Vec<LayoutNode>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        gutter: Option<u32>,
        /// Legacy flat children (field nodes directly in the row).
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        children: Vec<LayoutNode>,
    },
    Column {
        id: NodeId,
        #[serde(default = "default_span")]
        span: u8,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        children: Vec<LayoutNode>,
    },
    Field {
        id: NodeId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        field_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        field_key: Option<String>,
        #[serde(default = "default_span")]
        col_span: u8,
        /// Embedded definition; takes precedence over external lookup.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        field: Option<FieldDefinition>,
    },
    Tabs {
        id: NodeId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        tabs: Vec<Tab>,
        /// Children per tab id. A tab with no entry renders empty.
        #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
        tabs_children: IndexMap<String, Vec<LayoutNode>>,
    },
    Repeater {
        id: NodeId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min_items: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_items: Option<usize>,
        /// The per-item template, not per-item instances.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        children: Vec<LayoutNode>,
    },
}

impl LayoutNode {
    /// Create an empty section.
    pub fn section(id: impl Into<NodeId>) -> Self {
        Self::Section {
            id: id.into(),
            title: None,
            description: None,
            hide_when: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Create a field node with an embedded definition.
    pub fn field(id: impl Into<NodeId>, def: FieldDefinition) -> Self {
        Self::Field {
            id: id.into(),
            field_id: None,
            field_key: None,
            col_span: default_span(),
            field: Some(def),
        }
    }

    /// Create a field node referencing an external definition.
    pub fn field_ref(id: impl Into<NodeId>, field_id: impl Into<String>) -> Self {
        Self::Field {
            id: id.into(),
            field_id: Some(field_id.into()),
            field_key: None,
            col_span: default_span(),
            field: None,
        }
    }

    /// Create a repeater with the given item template.
    pub fn repeater(id: impl Into<NodeId>, children: Vec<LayoutNode>) -> Self {
        Self::Repeater {
            id: id.into(),
            title: None,
            min_items: None,
            max_items: None,
            children,
        }
    }

    /// The node's id.
    pub fn id(&self) -> &NodeId {
        match self {
            Self::Section { id, .. }
            | Self::Row { id, .. }
            | Self::Column { id, .. }
            | Self::Field { id, .. }
            | Self::Tabs { id, .. }
            | Self::Repeater { id, .. } => id,
        }
    }

    /// Wire discriminant for diagnostics.
    pub fn kind_str(&self) -> &'static str {
        match self {
            Self::Section { .. } => "section",
            Self::Row { .. } => "row",
            Self::Column { .. } => "column",
            Self::Field { .. } => "field",
            Self::Tabs { .. } => "tabs",
            Self::Repeater { .. } => "repeater",
        }
    }

    pub fn is_section(&self) -> bool {
        matches!(self, Self::Section { .. })
    }

    pub fn is_field(&self) -> bool {
        matches!(self, Self::Field { .. })
    }
}

/// Persisted layout envelope: `{version, nodes}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FormLayout {
    pub version: u32,
    #[serde(default)]
    pub nodes: Vec<LayoutNode>,
}

impl FormLayout {
    /// Wrap nodes in a current-version envelope.
    pub fn new(nodes: Vec<LayoutNode>) -> Self {
        Self {
            version: FORM_LAYOUT_VERSION,
            nodes,
        }
    }

    /// Reject unknown versions rather than guess.
    pub fn ensure_supported(&self) -> Result<()> {
        if self.version != FORM_LAYOUT_VERSION {
            return Err(EngineError::UnsupportedVersion {
                version: self.version,
            });
        }
        Ok(())
    }

    /// Migration seam. Version 1 passes through; future versions land here.
    pub fn migrate(self) -> Result<Self> {
        self.ensure_supported()?;
        Ok(self)
    }

    /// Parse and version-check a persisted envelope.
    pub fn from_json(json: &str) -> Result<Self> {
        let layout: FormLayout = serde_json::from_str(json)?;
        layout.migrate()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
