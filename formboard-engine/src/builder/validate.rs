//! Authoring-time checks over the whole arena.
//!
//! These are advisory issues shown in the designer, not hard errors: the
//! store never refuses to hold a form that fails them.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use crate::types::NodeId;

use super::{BuilderStore, Payload};

/// One problem found in the authored form.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum AuthoringIssue {
    /// A section with no fields anywhere inside it.
    EmptySection { section_id: String },
    /// A field with no embedded definition and no reference key or id.
    MissingKey { node_id: String },
    /// Two or more fields sharing a key within the same repeater scope.
    DuplicateKey { key: String, node_ids: Vec<String> },
    /// A selection-kind field with no options to choose from.
    NoOptions { node_id: String, key: String },
    /// A sum field whose source is unknown or not numeric-typed.
    SumSourceNotNumeric {
        node_id: String,
        key: String,
        source: String,
    },
}

impl fmt::Display for AuthoringIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptySection { section_id } => {
                write!(f, "section {section_id} has no fields")
            }
            Self::MissingKey { node_id } => {
                write!(f, "field {node_id} has no key")
            }
            Self::DuplicateKey { key, node_ids } => {
                write!(f, "key '{key}' used by {} fields", node_ids.len())
            }
            Self::NoOptions { key, .. } => {
                write!(f, "selection field '{key}' has no options")
            }
            Self::SumSourceNotNumeric { key, source, .. } => {
                write!(f, "sum field '{key}' source '{source}' is not numeric")
            }
        }
    }
}

impl BuilderStore {
    /// Check the whole form and report every authoring issue found.
    pub fn validate_all(&self) -> Vec<AuthoringIssue> {
        let mut issues = Vec::new();

        for section in self.section_ids() {
            let has_field = self.subtree_ids(&section).iter().any(|id| {
                self.nodes
                    .get(id)
                    .map_or(false, |n| matches!(n.payload, Payload::Field { .. }))
            });
            if !has_field {
                issues.push(AuthoringIssue::EmptySection {
                    section_id: section.to_string(),
                });
            }
        }

        // Keys by repeater scope: a repeated item template is its own
        // namespace, so the same key may appear in two different repeaters.
        let mut by_scope: HashMap<(Option<NodeId>, String), Vec<NodeId>> = HashMap::new();
        let mut numeric_keys: HashMap<String, bool> = HashMap::new();

        for (id, node) in &self.nodes {
            let Payload::Field {
                field_id,
                field_key,
                def,
                ..
            } = &node.payload
            else {
                continue;
            };

            if def.is_none() && field_key.is_none() && field_id.is_none() {
                issues.push(AuthoringIssue::MissingKey {
                    node_id: id.to_string(),
                });
                continue;
            }

            if let Some(key) = self.field_key(id) {
                by_scope
                    .entry((self.repeater_scope(id), key.to_string()))
                    .or_default()
                    .push(id.clone());
            }

            let Some(def) = def else { continue };
            numeric_keys.insert(def.key.clone(), def.kind.is_numeric());

            if def.kind.is_selection() && def.option_values().map_or(true, |v| v.is_empty()) {
                issues.push(AuthoringIssue::NoOptions {
                    node_id: id.to_string(),
                    key: def.key.clone(),
                });
            }
        }

        for ((_scope, key), ids) in &by_scope {
            if ids.len() > 1 {
                issues.push(AuthoringIssue::DuplicateKey {
                    key: key.clone(),
                    node_ids: ids.iter().map(ToString::to_string).collect(),
                });
            }
        }

        for (id, node) in &self.nodes {
            let Payload::Field { def: Some(def), .. } = &node.payload else {
                continue;
            };
            if !def.kind.is_aggregate() {
                continue;
            }
            for source in def.sources.as_deref().unwrap_or(&[]) {
                if numeric_keys.get(source) != Some(&true) {
                    issues.push(AuthoringIssue::SumSourceNotNumeric {
                        node_id: id.to_string(),
                        key: def.key.clone(),
                        source: source.clone(),
                    });
                }
            }
        }

        issues
    }

    /// Nearest repeater ancestor, or `None` at the top-level scope.
    fn repeater_scope(&self, id: &NodeId) -> Option<NodeId> {
        let mut current = self.nodes.get(id)?.parent.clone();
        while let Some(parent_id) = current {
            let node = self.nodes.get(&parent_id)?;
            if matches!(node.payload, Payload::Repeater { .. }) {
                return Some(parent_id);
            }
            current = node.parent.clone();
        }
        None
    }
}
