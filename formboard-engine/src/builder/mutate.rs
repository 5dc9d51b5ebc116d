//! Structural mutations: adding, moving, resizing, and removing nodes.
//!
//! Every mutation leaves the arena with dense per-container ordering and at
//! least one section at the top level.

use tracing::debug;

use formboard_fields::{Condition, FieldDefinition, FieldKind};

use crate::error::{EngineError, Result};
use crate::types::{clamp_span, NodeId, Tab, SPAN_MAX};

use super::{BuilderNode, BuilderStore, Payload, Selected};

impl BuilderStore {
    /// Append a new section at the end of the form and return its id.
    pub fn add_section(&mut self, title: impl Into<String>) -> NodeId {
        let title = title.into();
        let id = NodeId::new();
        self.insert_node(
            BuilderNode {
                id: id.clone(),
                parent: None,
                slot: None,
                order: 0,
                payload: Payload::Section {
                    title: (!title.is_empty()).then_some(title),
                    description: None,
                    hide_when: Vec::new(),
                },
            },
            None,
        );
        debug!(section = %id, "added section");
        id
    }

    /// Append a new field of the given kind to a container. The key is
    /// derived from the kind and made unique across the whole form.
    pub fn add_field(&mut self, container: &NodeId, kind: FieldKind) -> Result<NodeId> {
        let key = self.ensure_unique_key(kind.as_str());
        let label = kind.default_label();
        let def = FieldDefinition::new(key, kind).with_label(label);
        self.add_field_def(container, def)
    }

    /// Append a field carrying the given embedded definition. The
    /// definition's key is re-probed for uniqueness before insertion.
    pub fn add_field_def(&mut self, container: &NodeId, mut def: FieldDefinition) -> Result<NodeId> {
        self.ensure_container(container)?;
        def.key = self.ensure_unique_key(&def.key);
        let id = NodeId::new();
        self.insert_node(
            BuilderNode {
                id: id.clone(),
                parent: Some(container.clone()),
                slot: None,
                order: 0,
                payload: Payload::Field {
                    col_span: SPAN_MAX,
                    field_id: None,
                    field_key: None,
                    def: Some(def),
                },
            },
            None,
        );
        debug!(field = %id, container = %container, "added field");
        Ok(id)
    }

    /// Append a field into the current insertion target (selected section,
    /// selected field's section, or the last section).
    pub fn add_field_to_selection(&mut self, kind: FieldKind) -> Result<NodeId> {
        let target = self
            .insertion_target()
            .ok_or_else(|| EngineError::node_not_found("<no section>"))?;
        self.add_field(&target, kind)
    }

    /// Append a field into one pane of a tabs node.
    pub fn add_field_to_tab(
        &mut self,
        tabs: &NodeId,
        tab: &str,
        kind: FieldKind,
    ) -> Result<NodeId> {
        self.ensure_tab(tabs, tab)?;
        let key = self.ensure_unique_key(kind.as_str());
        let label = kind.default_label();
        let def = FieldDefinition::new(key, kind).with_label(label);
        let id = NodeId::new();
        self.insert_node(
            BuilderNode {
                id: id.clone(),
                parent: Some(tabs.clone()),
                slot: Some(tab.to_string()),
                order: 0,
                payload: Payload::Field {
                    col_span: SPAN_MAX,
                    field_id: None,
                    field_key: None,
                    def: Some(def),
                },
            },
            None,
        );
        Ok(id)
    }

    /// Append a tabs node with the given panes to a container.
    pub fn add_tabs(&mut self, container: &NodeId, tabs: Vec<Tab>) -> Result<NodeId> {
        self.ensure_container(container)?;
        let id = NodeId::new();
        self.insert_node(
            BuilderNode {
                id: id.clone(),
                parent: Some(container.clone()),
                slot: None,
                order: 0,
                payload: Payload::Tabs { title: None, tabs },
            },
            None,
        );
        Ok(id)
    }

    /// Append an empty repeater to a container.
    pub fn add_repeater(&mut self, container: &NodeId, title: impl Into<String>) -> Result<NodeId> {
        self.ensure_container(container)?;
        let title = title.into();
        let id = NodeId::new();
        self.insert_node(
            BuilderNode {
                id: id.clone(),
                parent: Some(container.clone()),
                slot: None,
                order: 0,
                payload: Payload::Repeater {
                    title: (!title.is_empty()).then_some(title),
                    min_items: None,
                    max_items: None,
                },
            },
            None,
        );
        Ok(id)
    }

    /// Update a section's title, description, and hide clauses.
    pub fn update_section(
        &mut self,
        id: &NodeId,
        title: Option<String>,
        description: Option<String>,
        hide_when: Vec<Condition>,
    ) -> Result<()> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| EngineError::node_not_found(id.as_str()))?;
        match &mut node.payload {
            Payload::Section {
                title: t,
                description: d,
                hide_when: h,
            } => {
                *t = title;
                *d = description;
                *h = hide_when;
                Ok(())
            }
            _ => Err(EngineError::NotASection { id: id.to_string() }),
        }
    }

    /// Replace a field's embedded definition, re-probing its key against the
    /// rest of the form if it changed.
    pub fn update_field_def(&mut self, id: &NodeId, mut def: FieldDefinition) -> Result<()> {
        let current = self.field_key(id).map(str::to_string);
        {
            let node = self
                .nodes
                .get(id)
                .ok_or_else(|| EngineError::node_not_found(id.as_str()))?;
            if !matches!(node.payload, Payload::Field { .. }) {
                return Err(EngineError::NotAField { id: id.to_string() });
            }
        }
        if current.as_deref() != Some(def.key.as_str()) {
            def.key = self.ensure_unique_key(&def.key);
        }
        if let Some(node) = self.nodes.get_mut(id) {
            if let Payload::Field { def: slot, .. } = &mut node.payload {
                *slot = Some(def);
            }
        }
        Ok(())
    }

    /// Move a section to a new position among the top-level nodes. The
    /// target index is clamped to the valid range.
    pub fn move_section_to(&mut self, id: &NodeId, index: usize) -> Result<()> {
        let node = self
            .nodes
            .get(id)
            .ok_or_else(|| EngineError::node_not_found(id.as_str()))?;
        if !matches!(node.payload, Payload::Section { .. }) {
            return Err(EngineError::NotASection { id: id.to_string() });
        }
        self.roots.retain(|r| r != id);
        let at = index.min(self.roots.len());
        self.roots.insert(at, id.clone());
        self.reindex_roots();
        debug!(section = %id, index = at, "moved section");
        Ok(())
    }

    /// Reorder a node among its current siblings. `index` is the target
    /// position in the remaining siblings, insert-before semantics.
    pub fn move_field_within(&mut self, container: &NodeId, id: &NodeId, index: usize) -> Result<()> {
        let node = self
            .nodes
            .get(id)
            .ok_or_else(|| EngineError::node_not_found(id.as_str()))?;
        if node.parent.as_ref() != Some(container) {
            return Err(EngineError::node_not_found(id.as_str()));
        }
        let slot = node.slot.clone();

        let siblings = self
            .children
            .get_mut(container)
            .ok_or_else(|| EngineError::node_not_found(container.as_str()))?;
        siblings.retain(|c| c != id);
        let at = super::slot_insert_pos(siblings, &self.nodes, &slot, Some(index));
        siblings.insert(at, id.clone());
        self.reindex(container);
        Ok(())
    }

    /// Move a node from one container to another, inserting before the node
    /// currently at `index` in the target. Both containers end up densely
    /// reindexed.
    pub fn move_field_across(
        &mut self,
        from: &NodeId,
        to: &NodeId,
        id: &NodeId,
        index: usize,
    ) -> Result<()> {
        self.ensure_container(to)?;
        {
            let node = self
                .nodes
                .get(id)
                .ok_or_else(|| EngineError::node_not_found(id.as_str()))?;
            if node.parent.as_ref() != Some(from) {
                return Err(EngineError::node_not_found(id.as_str()));
            }
        }
        self.detach(id);
        if let Some(node) = self.nodes.get_mut(id) {
            node.parent = Some(to.clone());
            node.slot = None;
        }
        let siblings = self.children.entry(to.clone()).or_default();
        let at = index.min(siblings.len());
        siblings.insert(at, id.clone());
        self.reindex(to);
        debug!(node = %id, from = %from, to = %to, index = at, "moved node across containers");
        Ok(())
    }

    /// Move a node into one pane of a tabs node, inserting before the pane's
    /// entry at `index`. Pane membership rides on the node's slot, so this is
    /// the same detach/insert/reindex path as any other move.
    pub fn move_field_to_tab(
        &mut self,
        from: &NodeId,
        tabs: &NodeId,
        tab: &str,
        id: &NodeId,
        index: usize,
    ) -> Result<()> {
        self.ensure_tab(tabs, tab)?;
        {
            let node = self
                .nodes
                .get(id)
                .ok_or_else(|| EngineError::node_not_found(id.as_str()))?;
            if node.parent.as_ref() != Some(from) {
                return Err(EngineError::node_not_found(id.as_str()));
            }
        }
        self.detach(id);
        let slot = Some(tab.to_string());
        if let Some(node) = self.nodes.get_mut(id) {
            node.parent = Some(tabs.clone());
            node.slot = slot.clone();
        }
        let siblings = self.children.entry(tabs.clone()).or_default();
        let at = super::slot_insert_pos(siblings, &self.nodes, &slot, Some(index));
        siblings.insert(at, id.clone());
        self.reindex(tabs);
        debug!(node = %id, from = %from, to = %tabs, tab, index, "moved node into tab pane");
        Ok(())
    }

    /// Set a field's column span, silently clamping into the 1..=12 grid.
    pub fn resize_field(&mut self, id: &NodeId, span: i32) -> Result<()> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| EngineError::node_not_found(id.as_str()))?;
        match &mut node.payload {
            Payload::Field { col_span, .. } => {
                *col_span = clamp_span(span);
                Ok(())
            }
            _ => Err(EngineError::NotAField { id: id.to_string() }),
        }
    }

    /// Remove a node and its whole subtree. Removing the last section leaves
    /// the form with a fresh empty one.
    pub fn remove_node(&mut self, id: &NodeId) -> Result<()> {
        if !self.nodes.contains_key(id) {
            return Err(EngineError::node_not_found(id.as_str()));
        }
        let removed = self.subtree_ids(id);
        self.detach(id);
        for gone in &removed {
            self.nodes.shift_remove(gone);
            self.children.remove(gone);
        }
        self.clear_selection_if_removed(&removed);
        if self.section_ids().is_empty() {
            let fresh = self.create_default_section();
            debug!(section = %fresh, "recreated default section");
        }
        Ok(())
    }

    /// Remove a section (and everything inside it).
    pub fn remove_section(&mut self, id: &NodeId) -> Result<()> {
        let node = self
            .nodes
            .get(id)
            .ok_or_else(|| EngineError::node_not_found(id.as_str()))?;
        if !matches!(node.payload, Payload::Section { .. }) {
            return Err(EngineError::NotASection { id: id.to_string() });
        }
        self.remove_node(id)
    }

    /// Check that `tabs` is a tabs node declaring the pane `tab`.
    fn ensure_tab(&self, tabs: &NodeId, tab: &str) -> Result<()> {
        let node = self
            .nodes
            .get(tabs)
            .ok_or_else(|| EngineError::node_not_found(tabs.as_str()))?;
        match &node.payload {
            Payload::Tabs { tabs: headers, .. } => {
                if headers.iter().any(|t| t.id == tab) {
                    Ok(())
                } else {
                    Err(EngineError::TabNotFound {
                        tabs: tabs.to_string(),
                        tab: tab.to_string(),
                    })
                }
            }
            _ => Err(EngineError::not_a_container(tabs.as_str())),
        }
    }

    pub(crate) fn ensure_container(&self, id: &NodeId) -> Result<()> {
        let node = self
            .nodes
            .get(id)
            .ok_or_else(|| EngineError::node_not_found(id.as_str()))?;
        if !node.payload.is_container() {
            return Err(EngineError::not_a_container(id.as_str()));
        }
        Ok(())
    }
}
