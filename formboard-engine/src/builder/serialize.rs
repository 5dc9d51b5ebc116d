//! Conversion between the builder arena and the persisted layout tree.
//!
//! `to_form_layout` and `load_from_form_layout` are exact inverses on ids,
//! keys, and ordering, so a save/load cycle never reshuffles an authored
//! form.

use indexmap::IndexMap;
use tracing::debug;

use crate::error::Result;
use crate::types::{FormLayout, LayoutNode, NodeId};

use super::{BuilderNode, BuilderStore, Payload};

impl BuilderStore {
    /// Materialize the arena into a versioned layout envelope.
    pub fn to_form_layout(&self) -> FormLayout {
        let nodes = self
            .roots
            .iter()
            .filter_map(|id| self.node_to_layout(id))
            .collect();
        FormLayout::new(nodes)
    }

    /// A read-only snapshot for the resolver/validator/evaluator pipeline.
    pub fn snapshot(&self) -> FormLayout {
        self.to_form_layout()
    }

    /// Replace the arena's contents with a persisted layout.
    ///
    /// Rejects unsupported versions. A layout with no top-level section
    /// still loads, and a default section is appended to keep the one-section
    /// floor.
    pub fn load_from_form_layout(&mut self, layout: &FormLayout) -> Result<()> {
        layout.ensure_supported()?;
        self.nodes.clear();
        self.children.clear();
        self.roots.clear();
        self.clear_selection();

        for node in &layout.nodes {
            self.load_node(node, None, None);
        }
        if self.section_ids().is_empty() {
            self.create_default_section();
        }
        debug!(nodes = self.nodes.len(), "loaded layout into builder");
        Ok(())
    }

    /// Build a store directly from a persisted layout.
    pub fn from_form_layout(layout: &FormLayout) -> Result<Self> {
        let mut store = Self::new();
        store.load_from_form_layout(layout)?;
        Ok(store)
    }

    fn node_to_layout(&self, id: &NodeId) -> Option<LayoutNode> {
        let node = self.nodes.get(id)?;
        Some(match &node.payload {
            Payload::Section {
                title,
                description,
                hide_when,
            } => LayoutNode::Section {
                id: id.clone(),
                title: title.clone(),
                description: description.clone(),
                hide_when: hide_when.clone(),
                children: self.children_to_layout(id),
            },
            Payload::Row { gutter } => {
                // Column children serialize under `columns`, everything else
                // under the legacy flat list.
                let mut columns = Vec::new();
                let mut children = Vec::new();
                for child_id in self.child_ids(id) {
                    let is_column = self
                        .nodes
                        .get(child_id)
                        .map_or(false, |n| matches!(n.payload, Payload::Column { .. }));
                    if let Some(child) = self.node_to_layout(child_id) {
                        if is_column {
                            columns.push(child);
                        } else {
                            children.push(child);
                        }
                    }
                }
                LayoutNode::Row {
                    id: id.clone(),
                    columns,
                    gutter: *gutter,
                    children,
                }
            }
            Payload::Column { span } => LayoutNode::Column {
                id: id.clone(),
                span: *span,
                children: self.children_to_layout(id),
            },
            Payload::Field {
                col_span,
                field_id,
                field_key,
                def,
            } => LayoutNode::Field {
                id: id.clone(),
                field_id: field_id.clone(),
                field_key: field_key.clone(),
                col_span: *col_span,
                field: def.clone(),
            },
            Payload::Tabs { title, tabs } => {
                let mut tabs_children: IndexMap<String, Vec<LayoutNode>> = IndexMap::new();
                for tab in tabs {
                    let pane: Vec<LayoutNode> = self
                        .child_ids(id)
                        .iter()
                        .filter(|cid| {
                            self.nodes
                                .get(*cid)
                                .map_or(false, |n| n.slot.as_deref() == Some(tab.id.as_str()))
                        })
                        .filter_map(|cid| self.node_to_layout(cid))
                        .collect();
                    if !pane.is_empty() {
                        tabs_children.insert(tab.id.clone(), pane);
                    }
                }
                LayoutNode::Tabs {
                    id: id.clone(),
                    title: title.clone(),
                    tabs: tabs.clone(),
                    tabs_children,
                }
            }
            Payload::Repeater {
                title,
                min_items,
                max_items,
            } => LayoutNode::Repeater {
                id: id.clone(),
                title: title.clone(),
                min_items: *min_items,
                max_items: *max_items,
                children: self.children_to_layout(id),
            },
        })
    }

    fn children_to_layout(&self, id: &NodeId) -> Vec<LayoutNode> {
        self.child_ids(id)
            .iter()
            .filter_map(|cid| self.node_to_layout(cid))
            .collect()
    }

    fn load_node(&mut self, node: &LayoutNode, parent: Option<NodeId>, slot: Option<String>) {
        match node {
            LayoutNode::Section {
                id,
                title,
                description,
                hide_when,
                children,
            } => {
                self.insert_node(
                    BuilderNode {
                        id: id.clone(),
                        parent: parent.clone(),
                        slot,
                        order: 0,
                        payload: Payload::Section {
                            title: title.clone(),
                            description: description.clone(),
                            hide_when: hide_when.clone(),
                        },
                    },
                    None,
                );
                self.load_children(children, id);
            }
            LayoutNode::Row {
                id,
                columns,
                gutter,
                children,
            } => {
                self.insert_node(
                    BuilderNode {
                        id: id.clone(),
                        parent: parent.clone(),
                        slot,
                        order: 0,
                        payload: Payload::Row { gutter: *gutter },
                    },
                    None,
                );
                self.load_children(columns, id);
                self.load_children(children, id);
            }
            LayoutNode::Column { id, span, children } => {
                self.insert_node(
                    BuilderNode {
                        id: id.clone(),
                        parent: parent.clone(),
                        slot,
                        order: 0,
                        payload: Payload::Column { span: *span },
                    },
                    None,
                );
                self.load_children(children, id);
            }
            LayoutNode::Field {
                id,
                field_id,
                field_key,
                col_span,
                field,
            } => {
                self.insert_node(
                    BuilderNode {
                        id: id.clone(),
                        parent,
                        slot,
                        order: 0,
                        payload: Payload::Field {
                            col_span: *col_span,
                            field_id: field_id.clone(),
                            field_key: field_key.clone(),
                            def: field.clone(),
                        },
                    },
                    None,
                );
            }
            LayoutNode::Tabs {
                id,
                title,
                tabs,
                tabs_children,
            } => {
                self.insert_node(
                    BuilderNode {
                        id: id.clone(),
                        parent: parent.clone(),
                        slot,
                        order: 0,
                        payload: Payload::Tabs {
                            title: title.clone(),
                            tabs: tabs.clone(),
                        },
                    },
                    None,
                );
                // Panes load in declared tab order.
                for tab in tabs {
                    if let Some(pane) = tabs_children.get(&tab.id) {
                        for child in pane {
                            self.load_node(child, Some(id.clone()), Some(tab.id.clone()));
                        }
                    }
                }
            }
            LayoutNode::Repeater {
                id,
                title,
                min_items,
                max_items,
                children,
            } => {
                self.insert_node(
                    BuilderNode {
                        id: id.clone(),
                        parent: parent.clone(),
                        slot,
                        order: 0,
                        payload: Payload::Repeater {
                            title: title.clone(),
                            min_items: *min_items,
                            max_items: *max_items,
                        },
                    },
                    None,
                );
                self.load_children(children, id);
            }
        }
    }

    fn load_children(&mut self, children: &[LayoutNode], parent: &NodeId) {
        for child in children {
            self.load_node(child, Some(parent.clone()), None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Tab;
    use formboard_fields::FieldKind;

    #[test]
    fn test_round_trip_preserves_ids_keys_order() {
        let mut store = BuilderStore::new();
        let s1 = store.section_ids()[0].clone();
        let s2 = store.add_section("Details");
        store.add_field(&s1, FieldKind::Text).unwrap();
        store.add_field(&s1, FieldKind::Number).unwrap();
        let rep = store.add_repeater(&s2, "Items").unwrap();
        store.add_field(&rep, FieldKind::Float).unwrap();

        let layout = store.to_form_layout();
        let reloaded = BuilderStore::from_form_layout(&layout).unwrap();
        assert_eq!(reloaded.to_form_layout(), layout);
        assert_eq!(reloaded.section_ids(), store.section_ids());
        assert_eq!(reloaded.collect_keys(), store.collect_keys());
    }

    #[test]
    fn test_round_trip_keeps_tab_panes() {
        let mut store = BuilderStore::new();
        let section = store.section_ids()[0].clone();
        let tabs = store
            .add_tabs(&section, vec![Tab::new("a"), Tab::new("b")])
            .unwrap();
        store.add_field_to_tab(&tabs, "b", FieldKind::Text).unwrap();

        let layout = store.to_form_layout();
        let json = layout.to_json().unwrap();
        let parsed = FormLayout::from_json(&json).unwrap();
        let reloaded = BuilderStore::from_form_layout(&parsed).unwrap();
        assert_eq!(reloaded.to_form_layout(), layout);
    }

    #[test]
    fn test_load_empty_layout_gets_default_section() {
        let layout = FormLayout::new(Vec::new());
        let store = BuilderStore::from_form_layout(&layout).unwrap();
        assert_eq!(store.section_ids().len(), 1);
    }

    #[test]
    fn test_load_rejects_unknown_version() {
        let mut layout = FormLayout::new(Vec::new());
        layout.version = 3;
        assert!(BuilderStore::from_form_layout(&layout).is_err());
    }
}
