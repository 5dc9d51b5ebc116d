//! Builder mutation store: the in-memory, node-indexed model behind the form
//! designer.
//!
//! Nodes live in an arena indexed by id with explicit parent/children maps,
//! so reordering — including cross-container drags — is an index rewrite, not
//! tree surgery. The layout tree is exclusively owned by this store; the
//! resolver, schema generator and evaluator only ever receive read-only
//! snapshots via [`BuilderStore::to_form_layout`].

mod duplicate;
mod mutate;
mod serialize;
mod validate;

pub use validate::AuthoringIssue;

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;

use formboard_fields::{Condition, FieldDefinition};

use crate::types::{NodeId, Tab};

/// Payload of one arena node: the node's own data, children excluded.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Payload {
    Section {
        title: Option<String>,
        description: Option<String>,
        hide_when: Vec<Condition>,
    },
    Row {
        gutter: Option<u32>,
    },
    Column {
        span: u8,
    },
    Field {
        col_span: u8,
        field_id: Option<String>,
        field_key: Option<String>,
        def: Option<FieldDefinition>,
    },
    Tabs {
        title: Option<String>,
        tabs: Vec<Tab>,
    },
    Repeater {
        title: Option<String>,
        min_items: Option<usize>,
        max_items: Option<usize>,
    },
}

impl Payload {
    /// Whether this node kind can hold direct children (tabs hold children
    /// per pane, not directly).
    fn is_container(&self) -> bool {
        matches!(
            self,
            Self::Section { .. } | Self::Row { .. } | Self::Column { .. } | Self::Repeater { .. }
        )
    }

    fn kind_str(&self) -> &'static str {
        match self {
            Self::Section { .. } => "section",
            Self::Row { .. } => "row",
            Self::Column { .. } => "column",
            Self::Field { .. } => "field",
            Self::Tabs { .. } => "tabs",
            Self::Repeater { .. } => "repeater",
        }
    }
}

/// One node in the builder arena.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct BuilderNode {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    /// Tab pane id when the parent is a tabs node.
    pub slot: Option<String>,
    /// Dense 0-based position among siblings (within the slot, for tab
    /// panes). Kept in sync by `reindex`.
    pub order: usize,
    pub payload: Payload,
}

/// Current designer selection. Drives where `add_field_to_selection`
/// inserts: selecting a field targets its owning section.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Selected {
    #[default]
    None,
    Section(NodeId),
    Field(NodeId),
}

/// The builder mutation store.
#[derive(Debug, Clone)]
pub struct BuilderStore {
    pub(crate) nodes: IndexMap<NodeId, BuilderNode>,
    pub(crate) children: HashMap<NodeId, Vec<NodeId>>,
    pub(crate) roots: Vec<NodeId>,
    selected: Selected,
}

impl BuilderStore {
    /// An empty form: one default section (a form always has at least one).
    pub fn new() -> Self {
        let mut store = Self {
            nodes: IndexMap::new(),
            children: HashMap::new(),
            roots: Vec::new(),
            selected: Selected::None,
        };
        store.create_default_section();
        store
    }

    pub(crate) fn create_default_section(&mut self) -> NodeId {
        let id = NodeId::new();
        self.insert_node(
            BuilderNode {
                id: id.clone(),
                parent: None,
                slot: None,
                order: 0,
                payload: Payload::Section {
                    title: None,
                    description: None,
                    hide_when: Vec::new(),
                },
            },
            None,
        );
        id
    }

    /// Number of nodes in the arena.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Top-level node ids in order (sections, primarily).
    pub fn root_ids(&self) -> &[NodeId] {
        &self.roots
    }

    /// Ids of top-level sections in order.
    pub fn section_ids(&self) -> Vec<NodeId> {
        self.roots
            .iter()
            .filter(|id| {
                self.nodes
                    .get(*id)
                    .map_or(false, |n| matches!(n.payload, Payload::Section { .. }))
            })
            .cloned()
            .collect()
    }

    /// Ordered child ids of a container.
    pub fn child_ids(&self, container: &NodeId) -> &[NodeId] {
        self.children
            .get(container)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Dense order value of a node among its siblings.
    pub fn order_of(&self, id: &NodeId) -> Option<usize> {
        self.nodes.get(id).map(|n| n.order)
    }

    /// The field's current key (embedded definition key or reference key).
    pub fn field_key(&self, id: &NodeId) -> Option<&str> {
        match &self.nodes.get(id)?.payload {
            Payload::Field {
                def, field_key, ..
            } => def
                .as_ref()
                .map(|d| d.key.as_str())
                .or(field_key.as_deref()),
            _ => None,
        }
    }

    /// The field's column span.
    pub fn field_span(&self, id: &NodeId) -> Option<u8> {
        match &self.nodes.get(id)?.payload {
            Payload::Field { col_span, .. } => Some(*col_span),
            _ => None,
        }
    }

    // --- selection -------------------------------------------------------

    pub fn selected(&self) -> &Selected {
        &self.selected
    }

    pub fn select_section(&mut self, id: &NodeId) -> crate::error::Result<()> {
        let node = self
            .nodes
            .get(id)
            .ok_or_else(|| crate::error::EngineError::node_not_found(id.as_str()))?;
        if !matches!(node.payload, Payload::Section { .. }) {
            return Err(crate::error::EngineError::NotASection {
                id: id.to_string(),
            });
        }
        self.selected = Selected::Section(id.clone());
        Ok(())
    }

    pub fn select_field(&mut self, id: &NodeId) -> crate::error::Result<()> {
        let node = self
            .nodes
            .get(id)
            .ok_or_else(|| crate::error::EngineError::node_not_found(id.as_str()))?;
        if !matches!(node.payload, Payload::Field { .. }) {
            return Err(crate::error::EngineError::NotAField { id: id.to_string() });
        }
        self.selected = Selected::Field(id.clone());
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.selected = Selected::None;
    }

    /// The container subsequent field inserts go into: the selected section,
    /// the selected field's owning section, or the last section.
    pub fn insertion_target(&self) -> Option<NodeId> {
        match &self.selected {
            Selected::Section(id) if self.contains(id) => Some(id.clone()),
            Selected::Field(id) => self.owning_section(id),
            _ => self.section_ids().last().cloned(),
        }
    }

    /// Nearest section ancestor of a node (or the node itself).
    pub fn owning_section(&self, id: &NodeId) -> Option<NodeId> {
        let mut current = Some(id.clone());
        while let Some(id) = current {
            let node = self.nodes.get(&id)?;
            if matches!(node.payload, Payload::Section { .. }) {
                return Some(id);
            }
            current = node.parent.clone();
        }
        None
    }

    // --- keys ------------------------------------------------------------

    /// Every field key currently in the arena.
    pub fn collect_keys(&self) -> HashSet<String> {
        self.nodes
            .keys()
            .filter_map(|id| self.field_key(id).map(str::to_string))
            .collect()
    }

    /// Probe `base`, `base_2`, `base_3`, ... until no existing key collides.
    pub fn ensure_unique_key(&self, base: &str) -> String {
        let used = self.collect_keys();
        unique_key(base, &used)
    }

    // --- arena plumbing --------------------------------------------------

    /// Insert a node at the end of its container (or slot) and reindex.
    pub(crate) fn insert_node(&mut self, node: BuilderNode, index: Option<usize>) {
        let id = node.id.clone();
        let parent = node.parent.clone();
        let slot = node.slot.clone();
        self.nodes.insert(id.clone(), node);

        match parent {
            None => {
                let at = index.unwrap_or(self.roots.len()).min(self.roots.len());
                self.roots.insert(at, id);
                self.reindex_roots();
            }
            Some(parent_id) => {
                let siblings = self.children.entry(parent_id.clone()).or_default();
                let at = slot_insert_pos(siblings, &self.nodes, &slot, index);
                siblings.insert(at, id);
                self.reindex(&parent_id);
            }
        }
    }

    /// Detach a node from its parent's child list (node stays in the arena).
    pub(crate) fn detach(&mut self, id: &NodeId) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        match node.parent.clone() {
            None => {
                self.roots.retain(|r| r != id);
                self.reindex_roots();
            }
            Some(parent_id) => {
                if let Some(siblings) = self.children.get_mut(&parent_id) {
                    siblings.retain(|c| c != id);
                }
                self.reindex(&parent_id);
            }
        }
    }

    /// Renumber a container's children to a dense 0..n-1 sequence, per slot
    /// for tab panes.
    pub(crate) fn reindex(&mut self, container: &NodeId) {
        let Some(child_ids) = self.children.get(container).cloned() else {
            return;
        };
        let mut counters: HashMap<Option<String>, usize> = HashMap::new();
        for child_id in child_ids {
            if let Some(child) = self.nodes.get_mut(&child_id) {
                let counter = counters.entry(child.slot.clone()).or_insert(0);
                child.order = *counter;
                *counter += 1;
            }
        }
    }

    pub(crate) fn reindex_roots(&mut self) {
        let roots = self.roots.clone();
        for (i, id) in roots.iter().enumerate() {
            if let Some(node) = self.nodes.get_mut(id) {
                node.order = i;
            }
        }
    }

    /// Ids of a node and all its descendants, depth-first.
    pub(crate) fn subtree_ids(&self, id: &NodeId) -> Vec<NodeId> {
        let mut out = vec![id.clone()];
        let mut stack: Vec<NodeId> = self.child_ids(id).to_vec();
        stack.reverse();
        while let Some(next) = stack.pop() {
            out.push(next.clone());
            let mut children = self.child_ids(&next).to_vec();
            children.reverse();
            stack.extend(children);
        }
        out
    }

    pub(crate) fn clear_selection_if_removed(&mut self, removed: &[NodeId]) {
        let gone = match &self.selected {
            Selected::None => false,
            Selected::Section(id) | Selected::Field(id) => removed.contains(id),
        };
        if gone {
            self.selected = Selected::None;
        }
    }
}

impl Default for BuilderStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Probe for a free key in `used`.
pub(crate) fn unique_key(base: &str, used: &HashSet<String>) -> String {
    if !used.contains(base) {
        return base.to_string();
    }
    let mut n = 2;
    loop {
        let candidate = format!("{base}_{n}");
        if !used.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

/// Position in the interleaved sibling vec for inserting at `index` within
/// `slot`. `None` appends after the slot's last entry.
fn slot_insert_pos(
    siblings: &[NodeId],
    nodes: &IndexMap<NodeId, BuilderNode>,
    slot: &Option<String>,
    index: Option<usize>,
) -> usize {
    let mut seen_in_slot = 0usize;
    let mut last_slot_end = 0usize;
    for (pos, id) in siblings.iter().enumerate() {
        let same = nodes.get(id).map_or(false, |n| &n.slot == slot);
        if same {
            if let Some(target) = index {
                if seen_in_slot == target {
                    return pos;
                }
            }
            seen_in_slot += 1;
            last_slot_end = pos + 1;
        }
    }
    // Append or clamp past-the-end targets to the slot's end. An empty slot
    // appends at the very end of the sibling list.
    if seen_in_slot == 0 {
        siblings.len()
    } else {
        last_slot_end
    }
}
