//! Subtree duplication with fresh identities.
//!
//! Clones get new node ids throughout. Embedded definition keys are
//! re-probed so the copy never collides with the original; reference-only
//! fields keep their reference untouched — rewriting it would dangle, since
//! the external definition it names still has the old key.

use std::collections::HashMap;

use tracing::debug;

use crate::error::{EngineError, Result};
use crate::types::NodeId;

use super::{BuilderNode, BuilderStore, Payload};

impl BuilderStore {
    /// Duplicate a node and its subtree, inserting the copy right after the
    /// original among its siblings. Returns the clone's id.
    pub fn duplicate_node(&mut self, id: &NodeId) -> Result<NodeId> {
        let original = self
            .nodes
            .get(id)
            .ok_or_else(|| EngineError::node_not_found(id.as_str()))?
            .clone();

        let subtree = self.subtree_ids(id);
        let mut id_map: HashMap<NodeId, NodeId> = HashMap::new();
        for old in &subtree {
            id_map.insert(old.clone(), NodeId::new());
        }

        let mut used = self.collect_keys();
        let clone_id = id_map[id].clone();

        // Clone nodes top-down so parents exist before their children.
        for old in &subtree {
            let Some(source) = self.nodes.get(old).cloned() else {
                continue;
            };
            let parent = if old == id {
                original.parent.clone()
            } else {
                source.parent.as_ref().map(|p| id_map[p].clone())
            };
            let mut payload = source.payload.clone();
            if let Payload::Field { def: Some(def), .. } = &mut payload {
                let fresh = super::unique_key(&def.key, &used);
                used.insert(fresh.clone());
                def.key = fresh;
            }
            let index = if old == id {
                // Right after the original within its slot.
                Some(original.order + 1)
            } else {
                None
            };
            self.insert_node(
                BuilderNode {
                    id: id_map[old].clone(),
                    parent,
                    slot: source.slot.clone(),
                    order: 0,
                    payload,
                },
                index,
            );
        }

        debug!(original = %id, clone = %clone_id, nodes = subtree.len(), "duplicated subtree");
        Ok(clone_id)
    }

    /// Duplicate a section. Same as [`duplicate_node`] but rejects
    /// non-section targets.
    ///
    /// [`duplicate_node`]: BuilderStore::duplicate_node
    pub fn duplicate_section(&mut self, id: &NodeId) -> Result<NodeId> {
        let node = self
            .nodes
            .get(id)
            .ok_or_else(|| EngineError::node_not_found(id.as_str()))?;
        if !matches!(node.payload, Payload::Section { .. }) {
            return Err(EngineError::NotASection { id: id.to_string() });
        }
        self.duplicate_node(id)
    }
}
