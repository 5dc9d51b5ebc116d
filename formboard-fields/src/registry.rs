//! DefinitionSet — in-memory registry of field definitions.
//!
//! Keeps insertion order and maintains indexes for fast lookup by both id and
//! key. Persistence is the caller's concern: ingestion is from JSON or YAML
//! strings, never from the filesystem.

use std::collections::HashMap;

use tracing::debug;

use crate::error::{FieldsError, Result};
use crate::types::FieldDefinition;

/// An ordered collection of field definitions indexed by id and key.
#[derive(Debug, Clone, Default)]
pub struct DefinitionSet {
    defs: Vec<FieldDefinition>,
    id_index: HashMap<String, usize>,
    key_index: HashMap<String, usize>,
}

impl DefinitionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from definitions, rejecting duplicate ids or keys.
    pub fn from_defs(defs: impl IntoIterator<Item = FieldDefinition>) -> Result<Self> {
        let mut set = Self::new();
        for def in defs {
            set.insert(def)?;
        }
        Ok(set)
    }

    /// Parse a JSON array of definitions.
    pub fn from_json(json: &str) -> Result<Self> {
        let defs: Vec<FieldDefinition> = serde_json::from_str(json)?;
        let set = Self::from_defs(defs)?;
        debug!(definitions = set.len(), "definition set loaded from JSON");
        Ok(set)
    }

    /// Parse a YAML sequence of definitions.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let defs: Vec<FieldDefinition> = serde_yaml_ng::from_str(yaml)?;
        let set = Self::from_defs(defs)?;
        debug!(definitions = set.len(), "definition set loaded from YAML");
        Ok(set)
    }

    /// Add a definition, rejecting id/key collisions.
    pub fn insert(&mut self, def: FieldDefinition) -> Result<()> {
        if self.id_index.contains_key(&def.id) {
            return Err(FieldsError::DuplicateId { id: def.id });
        }
        if self.key_index.contains_key(&def.key) {
            return Err(FieldsError::DuplicateKey { key: def.key });
        }
        let idx = self.defs.len();
        self.id_index.insert(def.id.clone(), idx);
        self.key_index.insert(def.key.clone(), idx);
        self.defs.push(def);
        Ok(())
    }

    /// Look up a definition by its id.
    pub fn get_by_id(&self, id: &str) -> Option<&FieldDefinition> {
        self.id_index.get(id).map(|&i| &self.defs[i])
    }

    /// Look up a definition by its key.
    pub fn get_by_key(&self, key: &str) -> Option<&FieldDefinition> {
        self.key_index.get(key).map(|&i| &self.defs[i])
    }

    /// Look up by id first, then key.
    pub fn get(&self, reference: &str) -> Option<&FieldDefinition> {
        self.get_by_id(reference).or_else(|| self.get_by_key(reference))
    }

    /// Look up by id or key, erroring when nothing matches. For callers that
    /// treat a dangling reference as fatal rather than a placeholder.
    pub fn require(&self, reference: &str) -> Result<&FieldDefinition> {
        self.get(reference)
            .ok_or_else(|| FieldsError::DefinitionNotFound {
                reference: reference.to_string(),
            })
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.key_index.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// Definitions in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.defs.iter()
    }
}
