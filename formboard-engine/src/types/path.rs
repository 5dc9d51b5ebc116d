//! Field paths: the addresses resolved fields use in the form-value map.
//!
//! Containers contribute nothing to a path. A repeater contributes a `*`
//! wildcard segment that render/validation time replaces with the item index.
//! The field's own key is always the terminal segment.

use serde::{Deserialize, Serialize};

/// One segment of a field path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// A literal key.
    Key(String),
    /// A repeater item slot, bound to an index at render time.
    Wildcard,
}

/// The dotted, possibly wildcarded address of a resolved field.
///
/// Serializes as its template string (`"*.price"`). Two fields resolving to
/// the same definition key under one repeater template share the same path by
/// design — the index is injected later.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct FieldPath(Vec<PathSegment>);

impl FieldPath {
    /// A path consisting of just a key.
    pub fn key(key: impl Into<String>) -> Self {
        Self(vec![PathSegment::Key(key.into())])
    }

    /// Build from prefix segments plus the terminal key.
    pub fn from_segments(prefix: &[PathSegment], key: impl Into<String>) -> Self {
        let mut segments = prefix.to_vec();
        segments.push(PathSegment::Key(key.into()));
        Self(segments)
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    /// Terminal key, if the path ends in one (it always does for resolved
    /// fields).
    pub fn terminal_key(&self) -> Option<&str> {
        match self.0.last() {
            Some(PathSegment::Key(k)) => Some(k),
            _ => None,
        }
    }

    pub fn has_wildcard(&self) -> bool {
        self.0.iter().any(|s| matches!(s, PathSegment::Wildcard))
    }

    /// Template string: segments joined with dots, wildcards as `*`.
    pub fn template(&self) -> String {
        let parts: Vec<&str> = self
            .0
            .iter()
            .map(|s| match s {
                PathSegment::Key(k) => k.as_str(),
                PathSegment::Wildcard => "*",
            })
            .collect();
        parts.join(".")
    }

    /// Substitute wildcards left-to-right with the given item indices,
    /// producing the concrete form-state name. Unconsumed wildcards stay `*`.
    pub fn bind(&self, indices: &[usize]) -> String {
        let mut next = indices.iter();
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|s| match s {
                PathSegment::Key(k) => k.clone(),
                PathSegment::Wildcard => next
                    .next()
                    .map(|i| i.to_string())
                    .unwrap_or_else(|| "*".to_string()),
            })
            .collect();
        parts.join(".")
    }

    /// Whether a concrete dotted path is an instance of this template.
    /// Wildcards match exactly one numeric segment.
    pub fn matches(&self, concrete: &str) -> bool {
        let parts: Vec<&str> = concrete.split('.').collect();
        if parts.len() != self.0.len() {
            return false;
        }
        self.0.iter().zip(parts).all(|(seg, part)| match seg {
            PathSegment::Key(k) => k == part,
            PathSegment::Wildcard => part.parse::<usize>().is_ok(),
        })
    }
}

impl From<String> for FieldPath {
    fn from(s: String) -> Self {
        let segments = s
            .split('.')
            .map(|part| {
                if part == "*" {
                    PathSegment::Wildcard
                } else {
                    PathSegment::Key(part.to_string())
                }
            })
            .collect();
        Self(segments)
    }
}

impl From<FieldPath> for String {
    fn from(path: FieldPath) -> Self {
        path.template()
    }
}

impl std::fmt::Display for FieldPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.template())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_key_path() {
        let path = FieldPath::key("price");
        assert_eq!(path.template(), "price");
        assert!(!path.has_wildcard());
        assert_eq!(path.terminal_key(), Some("price"));
    }

    #[test]
    fn test_repeater_path_template() {
        let prefix = vec![PathSegment::Wildcard];
        let path = FieldPath::from_segments(&prefix, "price");
        assert_eq!(path.template(), "*.price");
        assert!(path.has_wildcard());
    }

    #[test]
    fn test_bind_substitutes_indices() {
        let path = FieldPath::from(String::from("*.items.*.price"));
        assert_eq!(path.bind(&[2, 0]), "2.items.0.price");
        // Not enough indices leaves the remaining wildcard in place
        assert_eq!(path.bind(&[2]), "2.items.*.price");
    }

    #[test]
    fn test_matches_concrete_instances() {
        let path = FieldPath::from(String::from("*.price"));
        assert!(path.matches("0.price"));
        assert!(path.matches("12.price"));
        assert!(!path.matches("price"));
        assert!(!path.matches("x.price"));
        assert!(!path.matches("0.qty"));
    }

    #[test]
    fn test_serde_as_template_string() {
        let path = FieldPath::from(String::from("*.price"));
        let json = serde_json::to_string(&path).unwrap();
        assert_eq!(json, "\"*.price\"");
        let parsed: FieldPath = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, path);
    }
}
