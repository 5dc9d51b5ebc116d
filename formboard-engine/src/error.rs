//! Error types for the layout engine

use thiserror::Error;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that can occur in layout engine operations
#[derive(Debug, Error)]
pub enum EngineError {
    /// Persisted layout carries a version this build cannot read
    #[error("unsupported layout version: {version}")]
    UnsupportedVersion { version: u32 },

    /// Node not found in the builder store
    #[error("node not found: {id}")]
    NodeNotFound { id: String },

    /// Operation requires a section node
    #[error("node is not a section: {id}")]
    NotASection { id: String },

    /// Operation requires a field node
    #[error("node is not a field: {id}")]
    NotAField { id: String },

    /// Operation requires a container node
    #[error("node cannot hold children: {id}")]
    NotAContainer { id: String },

    /// Tab id not declared on the tabs node
    #[error("tab '{tab}' not found on tabs node {tabs}")]
    TabNotFound { tabs: String, tab: String },

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EngineError {
    /// Create a node-not-found error
    pub fn node_not_found(id: impl Into<String>) -> Self {
        Self::NodeNotFound { id: id.into() }
    }

    /// Create a not-a-container error
    pub fn not_a_container(id: impl Into<String>) -> Self {
        Self::NotAContainer { id: id.into() }
    }
}
