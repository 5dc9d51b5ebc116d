//! Error types for the field definition registry

use thiserror::Error;

/// Result type for field registry operations
pub type Result<T> = std::result::Result<T, FieldsError>;

/// Errors that can occur in field registry operations
#[derive(Debug, Error)]
pub enum FieldsError {
    /// Definition not found by any alias
    #[error("field definition not found: {reference}")]
    DefinitionNotFound { reference: String },

    /// Duplicate definition key
    #[error("duplicate field key: {key}")]
    DuplicateKey { key: String },

    /// Duplicate definition id
    #[error("duplicate field id: {id}")]
    DuplicateId { id: String },

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FieldsError::DefinitionNotFound {
            reference: "price".into(),
        };
        assert_eq!(err.to_string(), "field definition not found: price");
    }

    #[test]
    fn test_duplicate_key_display() {
        let err = FieldsError::DuplicateKey { key: "name".into() };
        assert!(err.to_string().contains("name"));
    }
}
