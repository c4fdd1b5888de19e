//! Storage error types.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate entry: {0}")]
    Duplicate(String),

    #[error("Invalid embedding dimension: expected {expected}, got {actual}")]
    InvalidEmbeddingDimension { expected: usize, actual: usize },

    #[error("Artifact value does not match kind {0}")]
    ArtifactKindMismatch(&'static str),

    #[error("Invalid artifact state transition: {0}")]
    InvalidArtifactState(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
