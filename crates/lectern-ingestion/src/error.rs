//! Ingestion error taxonomy. All of these are per-item errors inside the
//! pipeline's fan-outs: they are caught at the task boundary, logged, and
//! excluded from the aggregate, never failing a sibling paper.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    /// Network/HTTP failure fetching a feed or PDF.
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// Malformed feed entry or unparseable PDF.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The embedding capability failed; the affected paper is not indexed.
    #[error("Embedding error: {0}")]
    Embedding(#[from] lectern_llm::LlmError),

    /// The embedding capability returned a vector of the wrong size.
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    EmbeddingDimension { expected: usize, actual: usize },

    #[error("Store error: {0}")]
    Store(#[from] lectern_db::DbError),

    #[error("Egress blocked: {0}")]
    Blocked(String),
}

impl From<lectern_common::LecternError> for IngestError {
    fn from(err: lectern_common::LecternError) -> Self {
        match err {
            lectern_common::LecternError::Http(e) => IngestError::Fetch(e.to_string()),
            lectern_common::LecternError::Security(msg) => IngestError::Blocked(msg),
            other => IngestError::Fetch(other.to_string()),
        }
    }
}

impl From<reqwest::Error> for IngestError {
    fn from(err: reqwest::Error) -> Self {
        IngestError::Fetch(err.to_string())
    }
}
