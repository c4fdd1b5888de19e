//! Synthesis error taxonomy. Only session-level preconditions are
//! user-visible failures; malformed generation output never lands here — it
//! degrades to a default artifact in the decode step.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("Session not found: {0}")]
    SessionNotFound(Uuid),

    /// The session has no ingested documents; generation is not attempted.
    #[error("Not enough material to synthesize from")]
    NotEnoughMaterial,

    /// Another request is generating this artifact right now.
    #[error("Artifact generation already in progress")]
    GenerationInProgress,

    /// Fatal to session creation, surfaced to the caller, never retried here.
    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("Generation error: {0}")]
    Llm(#[from] lectern_llm::LlmError),

    #[error("Retrieval error: {0}")]
    Ingest(#[from] lectern_ingestion::IngestError),

    #[error("Store error: {0}")]
    Db(#[from] lectern_db::DbError),
}
