//! Lectern storage layer.
//!
//! An embedded keyed store for research sessions, documents and chunks with
//! a cosine-similarity query capability. The store is deliberately opaque to
//! the rest of the workspace: callers only see the repository types, so the
//! in-memory table set could be swapped for a real vector database without
//! touching the pipeline.

pub mod chunks;
pub mod database;
pub mod documents;
pub mod error;
pub mod schema;
pub mod sessions;

pub use chunks::ChunkRepository;
pub use database::{Database, DatabaseStats};
pub use documents::DocumentRepository;
pub use error::{DbError, Result};
pub use schema::{
    ArtifactKind, ArtifactSlot, ArtifactValue, Chunk, DataPoint, Document, GraphEdge, GraphNode,
    KnowledgeGraph, Reference, ResearchSession, Visualization, VisualizationSet, EMBEDDING_DIM,
};
pub use sessions::{ClaimOutcome, SessionRepository};
