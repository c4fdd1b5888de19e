//! Ingestion pipeline: paper discovery, PDF text extraction, chunking,
//! embedding, and per-session document indexing.

pub mod chunker;
pub mod embedding;
pub mod error;
pub mod models;
pub mod pdf_text;
pub mod pipeline;
pub mod sources;

pub use chunker::{split, ChunkerConfig};
pub use embedding::EmbeddingClient;
pub use error::IngestError;
pub use models::DiscoveredPaper;
pub use pipeline::{run_ingestion, IngestionOutcome};
pub use sources::{arxiv::ArxivClient, LiteratureSource};
