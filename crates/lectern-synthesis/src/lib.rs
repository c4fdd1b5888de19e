//! Synthesis layer: retrieval-augmented generation over ingested sessions.
//!
//! Produces the per-session artifacts — narrative summary, critique list,
//! tabular summary, knowledge graph, chart suggestions — plus the chat-style
//! answerer they share, and the `ResearchPipeline` aggregate that drives
//! discovery → ingestion → retrieval → synthesis for one research query.

pub mod chat;
pub mod criticize;
pub mod decode;
pub mod error;
pub mod knowledge_graph;
pub mod retrieval;
pub mod session;
pub mod summarize;
pub mod table;
pub mod visualizations;

pub use chat::ChatAnswer;
pub use decode::{decode_artifact, strip_code_fences, ArtifactDecode};
pub use error::SynthesisError;
pub use retrieval::{build_context, build_references, dedup_by_source, Retriever, SearchResult};
pub use session::{
    DailySessionQuota, PipelineOptions, ResearchPipeline, SessionGate, UnlimitedGate,
};
