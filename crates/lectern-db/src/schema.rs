//! Record types stored by the Lectern database.

use serde::{Deserialize, Serialize};

/// Embedding dimension used across the whole index. Every stored vector and
/// every query vector must have exactly this many components.
pub const EMBEDDING_DIM: usize = 1536;

// =============================================================================
// Document
// =============================================================================

/// A paper successfully converted to text, owned by one research session.
/// Immutable after creation apart from its relation to chunks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: uuid::Uuid,
    pub session_id: uuid::Uuid,
    pub title: String,
    /// Full extracted text.
    pub content: String,
    /// Discovery metadata (authors, dates, DOI, categories, …) as stored.
    pub metadata: serde_json::Value,
    pub source_url: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Document {
    pub fn new(
        session_id: uuid::Uuid,
        title: String,
        content: String,
        metadata: serde_json::Value,
        source_url: String,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            session_id,
            title,
            content,
            metadata,
            source_url,
            created_at: chrono::Utc::now(),
        }
    }
}

// =============================================================================
// Chunk
// =============================================================================

/// A bounded span of a document's text with its embedding vector.
/// Created during ingestion, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: uuid::Uuid,
    pub document_id: uuid::Uuid,
    pub position: i64,
    pub content: String,
    pub embedding: Vec<f32>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Chunk {
    pub fn new(document_id: uuid::Uuid, position: i64, content: String, embedding: Vec<f32>) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            document_id,
            position,
            content,
            embedding,
            created_at: chrono::Utc::now(),
        }
    }
}

// =============================================================================
// Research session
// =============================================================================

/// One end-to-end research query and its derived artifacts.
/// Each artifact is independently optional and independently regenerable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchSession {
    pub id: uuid::Uuid,
    pub owner_id: String,
    pub original_query: String,
    pub enhanced_query: String,
    pub summary: ArtifactSlot<String>,
    pub critique: ArtifactSlot<String>,
    pub table: ArtifactSlot<String>,
    pub knowledge_graph: ArtifactSlot<KnowledgeGraph>,
    pub visualizations: ArtifactSlot<VisualizationSet>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl ResearchSession {
    pub fn new(owner_id: String, original_query: String, enhanced_query: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            owner_id,
            original_query,
            enhanced_query,
            summary: ArtifactSlot::Absent,
            critique: ArtifactSlot::Absent,
            table: ArtifactSlot::Absent,
            knowledge_graph: ArtifactSlot::Absent,
            visualizations: ArtifactSlot::Absent,
            created_at: chrono::Utc::now(),
        }
    }
}

/// Per-artifact lifecycle: Absent → Generating → Present. Generating falls
/// back to Absent on failure; Present never regresses except by an explicit
/// clear.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactSlot<T> {
    #[default]
    Absent,
    Generating,
    Present(T),
}

impl<T> ArtifactSlot<T> {
    pub fn is_present(&self) -> bool {
        matches!(self, ArtifactSlot::Present(_))
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            ArtifactSlot::Present(v) => Some(v),
            _ => None,
        }
    }
}

/// The five artifact kinds a session can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Summary,
    Critique,
    Table,
    KnowledgeGraph,
    Visualizations,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Summary        => "summary",
            ArtifactKind::Critique       => "critique",
            ArtifactKind::Table          => "table",
            ArtifactKind::KnowledgeGraph => "knowledge_graph",
            ArtifactKind::Visualizations => "visualizations",
        }
    }
}

/// A stored artifact payload, tagged by shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ArtifactValue {
    Text(String),
    Graph(KnowledgeGraph),
    Charts(VisualizationSet),
}

// =============================================================================
// Derived structures persisted inside artifacts
// =============================================================================

/// A deduplicated, ordinally-identified citation entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    pub id: u32,
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    pub label: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeGraph {
    #[serde(default)]
    pub nodes: Vec<GraphNode>,
    #[serde(default)]
    pub edges: Vec<GraphEdge>,
    #[serde(default)]
    pub references: Vec<Reference>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub name: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visualization {
    pub title: String,
    /// Suggested chart type: "bar", "pie" or "line".
    #[serde(rename = "type")]
    pub chart_type: String,
    #[serde(default)]
    pub data: Vec<DataPoint>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisualizationSet {
    #[serde(default)]
    pub visualizations: Vec<Visualization>,
}
