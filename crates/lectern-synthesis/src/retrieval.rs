//! Retrieval orchestration: query embedding, index search, metadata join,
//! and the dedup/reference/context helpers shared by the synthesis stages.

use std::collections::HashSet;

use lectern_db::{ChunkRepository, DocumentRepository, Reference};
use lectern_ingestion::EmbeddingClient;
use serde::Serialize;
use tracing::instrument;
use uuid::Uuid;

use crate::error::SynthesisError;

/// One retrieval hit: a chunk snippet with the owning document's provenance.
/// Transient — produced per query, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub snippet: String,
    pub metadata: serde_json::Value,
    pub source_url: String,
    pub distance: f32,
}

#[derive(Clone)]
pub struct Retriever {
    documents: DocumentRepository,
    chunks: ChunkRepository,
    embedder: EmbeddingClient,
}

impl Retriever {
    pub fn new(
        documents: DocumentRepository,
        chunks: ChunkRepository,
        embedder: EmbeddingClient,
    ) -> Self {
        Self { documents, chunks, embedder }
    }

    /// Embed the query, search the index, and join document metadata.
    /// Results are ordered by ascending distance and carry per-chunk
    /// provenance; deduplication is left to the callers that need it.
    #[instrument(skip(self))]
    pub async fn retrieve(
        &self,
        query: &str,
        scope: Option<Uuid>,
        top_k: usize,
    ) -> Result<Vec<SearchResult>, SynthesisError> {
        let embedding = self.embedder.embed(query).await?;
        if embedding.is_empty() {
            return Ok(Vec::new());
        }

        let hits = self.chunks.search_similar(&embedding, top_k, scope).await?;

        let mut results = Vec::with_capacity(hits.len());
        for (chunk, distance) in hits {
            let Some(doc) = self.documents.find_by_id(chunk.document_id).await? else {
                continue;
            };
            let metadata = if doc.metadata.is_null() {
                serde_json::json!({ "title": doc.title, "sourceUrl": doc.source_url })
            } else {
                doc.metadata
            };
            results.push(SearchResult {
                snippet: chunk.content,
                metadata,
                source_url: doc.source_url,
                distance,
            });
        }
        Ok(results)
    }
}

/// Deduplicate by source URL, keeping the first occurrence of each. The
/// input is assumed distance-sorted, so "first" is the lowest distance.
pub fn dedup_by_source(results: &[SearchResult]) -> Vec<&SearchResult> {
    let mut seen = HashSet::new();
    results
        .iter()
        .filter(|r| seen.insert(r.source_url.as_str()))
        .collect()
}

/// Build the reference list: ordinal ids 1..N in first-seen order, one entry
/// per distinct URL.
pub fn build_references(results: &[SearchResult]) -> Vec<Reference> {
    dedup_by_source(results)
        .into_iter()
        .enumerate()
        .map(|(i, r)| Reference {
            id: (i + 1) as u32,
            title: result_title(r),
            url: r.source_url.clone(),
        })
        .collect()
}

/// Build the context string handed to the generation capability: one
/// `Source N` block per distinct URL, in reference order.
pub fn build_context(results: &[SearchResult]) -> String {
    dedup_by_source(results)
        .into_iter()
        .enumerate()
        .map(|(i, r)| {
            format!("Source {}:\n{}\nSource URL: {}\n", i + 1, r.snippet, r.source_url)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn result_title(r: &SearchResult) -> String {
    r.metadata["title"]
        .as_str()
        .filter(|t| !t.is_empty())
        .unwrap_or("Untitled Source")
        .to_string()
}
