//! Chunk repository with vector similarity search.

use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

use crate::database::Database;
use crate::error::{DbError, Result};
use crate::schema::{Chunk, EMBEDDING_DIM};

/// Relevance cutoff on cosine distance. Assumes near-unit-normalized
/// embeddings, where 1.0 is no better than orthogonal. Verify empirically
/// before pointing the index at a differently normalized embedding space.
pub const MAX_COSINE_DISTANCE: f32 = 1.0;

#[derive(Clone)]
pub struct ChunkRepository {
    db: Arc<Database>,
}

impl ChunkRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert all chunks of one document as an atomic batch: either every
    /// chunk is stored or none is. Each embedding must have EMBEDDING_DIM
    /// components and the owning document must already exist.
    pub async fn insert_batch(&self, chunks: &[Chunk]) -> Result<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }

        for chunk in chunks {
            if chunk.embedding.len() != EMBEDDING_DIM {
                return Err(DbError::InvalidEmbeddingDimension {
                    expected: EMBEDDING_DIM,
                    actual: chunk.embedding.len(),
                });
            }
        }

        let mut tables = self.db.tables.write().await;
        for chunk in chunks {
            if !tables.documents.contains_key(&chunk.document_id) {
                return Err(DbError::NotFound(format!(
                    "document {} for chunk insert",
                    chunk.document_id
                )));
            }
        }
        for chunk in chunks {
            tables.chunks.insert(chunk.id, chunk.clone());
        }
        Ok(chunks.len())
    }

    /// All chunks of a document, ordered by position.
    pub async fn find_by_document(&self, document_id: Uuid) -> Result<Vec<Chunk>> {
        let tables = self.db.tables.read().await;
        let mut chunks: Vec<Chunk> = tables
            .chunks
            .values()
            .filter(|c| c.document_id == document_id)
            .cloned()
            .collect();
        chunks.sort_by_key(|c| c.position);
        Ok(chunks)
    }

    pub async fn count(&self) -> Result<usize> {
        let tables = self.db.tables.read().await;
        Ok(tables.chunks.len())
    }

    /// Top-k nearest chunks by cosine distance, ascending, restricted to
    /// `distance < MAX_COSINE_DISTANCE`. `scope` limits the search to chunks
    /// whose document belongs to that session; `None` searches globally.
    pub async fn search_similar(
        &self,
        query: &[f32],
        top_k: usize,
        scope: Option<Uuid>,
    ) -> Result<Vec<(Chunk, f32)>> {
        if query.len() != EMBEDDING_DIM {
            return Err(DbError::InvalidEmbeddingDimension {
                expected: EMBEDDING_DIM,
                actual: query.len(),
            });
        }

        let tables = self.db.tables.read().await;

        let scoped_docs: Option<HashSet<Uuid>> = scope.map(|session_id| {
            tables
                .documents
                .values()
                .filter(|d| d.session_id == session_id)
                .map(|d| d.id)
                .collect()
        });

        let mut hits: Vec<(Chunk, f32)> = tables
            .chunks
            .values()
            .filter(|c| match &scoped_docs {
                Some(ids) => ids.contains(&c.document_id),
                None => true,
            })
            .map(|c| (c.clone(), cosine_distance(query, &c.embedding)))
            .filter(|(_, d)| *d < MAX_COSINE_DISTANCE)
            .collect();

        hits.sort_by(|a, b| a.1.total_cmp(&b.1));
        hits.truncate(top_k);
        Ok(hits)
    }
}

/// Cosine distance: 1 − cosine similarity. A zero-norm vector is treated as
/// orthogonal to everything (distance 1.0), which the cutoff then excludes.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - dot / (norm_a.sqrt() * norm_b.sqrt())
}
