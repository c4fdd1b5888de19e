//! Embedding client — wraps the external embedding capability for chunk and
//! query vectors.
//!
//! Failures surface as errors rather than fabricated vectors: a zero vector
//! in the index would silently corrupt similarity ranking, so a chunk whose
//! embedding cannot be produced is skipped by the caller instead.

use std::sync::Arc;

use lectern_db::EMBEDDING_DIM;
use lectern_llm::{retry_once, LlmBackend};
use tracing::instrument;

use crate::error::IngestError;

#[derive(Clone)]
pub struct EmbeddingClient {
    backend: Arc<dyn LlmBackend>,
    dim: usize,
}

impl EmbeddingClient {
    pub fn new(backend: Arc<dyn LlmBackend>) -> Self {
        Self { backend, dim: EMBEDDING_DIM }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Embed one text. Whitespace-only input returns an empty vector without
    /// invoking the backend. Transport failures are retried once; a persistent
    /// failure or a wrong-sized vector is an error.
    #[instrument(skip(self, text), fields(len = text.len()))]
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, IngestError> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let vector = retry_once(|| self.backend.embed(text, self.dim)).await?;

        if vector.len() != self.dim {
            return Err(IngestError::EmbeddingDimension {
                expected: self.dim,
                actual: vector.len(),
            });
        }
        Ok(vector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use lectern_llm::{LlmError, LlmRequest, LlmResponse};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingBackend {
        calls: AtomicUsize,
        dim: usize,
    }

    #[async_trait]
    impl LlmBackend for CountingBackend {
        async fn complete(&self, _req: LlmRequest) -> Result<LlmResponse, LlmError> {
            unreachable!("embedding client never completes")
        }

        async fn embed(&self, _text: &str, _dim: usize) -> Result<Vec<f32>, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![0.5; self.dim])
        }

        fn model_id(&self) -> &str {
            "counting"
        }
    }

    #[tokio::test]
    async fn test_whitespace_input_skips_backend() {
        let backend = Arc::new(CountingBackend { calls: AtomicUsize::new(0), dim: EMBEDDING_DIM });
        let client = EmbeddingClient::new(backend.clone());
        assert!(client.embed("   \n\t ").await.unwrap().is_empty());
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_embed_returns_fixed_dimension() {
        let backend = Arc::new(CountingBackend { calls: AtomicUsize::new(0), dim: EMBEDDING_DIM });
        let client = EmbeddingClient::new(backend);
        let v = client.embed("some chunk text").await.unwrap();
        assert_eq!(v.len(), EMBEDDING_DIM);
    }

    #[tokio::test]
    async fn test_wrong_dimension_is_an_error() {
        let backend = Arc::new(CountingBackend { calls: AtomicUsize::new(0), dim: 8 });
        let client = EmbeddingClient::new(backend);
        let err = client.embed("text").await;
        assert!(matches!(
            err,
            Err(IngestError::EmbeddingDimension { expected: EMBEDDING_DIM, actual: 8 })
        ));
    }
}
