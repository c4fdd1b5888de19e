//! Per-session ingestion pipeline.
//!
//! Orchestrates the flow for one batch of discovered papers:
//!   1. Deduplicate papers by source URL
//!   2. Per paper (concurrently, isolated error domains):
//!      a. extract text from the PDF payload
//!      b. split into chunks
//!      c. embed every chunk (concurrently within the paper)
//!      d. insert the document and its chunk batch, all-or-nothing
//!   3. Aggregate a result summary
//!
//! A paper whose fetch, extraction or embedding failed is skipped entirely —
//! no document record, no partial chunk set — and never blocks its siblings.

use std::collections::HashSet;
use std::time::Instant;

use futures::future::join_all;
use lectern_db::{Chunk, ChunkRepository, Document, DocumentRepository};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::chunker::{split, ChunkerConfig};
use crate::embedding::EmbeddingClient;
use crate::error::IngestError;
use crate::models::DiscoveredPaper;

/// Summary of one ingestion run.
#[derive(Debug, Clone)]
pub struct IngestionOutcome {
    pub session_id: Uuid,
    /// Papers handed to the pipeline after URL deduplication.
    pub papers_seen: usize,
    pub papers_ingested: usize,
    pub papers_skipped: usize,
    pub chunks_inserted: usize,
    pub errors: Vec<String>,
    pub duration_ms: u64,
}

/// Runs ingestion for one session's batch of papers.
///
/// Non-destructive: every per-paper error is caught at the task boundary,
/// logged, recorded in the outcome, and the rest of the batch continues.
#[instrument(skip_all, fields(session_id = %session_id, papers = papers.len()))]
pub async fn run_ingestion(
    papers: Vec<DiscoveredPaper>,
    session_id: Uuid,
    documents: &DocumentRepository,
    chunks: &ChunkRepository,
    embedder: &EmbeddingClient,
    chunker_cfg: &ChunkerConfig,
) -> IngestionOutcome {
    let t0 = Instant::now();

    // Papers are deduplicated by source URL before any work, first seen wins.
    let mut seen = HashSet::new();
    let papers: Vec<DiscoveredPaper> = papers
        .into_iter()
        .filter(|p| seen.insert(p.source_url.clone()))
        .collect();

    let mut outcome = IngestionOutcome {
        session_id,
        papers_seen: papers.len(),
        papers_ingested: 0,
        papers_skipped: 0,
        chunks_inserted: 0,
        errors: Vec::new(),
        duration_ms: 0,
    };

    let results = join_all(papers.into_iter().map(|paper| {
        let title = paper.title.clone();
        async move {
            let res =
                ingest_paper(paper, session_id, documents, chunks, embedder, chunker_cfg).await;
            (title, res)
        }
    }))
    .await;

    for (title, result) in results {
        match result {
            Ok(Some(n)) => {
                outcome.papers_ingested += 1;
                outcome.chunks_inserted += n;
            }
            Ok(None) => {
                outcome.papers_skipped += 1;
            }
            Err(e) => {
                outcome.papers_skipped += 1;
                let msg = format!("{title}: {e}");
                warn!("Paper ingestion failed: {msg}");
                outcome.errors.push(msg);
            }
        }
    }

    outcome.duration_ms = t0.elapsed().as_millis() as u64;
    info!(
        papers_seen     = outcome.papers_seen,
        papers_ingested = outcome.papers_ingested,
        papers_skipped  = outcome.papers_skipped,
        chunks_inserted = outcome.chunks_inserted,
        duration_ms     = outcome.duration_ms,
        errors          = outcome.errors.len(),
        "Ingestion complete"
    );
    outcome
}

/// Ingest one paper. Returns Ok(None) when the paper had no PDF payload,
/// Ok(Some(n)) with the number of chunks stored, or the error that made the
/// paper unusable. The document record is only written once every chunk of
/// the paper has an embedding, so failure leaves no half-written state.
async fn ingest_paper(
    paper: DiscoveredPaper,
    session_id: Uuid,
    documents: &DocumentRepository,
    chunks: &ChunkRepository,
    embedder: &EmbeddingClient,
    chunker_cfg: &ChunkerConfig,
) -> Result<Option<usize>, IngestError> {
    let Some(pdf_bytes) = paper.pdf_bytes.as_deref() else {
        debug!(title = %paper.title, "No PDF payload, skipping paper");
        return Ok(None);
    };

    let text = crate::pdf_text::extract_text(pdf_bytes)?;
    let pieces = split(&text, chunker_cfg.max_chars);

    let embeddings = join_all(pieces.iter().map(|piece| embedder.embed(piece))).await;

    let mut pairs = Vec::with_capacity(pieces.len());
    for (piece, embedding) in pieces.into_iter().zip(embeddings) {
        let embedding = embedding?;
        if embedding.is_empty() {
            continue;
        }
        pairs.push((piece, embedding));
    }

    let document = Document::new(
        session_id,
        paper.title.clone(),
        text,
        paper.metadata(),
        paper.source_url.clone(),
    );
    documents.insert(&document).await?;

    let rows: Vec<Chunk> = pairs
        .into_iter()
        .enumerate()
        .map(|(i, (content, embedding))| Chunk::new(document.id, i as i64, content, embedding))
        .collect();
    let inserted = chunks.insert_batch(&rows).await?;

    info!(
        document_id = %document.id,
        title = %paper.title,
        chunks = inserted,
        "Paper ingested"
    );
    Ok(Some(inserted))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use lectern_db::{Database, ResearchSession, SessionRepository};
    use lectern_llm::{LlmBackend, LlmError, LlmRequest, LlmResponse};
    use std::sync::Arc;

    /// Deterministic embedding backend: a unit vector whose hot component is
    /// derived from the text bytes.
    struct HashEmbedBackend;

    #[async_trait]
    impl LlmBackend for HashEmbedBackend {
        async fn complete(&self, _req: LlmRequest) -> Result<LlmResponse, LlmError> {
            Err(LlmError::Unavailable("completions not mocked".into()))
        }

        async fn embed(&self, text: &str, dim: usize) -> Result<Vec<f32>, LlmError> {
            let mut v = vec![0.0; dim];
            let hot = text.bytes().map(|b| b as usize).sum::<usize>() % dim;
            v[hot] = 1.0;
            Ok(v)
        }

        fn model_id(&self) -> &str {
            "hash-embed"
        }
    }

    /// Build a small real PDF containing the given line of text.
    fn fixture_pdf(text: &str) -> Vec<u8> {
        use lopdf::content::{Content, Operation};
        use lopdf::{dictionary, Document as PdfDocument, Object, Stream};

        let mut doc = PdfDocument::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![100.into(), 600.into()]),
                Operation::new("Tj", vec![Object::string_literal(text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().unwrap(),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    fn paper(url: &str, pdf_bytes: Option<Vec<u8>>) -> DiscoveredPaper {
        DiscoveredPaper {
            title: format!("Paper {url}"),
            authors: vec!["Ada Lovelace".to_string()],
            published: None,
            updated: None,
            doi: None,
            journal_ref: None,
            comment: None,
            categories: vec!["cs.IR".to_string()],
            source_url: url.to_string(),
            pdf_url: format!("{url}.pdf"),
            pdf_bytes,
        }
    }

    struct Harness {
        db: Arc<Database>,
        documents: DocumentRepository,
        chunks: ChunkRepository,
        embedder: EmbeddingClient,
        session_id: Uuid,
    }

    async fn harness() -> Harness {
        let db = Arc::new(Database::new());
        let sessions = SessionRepository::new(db.clone());
        let session = ResearchSession::new("owner".into(), "q".into(), "eq".into());
        let session_id = session.id;
        sessions.insert(&session).await.unwrap();
        Harness {
            documents: DocumentRepository::new(db.clone()),
            chunks: ChunkRepository::new(db.clone()),
            embedder: EmbeddingClient::new(Arc::new(HashEmbedBackend)),
            db,
            session_id,
        }
    }

    #[tokio::test]
    async fn test_papers_without_pdfs_create_no_documents() {
        let h = harness().await;
        let outcome = run_ingestion(
            vec![paper("http://arxiv.org/abs/1", None)],
            h.session_id,
            &h.documents,
            &h.chunks,
            &h.embedder,
            &ChunkerConfig::default(),
        )
        .await;

        assert_eq!(outcome.papers_seen, 1);
        assert_eq!(outcome.papers_ingested, 0);
        assert_eq!(outcome.papers_skipped, 1);
        assert!(outcome.errors.is_empty());
        assert_eq!(h.db.stats().await.documents, 0);
    }

    #[tokio::test]
    async fn test_failed_paper_does_not_block_siblings() {
        let h = harness().await;
        // Three good PDFs and one whose fetch "failed" (no payload): the
        // batch still ingests exactly three documents.
        let papers = vec![
            paper("http://arxiv.org/abs/1", Some(fixture_pdf("First paper body."))),
            paper("http://arxiv.org/abs/2", Some(fixture_pdf("Second paper body."))),
            paper("http://arxiv.org/abs/3", None),
            paper("http://arxiv.org/abs/4", Some(fixture_pdf("Fourth paper body."))),
        ];
        let outcome = run_ingestion(
            papers,
            h.session_id,
            &h.documents,
            &h.chunks,
            &h.embedder,
            &ChunkerConfig::default(),
        )
        .await;

        assert_eq!(outcome.papers_ingested, 3);
        assert_eq!(outcome.papers_skipped, 1);
        assert_eq!(h.db.stats().await.documents, 3);
        assert!(outcome.chunks_inserted >= 3);
        assert_eq!(h.db.stats().await.chunks, outcome.chunks_inserted);
    }

    #[tokio::test]
    async fn test_unparseable_pdf_is_skipped_with_error() {
        let h = harness().await;
        let papers = vec![
            paper("http://arxiv.org/abs/1", Some(b"not a pdf at all".to_vec())),
            paper("http://arxiv.org/abs/2", Some(fixture_pdf("Good paper body."))),
        ];
        let outcome = run_ingestion(
            papers,
            h.session_id,
            &h.documents,
            &h.chunks,
            &h.embedder,
            &ChunkerConfig::default(),
        )
        .await;

        assert_eq!(outcome.papers_ingested, 1);
        assert_eq!(outcome.papers_skipped, 1);
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(h.db.stats().await.documents, 1);
    }

    #[tokio::test]
    async fn test_duplicate_urls_collapse_before_ingestion() {
        let h = harness().await;
        let papers = vec![
            paper("http://arxiv.org/abs/1", Some(fixture_pdf("Body one."))),
            paper("http://arxiv.org/abs/1", Some(fixture_pdf("Body one again."))),
        ];
        let outcome = run_ingestion(
            papers,
            h.session_id,
            &h.documents,
            &h.chunks,
            &h.embedder,
            &ChunkerConfig::default(),
        )
        .await;

        assert_eq!(outcome.papers_seen, 1);
        assert_eq!(outcome.papers_ingested, 1);
        assert_eq!(h.db.stats().await.documents, 1);
    }

    #[tokio::test]
    async fn test_embedding_failure_skips_paper_entirely() {
        struct FailingBackend;

        #[async_trait]
        impl LlmBackend for FailingBackend {
            async fn complete(&self, _req: LlmRequest) -> Result<LlmResponse, LlmError> {
                Err(LlmError::Unavailable("nope".into()))
            }
            async fn embed(&self, _text: &str, _dim: usize) -> Result<Vec<f32>, LlmError> {
                Err(LlmError::Unavailable("embedding down".into()))
            }
            fn model_id(&self) -> &str {
                "failing"
            }
        }

        let h = harness().await;
        let embedder = EmbeddingClient::new(Arc::new(FailingBackend));
        let outcome = run_ingestion(
            vec![paper("http://arxiv.org/abs/1", Some(fixture_pdf("Body.")))],
            h.session_id,
            &h.documents,
            &h.chunks,
            &embedder,
            &ChunkerConfig::default(),
        )
        .await;

        assert_eq!(outcome.papers_ingested, 0);
        assert_eq!(outcome.errors.len(), 1);
        // No document and no partial chunk set was written.
        let stats = h.db.stats().await;
        assert_eq!(stats.documents, 0);
        assert_eq!(stats.chunks, 0);
    }
}
