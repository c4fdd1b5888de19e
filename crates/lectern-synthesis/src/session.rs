//! Research session orchestration.
//!
//! `ResearchPipeline` is the aggregate entry point: it creates sessions
//! (quota gate → query enhancement → discovery → ingestion) and serves the
//! five derived artifacts lazily, generating each on first request and
//! caching it on the session record. Regeneration is always an explicit
//! call, never a side effect of reading.

use std::sync::Arc;

use async_trait::async_trait;
use lectern_db::{
    ArtifactKind, ArtifactValue, ChunkRepository, ClaimOutcome, Database, DbError, Document,
    DocumentRepository, KnowledgeGraph, ResearchSession, SessionRepository, VisualizationSet,
};
use lectern_ingestion::{run_ingestion, ChunkerConfig, EmbeddingClient, LiteratureSource};
use lectern_llm::{Generator, ModelTier};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::criticize::criticize_documents;
use crate::decode::decode_artifact;
use crate::error::SynthesisError;
use crate::knowledge_graph::build_knowledge_graph;
use crate::retrieval::Retriever;
use crate::summarize::summarize_documents;
use crate::table::tabulate_documents;
use crate::visualizations::build_visualizations;

// ── Session gate ──────────────────────────────────────────────────────────────

/// Gate run before a session is created. Quota rules belong to the hosting
/// application; the pipeline only respects the verdict.
#[async_trait]
pub trait SessionGate: Send + Sync {
    async fn authorize(&self, owner_id: &str) -> Result<(), SynthesisError>;
}

pub struct UnlimitedGate;

#[async_trait]
impl SessionGate for UnlimitedGate {
    async fn authorize(&self, _owner_id: &str) -> Result<(), SynthesisError> {
        Ok(())
    }
}

/// Soft cap on sessions created per owner per UTC day.
pub struct DailySessionQuota {
    max_per_day: usize,
    sessions: SessionRepository,
}

impl DailySessionQuota {
    pub fn new(max_per_day: usize, sessions: SessionRepository) -> Self {
        Self { max_per_day, sessions }
    }
}

#[async_trait]
impl SessionGate for DailySessionQuota {
    async fn authorize(&self, owner_id: &str) -> Result<(), SynthesisError> {
        let today = chrono::Utc::now().date_naive();
        let used = self.sessions.count_created_on(owner_id, today).await?;
        if used >= self.max_per_day {
            return Err(SynthesisError::QuotaExceeded(format!(
                "{used}/{} sessions used today",
                self.max_per_day
            )));
        }
        Ok(())
    }
}

// ── Pipeline ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Papers a session aims to ingest.
    pub min_papers: usize,
    /// Retrieval depth for synthesis stages.
    pub top_k: usize,
    pub chunker: ChunkerConfig,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            min_papers: 4,
            top_k: 20,
            chunker: ChunkerConfig::default(),
        }
    }
}

impl From<&lectern_common::Config> for PipelineOptions {
    fn from(cfg: &lectern_common::Config) -> Self {
        Self {
            min_papers: cfg.discovery.min_papers,
            top_k: cfg.retrieval.top_k,
            chunker: ChunkerConfig { max_chars: cfg.chunking.max_chars },
        }
    }
}

/// The aggregate orchestrator for research sessions. All collaborators are
/// injected; the pipeline owns no ambient state.
pub struct ResearchPipeline {
    sessions: SessionRepository,
    documents: DocumentRepository,
    chunks: ChunkRepository,
    retriever: Retriever,
    embedder: EmbeddingClient,
    generator: Generator,
    source: Arc<dyn LiteratureSource>,
    gate: Arc<dyn SessionGate>,
    options: PipelineOptions,
}

impl ResearchPipeline {
    pub fn new(
        db: Arc<Database>,
        source: Arc<dyn LiteratureSource>,
        generator: Generator,
        gate: Arc<dyn SessionGate>,
        options: PipelineOptions,
    ) -> Self {
        let sessions = SessionRepository::new(db.clone());
        let documents = DocumentRepository::new(db.clone());
        let chunks = ChunkRepository::new(db);
        let embedder = EmbeddingClient::new(generator.backend());
        let retriever = Retriever::new(documents.clone(), chunks.clone(), embedder.clone());
        Self {
            sessions,
            documents,
            chunks,
            retriever,
            embedder,
            generator,
            source,
            gate,
            options,
        }
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    // ── Session lifecycle ────────────────────────────────────────────────────

    /// Create a session for a query: authorize, derive search keywords and an
    /// enhanced query, persist the session, then discover and ingest papers.
    /// Discovery failure degrades to an empty session rather than an error;
    /// every synthesis call on such a session reports NotEnoughMaterial.
    #[instrument(skip(self))]
    pub async fn create_session(
        &self,
        query: &str,
        owner_id: &str,
    ) -> Result<ResearchSession, SynthesisError> {
        self.gate.authorize(owner_id).await?;

        let keywords = self.extract_search_keywords(query).await;
        let enhanced_query = self.enhance_query(query, &keywords).await?;
        info!(enhanced_query = %enhanced_query, "Session query enhanced");

        let session =
            ResearchSession::new(owner_id.to_string(), query.to_string(), enhanced_query);
        self.sessions.insert(&session).await?;

        let papers = match self
            .source
            .discover(&keywords.join(" "), self.options.min_papers)
            .await
        {
            Ok(papers) => papers,
            Err(e) => {
                warn!(error = %e, "Discovery failed, session will have no documents");
                Vec::new()
            }
        };

        let outcome = run_ingestion(
            papers,
            session.id,
            &self.documents,
            &self.chunks,
            &self.embedder,
            &self.options.chunker,
        )
        .await;
        info!(
            session_id = %session.id,
            papers_ingested = outcome.papers_ingested,
            chunks_inserted = outcome.chunks_inserted,
            "Session created"
        );

        Ok(session)
    }

    pub async fn session(&self, id: Uuid) -> Result<ResearchSession, SynthesisError> {
        self.sessions
            .find_by_id(id)
            .await?
            .ok_or(SynthesisError::SessionNotFound(id))
    }

    pub async fn list_sessions(&self, owner_id: &str) -> Result<Vec<ResearchSession>, SynthesisError> {
        Ok(self.sessions.list_by_owner(owner_id).await?)
    }

    /// Delete a session and everything it owns.
    pub async fn delete_session(&self, id: Uuid) -> Result<(), SynthesisError> {
        self.sessions.delete(id).await?;
        Ok(())
    }

    // ── Lazy artifacts ───────────────────────────────────────────────────────

    pub async fn summary(&self, session_id: Uuid) -> Result<String, SynthesisError> {
        let session = self.session(session_id).await?;
        match self.claim(session_id, ArtifactKind::Summary).await? {
            Some(ArtifactValue::Text(text)) => return Ok(text),
            Some(_) => return Err(DbError::ArtifactKindMismatch("summary").into()),
            None => {}
        }
        let result = async {
            let documents = self.material(session.id).await?;
            summarize_documents(&self.generator, &documents).await
        }
        .await;
        self.finish(session_id, ArtifactKind::Summary, ArtifactValue::Text, result)
            .await
    }

    pub async fn critique(&self, session_id: Uuid) -> Result<String, SynthesisError> {
        let session = self.session(session_id).await?;
        match self.claim(session_id, ArtifactKind::Critique).await? {
            Some(ArtifactValue::Text(text)) => return Ok(text),
            Some(_) => return Err(DbError::ArtifactKindMismatch("critique").into()),
            None => {}
        }
        let result = async {
            let documents = self.material(session.id).await?;
            criticize_documents(&self.generator, &documents).await
        }
        .await;
        self.finish(session_id, ArtifactKind::Critique, ArtifactValue::Text, result)
            .await
    }

    pub async fn table(&self, session_id: Uuid) -> Result<String, SynthesisError> {
        let session = self.session(session_id).await?;
        match self.claim(session_id, ArtifactKind::Table).await? {
            Some(ArtifactValue::Text(text)) => return Ok(text),
            Some(_) => return Err(DbError::ArtifactKindMismatch("table").into()),
            None => {}
        }
        let result = async {
            let documents = self.material(session.id).await?;
            tabulate_documents(&self.generator, &documents).await
        }
        .await;
        self.finish(session_id, ArtifactKind::Table, ArtifactValue::Text, result)
            .await
    }

    pub async fn knowledge_graph(&self, session_id: Uuid) -> Result<KnowledgeGraph, SynthesisError> {
        let session = self.session(session_id).await?;
        match self.claim(session_id, ArtifactKind::KnowledgeGraph).await? {
            Some(ArtifactValue::Graph(graph)) => return Ok(graph),
            Some(_) => return Err(DbError::ArtifactKindMismatch("knowledge_graph").into()),
            None => {}
        }
        let result = async {
            self.material(session.id).await?;
            build_knowledge_graph(&self.retriever, &self.generator, &session, self.options.top_k)
                .await
        }
        .await;
        self.finish(session_id, ArtifactKind::KnowledgeGraph, ArtifactValue::Graph, result)
            .await
    }

    pub async fn visualizations(
        &self,
        session_id: Uuid,
    ) -> Result<VisualizationSet, SynthesisError> {
        let session = self.session(session_id).await?;
        match self.claim(session_id, ArtifactKind::Visualizations).await? {
            Some(ArtifactValue::Charts(set)) => return Ok(set),
            Some(_) => return Err(DbError::ArtifactKindMismatch("visualizations").into()),
            None => {}
        }
        let result = async {
            self.material(session.id).await?;
            build_visualizations(&self.retriever, &self.generator, &session, self.options.top_k)
                .await
        }
        .await;
        self.finish(session_id, ArtifactKind::Visualizations, ArtifactValue::Charts, result)
            .await
    }

    // ── Explicit regeneration ────────────────────────────────────────────────

    pub async fn regenerate_summary(&self, session_id: Uuid) -> Result<String, SynthesisError> {
        self.sessions.clear_artifact(session_id, ArtifactKind::Summary).await?;
        self.summary(session_id).await
    }

    pub async fn regenerate_critique(&self, session_id: Uuid) -> Result<String, SynthesisError> {
        self.sessions.clear_artifact(session_id, ArtifactKind::Critique).await?;
        self.critique(session_id).await
    }

    pub async fn regenerate_table(&self, session_id: Uuid) -> Result<String, SynthesisError> {
        self.sessions.clear_artifact(session_id, ArtifactKind::Table).await?;
        self.table(session_id).await
    }

    pub async fn regenerate_knowledge_graph(
        &self,
        session_id: Uuid,
    ) -> Result<KnowledgeGraph, SynthesisError> {
        self.sessions
            .clear_artifact(session_id, ArtifactKind::KnowledgeGraph)
            .await?;
        self.knowledge_graph(session_id).await
    }

    pub async fn regenerate_visualizations(
        &self,
        session_id: Uuid,
    ) -> Result<VisualizationSet, SynthesisError> {
        self.sessions
            .clear_artifact(session_id, ArtifactKind::Visualizations)
            .await?;
        self.visualizations(session_id).await
    }

    // ── Internals ────────────────────────────────────────────────────────────

    /// Claim an artifact slot. Ok(Some(v)) means a stored value exists;
    /// Ok(None) means the claim succeeded and the caller must generate.
    async fn claim(
        &self,
        session_id: Uuid,
        kind: ArtifactKind,
    ) -> Result<Option<ArtifactValue>, SynthesisError> {
        match self.sessions.claim_artifact(session_id, kind).await? {
            ClaimOutcome::AlreadyPresent(value) => Ok(Some(value)),
            ClaimOutcome::InFlight => Err(SynthesisError::GenerationInProgress),
            ClaimOutcome::Claimed => Ok(None),
        }
    }

    /// Store a generated value, or release the claim so the artifact stays
    /// absent and eligible for retry.
    async fn finish<T: Clone>(
        &self,
        session_id: Uuid,
        kind: ArtifactKind,
        wrap: fn(T) -> ArtifactValue,
        result: Result<T, SynthesisError>,
    ) -> Result<T, SynthesisError> {
        match result {
            Ok(value) => {
                self.sessions
                    .complete_artifact(session_id, kind, wrap(value.clone()))
                    .await?;
                Ok(value)
            }
            Err(e) => {
                if let Err(release_err) = self.sessions.release_artifact(session_id, kind).await {
                    warn!(error = %release_err, "Failed to release artifact claim");
                }
                Err(e)
            }
        }
    }

    /// The session's documents, or NotEnoughMaterial when none were ingested.
    async fn material(&self, session_id: Uuid) -> Result<Vec<Document>, SynthesisError> {
        let documents = self.documents.find_by_session(session_id).await?;
        if documents.is_empty() {
            return Err(SynthesisError::NotEnoughMaterial);
        }
        Ok(documents)
    }

    /// Derive search keywords from the raw query. A decode failure falls
    /// back to the query's own leading terms rather than failing creation.
    async fn extract_search_keywords(&self, query: &str) -> Vec<String> {
        let prompt = format!(
            "Extract 2 precise search keywords for this research topic: \"{query}\". \
             Return as JSON array of strings."
        );
        let fallback = || {
            query
                .split_whitespace()
                .take(2)
                .map(str::to_string)
                .collect::<Vec<_>>()
        };

        match self.generator.generate(&prompt, ModelTier::Light).await {
            Ok(raw) => {
                let keywords = decode_artifact::<Vec<String>>(&raw).into_value();
                if keywords.is_empty() {
                    fallback()
                } else {
                    keywords
                }
            }
            Err(e) => {
                warn!(error = %e, "Keyword extraction failed, using raw query terms");
                fallback()
            }
        }
    }

    async fn enhance_query(
        &self,
        query: &str,
        keywords: &[String],
    ) -> Result<String, SynthesisError> {
        let prompt = format!(
            "Given the research topic \"{query}\" and keywords {}, return an enhanced \
             research query with proper focus and clear without unnecessary articles \
             like \"A comparative, The Study\". Return single sentence only.",
            keywords.join(", ")
        );
        Ok(self.generator.generate(&prompt, ModelTier::Default).await?)
    }
}
