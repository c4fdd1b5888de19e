//! Research session repository, including the artifact state machine.

use std::sync::Arc;
use uuid::Uuid;

use crate::database::Database;
use crate::error::{DbError, Result};
use crate::schema::{ArtifactKind, ArtifactSlot, ArtifactValue, ResearchSession};

/// Result of trying to claim an artifact slot for generation.
#[derive(Debug, Clone, PartialEq)]
pub enum ClaimOutcome {
    /// The slot moved Absent → Generating; the caller owns generation now.
    Claimed,
    /// The artifact already exists; use the stored value.
    AlreadyPresent(ArtifactValue),
    /// Another caller is generating it right now.
    InFlight,
}

#[derive(Clone)]
pub struct SessionRepository {
    db: Arc<Database>,
}

impl SessionRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub async fn insert(&self, session: &ResearchSession) -> Result<()> {
        let mut tables = self.db.tables.write().await;
        tables.sessions.insert(session.id, session.clone());
        Ok(())
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<ResearchSession>> {
        let tables = self.db.tables.read().await;
        Ok(tables.sessions.get(&id).cloned())
    }

    /// Sessions of one owner, newest first.
    pub async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<ResearchSession>> {
        let tables = self.db.tables.read().await;
        let mut sessions: Vec<ResearchSession> = tables
            .sessions
            .values()
            .filter(|s| s.owner_id == owner_id)
            .cloned()
            .collect();
        sessions.sort_by_key(|s| std::cmp::Reverse(s.created_at));
        Ok(sessions)
    }

    /// Sessions an owner created on a given UTC day. Used by quota gates.
    pub async fn count_created_on(&self, owner_id: &str, day: chrono::NaiveDate) -> Result<usize> {
        let tables = self.db.tables.read().await;
        Ok(tables
            .sessions
            .values()
            .filter(|s| s.owner_id == owner_id && s.created_at.date_naive() == day)
            .count())
    }

    /// Delete a session and cascade to its documents and chunks.
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let mut tables = self.db.tables.write().await;
        if tables.sessions.remove(&id).is_none() {
            return Err(DbError::NotFound(format!("session {id}")));
        }
        let doc_ids: Vec<Uuid> = tables
            .documents
            .values()
            .filter(|d| d.session_id == id)
            .map(|d| d.id)
            .collect();
        tables.documents.retain(|_, d| d.session_id != id);
        tables
            .chunks
            .retain(|_, c| !doc_ids.contains(&c.document_id));
        Ok(())
    }

    // ── Artifact state machine ───────────────────────────────────────────────

    /// Try to move an artifact slot from Absent to Generating.
    pub async fn claim_artifact(&self, id: Uuid, kind: ArtifactKind) -> Result<ClaimOutcome> {
        let mut tables = self.db.tables.write().await;
        let session = tables
            .sessions
            .get_mut(&id)
            .ok_or_else(|| DbError::NotFound(format!("session {id}")))?;

        macro_rules! claim {
            ($slot:expr, $wrap:path) => {
                match &$slot {
                    ArtifactSlot::Present(v) => ClaimOutcome::AlreadyPresent($wrap(v.clone())),
                    ArtifactSlot::Generating => ClaimOutcome::InFlight,
                    ArtifactSlot::Absent => {
                        $slot = ArtifactSlot::Generating;
                        ClaimOutcome::Claimed
                    }
                }
            };
        }

        let outcome = match kind {
            ArtifactKind::Summary        => claim!(session.summary, ArtifactValue::Text),
            ArtifactKind::Critique       => claim!(session.critique, ArtifactValue::Text),
            ArtifactKind::Table          => claim!(session.table, ArtifactValue::Text),
            ArtifactKind::KnowledgeGraph => claim!(session.knowledge_graph, ArtifactValue::Graph),
            ArtifactKind::Visualizations => claim!(session.visualizations, ArtifactValue::Charts),
        };
        Ok(outcome)
    }

    /// Move a Generating slot to Present with the produced value.
    pub async fn complete_artifact(
        &self,
        id: Uuid,
        kind: ArtifactKind,
        value: ArtifactValue,
    ) -> Result<()> {
        let mut tables = self.db.tables.write().await;
        let session = tables
            .sessions
            .get_mut(&id)
            .ok_or_else(|| DbError::NotFound(format!("session {id}")))?;

        macro_rules! complete {
            ($slot:expr, $pat:path) => {{
                if $slot != ArtifactSlot::Generating {
                    return Err(DbError::InvalidArtifactState(format!(
                        "complete {} without an active claim",
                        kind.as_str()
                    )));
                }
                match value {
                    $pat(v) => $slot = ArtifactSlot::Present(v),
                    _ => return Err(DbError::ArtifactKindMismatch(kind.as_str())),
                }
            }};
        }

        match kind {
            ArtifactKind::Summary        => complete!(session.summary, ArtifactValue::Text),
            ArtifactKind::Critique       => complete!(session.critique, ArtifactValue::Text),
            ArtifactKind::Table          => complete!(session.table, ArtifactValue::Text),
            ArtifactKind::KnowledgeGraph => complete!(session.knowledge_graph, ArtifactValue::Graph),
            ArtifactKind::Visualizations => complete!(session.visualizations, ArtifactValue::Charts),
        }
        Ok(())
    }

    /// Release a claim after a failed generation: Generating → Absent.
    /// Releasing an Absent slot is a no-op; a Present slot is an error
    /// (Present never regresses except through `clear_artifact`).
    pub async fn release_artifact(&self, id: Uuid, kind: ArtifactKind) -> Result<()> {
        let mut tables = self.db.tables.write().await;
        let session = tables
            .sessions
            .get_mut(&id)
            .ok_or_else(|| DbError::NotFound(format!("session {id}")))?;

        macro_rules! release {
            ($slot:expr) => {
                match &$slot {
                    ArtifactSlot::Present(_) => {
                        return Err(DbError::InvalidArtifactState(format!(
                            "release of present artifact {}",
                            kind.as_str()
                        )))
                    }
                    _ => $slot = ArtifactSlot::Absent,
                }
            };
        }

        match kind {
            ArtifactKind::Summary        => release!(session.summary),
            ArtifactKind::Critique       => release!(session.critique),
            ArtifactKind::Table          => release!(session.table),
            ArtifactKind::KnowledgeGraph => release!(session.knowledge_graph),
            ArtifactKind::Visualizations => release!(session.visualizations),
        }
        Ok(())
    }

    /// Explicit user-driven reset of a slot to Absent, the only path by
    /// which a Present artifact becomes regenerable.
    pub async fn clear_artifact(&self, id: Uuid, kind: ArtifactKind) -> Result<()> {
        let mut tables = self.db.tables.write().await;
        let session = tables
            .sessions
            .get_mut(&id)
            .ok_or_else(|| DbError::NotFound(format!("session {id}")))?;
        match kind {
            ArtifactKind::Summary        => session.summary = ArtifactSlot::Absent,
            ArtifactKind::Critique       => session.critique = ArtifactSlot::Absent,
            ArtifactKind::Table          => session.table = ArtifactSlot::Absent,
            ArtifactKind::KnowledgeGraph => session.knowledge_graph = ArtifactSlot::Absent,
            ArtifactKind::Visualizations => session.visualizations = ArtifactSlot::Absent,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::DocumentRepository;
    use crate::schema::{Chunk, Document, KnowledgeGraph, VisualizationSet, EMBEDDING_DIM};
    use crate::ChunkRepository;

    async fn seeded(db: &Arc<Database>) -> Uuid {
        let repo = SessionRepository::new(db.clone());
        let session = ResearchSession::new("owner".into(), "q".into(), "eq".into());
        let id = session.id;
        repo.insert(&session).await.unwrap();
        id
    }

    #[tokio::test]
    async fn test_claim_complete_roundtrip() {
        let db = Arc::new(Database::new());
        let id = seeded(&db).await;
        let repo = SessionRepository::new(db);

        assert_eq!(
            repo.claim_artifact(id, ArtifactKind::Table).await.unwrap(),
            ClaimOutcome::Claimed
        );
        // Second claim while generating reports in-flight.
        assert_eq!(
            repo.claim_artifact(id, ArtifactKind::Table).await.unwrap(),
            ClaimOutcome::InFlight
        );

        repo.complete_artifact(id, ArtifactKind::Table, ArtifactValue::Text("A | B".into()))
            .await
            .unwrap();

        match repo.claim_artifact(id, ArtifactKind::Table).await.unwrap() {
            ClaimOutcome::AlreadyPresent(ArtifactValue::Text(t)) => assert_eq!(t, "A | B"),
            other => panic!("expected stored table, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_release_returns_slot_to_absent() {
        let db = Arc::new(Database::new());
        let id = seeded(&db).await;
        let repo = SessionRepository::new(db);

        repo.claim_artifact(id, ArtifactKind::Summary).await.unwrap();
        repo.release_artifact(id, ArtifactKind::Summary).await.unwrap();
        // Eligible for retry after release.
        assert_eq!(
            repo.claim_artifact(id, ArtifactKind::Summary).await.unwrap(),
            ClaimOutcome::Claimed
        );
    }

    #[tokio::test]
    async fn test_present_artifact_cannot_be_released_only_cleared() {
        let db = Arc::new(Database::new());
        let id = seeded(&db).await;
        let repo = SessionRepository::new(db);

        repo.claim_artifact(id, ArtifactKind::Critique).await.unwrap();
        repo.complete_artifact(id, ArtifactKind::Critique, ArtifactValue::Text("- gap".into()))
            .await
            .unwrap();

        assert!(matches!(
            repo.release_artifact(id, ArtifactKind::Critique).await,
            Err(DbError::InvalidArtifactState(_))
        ));

        repo.clear_artifact(id, ArtifactKind::Critique).await.unwrap();
        assert_eq!(
            repo.claim_artifact(id, ArtifactKind::Critique).await.unwrap(),
            ClaimOutcome::Claimed
        );
    }

    #[tokio::test]
    async fn test_complete_rejects_mismatched_value() {
        let db = Arc::new(Database::new());
        let id = seeded(&db).await;
        let repo = SessionRepository::new(db);

        repo.claim_artifact(id, ArtifactKind::KnowledgeGraph).await.unwrap();
        let err = repo
            .complete_artifact(id, ArtifactKind::KnowledgeGraph, ArtifactValue::Text("no".into()))
            .await;
        assert!(matches!(err, Err(DbError::ArtifactKindMismatch(_))));

        repo.complete_artifact(
            id,
            ArtifactKind::KnowledgeGraph,
            ArtifactValue::Graph(KnowledgeGraph::default()),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_complete_without_claim_rejected() {
        let db = Arc::new(Database::new());
        let id = seeded(&db).await;
        let repo = SessionRepository::new(db);
        let err = repo
            .complete_artifact(
                id,
                ArtifactKind::Visualizations,
                ArtifactValue::Charts(VisualizationSet::default()),
            )
            .await;
        assert!(matches!(err, Err(DbError::InvalidArtifactState(_))));
    }

    #[tokio::test]
    async fn test_delete_cascades_documents_and_chunks() {
        let db = Arc::new(Database::new());
        let id = seeded(&db).await;
        let sessions = SessionRepository::new(db.clone());
        let documents = DocumentRepository::new(db.clone());
        let chunks = ChunkRepository::new(db.clone());

        let doc = Document::new(
            id,
            "t".into(),
            "c".into(),
            serde_json::json!({}),
            "http://arxiv.org/abs/1".into(),
        );
        documents.insert(&doc).await.unwrap();
        chunks
            .insert_batch(&[Chunk::new(doc.id, 0, "x".into(), vec![1.0; EMBEDDING_DIM])])
            .await
            .unwrap();

        sessions.delete(id).await.unwrap();
        let stats = db.stats().await;
        assert_eq!(stats.sessions, 0);
        assert_eq!(stats.documents, 0);
        assert_eq!(stats.chunks, 0);
    }

    #[tokio::test]
    async fn test_count_created_on_for_quota() {
        let db = Arc::new(Database::new());
        let repo = SessionRepository::new(db);
        for _ in 0..3 {
            let s = ResearchSession::new("alice".into(), "q".into(), "eq".into());
            repo.insert(&s).await.unwrap();
        }
        let other = ResearchSession::new("bob".into(), "q".into(), "eq".into());
        repo.insert(&other).await.unwrap();

        let today = chrono::Utc::now().date_naive();
        assert_eq!(repo.count_created_on("alice", today).await.unwrap(), 3);
        assert_eq!(repo.count_created_on("bob", today).await.unwrap(), 1);
    }
}
