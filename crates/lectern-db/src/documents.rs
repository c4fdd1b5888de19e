//! Document repository.

use std::sync::Arc;
use uuid::Uuid;

use crate::database::Database;
use crate::error::{DbError, Result};
use crate::schema::Document;

#[derive(Clone)]
pub struct DocumentRepository {
    db: Arc<Database>,
}

impl DocumentRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert a document. The owning session must exist, and the source URL
    /// must be unique within that session.
    pub async fn insert(&self, document: &Document) -> Result<()> {
        let mut tables = self.db.tables.write().await;

        if !tables.sessions.contains_key(&document.session_id) {
            return Err(DbError::NotFound(format!(
                "session {} for document insert",
                document.session_id
            )));
        }

        let duplicate = tables.documents.values().any(|d| {
            d.session_id == document.session_id && d.source_url == document.source_url
        });
        if duplicate {
            return Err(DbError::Duplicate(format!(
                "document with source URL {} in session {}",
                document.source_url, document.session_id
            )));
        }

        tables.documents.insert(document.id, document.clone());
        Ok(())
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Document>> {
        let tables = self.db.tables.read().await;
        Ok(tables.documents.get(&id).cloned())
    }

    /// All documents of a session, in creation order.
    pub async fn find_by_session(&self, session_id: Uuid) -> Result<Vec<Document>> {
        let tables = self.db.tables.read().await;
        let mut docs: Vec<Document> = tables
            .documents
            .values()
            .filter(|d| d.session_id == session_id)
            .cloned()
            .collect();
        docs.sort_by_key(|d| (d.created_at, d.id));
        Ok(docs)
    }

    pub async fn count_by_session(&self, session_id: Uuid) -> Result<usize> {
        let tables = self.db.tables.read().await;
        Ok(tables
            .documents
            .values()
            .filter(|d| d.session_id == session_id)
            .count())
    }

    pub async fn count(&self) -> Result<usize> {
        let tables = self.db.tables.read().await;
        Ok(tables.documents.len())
    }
}
