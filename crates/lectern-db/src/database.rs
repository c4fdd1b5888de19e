//! Embedded table set shared by the repositories.

use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::schema::{Chunk, Document, ResearchSession};

/// Main database handle. Sessions never share documents or chunks, so all
/// writes are scoped to one session's rows and a single lock suffices.
#[derive(Default)]
pub struct Database {
    pub(crate) tables: RwLock<Tables>,
}

#[derive(Default)]
pub(crate) struct Tables {
    pub(crate) sessions: HashMap<Uuid, ResearchSession>,
    pub(crate) documents: HashMap<Uuid, Document>,
    pub(crate) chunks: HashMap<Uuid, Chunk>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseStats {
    pub sessions: usize,
    pub documents: usize,
    pub chunks: usize,
}

impl Database {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn stats(&self) -> DatabaseStats {
        let tables = self.tables.read().await;
        DatabaseStats {
            sessions: tables.sessions.len(),
            documents: tables.documents.len(),
            chunks: tables.chunks.len(),
        }
    }
}
