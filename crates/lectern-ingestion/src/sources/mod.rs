//! Literature source clients.

pub mod arxiv;

use async_trait::async_trait;

use crate::error::IngestError;
use crate::models::DiscoveredPaper;

/// Common interface for literature source clients.
#[async_trait]
pub trait LiteratureSource: Send + Sync {
    /// Search the index for papers matching a query. Returned papers carry
    /// metadata and PDF links but no PDF payloads.
    async fn search(&self, query: &str, max_results: usize)
        -> Result<Vec<DiscoveredPaper>, IngestError>;

    /// Full discovery: search with the configured over-fetch ceiling, keep
    /// the first `min_desired` entries, fetch their PDF payloads.
    async fn discover(&self, keywords: &str, min_desired: usize)
        -> Result<Vec<DiscoveredPaper>, IngestError>;
}
