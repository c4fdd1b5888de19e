//! Data models for the ingestion pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A paper discovered in the literature index, before ingestion. Transient:
/// once converted to a stored document the metadata travels as JSON and the
/// PDF payload is dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveredPaper {
    pub title: String,
    pub authors: Vec<String>,
    pub published: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
    pub doi: Option<String>,
    pub journal_ref: Option<String>,
    pub comment: Option<String>,
    pub categories: Vec<String>,
    /// The feed entry id, which doubles as the citation URL.
    pub source_url: String,
    pub pdf_url: String,
    /// Raw PDF payload; None when the fetch failed.
    #[serde(skip)]
    pub pdf_bytes: Option<Vec<u8>>,
}

impl DiscoveredPaper {
    /// Metadata record stored on the document, shaped like the feed entry.
    pub fn metadata(&self) -> serde_json::Value {
        serde_json::json!({
            "title":      self.title,
            "authors":    self.authors,
            "published":  self.published,
            "updated":    self.updated,
            "doi":        self.doi,
            "journalRef": self.journal_ref,
            "categories": self.categories,
            "comments":   self.comment,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_carries_feed_fields() {
        let paper = DiscoveredPaper {
            title: "Attention Is All You Need".to_string(),
            authors: vec!["Vaswani A".to_string(), "Shazeer N".to_string()],
            published: None,
            updated: None,
            doi: Some("10.0000/example".to_string()),
            journal_ref: None,
            comment: None,
            categories: vec!["cs.CL".to_string()],
            source_url: "http://arxiv.org/abs/1706.03762".to_string(),
            pdf_url: "http://arxiv.org/pdf/1706.03762".to_string(),
            pdf_bytes: None,
        };
        let meta = paper.metadata();
        assert_eq!(meta["title"], "Attention Is All You Need");
        assert_eq!(meta["authors"].as_array().unwrap().len(), 2);
        assert_eq!(meta["doi"], "10.0000/example");
        assert_eq!(meta["categories"][0], "cs.CL");
    }
}
