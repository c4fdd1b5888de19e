//! arXiv export API client.
//!
//! Endpoint: http://export.arxiv.org/api/query
//! Query format: AND of quoted keywords against the `all:` field, sorted by
//! relevance. The response is an Atom feed; each `<entry>` is parsed
//! independently so one malformed entry never aborts the rest.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use lectern_common::SandboxClient;
use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::{debug, instrument, warn};

use super::LiteratureSource;
use crate::error::IngestError;
use crate::models::DiscoveredPaper;

const ARXIV_API_URL: &str = "http://export.arxiv.org/api/query";

pub struct ArxivClient {
    client: SandboxClient,
    /// Over-fetch ceiling: how many entries to request per search.
    max_results: usize,
}

impl ArxivClient {
    pub fn new(max_results: usize) -> Result<Self, IngestError> {
        Ok(Self {
            client: SandboxClient::new()?,
            max_results,
        })
    }

    /// Build the boolean AND-of-quoted-terms query string.
    pub fn build_query(keywords: &str) -> String {
        keywords
            .split_whitespace()
            .map(|k| format!("\"{k}\""))
            .collect::<Vec<_>>()
            .join("+AND+")
    }

    /// Fetch one paper's PDF payload. Any failure yields None for this paper
    /// only and never fails the batch.
    async fn fetch_pdf(&self, pdf_url: &str) -> Option<Vec<u8>> {
        match self.try_fetch_pdf(pdf_url).await {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!(url = pdf_url, error = %e, "PDF fetch failed");
                None
            }
        }
    }

    async fn try_fetch_pdf(&self, pdf_url: &str) -> Result<Vec<u8>, IngestError> {
        let resp = self.client.get(pdf_url)?.send().await?;
        if !resp.status().is_success() {
            return Err(IngestError::Fetch(format!(
                "PDF download failed: HTTP {}",
                resp.status()
            )));
        }
        Ok(resp.bytes().await?.to_vec())
    }
}

#[async_trait]
impl LiteratureSource for ArxivClient {
    #[instrument(skip(self))]
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<DiscoveredPaper>, IngestError> {
        let url = format!(
            "{}?search_query=all:{}&max_results={}&sortBy=relevance",
            ARXIV_API_URL,
            Self::build_query(query),
            max_results
        );
        let xml = self.client.get(&url)?.send().await?.text().await?;
        let papers = parse_feed(&xml);
        debug!(n = papers.len(), "arXiv search returned entries with PDF links");
        Ok(papers)
    }

    #[instrument(skip(self))]
    async fn discover(
        &self,
        keywords: &str,
        min_desired: usize,
    ) -> Result<Vec<DiscoveredPaper>, IngestError> {
        let mut papers = self.search(keywords, self.max_results).await?;

        if papers.len() < min_desired {
            warn!(
                found = papers.len(),
                wanted = min_desired,
                keywords,
                "Fewer papers than desired; continuing with what was found"
            );
        }
        papers.truncate(min_desired);

        // Fetch all PDF payloads concurrently; each failure is per-paper.
        let papers = join_all(papers.into_iter().map(|mut paper| async move {
            paper.pdf_bytes = self.fetch_pdf(&paper.pdf_url).await;
            paper
        }))
        .await;

        Ok(papers)
    }
}

// ── Atom feed parsing ─────────────────────────────────────────────────────────

/// Parse an Atom feed into papers. Entries are isolated before parsing so a
/// malformed entry is skipped while the rest still parse. Entries without a
/// PDF link are dropped.
pub(crate) fn parse_feed(xml: &str) -> Vec<DiscoveredPaper> {
    let mut papers = Vec::new();
    for block in entry_blocks(xml) {
        match parse_entry(block) {
            Ok(Some(paper)) => papers.push(paper),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Skipping malformed feed entry"),
        }
    }
    papers
}

/// Slice the feed into `<entry>…</entry>` blocks.
fn entry_blocks(xml: &str) -> Vec<&str> {
    const OPEN: &str = "<entry>";
    const CLOSE: &str = "</entry>";
    let mut blocks = Vec::new();
    let mut rest = xml;
    while let Some(start) = rest.find(OPEN) {
        let after = &rest[start..];
        match after.find(CLOSE) {
            Some(end) => {
                blocks.push(&after[..end + CLOSE.len()]);
                rest = &after[end + CLOSE.len()..];
            }
            None => break,
        }
    }
    blocks
}

/// Parse a single `<entry>` block. Returns None for entries that are dropped
/// on purpose (missing title or PDF link).
fn parse_entry(xml: &str) -> Result<Option<DiscoveredPaper>, IngestError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut title = String::new();
    let mut source_url = String::new();
    let mut pdf_url: Option<String> = None;
    let mut authors: Vec<String> = Vec::new();
    let mut categories: Vec<String> = Vec::new();
    let mut published: Option<DateTime<Utc>> = None;
    let mut updated: Option<DateTime<Utc>> = None;
    let mut doi: Option<String> = None;
    let mut journal_ref: Option<String> = None;
    let mut comment: Option<String> = None;

    let mut in_title = false;
    let mut in_id = false;
    let mut in_name = false;
    let mut in_published = false;
    let mut in_updated = false;
    let mut in_doi = false;
    let mut in_journal_ref = false;
    let mut in_comment = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"title"             => in_title = true,
                b"id"                => in_id = true,
                b"name"              => in_name = true,
                b"published"         => in_published = true,
                b"updated"           => in_updated = true,
                b"arxiv:doi"         => in_doi = true,
                b"arxiv:journal_ref" => in_journal_ref = true,
                b"arxiv:comment"     => in_comment = true,
                _ => {}
            },
            Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                b"link" => {
                    let is_pdf = attribute(e, "title").as_deref() == Some("pdf");
                    if is_pdf {
                        pdf_url = attribute(e, "href");
                    }
                }
                b"category" => {
                    if let Some(term) = attribute(e, "term") {
                        categories.push(term);
                    }
                }
                _ => {}
            },
            Ok(Event::Text(ref e)) => {
                let text = e.unescape().unwrap_or_default().to_string();
                if in_title       { title = text; }
                else if in_id     { source_url = text; }
                else if in_name   { authors.push(text); }
                else if in_published { published = parse_date(&text); }
                else if in_updated   { updated = parse_date(&text); }
                else if in_doi       { doi = Some(text); }
                else if in_journal_ref { journal_ref = Some(text); }
                else if in_comment     { comment = Some(text); }
            }
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"title"             => in_title = false,
                b"id"                => in_id = false,
                b"name"              => in_name = false,
                b"published"         => in_published = false,
                b"updated"           => in_updated = false,
                b"arxiv:doi"         => in_doi = false,
                b"arxiv:journal_ref" => in_journal_ref = false,
                b"arxiv:comment"     => in_comment = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(IngestError::Parse(format!("entry XML: {e}"))),
            _ => {}
        }
        buf.clear();
    }

    if title.is_empty() {
        warn!("Dropping feed entry with empty title");
        return Ok(None);
    }
    let Some(pdf_url) = pdf_url else {
        debug!(title = %title, "Dropping feed entry without a PDF link");
        return Ok(None);
    };

    Ok(Some(DiscoveredPaper {
        title,
        authors,
        published,
        updated,
        doi,
        journal_ref,
        comment,
        categories,
        source_url,
        pdf_url,
        pdf_bytes: None,
    }))
}

fn attribute(e: &quick_xml::events::BytesStart<'_>, name: &str) -> Option<String> {
    e.try_get_attribute(name)
        .ok()
        .flatten()
        .and_then(|attr| attr.unescape_value().ok().map(|v| v.to_string()))
}

fn parse_date(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}
