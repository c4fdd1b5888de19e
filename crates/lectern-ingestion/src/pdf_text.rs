//! PDF text extraction.
//!
//! Extracts plain text page by page from an in-memory PDF payload. Layout is
//! not preserved; the chunker only needs running text.

use lopdf::Document as PdfDocument;
use tracing::debug;

use crate::error::IngestError;

/// Extract the full text of a PDF. Fails if the document cannot be loaded or
/// yields no extractable text at all; a single unreadable page is skipped.
pub fn extract_text(bytes: &[u8]) -> Result<String, IngestError> {
    let pdf = PdfDocument::load_mem(bytes)
        .map_err(|e| IngestError::Parse(format!("PDF load failed: {e}")))?;

    let mut full_text = String::new();
    for (page_number, _) in pdf.get_pages() {
        match pdf.extract_text(&[page_number]) {
            Ok(text) => {
                full_text.push_str(&text);
                full_text.push('\n');
            }
            Err(e) => {
                debug!(page = page_number, error = %e, "Page text extraction failed, skipping page");
            }
        }
    }

    if full_text.trim().is_empty() {
        return Err(IngestError::Parse("PDF contained no extractable text".to_string()));
    }

    Ok(full_text)
}
