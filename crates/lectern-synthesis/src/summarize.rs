//! Map-reduce summarization: one summary per document, then one synthesis
//! pass combining them into a fixed-section report with inline citations.

use futures::future::join_all;
use lectern_db::Document;
use lectern_llm::{Generator, ModelTier};
use tracing::{instrument, warn};

use crate::error::SynthesisError;

/// Summarize all documents of a session into a structured report.
///
/// The map step runs one generation per document concurrently; a failed map
/// task is logged and excluded, and the survivors are renumbered 1..N so the
/// `(Source N)` markers always match the reference list in the report.
#[instrument(skip_all, fields(documents = documents.len()))]
pub async fn summarize_documents(
    generator: &Generator,
    documents: &[Document],
) -> Result<String, SynthesisError> {
    let map_results = join_all(documents.iter().map(|doc| async move {
        let prompt = format!(
            r#"You are a research assistant. Summarize the following research paper.

## Guidelines:
- Provide a concise summary of the paper's key findings.
- Focus on the main points and conclusions.

## Source:
{}

## Paper:
{}

## Summary:
"#,
            doc.source_url, doc.content
        );
        generator.generate(&prompt, ModelTier::Default).await
    }))
    .await;

    let mut summaries = Vec::new();
    for (doc, result) in documents.iter().zip(map_results) {
        match result {
            Ok(summary) => summaries.push((doc, summary)),
            Err(e) => warn!(
                source_url = %doc.source_url,
                error = %e,
                "Per-document summary failed, excluding from synthesis"
            ),
        }
    }
    if summaries.is_empty() {
        return Err(SynthesisError::NotEnoughMaterial);
    }

    let combined = summaries
        .iter()
        .enumerate()
        .map(|(i, (doc, summary))| format!("Source {} ({}):\n{}", i + 1, doc.source_url, summary))
        .collect::<Vec<_>>()
        .join("\n\n---\n\n");

    let final_prompt = format!(
        r#"You are a research assistant. Synthesize the following summaries into a single, structured report.

## Requirements:
1. The report must include these sections:
   - ## Introduction
   - ## Methodology
   - ## Results
   - ## Conclusion
   - ## References
2. Synthesize information across all summaries (do not just list them).
3. Use inline citations like (Source 1), (Source 2), etc., based on the provided summaries.
4. In the References section, include the source URL with a descriptive title.

## Summaries:
{combined}

## Report:
"#
    );

    let report = generator.generate(&final_prompt, ModelTier::Default).await?;
    Ok(report)
}
