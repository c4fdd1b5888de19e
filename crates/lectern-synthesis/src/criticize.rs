//! Map-reduce critique: per-paper gaps and limitations, consolidated into a
//! single deduplicated bullet list.

use futures::future::join_all;
use lectern_db::Document;
use lectern_llm::{Generator, ModelTier};
use tracing::{instrument, warn};

use crate::error::SynthesisError;

#[instrument(skip_all, fields(documents = documents.len()))]
pub async fn criticize_documents(
    generator: &Generator,
    documents: &[Document],
) -> Result<String, SynthesisError> {
    let map_results = join_all(documents.iter().map(|doc| async move {
        let prompt = format!(
            r#"You are a critical research analyst. Your task is to identify the **gaps and limitations** in the following research paper.

## Guidelines:
- Focus on methodological weaknesses, unanswered questions, and areas for future research.
- Be specific and provide evidence from the text to support your claims.
- Structure your analysis as a **list of bullet points**.

## Research Paper (URL: {}):
{}

## Gaps and Limitations:
"#,
            doc.source_url, doc.content
        );
        generator.generate(&prompt, ModelTier::Light).await
    }))
    .await;

    let mut criticisms = Vec::new();
    for (doc, result) in documents.iter().zip(map_results) {
        match result {
            Ok(criticism) => criticisms.push(criticism),
            Err(e) => warn!(
                source_url = %doc.source_url,
                error = %e,
                "Per-document critique failed, excluding from synthesis"
            ),
        }
    }
    if criticisms.is_empty() {
        return Err(SynthesisError::NotEnoughMaterial);
    }

    let combined = criticisms.join("\n\n---\n\n");

    let final_prompt = format!(
        r#"You are a critical research analyst. Your task is to **synthesize** the following criticisms into a single, consolidated list of gaps and limitations.

## Guidelines:
- Combine similar points from different papers.
- Remove duplicate points.
- Structure your analysis as a **list of bullet points**.

## Criticisms:
{combined}

## Consolidated Gaps and Limitations:
"#
    );

    let consolidated = generator.generate(&final_prompt, ModelTier::Light).await?;
    Ok(consolidated)
}
