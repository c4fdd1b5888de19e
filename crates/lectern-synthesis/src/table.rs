//! Single-shot tabular summary over all document contents.

use lectern_db::Document;
use lectern_llm::{Generator, ModelTier};
use tracing::instrument;

use crate::error::SynthesisError;

/// Generate a pipe-delimited summary table from the session's documents.
/// The prompt constrains output to at most 5 column headers and blank cells
/// instead of invented values.
#[instrument(skip_all, fields(documents = documents.len()))]
pub async fn tabulate_documents(
    generator: &Generator,
    documents: &[Document],
) -> Result<String, SynthesisError> {
    let context = documents
        .iter()
        .enumerate()
        .map(|(i, doc)| format!("Source {} (URL: {}):\n{}\n", i + 1, doc.source_url, doc.content))
        .collect::<Vec<_>>()
        .join("\n\n---\n\n");

    let prompt = format!(
        r#"You are a research assistant.
Analyze the sources below and create a **structured summary table** that best represents the key findings.

## Guidelines:
- Use **no more than 5 simple column headers**.
- Include as many relevant rows as possible.
- Quantitative information is highly appreciated, and should be represented in a consistent format (e.g., percentages, whole numbers).
- If some information is missing, leave the cell blank (do not guess).
- Return the table in a **plain text format** where each row is separated by a newline and columns by a pipe (|).
  Example:
  Header1 | Header2 | Header3
  Row1Col1 | Row1Col2 | Row1Col3
  Row2Col1 | Row2Col2 | Row2Col3

## Research Papers:
{context}

## Table:
"#
    );

    let table = generator.generate(&prompt, ModelTier::Default).await?;
    Ok(table)
}
