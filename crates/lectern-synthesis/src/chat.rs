//! Chat-style answerer over retrieved context, with inline source citations.
//! Used directly for Q&A and as the per-keyword stage of the visualization
//! pipeline.

use lectern_llm::{Generator, ModelTier};
use tracing::instrument;
use uuid::Uuid;

use crate::error::SynthesisError;
use crate::retrieval::{build_context, Retriever, SearchResult};

/// An answer plus the raw (non-deduplicated) results it was grounded on, so
/// callers keep per-chunk provenance.
#[derive(Debug, Clone)]
pub struct ChatAnswer {
    pub answer: String,
    pub sources: Vec<SearchResult>,
}

#[instrument(skip(retriever, generator))]
pub async fn answer(
    retriever: &Retriever,
    generator: &Generator,
    question: &str,
    scope: Option<Uuid>,
    top_k: usize,
) -> Result<ChatAnswer, SynthesisError> {
    let results = retriever.retrieve(question, scope, top_k).await?;
    let context = build_context(&results);

    let prompt = format!(
        r#"You are a helpful assistant. Use the following sources to answer the user's question.

Guidelines:
- Present results in a clear, human-readable way:
  - Express accuracy, precision, recall, or similar metrics as percentages.
  - Express counts as whole numbers.
  - Keep numerical values consistent and easy to compare.
- If multiple pieces of information come from the same document, cite that source only once.
- Always cite sources in your answer like (Source 1), (Source 2), etc.
- Keep explanations concise and relevant to the user's question.

Question: {question}

Sources:
{context}
"#
    );

    let answer = generator.generate(&prompt, ModelTier::Light).await?;
    Ok(ChatAnswer { answer, sources: results })
}
