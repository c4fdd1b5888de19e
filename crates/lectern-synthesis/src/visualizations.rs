//! Two-stage visualization pipeline: extract keywords from the enhanced
//! query, answer each keyword over retrieval, then mine the merged answers
//! for numeric data and chart suggestions.

use futures::future::join_all;
use lectern_db::{ResearchSession, VisualizationSet};
use lectern_llm::{Generator, ModelTier};
use tracing::{instrument, warn};

use crate::chat;
use crate::decode::decode_artifact;
use crate::error::SynthesisError;
use crate::retrieval::Retriever;

#[derive(Debug, Default, serde::Deserialize)]
struct KeywordSet {
    #[serde(default)]
    keywords: Vec<String>,
}

/// Extract data-oriented keywords from a research query.
pub async fn extract_keywords(
    generator: &Generator,
    query: &str,
) -> Result<Vec<String>, SynthesisError> {
    let prompt = format!(
        r#"You are a research assistant. Your task is to extract relevant keywords from the following research query for data extraction.

## Research Query:
{query}

## Instructions:
1. Identify the key concepts and entities in the research query.
2. Generate a list of keywords that can be used to find relevant data.
3. Format the output as a JSON object with a "keywords" key, which is an array of strings.

## Example:
Research Query: "What are the latest advancements in AI for drug discovery?"
Output:
{{
  "keywords": ["AI", "drug discovery", "advancements", "machine learning", "pharmaceuticals"]
}}
"#
    );

    let raw = generator.generate(&prompt, ModelTier::Light).await?;
    Ok(decode_artifact::<KeywordSet>(&raw).into_value().keywords)
}

/// Extract numeric data points and chart suggestions from a merged report.
async fn extract_visualizations(
    generator: &Generator,
    report: &str,
    query: &str,
) -> Result<VisualizationSet, SynthesisError> {
    let prompt = format!(
        r#"You are a data visualization expert. Your task is to extract numerical data from the following text and suggest visualizations that are directly relevant to the research query.

## Research Query:
{query}

## Instructions:
1. Carefully analyze the research query to understand the main topic and the key aspects to be visualized.
2. Identify interesting numerical data in the text that is directly relevant to the research query.
3. For each piece of data, suggest a chart type (e.g., "bar", "line", "pie").
4. Format the output as a JSON object with a "visualizations" key.
5. The "visualizations" key should be an array of objects, where each object has:
   - "title": A title for the chart that reflects its relevance to the research query.
   - "type": The suggested chart type (should be bar or pie chart if needed).
   - "data": The data for the chart, as an array of objects.

## Example:
Research Query: "Comparing the effectiveness of different fertilizers on plant growth."
Text: "Fertilizer A resulted in 15cm of growth, while Fertilizer B resulted in 10cm of growth."
Output:
{{
  "visualizations": [
    {{
      "title": "Effectiveness of Fertilizers on Plant Growth",
      "type": "bar",
      "data": [
        {{ "name": "Fertilizer A", "value": 15 }},
        {{ "name": "Fertilizer B", "value": 10 }}
      ]
    }}
  ]
}}

6. Ensure that the visualizations are directly relevant to the research query and provide meaningful insights.
7. Ensure the name property in data objects is present and concise (e.g., "Fertilizer A", "Category 1").

## Text to process:
{report}
"#
    );

    let raw = generator.generate(&prompt, ModelTier::Light).await?;
    Ok(decode_artifact::<VisualizationSet>(&raw).into_value())
}

/// Full pipeline: keywords → per-keyword retrieval-grounded answers →
/// merged report → chart extraction. Per-keyword failures are logged and
/// excluded; the merge proceeds with whatever answered.
#[instrument(skip_all, fields(session_id = %session.id))]
pub async fn build_visualizations(
    retriever: &Retriever,
    generator: &Generator,
    session: &ResearchSession,
    top_k: usize,
) -> Result<VisualizationSet, SynthesisError> {
    let keywords = extract_keywords(generator, &session.enhanced_query).await?;

    let answers = join_all(keywords.iter().map(|keyword| async move {
        chat::answer(retriever, generator, keyword, Some(session.id), top_k)
            .await
            .map(|a| a.answer)
    }))
    .await;

    let mut reports = Vec::new();
    for (keyword, result) in keywords.iter().zip(answers) {
        match result {
            Ok(answer) => reports.push(answer),
            Err(e) => warn!(keyword = %keyword, error = %e, "Keyword report failed, excluding"),
        }
    }

    let merged = reports.join("\n\n");
    extract_visualizations(generator, &merged, &session.enhanced_query).await
}
