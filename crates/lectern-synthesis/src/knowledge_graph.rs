//! Single-shot knowledge graph extraction over deduplicated retrieved
//! context.

use lectern_db::{KnowledgeGraph, ResearchSession};
use lectern_llm::{Generator, ModelTier};
use tracing::instrument;

use crate::decode::decode_artifact;
use crate::error::SynthesisError;
use crate::retrieval::{build_context, build_references, Retriever};

#[instrument(skip_all, fields(session_id = %session.id))]
pub async fn build_knowledge_graph(
    retriever: &Retriever,
    generator: &Generator,
    session: &ResearchSession,
    top_k: usize,
) -> Result<KnowledgeGraph, SynthesisError> {
    let results = retriever
        .retrieve(&session.enhanced_query, Some(session.id), top_k)
        .await?;

    let context = build_context(&results);
    let references = build_references(&results);
    let references_json =
        serde_json::to_string_pretty(&references).unwrap_or_else(|_| "[]".to_string());

    let prompt = format!(
        r#"You are a knowledge graph expert. Your task is to extract entities and their relationships from the following text.

## Instructions:
1. Identify the key entities in the text. An entity can be a person, organization, location, concept, etc.
2. Identify the relationships between these entities. A relationship should have a source entity, a target entity, and a label describing the relationship.
3. Ensure that each entity is unique and relationships accurately reflect the connections in the text.
4. Keep the nodes and edges simple, concise and relevant to the main topics discussed in the text.
5. Format the output as a JSON object with three keys: "nodes", "edges", and "references".
   - "nodes" should be an array of objects, where each object has an "id" (the entity name) and a "label" (the entity name).
   - "edges" should be an array of objects, where each object has a "source" (the ID of the source entity), a "target" (the ID of the target entity), and a "label" (the description of the relationship).
   - "references" should be an array of objects with {{ id, title, url }} based on the provided search results.

## Example:
Text: "CRISPR technology can be used to edit the genome of plants. This affects gene expression."
Output:
{{
  "nodes": [
    {{ "id": "CRISPR", "label": "CRISPR" }},
    {{ "id": "gene expression", "label": "gene expression" }},
    {{ "id": "plants", "label": "plants" }}
  ],
  "edges": [
    {{ "source": "CRISPR", "target": "gene expression", "label": "affects" }},
    {{ "source": "CRISPR", "target": "plants", "label": "in" }}
  ],
  "references": []
}}

## Text to process:
{context}

## Unique References (for citations):
{references_json}
"#
    );

    let raw = generator.generate(&prompt, ModelTier::Default).await?;
    let mut graph = decode_artifact::<KnowledgeGraph>(&raw).into_value();
    if graph.references.is_empty() {
        graph.references = references;
    }
    Ok(graph)
}
