//! Defensive decoding of JSON-shaped generation output.
//!
//! Models wrap JSON in code fences or return something that is not JSON at
//! all. Artifacts must degrade to "not yet available" rather than crash the
//! pipeline, so the parse-failed path is an explicit branch callers can test
//! against, not an implicit catch.

use serde::de::DeserializeOwned;
use tracing::warn;

/// Outcome of decoding one artifact payload.
#[derive(Debug, Clone, PartialEq)]
pub enum ArtifactDecode<T> {
    Parsed(T),
    /// The payload was not valid JSON for `T`; carries the parse error.
    Defaulted { error: String },
}

impl<T: Default> ArtifactDecode<T> {
    /// Collapse to a value, logging when the default stands in.
    pub fn into_value(self) -> T {
        match self {
            ArtifactDecode::Parsed(v) => v,
            ArtifactDecode::Defaulted { error } => {
                warn!(error = %error, "Generation output was not valid JSON, using default artifact");
                T::default()
            }
        }
    }

    pub fn is_defaulted(&self) -> bool {
        matches!(self, ArtifactDecode::Defaulted { .. })
    }
}

/// Remove markdown code-fence markers around a JSON payload.
pub fn strip_code_fences(raw: &str) -> String {
    raw.replace("```json", "").replace("```", "").trim().to_string()
}

/// Decode a generation payload into `T`, falling back to `T::default()`.
pub fn decode_artifact<T: DeserializeOwned + Default>(raw: &str) -> ArtifactDecode<T> {
    let cleaned = strip_code_fences(raw);
    match serde_json::from_str(&cleaned) {
        Ok(v) => ArtifactDecode::Parsed(v),
        Err(e) => ArtifactDecode::Defaulted { error: e.to_string() },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lectern_db::KnowledgeGraph;

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("{\"a\":1}"), "{\"a\":1}");
        assert_eq!(strip_code_fences("  ```\n[]\n```  "), "[]");
    }

    #[test]
    fn test_decode_fenced_graph() {
        let raw = r#"```json
        {"nodes":[{"id":"CRISPR","label":"CRISPR"}],
         "edges":[{"source":"CRISPR","target":"plants","label":"edits"}],
         "references":[{"id":1,"title":"T","url":"http://arxiv.org/abs/1"}]}
        ```"#;
        let decoded = decode_artifact::<KnowledgeGraph>(raw);
        assert!(!decoded.is_defaulted());
        let graph = decoded.into_value();
        assert_eq!(graph.nodes.len(), 1);
        assert_eq!(graph.edges[0].label, "edits");
        assert_eq!(graph.references[0].id, 1);
    }

    #[test]
    fn test_malformed_payload_takes_default_branch() {
        let decoded = decode_artifact::<KnowledgeGraph>("The model apologizes instead of JSON.");
        assert!(decoded.is_defaulted());
        let graph = decoded.into_value();
        assert!(graph.nodes.is_empty());
        assert!(graph.edges.is_empty());
    }

    #[test]
    fn test_decode_plain_array() {
        let decoded = decode_artifact::<Vec<String>>("```json\n[\"alpha\",\"beta\"]\n```");
        assert_eq!(decoded.into_value(), vec!["alpha", "beta"]);
    }
}
