//! Configuration loading for Lectern.
//! Reads lectern.toml from the current directory or the path in the
//! LECTERN_CONFIG env var. API keys come from the environment (dotenv
//! supported), never from the config file.

use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub quota: QuotaConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// How many feed entries to request from the literature index.
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    /// How many papers a session aims to ingest.
    #[serde(default = "default_min_papers")]
    pub min_papers: usize,
}

fn default_max_results() -> usize { 20 }
fn default_min_papers()  -> usize { 4 }

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            max_results: default_max_results(),
            min_papers: default_min_papers(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
}

fn default_max_chars() -> usize { 2000 }

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { max_chars: default_max_chars() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embed_model")]
    pub model: String,
}

fn default_embed_model() -> String { "gemini-embedding-001".to_string() }

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self { model: default_embed_model() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// "gemini" or "openai_compatible".
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Cheaper model used for critiques, chat answers and keyword extraction.
    #[serde(default = "default_light_model")]
    pub light_model: String,
    /// Base URL for the openai_compatible provider.
    pub base_url: Option<String>,
    /// Name of the env var holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

fn default_provider()    -> String { "gemini".to_string() }
fn default_model()       -> String { "gemini-2.5-flash".to_string() }
fn default_light_model() -> String { "gemini-2.5-flash-lite".to_string() }
fn default_api_key_env() -> String { "LECTERN_GEMINI_API_KEY".to_string() }

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            light_model: default_light_model(),
            base_url: None,
            api_key_env: default_api_key_env(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_top_k() -> usize { 20 }

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: default_top_k() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaConfig {
    /// Max research sessions an owner may create per UTC day.
    #[serde(default = "default_sessions_per_day")]
    pub max_sessions_per_day: usize,
}

fn default_sessions_per_day() -> usize { 5 }

impl Default for QuotaConfig {
    fn default() -> Self {
        Self { max_sessions_per_day: default_sessions_per_day() }
    }
}

impl Config {
    /// Load configuration from lectern.toml.
    /// Checks LECTERN_CONFIG first, then the current directory. A missing
    /// file yields the built-in defaults.
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let path = std::env::var("LECTERN_CONFIG")
            .unwrap_or_else(|_| "lectern.toml".to_string());

        if !Path::new(&path).exists() {
            tracing::debug!(path = %path, "No config file found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Resolve the configured API key from the environment.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.llm.api_key_env).ok().filter(|k| !k.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.discovery.max_results, 20);
        assert_eq!(cfg.discovery.min_papers, 4);
        assert_eq!(cfg.chunking.max_chars, 2000);
        assert_eq!(cfg.retrieval.top_k, 20);
        assert!(cfg.discovery.max_results >= cfg.discovery.min_papers);
    }

    #[test]
    fn test_parse_partial_toml() {
        let cfg: Config = toml::from_str(
            r#"
            [discovery]
            min_papers = 6

            [llm]
            provider = "openai_compatible"
            base_url = "http://localhost:11434"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.discovery.min_papers, 6);
        assert_eq!(cfg.discovery.max_results, 20);
        assert_eq!(cfg.llm.provider, "openai_compatible");
        assert_eq!(cfg.llm.base_url.as_deref(), Some("http://localhost:11434"));
    }
}
