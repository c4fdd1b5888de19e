//! LLM backend trait and concrete implementations.
//!
//! Backends:
//!   GeminiBackend           — Google Gemini API (generateContent / embedContent)
//!   OpenAiCompatibleBackend — any OpenAI-compatible endpoint (OpenAI, Ollama,
//!                             vLLM, Groq, OpenRouter, …)
//!
//! Both expose chat completion and text embedding behind one trait so the
//! pipeline can be wired against either provider, or against a mock in tests.

use async_trait::async_trait;
use lectern_common::SandboxClient;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ── Error ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
    #[error("Request blocked by egress policy: {0}")]
    Blocked(String),
    #[error("API error [{status}]: {message}")]
    ApiError { status: u16, message: String },
}

impl LlmError {
    /// Transport-class failures are worth one retry; API rejections are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::Http(_) => true,
            LlmError::ApiError { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<lectern_common::LecternError> for LlmError {
    fn from(err: lectern_common::LecternError) -> Self {
        match err {
            lectern_common::LecternError::Http(e) => LlmError::Http(e),
            other => LlmError::Blocked(other.to_string()),
        }
    }
}

// ── Request / Response ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String, // "system" | "user"
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmRequest {
    pub messages: Vec<Message>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl LlmRequest {
    pub fn prompt(text: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::user(text)],
            model: None,
            max_tokens: None,
            temperature: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub content: String,
    pub model: String,
}

// ── Trait ─────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait LlmBackend: Send + Sync {
    async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError>;

    /// Embed one text into a vector of `dim` components.
    async fn embed(&self, text: &str, dim: usize) -> Result<Vec<f32>, LlmError>;

    fn model_id(&self) -> &str;
}

// ── Helpers ───────────────────────────────────────────────────────────────────

async fn check_response_status(resp: reqwest::Response) -> Result<serde_json::Value, LlmError> {
    let status = resp.status().as_u16();
    let body: serde_json::Value = resp.json().await?;
    if status >= 400 {
        let msg = body["error"]["message"]
            .as_str()
            .or_else(|| body["message"].as_str())
            .unwrap_or("unknown API error")
            .to_string();
        return Err(LlmError::ApiError { status, message: msg });
    }
    Ok(body)
}

fn parse_float_array(value: &serde_json::Value) -> Vec<f32> {
    value
        .as_array()
        .map(|arr| arr.iter().filter_map(|v| v.as_f64()).map(|v| v as f32).collect())
        .unwrap_or_default()
}

// ── 1. Gemini ─────────────────────────────────────────────────────────────────

pub struct GeminiBackend {
    pub model: String,
    pub embedding_model: String,
    api_key: String,
    client: SandboxClient,
}

impl GeminiBackend {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, LlmError> {
        Ok(Self {
            model: model.into(),
            embedding_model: "gemini-embedding-001".to_string(),
            api_key: api_key.into(),
            client: SandboxClient::new().map_err(LlmError::from)?,
        })
    }

    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = model.into();
        self
    }
}

#[async_trait]
impl LlmBackend for GeminiBackend {
    async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError> {
        let model = req.model.as_deref().unwrap_or(&self.model);
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
            model, self.api_key
        );
        let contents: Vec<serde_json::Value> = req
            .messages
            .iter()
            .map(|m| serde_json::json!({"role": "user", "parts": [{"text": m.content}]}))
            .collect();
        let mut body = serde_json::json!({ "contents": contents });
        if let Some(t) = req.temperature {
            body["generationConfig"]["temperature"] = serde_json::json!(t);
        }
        if let Some(n) = req.max_tokens {
            body["generationConfig"]["maxOutputTokens"] = serde_json::json!(n);
        }

        let resp = self.client.post(&url)?.json(&body).send().await?;
        let json = check_response_status(resp).await?;
        let content = json["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .unwrap_or("")
            .to_string();
        Ok(LlmResponse { content, model: model.to_string() })
    }

    async fn embed(&self, text: &str, dim: usize) -> Result<Vec<f32>, LlmError> {
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:embedContent?key={}",
            self.embedding_model, self.api_key
        );
        let body = serde_json::json!({
            "content": { "parts": [{ "text": text }] },
            "outputDimensionality": dim,
        });
        let resp = self.client.post(&url)?.json(&body).send().await?;
        let json = check_response_status(resp).await?;
        Ok(parse_float_array(&json["embedding"]["values"]))
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

// ── 2. OpenAI-compatible ──────────────────────────────────────────────────────

pub struct OpenAiCompatibleBackend {
    pub base_url: String,
    pub model: String,
    pub embedding_model: String,
    api_key: Option<String>,
    client: SandboxClient,
}

impl OpenAiCompatibleBackend {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
    ) -> Result<Self, LlmError> {
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            embedding_model: "text-embedding-3-small".to_string(),
            api_key,
            client: SandboxClient::new().map_err(LlmError::from)?,
        })
    }

    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = model.into();
        self
    }

    fn authorized(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => req.bearer_auth(key),
            None => req,
        }
    }
}

#[async_trait]
impl LlmBackend for OpenAiCompatibleBackend {
    async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let model = req.model.as_deref().unwrap_or(&self.model).to_string();
        let body = serde_json::json!({
            "model":       model,
            "messages":    req.messages,
            "max_tokens":  req.max_tokens.unwrap_or(4096),
            "temperature": req.temperature.unwrap_or(0.2),
        });
        let resp = self.authorized(self.client.post(&url)?).json(&body).send().await?;
        let json = check_response_status(resp).await?;
        Ok(LlmResponse {
            content: json["choices"][0]["message"]["content"]
                .as_str()
                .unwrap_or("")
                .to_string(),
            model: json["model"].as_str().unwrap_or(&model).to_string(),
        })
    }

    async fn embed(&self, text: &str, dim: usize) -> Result<Vec<f32>, LlmError> {
        let url = format!("{}/v1/embeddings", self.base_url);
        let body = serde_json::json!({
            "model":      &self.embedding_model,
            "input":      text,
            "dimensions": dim,
        });
        let resp = self.authorized(self.client.post(&url)?).json(&body).send().await?;
        let json = check_response_status(resp).await?;
        Ok(parse_float_array(&json["data"][0]["embedding"]))
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}
