//! Generation convenience layer: model-tier selection and the single-retry
//! policy applied at every external LLM call site.

use std::future::Future;
use std::sync::Arc;

use crate::backend::{LlmBackend, LlmError, LlmRequest};

/// Which model a synthesis stage wants. Keyword extraction, critique and
/// chat answers run on the light tier; report, table and graph generation on
/// the default tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelTier {
    Default,
    Light,
}

/// Retry a fallible async operation once if the first failure is
/// transport-class. The per-attempt bound comes from the HTTP client timeout.
pub async fn retry_once<T, F, Fut>(op: F) -> Result<T, LlmError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, LlmError>>,
{
    match op().await {
        Ok(v) => Ok(v),
        Err(e) if e.is_retryable() => {
            tracing::warn!(error = %e, "LLM call failed, retrying once");
            op().await
        }
        Err(e) => Err(e),
    }
}

/// Thin wrapper over a backend carrying the configured model names.
#[derive(Clone)]
pub struct Generator {
    backend: Arc<dyn LlmBackend>,
    model: String,
    light_model: String,
}

impl Generator {
    pub fn new(backend: Arc<dyn LlmBackend>, model: String, light_model: String) -> Self {
        Self { backend, model, light_model }
    }

    pub fn backend(&self) -> Arc<dyn LlmBackend> {
        self.backend.clone()
    }

    /// One prompt in, trimmed text out, retried once on transport failure.
    pub async fn generate(&self, prompt: &str, tier: ModelTier) -> Result<String, LlmError> {
        let model = match tier {
            ModelTier::Default => &self.model,
            ModelTier::Light => &self.light_model,
        };
        let resp = retry_once(|| {
            self.backend
                .complete(LlmRequest::prompt(prompt).with_model(model.clone()))
        })
        .await?;
        Ok(resp.content.trim().to_string())
    }
}
