//! LLM backend trait and concrete implementations for Lectern.

pub mod backend;
pub mod generate;

pub use backend::{
    GeminiBackend, LlmBackend, LlmError, LlmRequest, LlmResponse, Message,
    OpenAiCompatibleBackend,
};
pub use generate::{retry_once, Generator, ModelTier};
