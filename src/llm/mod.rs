//! LLM integration for Shop Assist.
//!
//! Supports:
//! - **Ollama**: local model server, `/api/chat`
//! - **OpenAI-compatible**: hosted completion API, `/v1/chat/completions`
//!
//! Both backends implement the `LlmProvider` trait so the response engine
//! never knows which one it is talking to.

pub mod ollama;
pub mod openai;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::{CompletionOptions, LlmBackend, LlmConfig};
use crate::error::LlmError;

/// Role of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One message in a completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A whole-response completion request (no streaming).
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub options: CompletionOptions,
}

impl CompletionRequest {
    pub fn new(messages: Vec<ChatMessage>, options: CompletionOptions) -> Self {
        Self { messages, options }
    }
}

/// Completion backend trait.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Run one completion and return the raw assistant text.
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError>;

    /// Model identifier, for logging.
    fn model_name(&self) -> &str;
}

/// Create an LLM provider from configuration.
///
/// Returns `None` when no backend is configured; the engine then answers
/// from canned replies.
pub fn create_provider(config: &LlmConfig) -> Result<Option<Arc<dyn LlmProvider>>, LlmError> {
    match &config.backend {
        None => Ok(None),
        Some(LlmBackend::Ollama { base_url, model }) => {
            let provider = ollama::OllamaProvider::new(base_url, model, config.timeout)?;
            tracing::info!(model = %model, "Using Ollama backend");
            Ok(Some(Arc::new(provider)))
        }
        Some(LlmBackend::OpenAi {
            base_url,
            api_key,
            model,
        }) => {
            let provider =
                openai::OpenAiProvider::new(base_url, api_key.clone(), model, config.timeout)?;
            tracing::info!(model = %model, "Using OpenAI-compatible backend");
            Ok(Some(Arc::new(provider)))
        }
    }
}
