//! Configuration types.

use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Store persona embedded in every system prompt.
#[derive(Debug, Clone)]
pub struct Persona {
    /// Store name, e.g. "HG Phones".
    pub store_name: String,
    /// Seller name the assistant speaks as, e.g. "Alex".
    pub seller_name: String,
}

impl Default for Persona {
    fn default() -> Self {
        Self {
            store_name: "HG Phones".to_string(),
            seller_name: "Alex".to_string(),
        }
    }
}

impl Persona {
    /// Load the persona from `SHOP_NAME` / `SELLER_NAME`, falling back to
    /// the defaults.
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            store_name: std::env::var("SHOP_NAME").unwrap_or(default.store_name),
            seller_name: std::env::var("SELLER_NAME").unwrap_or(default.seller_name),
        }
    }
}

/// Decoding options passed through to the completion backend.
#[derive(Debug, Clone)]
pub struct CompletionOptions {
    pub temperature: f32,
    /// Maximum output tokens.
    pub max_tokens: u32,
    pub top_p: f32,
    pub top_k: u32,
    pub repeat_penalty: f32,
    /// Stop sequences; the model never emits text past any of these.
    pub stop: Vec<String>,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            max_tokens: 80,
            top_p: 0.9,
            top_k: 40,
            repeat_penalty: 1.2,
            stop: vec![
                "\n\n".to_string(),
                "Cliente:".to_string(),
                "Vendedor:".to_string(),
                "Usuário:".to_string(),
            ],
        }
    }
}

/// Which completion backend to use.
#[derive(Debug, Clone)]
pub enum LlmBackend {
    /// Local Ollama server (`/api/chat`).
    Ollama { base_url: String, model: String },
    /// Hosted OpenAI-compatible server (`/v1/chat/completions`).
    OpenAi {
        base_url: String,
        api_key: SecretString,
        model: String,
    },
}

/// LLM configuration. `backend: None` means no model is reachable and the
/// engine answers from intent-keyed canned replies only.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub backend: Option<LlmBackend>,
    pub options: CompletionOptions,
    /// Per-request timeout on the completion call.
    pub timeout: Duration,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            backend: None,
            options: CompletionOptions::default(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl LlmConfig {
    /// Build from `LLM_BACKEND` and related environment variables.
    ///
    /// Unset `LLM_BACKEND` selects the canned-reply mode; an unknown value
    /// is a configuration error rather than a silent fallback.
    pub fn from_env() -> Result<Self, ConfigError> {
        let backend = match std::env::var("LLM_BACKEND").ok().as_deref() {
            None | Some("") => None,
            Some("ollama") => Some(LlmBackend::Ollama {
                base_url: std::env::var("OLLAMA_URL")
                    .unwrap_or_else(|_| "http://localhost:11434".to_string()),
                model: std::env::var("OLLAMA_MODEL").unwrap_or_else(|_| "gemma3:4b".to_string()),
            }),
            Some("openai") => {
                let api_key = std::env::var("OPENAI_API_KEY")
                    .map_err(|_| ConfigError::MissingEnvVar("OPENAI_API_KEY".to_string()))?;
                Some(LlmBackend::OpenAi {
                    base_url: std::env::var("OPENAI_BASE_URL")
                        .unwrap_or_else(|_| "https://api.openai.com".to_string()),
                    api_key: SecretString::from(api_key),
                    model: std::env::var("OPENAI_MODEL")
                        .unwrap_or_else(|_| "gpt-4o-mini".to_string()),
                })
            }
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    key: "LLM_BACKEND".to_string(),
                    message: format!("unknown backend '{other}' (expected ollama|openai)"),
                });
            }
        };

        Ok(Self {
            backend,
            ..Self::default()
        })
    }
}

/// Web-search configuration.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Per-request timeout on the search call.
    pub timeout: Duration,
    /// How many results enrichment consumes.
    pub max_results: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_results: 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_match_fixed_decoding_config() {
        let opts = CompletionOptions::default();
        assert_eq!(opts.max_tokens, 80);
        assert_eq!(opts.top_k, 40);
        assert_eq!(opts.stop.len(), 4);
        assert!(opts.stop.contains(&"Cliente:".to_string()));
    }

    #[test]
    fn default_llm_config_has_no_backend() {
        let config = LlmConfig::default();
        assert!(config.backend.is_none());
        assert_eq!(config.timeout, Duration::from_secs(30));
    }
}
