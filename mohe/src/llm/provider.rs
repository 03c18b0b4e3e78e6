use std::sync::Arc;

use crate::config::{parse_llm_provider_model, LlmConfig};
use crate::error::{MoheError, Result};
use crate::llm::api::LlmApiClient;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmBackend {
    OpenAI,
    OpenRouter,
    Ollama,
    LmStudio,
    OpenAICompatible { base_url: String },
    Unavailable { reason: String },
}

#[derive(Debug, Clone, Default)]
pub struct CompletionOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub top_p: Option<f32>,
    pub stop: Option<Vec<String>>,
}

/// Text completion collaborator selected once at startup.
#[derive(Clone)]
pub struct LlmProvider {
    backend: LlmBackend,
    client: Option<Arc<LlmApiClient>>,
}

impl LlmProvider {
    pub fn new(config: Option<&LlmConfig>) -> Self {
        let Some(config) = config else {
            return Self::unavailable("No LLM configuration provided");
        };

        let (provider, _model) = parse_llm_provider_model(&config.model);

        let backend = match provider.to_lowercase().as_str() {
            "openai" => LlmBackend::OpenAI,
            "openrouter" => LlmBackend::OpenRouter,
            "ollama" => LlmBackend::Ollama,
            "lmstudio" => LlmBackend::LmStudio,
            _ => match &config.base_url {
                Some(base_url) => LlmBackend::OpenAICompatible {
                    base_url: base_url.clone(),
                },
                None => {
                    return Self::unavailable(&format!(
                        "Unknown provider in model: {}",
                        config.model
                    ))
                }
            },
        };

        match LlmApiClient::new(config) {
            Ok(client) => Self {
                backend,
                client: Some(Arc::new(client)),
            },
            Err(e) => {
                tracing::warn!(model = %config.model, error = %e, "LLM client unavailable");
                Self::unavailable(&e.to_string())
            }
        }
    }

    pub fn unavailable(reason: &str) -> Self {
        Self {
            backend: LlmBackend::Unavailable {
                reason: reason.to_string(),
            },
            client: None,
        }
    }

    pub fn is_available(&self) -> bool {
        self.client.is_some() && !matches!(self.backend, LlmBackend::Unavailable { .. })
    }

    pub fn backend(&self) -> &LlmBackend {
        &self.backend
    }

    pub fn model_name(&self) -> Option<&str> {
        self.client.as_deref().map(LlmApiClient::model)
    }

    pub async fn complete(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        options: Option<&CompletionOptions>,
    ) -> Result<String> {
        match (&self.backend, &self.client) {
            (LlmBackend::Unavailable { reason }, _) => Err(MoheError::LlmUnavailable(reason.clone())),
            (_, None) => Err(MoheError::LlmUnavailable("No LLM client configured".to_string())),
            (_, Some(client)) => client.complete(prompt, system_prompt, options).await,
        }
    }
}

impl std::fmt::Debug for LlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmProvider")
            .field("backend", &self.backend)
            .field("model", &self.model_name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn llm_config(model: &str, base_url: Option<&str>) -> LlmConfig {
        LlmConfig {
            model: model.to_string(),
            api_key: Some("test-key".to_string()),
            base_url: base_url.map(String::from),
            timeout_secs: 5,
            max_retries: 0,
        }
    }

    #[test]
    fn test_backend_selection() {
        let provider = LlmProvider::new(Some(&llm_config("openai/gpt-4o-mini", None)));
        assert_eq!(provider.backend(), &LlmBackend::OpenAI);
        assert!(provider.is_available());

        let provider = LlmProvider::new(Some(&llm_config("ollama/llama3", None)));
        assert_eq!(provider.backend(), &LlmBackend::Ollama);

        let provider = LlmProvider::new(Some(&llm_config("custom-model", Some("http://llm.local/v1"))));
        assert_eq!(
            provider.backend(),
            &LlmBackend::OpenAICompatible {
                base_url: "http://llm.local/v1".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_provider_is_unavailable() {
        let provider = LlmProvider::new(Some(&llm_config("custom-model", None)));
        assert!(!provider.is_available());
        assert!(matches!(provider.backend(), LlmBackend::Unavailable { .. }));
    }

    #[tokio::test]
    async fn test_unavailable_provider_returns_error() {
        let provider = LlmProvider::new(None);
        let result = provider.complete("hello", None, None).await;
        assert!(matches!(result, Err(MoheError::LlmUnavailable(_))));
    }
}
