use std::time::Duration;

use async_openai::{
    config::OpenAIConfig,
    error::{ApiError, OpenAIError},
    types::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequest, CreateChatCompletionRequestArgs, CreateChatCompletionResponse,
        Stop,
    },
    Client,
};

use crate::{
    config::{parse_llm_provider_model, LlmConfig},
    error::{MoheError, Result},
    llm::provider::CompletionOptions,
};

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";
const OLLAMA_BASE_URL: &str = "http://localhost:11434/v1";
const LMSTUDIO_BASE_URL: &str = "http://localhost:1234/v1";

/// Chat completion client for OpenAI-compatible endpoints.
#[derive(Clone)]
pub struct LlmApiClient {
    client: Client<OpenAIConfig>,
    model: String,
    max_retries: u32,
}

impl LlmApiClient {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let (provider, model) = parse_llm_provider_model(&config.model);
        let provider = provider.to_lowercase();

        let needs_api_key = !matches!(provider.as_str(), "ollama" | "local" | "lmstudio");
        if needs_api_key && config.api_key.is_none() {
            return Err(MoheError::Llm(format!(
                "API key required for provider '{provider}'"
            )));
        }

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| default_base_url(&provider).to_string());
        let model = if provider == "local" {
            config.model.clone()
        } else {
            model.to_string()
        };

        let openai_config = OpenAIConfig::new()
            .with_api_base(base_url)
            .with_api_key(config.api_key.clone().unwrap_or_default());

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|error| MoheError::Llm(format!("Failed to create LLM HTTP client: {error}")))?;

        // async-openai retries server errors on its own; bound that by our timeout.
        let backoff = backoff::ExponentialBackoff {
            max_elapsed_time: Some(Duration::from_secs(config.timeout_secs)),
            ..Default::default()
        };

        let client = Client::with_config(openai_config)
            .with_http_client(http_client)
            .with_backoff(backoff);

        Ok(Self {
            client,
            model,
            max_retries: config.max_retries,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Run a chat completion, retrying transient failures with exponential delay.
    pub async fn complete(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        options: Option<&CompletionOptions>,
    ) -> Result<String> {
        if prompt.trim().is_empty() {
            return Err(MoheError::Validation("Prompt cannot be empty".to_string()));
        }

        let mut attempt = 0;
        loop {
            let request = self.build_request(prompt, system_prompt, options)?;

            let error = match self.client.chat().create(request).await {
                Ok(response) => return Self::extract_content(response),
                Err(error) => error,
            };

            if let Some(terminal) = Self::rate_limit_error(&error).or_else(|| Self::auth_error(&error))
            {
                return Err(terminal);
            }

            let retryable = Self::is_retryable(&error);
            let mapped = Self::map_openai_error(error);
            if !retryable || attempt >= self.max_retries {
                return Err(mapped);
            }

            attempt += 1;
            let delay_ms = 100 * 2_u64.pow(attempt - 1);
            tracing::debug!(attempt, delay_ms, error = %mapped, "Retrying LLM completion");
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }
    }

    fn build_request(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        options: Option<&CompletionOptions>,
    ) -> Result<CreateChatCompletionRequest> {
        let mut messages = Vec::new();

        if let Some(system_prompt) = system_prompt.filter(|value| !value.trim().is_empty()) {
            messages.push(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(system_prompt)
                    .build()
                    .map_err(|error| MoheError::Validation(format!("Invalid system prompt: {error}")))?
                    .into(),
            );
        }

        messages.push(
            ChatCompletionRequestUserMessageArgs::default()
                .content(prompt)
                .build()
                .map_err(|error| MoheError::Validation(format!("Invalid user prompt: {error}")))?
                .into(),
        );

        let mut request = CreateChatCompletionRequestArgs::default();
        request.model(self.model.clone()).messages(messages);

        if let Some(options) = options {
            if let Some(temperature) = options.temperature {
                request.temperature(temperature);
            }
            if let Some(max_tokens) = options.max_tokens {
                request.max_tokens(max_tokens);
            }
            if let Some(top_p) = options.top_p {
                request.top_p(top_p);
            }
            if let Some(stop) = options.stop.as_ref().filter(|values| !values.is_empty()) {
                request.stop(Stop::StringArray(stop.clone()));
            }
        }

        request
            .build()
            .map_err(|error| MoheError::Validation(format!("Invalid LLM completion request: {error}")))
    }

    fn extract_content(response: CreateChatCompletionResponse) -> Result<String> {
        let message = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| MoheError::Llm("LLM response contained no choices".to_string()))?
            .message
            .content
            .unwrap_or_default();

        if message.trim().is_empty() {
            return Err(MoheError::Llm("LLM response contained empty content".to_string()));
        }

        Ok(message)
    }

    fn is_retryable(error: &OpenAIError) -> bool {
        match error {
            OpenAIError::ApiError(api_error) => api_error.r#type.is_none() && api_error.code.is_none(),
            OpenAIError::Reqwest(reqwest_error) => reqwest_error
                .status()
                .map(|status| status.is_server_error())
                .unwrap_or(true),
            _ => false,
        }
    }

    fn rate_limit_error(error: &OpenAIError) -> Option<MoheError> {
        let limited = match error {
            OpenAIError::Reqwest(reqwest_error) => {
                reqwest_error.status() == Some(reqwest::StatusCode::TOO_MANY_REQUESTS)
            }
            OpenAIError::ApiError(api_error) => Self::api_error_mentions(
                api_error,
                &["rate limit", "too many requests", "rate_limit", "insufficient_quota"],
            ),
            _ => false,
        };
        limited.then_some(MoheError::LlmRateLimit { retry_after: None })
    }

    fn auth_error(error: &OpenAIError) -> Option<MoheError> {
        match error {
            OpenAIError::Reqwest(reqwest_error)
                if matches!(
                    reqwest_error.status(),
                    Some(reqwest::StatusCode::UNAUTHORIZED) | Some(reqwest::StatusCode::FORBIDDEN)
                ) =>
            {
                Some(MoheError::Llm(format!("LLM authentication failed: {reqwest_error}")))
            }
            OpenAIError::ApiError(api_error)
                if Self::api_error_mentions(
                    api_error,
                    &["unauthorized", "forbidden", "authentication", "invalid api key", "invalid_api_key"],
                ) =>
            {
                Some(MoheError::Llm(format!("LLM authentication failed: {api_error}")))
            }
            _ => None,
        }
    }

    fn api_error_mentions(api_error: &ApiError, needles: &[&str]) -> bool {
        let haystack = format!(
            "{} {} {}",
            api_error.message,
            api_error.r#type.clone().unwrap_or_default(),
            api_error.code.clone().unwrap_or_default()
        )
        .to_lowercase();
        needles.iter().any(|needle| haystack.contains(needle))
    }

    fn map_openai_error(error: OpenAIError) -> MoheError {
        match error {
            OpenAIError::Reqwest(reqwest_error) => {
                MoheError::Llm(format!("LLM request failed: {reqwest_error}"))
            }
            OpenAIError::ApiError(api_error) => MoheError::Llm(format!("LLM API error: {api_error}")),
            OpenAIError::JSONDeserialize(err) => {
                MoheError::Llm(format!("Failed to parse LLM response: {err}"))
            }
            OpenAIError::InvalidArgument(message) => MoheError::Validation(message),
            other => MoheError::Llm(other.to_string()),
        }
    }
}

fn default_base_url(provider: &str) -> &'static str {
    match provider {
        "openrouter" => OPENROUTER_BASE_URL,
        "ollama" => OLLAMA_BASE_URL,
        "lmstudio" => LMSTUDIO_BASE_URL,
        _ => OPENAI_BASE_URL,
    }
}
