//! OpenAI and OpenAI-compatible backends.
//!
//! Both speak the chat completions API. The official provider defaults to
//! `api.openai.com`; the compatible provider has no default endpoint and
//! refuses to resolve without a `BASE_URL`.

use crate::env::{endpoints, vars};
use crate::llm::http;
use crate::llm::provider::{LanguageModel, ProviderResolver};
use crate::llm::types::{
    GenerationRequest, GenerationResponse, LLMError, ProviderKind, Settings, TokenUsage,
};
use futures::future::BoxFuture;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::debug;

/// Resolver for the `openai` and `openai-compatible` provider kinds.
pub struct OpenAIProvider {
    kind: ProviderKind,
}

impl OpenAIProvider {
    pub fn openai() -> Self {
        Self {
            kind: ProviderKind::OpenAI,
        }
    }

    pub fn compatible() -> Self {
        Self {
            kind: ProviderKind::OpenAICompatible,
        }
    }

    /// Map settings onto the chat completions connection for this kind.
    pub fn chat_config(&self, settings: &Settings) -> Result<ChatCompletionsConfig, LLMError> {
        let connection = settings.connection();

        let base_url = match connection.base_url {
            Some(url) => http::validate_base_url(self.kind, &url)?,
            None if self.kind == ProviderKind::OpenAICompatible => {
                return Err(LLMError::Configuration(
                    "Base URL is required for OpenAI-compatible providers".to_string(),
                ));
            }
            None => endpoints::OPENAI_BASE_URL.to_string(),
        };

        // Compatible servers often run without authentication
        let (api_key_env, max_tokens_field) = match self.kind {
            ProviderKind::OpenAICompatible => (None, "max_tokens"),
            _ => (Some(vars::OPENAI_API_KEY), "max_completion_tokens"),
        };

        Ok(ChatCompletionsConfig {
            provider: self.kind,
            model: settings.model.clone(),
            base_url,
            api_key: connection.api_key,
            api_key_env,
            max_tokens_field,
            send_reasoning_effort: true,
        })
    }
}

impl ProviderResolver for OpenAIProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn resolve(
        &self,
        settings: &Settings,
        client: &reqwest::Client,
    ) -> Result<Arc<dyn LanguageModel>, LLMError> {
        let config = self.chat_config(settings)?;
        Ok(Arc::new(ChatCompletionsModel::new(config, client.clone())))
    }
}

/// Connection and wire details for a chat completions endpoint.
#[derive(Debug, Clone)]
pub struct ChatCompletionsConfig {
    pub provider: ProviderKind,
    pub model: String,
    pub base_url: String,
    pub api_key: Option<String>,
    /// Fallback variable for the key. `None` makes the key optional.
    pub api_key_env: Option<&'static str>,
    /// Body field carrying the token limit
    pub max_tokens_field: &'static str,
    pub send_reasoning_effort: bool,
}

/// Model handle for any endpoint speaking the chat completions API.
pub struct ChatCompletionsModel {
    config: ChatCompletionsConfig,
    client: reqwest::Client,
}

impl ChatCompletionsModel {
    pub fn new(config: ChatCompletionsConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    pub fn config(&self) -> &ChatCompletionsConfig {
        &self.config
    }

    fn api_key(&self) -> Result<Option<String>, LLMError> {
        match self.config.api_key_env {
            Some(env_var) => {
                http::require_api_key(self.config.provider, self.config.api_key.as_deref(), env_var)
                    .map(Some)
            }
            None => Ok(self.config.api_key.clone()),
        }
    }

    /// Build the request body. Unset options are left out entirely.
    pub fn build_request_body(&self, request: &GenerationRequest) -> Value {
        let mut messages = Vec::new();
        if let Some(system) = &request.system {
            messages.push(json!({ "role": "system", "content": system }));
        }
        messages.push(json!({ "role": "user", "content": request.prompt }));

        let mut body = json!({
            "model": self.config.model,
            "messages": messages,
        });

        if let Some(temperature) = request.temperature {
            body["temperature"] = json!(temperature);
        }

        if let Some(max_tokens) = request.max_tokens {
            body[self.config.max_tokens_field] = json!(max_tokens);
        }

        if self.config.send_reasoning_effort
            && let Some(effort) = &request.reasoning_effort
        {
            body["reasoning_effort"] = json!(effort.as_str());
        }

        body
    }

    fn parse_response(
        &self,
        response: ChatCompletionResponse,
    ) -> Result<GenerationResponse, LLMError> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LLMError::InvalidResponse {
                provider: self.config.provider,
                message: "No choices in response".to_string(),
            })?;

        let text = match (choice.message.content, choice.message.refusal) {
            (Some(content), _) => content,
            (None, Some(refusal)) => refusal,
            (None, None) => String::new(),
        };

        Ok(GenerationResponse {
            text,
            model_id: response.model,
            usage: response
                .usage
                .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens)),
            finish_reason: choice.finish_reason,
        })
    }
}

impl LanguageModel for ChatCompletionsModel {
    fn generate(
        &self,
        request: GenerationRequest,
    ) -> BoxFuture<'_, Result<GenerationResponse, LLMError>> {
        Box::pin(async move {
            let api_key = self.api_key()?;
            let body = self.build_request_body(&request);
            let url = format!("{}/chat/completions", self.config.base_url);

            let mut headers = Vec::new();
            if let Some(key) = api_key {
                headers.push(("Authorization", format!("Bearer {}", key)));
            }

            debug!(
                provider = %self.config.provider,
                model = %self.config.model,
                url = %url,
                request_id = %request.id,
                "Sending chat completion request"
            );

            let response: ChatCompletionResponse = http::post_json(
                &self.client,
                self.config.provider,
                &url,
                &headers,
                &body,
                request.max_retries,
            )
            .await?;

            self.parse_response(response)
        })
    }

    fn provider(&self) -> ProviderKind {
        self.config.provider
    }

    fn model_id(&self) -> &str {
        &self.config.model
    }
}

// Chat completions response types
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}
