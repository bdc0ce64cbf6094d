//! Anthropic backend using the Messages API.

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

/// The Messages API requires `max_tokens`; this applies when none is configured.
pub const DEFAULT_MAX_TOKENS: u64 = 4096;

pub struct AnthropicProvider;

impl ProviderResolver for AnthropicProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    fn resolve(
        &self,
        settings: &Settings,
        client: &reqwest::Client,
    ) -> Result<Arc<dyn LanguageModel>, LLMError> {
        let connection = settings.connection();
        let base_url = match connection.base_url {
            Some(url) => http::validate_base_url(ProviderKind::Anthropic, &url)?,
            None => endpoints::ANTHROPIC_BASE_URL.to_string(),
        };

        Ok(Arc::new(AnthropicModel {
            model: settings.model.clone(),
            base_url,
            api_key: connection.api_key,
            client: client.clone(),
        }))
    }
}

pub struct AnthropicModel {
    model: String,
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl AnthropicModel {
    fn build_request_body(&self, request: &GenerationRequest) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": [
                {
                    "role": "user",
                    "content": request.prompt
                }
            ],
            "max_tokens": request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        });

        if let Some(system) = &request.system {
            body["system"] = json!(system);
        }

        if let Some(temperature) = request.temperature {
            body["temperature"] = json!(temperature);
        }

        body
    }

    fn parse_response(&self, response: AnthropicResponse) -> GenerationResponse {
        let text = response
            .content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                ContentBlock::Other => None,
            })
            .collect::<Vec<_>>()
            .join("");

        GenerationResponse {
            text,
            model_id: response.model,
            usage: response
                .usage
                .map(|u| TokenUsage::new(u.input_tokens, u.output_tokens)),
            finish_reason: response.stop_reason,
        }
    }
}

impl LanguageModel for AnthropicModel {
    fn generate(
        &self,
        request: GenerationRequest,
    ) -> BoxFuture<'_, Result<GenerationResponse, LLMError>> {
        Box::pin(async move {
            let api_key = http::require_api_key(
                ProviderKind::Anthropic,
                self.api_key.as_deref(),
                vars::ANTHROPIC_API_KEY,
            )?;
            let body = self.build_request_body(&request);
            let url = format!("{}/messages", self.base_url);

            debug!(
                provider = "anthropic",
                model = %self.model,
                url = %url,
                request_id = %request.id,
                "Sending request to Anthropic"
            );

            let headers = [
                ("x-api-key", api_key),
                ("anthropic-version", endpoints::ANTHROPIC_VERSION.to_string()),
            ];
            let response: AnthropicResponse = http::post_json(
                &self.client,
                ProviderKind::Anthropic,
                &url,
                &headers,
                &body,
                request.max_retries,
            )
            .await?;

            Ok(self.parse_response(response))
        })
    }

    fn provider(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

// Anthropic API response types
#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
    #[serde(default)]
    usage: Option<AnthropicUsage>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}
