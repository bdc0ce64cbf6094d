//! Google Gemini backend using `generateContent`.

use crate::env::{endpoints, vars};
use crate::llm::http;
use crate::llm::provider::{LanguageModel, ProviderResolver};
use crate::llm::types::{
    GenerationRequest, GenerationResponse, LLMError, ProviderKind, Settings, TokenUsage,
};
use futures::future::BoxFuture;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use tracing::debug;

pub struct GoogleProvider;

impl ProviderResolver for GoogleProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Google
    }

    fn resolve(
        &self,
        settings: &Settings,
        client: &reqwest::Client,
    ) -> Result<Arc<dyn LanguageModel>, LLMError> {
        let connection = settings.connection();
        let base_url = match connection.base_url {
            Some(url) => http::validate_base_url(ProviderKind::Google, &url)?,
            None => endpoints::GOOGLE_BASE_URL.to_string(),
        };

        Ok(Arc::new(GoogleModel {
            model: settings.model.clone(),
            base_url,
            api_key: connection.api_key,
            client: client.clone(),
        }))
    }
}

pub struct GoogleModel {
    model: String,
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl GoogleModel {
    fn endpoint(&self) -> String {
        // Model ids are accepted both bare and with the `models/` prefix
        let model = self.model.strip_prefix("models/").unwrap_or(&self.model);
        format!("{}/models/{}:generateContent", self.base_url, model)
    }

    fn build_request_body(&self, request: &GenerationRequest) -> Value {
        let mut body = json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": request.prompt }]
            }]
        });

        if let Some(system) = &request.system {
            body["systemInstruction"] = json!({ "parts": [{ "text": system }] });
        }

        let mut generation_config = Map::new();
        if let Some(temperature) = request.temperature {
            generation_config.insert("temperature".to_string(), json!(temperature));
        }
        if let Some(max_tokens) = request.max_tokens {
            generation_config.insert("maxOutputTokens".to_string(), json!(max_tokens));
        }
        if !generation_config.is_empty() {
            body["generationConfig"] = Value::Object(generation_config);
        }

        body
    }

    fn parse_response(&self, response: GoogleResponse) -> Result<GenerationResponse, LLMError> {
        let candidate = response.candidates.into_iter().next().ok_or_else(|| {
            let reason = response
                .prompt_feedback
                .and_then(|f| f.block_reason)
                .map(|r| format!("prompt blocked: {}", r))
                .unwrap_or_else(|| "No candidates in response".to_string());
            LLMError::InvalidResponse {
                provider: ProviderKind::Google,
                message: reason,
            }
        })?;

        let text = candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter(|part| !part.thought)
                    .filter_map(|part| part.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        Ok(GenerationResponse {
            text,
            model_id: response.model_version,
            usage: response.usage_metadata.map(|u| TokenUsage {
                input_tokens: u.prompt_token_count,
                output_tokens: u.candidates_token_count,
                total_tokens: u.total_token_count,
            }),
            finish_reason: candidate.finish_reason,
        })
    }
}

impl LanguageModel for GoogleModel {
    fn generate(
        &self,
        request: GenerationRequest,
    ) -> BoxFuture<'_, Result<GenerationResponse, LLMError>> {
        Box::pin(async move {
            let api_key = http::require_api_key(
                ProviderKind::Google,
                self.api_key.as_deref(),
                vars::GOOGLE_API_KEY,
            )?;
            let body = self.build_request_body(&request);
            let url = self.endpoint();

            debug!(
                provider = "google",
                model = %self.model,
                request_id = %request.id,
                "Sending request to Google AI"
            );

            let headers = [("x-goog-api-key", api_key)];
            let response: GoogleResponse = http::post_json(
                &self.client,
                ProviderKind::Google,
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
        ProviderKind::Google
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

// Google API response types
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    model_version: Option<String>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u64,
    #[serde(default)]
    candidates_token_count: u64,
    #[serde(default)]
    total_token_count: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}
