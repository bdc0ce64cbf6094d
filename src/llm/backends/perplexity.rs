//! Perplexity backend.
//!
//! Perplexity serves the chat completions wire format from its own endpoint.
//! Without a `BASE_URL` the public API is used.

use super::openai::{ChatCompletionsConfig, ChatCompletionsModel};
use crate::env::{endpoints, vars};
use crate::llm::http;
use crate::llm::provider::{LanguageModel, ProviderResolver};
use crate::llm::types::{LLMError, ProviderKind, Settings};
use std::sync::Arc;

pub struct PerplexityProvider;

impl PerplexityProvider {
    pub fn chat_config(&self, settings: &Settings) -> Result<ChatCompletionsConfig, LLMError> {
        let connection = settings.connection();
        let base_url = match connection.base_url {
            Some(url) => http::validate_base_url(ProviderKind::Perplexity, &url)?,
            None => endpoints::PERPLEXITY_BASE_URL.to_string(),
        };

        Ok(ChatCompletionsConfig {
            provider: ProviderKind::Perplexity,
            model: settings.model.clone(),
            base_url,
            api_key: connection.api_key,
            api_key_env: Some(vars::PERPLEXITY_API_KEY),
            max_tokens_field: "max_tokens",
            send_reasoning_effort: false,
        })
    }
}

impl ProviderResolver for PerplexityProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Perplexity
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::types::{GenerationRequest, ReasoningEffort};

    #[test]
    fn test_default_endpoint() {
        let settings = Settings::new(ProviderKind::Perplexity, "sonar-pro");
        let config = PerplexityProvider.chat_config(&settings).unwrap();
        assert_eq!(config.base_url, "https://api.perplexity.ai");
        assert_eq!(config.api_key_env, Some("PERPLEXITY_API_KEY"));
    }

    #[test]
    fn test_base_url_override() {
        let settings = Settings::new(ProviderKind::Perplexity, "sonar-pro")
            .with_base_url("https://proxy.internal/perplexity/");
        let config = PerplexityProvider.chat_config(&settings).unwrap();
        assert_eq!(config.base_url, "https://proxy.internal/perplexity");
    }

    #[test]
    fn test_reasoning_effort_not_sent() {
        let settings = Settings::new(ProviderKind::Perplexity, "sonar-reasoning");
        let model = ChatCompletionsModel::new(
            PerplexityProvider.chat_config(&settings).unwrap(),
            reqwest::Client::new(),
        );
        let request = GenerationRequest {
            reasoning_effort: Some(ReasoningEffort::High),
            max_tokens: Some(512),
            ..GenerationRequest::new("hello")
        };

        let body = model.build_request_body(&request);
        assert!(body.get("reasoning_effort").is_none());
        assert_eq!(body["max_tokens"], 512);
    }
}
