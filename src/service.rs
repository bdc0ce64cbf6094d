//! The ask-ai service: turns a [`Query`] into one generation call.
//!
//! ## Flow
//!
//! 1. Settings are validated once, when the service is built
//! 2. Each query resolves a fresh model handle through the [`ProviderRegistry`]
//! 3. The question and optional context are flattened into a tagged prompt
//! 4. A single generation call is made with retries pinned to zero
//! 5. Any failure comes back as `AI service error: <cause>`
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use ask_ai::{AskAiService, ProviderKind, Query, Settings};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = Settings::new(ProviderKind::OpenAI, "o3-2025-04-16").with_api_key("sk-...");
//! let service = AskAiService::new(settings)?;
//!
//! let answer = service
//!     .answer_query(Query::new("Is a BTreeMap a good fit here?").with_context("fn main() {}"))
//!     .await?;
//! println!("{}", answer.text);
//! # Ok(())
//! # }
//! ```

use crate::env::{SERVER_NAME, SERVER_VERSION};
use crate::llm::{
    Answer, GenerationRequest, LLMError, LanguageModel, ProviderRegistry, Query, Settings,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// Instruction attached to every generation call.
pub const SYSTEM_PROMPT: &str = "\
You are a large language model working as a peer assistant. Another AI model is calling you through a tool because it wants your help.

It may want a second opinion, a different angle on a problem, or help with something it could not solve alone. Answer as a collaborator.

Keep in mind:
- The request comes from another AI. Your answer will be read and processed by that AI as part of its own task.
- Offer your answer as advice or an alternative viewpoint, not as an authoritative instruction or established fact.
- The calling AI may leave out background, context or earlier conversation because it assumes you already have it. You do not, and you have no memory of previous calls. If the information you were given looks incomplete in any way, do not answer. Say plainly that the context is incomplete and ask the caller to resend its question with the full context, including all relevant history.
- The caller's assumptions or chosen approach may be wrong. Step back, consider the wider picture, and think it through before answering.
- Know your limits, including your knowledge cutoff. When you are unsure or a request is beyond what you can do, say so instead of guessing or giving an evasive answer.

Your goal is to help the other AI get past its problem. Be clear, structured and actionable.";

/// Flatten a query into the tagged prompt sent to the backend.
///
/// The context block, when present, always precedes the question block.
pub fn build_prompt(query: &Query) -> String {
    let question = format!("<question>\n{}\n</question>", query.question);

    match query.context() {
        Some(context) => format!("<context>\n{}\n</context>\n\n{}", context, question),
        None => question,
    }
}

/// Stateless query translator bound to one set of [`Settings`].
///
/// Cloning is cheap and clones share the HTTP connection pool.
#[derive(Clone)]
pub struct AskAiService {
    settings: Arc<Settings>,
    registry: Arc<ProviderRegistry>,
    client: reqwest::Client,
}

impl AskAiService {
    pub fn new(settings: Settings) -> Result<Self, LLMError> {
        Self::with_registry(settings, ProviderRegistry::with_defaults())
    }

    /// Build the service against a specific provider table.
    ///
    /// Fails with a configuration error when the settings are invalid. A
    /// missing base URL for `openai-compatible` is not detected here; it
    /// surfaces on the first query.
    pub fn with_registry(
        settings: Settings,
        registry: ProviderRegistry,
    ) -> Result<Self, LLMError> {
        settings.validate()?;
        let client = build_http_client(&settings)?;

        Ok(Self {
            settings: Arc::new(settings),
            registry: Arc::new(registry),
            client,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Build a model handle for the configured provider.
    pub fn resolve_model(&self) -> Result<Arc<dyn LanguageModel>, LLMError> {
        self.registry.resolve(&self.settings, &self.client)
    }

    /// The generation call a query translates into.
    pub fn generation_request(&self, query: &Query) -> GenerationRequest {
        let settings = &self.settings;

        let reasoning_effort = match &settings.reasoning_effort {
            Some(effort) if settings.provider.supports_reasoning_effort() => Some(effort.clone()),
            Some(effort) => {
                debug!(
                    provider = %settings.provider,
                    reasoning_effort = %effort,
                    "Provider does not accept a reasoning effort, ignoring it"
                );
                None
            }
            None => None,
        };

        GenerationRequest {
            prompt: build_prompt(query),
            system: Some(SYSTEM_PROMPT.to_string()),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens.and_then(|v| u64::try_from(v).ok()),
            reasoning_effort,
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Ask the configured model one question.
    ///
    /// Every failure, whether from resolution or from the backend, is
    /// returned as [`LLMError::Service`].
    pub async fn answer_query(&self, query: Query) -> Result<Answer, LLMError> {
        let request = self.generation_request(&query);
        let request_id = request.id;

        self.try_answer(&query, request).await.map_err(|err| {
            error!(
                request_id = %request_id,
                provider = %self.settings.provider,
                error = %err,
                "Query failed"
            );
            err.into_service_error()
        })
    }

    async fn try_answer(
        &self,
        query: &Query,
        request: GenerationRequest,
    ) -> Result<Answer, LLMError> {
        if query.question.trim().is_empty() {
            return Err(LLMError::InvalidRequest("Question is required".to_string()));
        }

        let model = self.resolve_model()?;
        let request_id = request.id;

        info!(
            request_id = %request_id,
            provider = %self.settings.provider,
            model = %model.model_id(),
            has_context = query.context().is_some(),
            "Asking AI"
        );

        let started = Instant::now();
        let response = model.generate(request).await?;

        info!(
            request_id = %request_id,
            resolved_model = response.model_id.as_deref().unwrap_or("unknown"),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Received AI response"
        );

        Ok(Answer {
            text: response.text,
            provider: self.settings.provider,
            resolved_model_id: response.model_id,
            usage: response.usage,
        })
    }
}

/// One-shot form: validate `settings`, then answer `query`.
pub async fn answer_query(settings: Settings, query: Query) -> Result<Answer, LLMError> {
    AskAiService::new(settings)?.answer_query(query).await
}

fn build_http_client(settings: &Settings) -> Result<reqwest::Client, LLMError> {
    let mut builder =
        reqwest::Client::builder().user_agent(format!("{}/{}", SERVER_NAME, SERVER_VERSION));

    if let Some(secs) = settings.request_timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }

    builder
        .build()
        .map_err(|e| LLMError::Configuration(format!("Failed to build HTTP client: {}", e)))
}
