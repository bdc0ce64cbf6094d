use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Supported text-generation backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ProviderKind {
    OpenAI,
    Anthropic,
    Google,
    Perplexity,
    OpenAICompatible,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 5] = [
        ProviderKind::OpenAI,
        ProviderKind::Anthropic,
        ProviderKind::Google,
        ProviderKind::Perplexity,
        ProviderKind::OpenAICompatible,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAI => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Google => "google",
            ProviderKind::Perplexity => "perplexity",
            ProviderKind::OpenAICompatible => "openai-compatible",
        }
    }

    /// Whether the backend accepts a reasoning effort hint.
    pub fn supports_reasoning_effort(&self) -> bool {
        matches!(self, ProviderKind::OpenAI | ProviderKind::OpenAICompatible)
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = LLMError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        ProviderKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| LLMError::UnsupportedProvider(s.to_string()))
    }
}

impl TryFrom<String> for ProviderKind {
    type Error = LLMError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ProviderKind> for String {
    fn from(kind: ProviderKind) -> Self {
        kind.as_str().to_string()
    }
}

/// How much internal deliberation a reasoning model should spend.
///
/// Besides the three named levels, any other value (for example `max` or a
/// numeric token budget such as `10000`) is carried through verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ReasoningEffort {
    Low,
    Medium,
    High,
    Other(String),
}

impl ReasoningEffort {
    pub fn as_str(&self) -> &str {
        match self {
            ReasoningEffort::Low => "low",
            ReasoningEffort::Medium => "medium",
            ReasoningEffort::High => "high",
            ReasoningEffort::Other(value) => value,
        }
    }
}

impl From<String> for ReasoningEffort {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => ReasoningEffort::Low,
            "medium" => ReasoningEffort::Medium,
            "high" => ReasoningEffort::High,
            _ => ReasoningEffort::Other(value.trim().to_string()),
        }
    }
}

impl From<&str> for ReasoningEffort {
    fn from(value: &str) -> Self {
        ReasoningEffort::from(value.to_string())
    }
}

impl From<ReasoningEffort> for String {
    fn from(effort: ReasoningEffort) -> Self {
        effort.as_str().to_string()
    }
}

impl fmt::Display for ReasoningEffort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated server settings, built once per process and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub provider: ProviderKind,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Maximum tokens for responses. Low values can produce empty or truncated answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_effort: Option<ReasoningEffort>,
    /// HTTP client timeout; `None` leaves requests unbounded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
}

impl Settings {
    pub fn new(provider: ProviderKind, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            api_key: None,
            temperature: None,
            max_tokens: None,
            base_url: None,
            reasoning_effort: None,
            request_timeout_secs: None,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: i64) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_reasoning_effort(mut self, effort: impl Into<ReasoningEffort>) -> Self {
        self.reasoning_effort = Some(effort.into());
        self
    }

    /// Eager validation. Provider prerequisites such as a base URL are
    /// checked later, when a model handle is resolved.
    pub fn validate(&self) -> Result<(), LLMError> {
        if self.model.trim().is_empty() {
            return Err(LLMError::Configuration("Model is required".to_string()));
        }

        if let Some(max_tokens) = self.max_tokens
            && max_tokens <= 0
        {
            return Err(LLMError::Configuration(
                "Max tokens must be greater than 0".to_string(),
            ));
        }

        if self.request_timeout_secs == Some(0) {
            return Err(LLMError::Configuration(
                "Request timeout must be greater than 0".to_string(),
            ));
        }

        if let Some(temperature) = self.temperature
            && !temperature.is_finite()
        {
            return Err(LLMError::Configuration(format!(
                "Temperature must be a finite number, got {}",
                temperature
            )));
        }

        Ok(())
    }

    /// Connection settings holding only the fields that are actually set.
    pub fn connection(&self) -> ConnectionSettings {
        ConnectionSettings {
            api_key: non_blank(self.api_key.as_deref()),
            base_url: non_blank(self.base_url.as_deref())
                .map(|url| url.trim_end_matches('/').to_string()),
        }
    }

    /// Copy of the settings that is safe to print.
    pub fn redacted(&self) -> Settings {
        Settings {
            api_key: self.api_key.as_ref().map(|_| "***".to_string()),
            ..self.clone()
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Per-backend connection settings. Absent fields let the backend apply its own defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

/// A question for the second model, with optional background.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl Query {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            context: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Trimmed context, or `None` when it is absent or all whitespace.
    pub fn context(&self) -> Option<&str> {
        self.context
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }
}

/// What the second model said.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    pub provider: ProviderKind,
    /// Model id reported by the backend, which may differ from the configured one
    pub resolved_model_id: Option<String>,
    pub usage: Option<TokenUsage>,
}

/// A single text generation call against a model handle
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub id: Uuid,
    pub prompt: String,
    pub system: Option<String>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u64>,
    pub reasoning_effort: Option<ReasoningEffort>,
    /// Additional attempts after a failed call
    pub max_retries: u32,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }
}

impl Default for GenerationRequest {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4(),
            prompt: String::new(),
            system: None,
            temperature: None,
            max_tokens: None,
            reasoning_effort: None,
            max_retries: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationResponse {
    pub text: String,
    pub model_id: Option<String>,
    pub usage: Option<TokenUsage>,
    pub finish_reason: Option<String>,
}

/// Token usage statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
}

impl TokenUsage {
    pub fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens: input_tokens + output_tokens,
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum LLMError {
    #[error("{0}")]
    Configuration(String),
    #[error("Unsupported provider: {0}")]
    UnsupportedProvider(String),
    #[error("{0}")]
    InvalidRequest(String),
    #[error("{0}")]
    Authentication(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("{provider} API error (status {status}): {message}")]
    Api {
        provider: ProviderKind,
        status: u16,
        message: String,
    },
    #[error("Invalid response from {provider}: {message}")]
    InvalidResponse {
        provider: ProviderKind,
        message: String,
    },
    #[error("{0}")]
    Backend(String),
    #[error("AI service error: {0}")]
    Service(String),
}

impl LLMError {
    /// Errors caused by settings rather than by the backend call.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            LLMError::Configuration(_) | LLMError::UnsupportedProvider(_)
        )
    }

    pub fn is_backend(&self) -> bool {
        matches!(
            self,
            LLMError::Authentication(_)
                | LLMError::Network(_)
                | LLMError::Api { .. }
                | LLMError::InvalidResponse { .. }
                | LLMError::Backend(_)
        )
    }

    /// Wrap into the uniform `AI service error: ...` form.
    pub fn into_service_error(self) -> LLMError {
        if let LLMError::Service(_) = self {
            return self;
        }

        let message = self.to_string();
        if message.trim().is_empty() {
            LLMError::Service("Unknown error occurred".to_string())
        } else {
            LLMError::Service(message)
        }
    }
}
