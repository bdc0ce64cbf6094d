use crate::llm::backends::{AnthropicProvider, GoogleProvider, OpenAIProvider, PerplexityProvider};
use crate::llm::types::{GenerationRequest, GenerationResponse, LLMError, ProviderKind, Settings};
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// A model handle: one backend, one model, one set of connection settings.
///
/// Handles are cheap to build and hold no state between calls.
pub trait LanguageModel: Send + Sync {
    /// Execute a single generation call
    fn generate(
        &self,
        request: GenerationRequest,
    ) -> BoxFuture<'_, Result<GenerationResponse, LLMError>>;

    /// Backend this handle talks to
    fn provider(&self) -> ProviderKind;

    /// Model id the handle was configured with
    fn model_id(&self) -> &str;
}

/// Builds model handles for one [`ProviderKind`], enforcing that provider's
/// configuration prerequisites. Implementations must not perform network I/O.
pub trait ProviderResolver: Send + Sync {
    fn kind(&self) -> ProviderKind;

    fn resolve(
        &self,
        settings: &Settings,
        client: &reqwest::Client,
    ) -> Result<Arc<dyn LanguageModel>, LLMError>;
}

/// Lookup table from provider kind to resolver.
#[derive(Clone)]
pub struct ProviderRegistry {
    resolvers: HashMap<ProviderKind, Arc<dyn ProviderResolver>>,
}

impl ProviderRegistry {
    /// A registry with no providers at all
    pub fn empty() -> Self {
        Self {
            resolvers: HashMap::new(),
        }
    }

    /// A registry with every built-in backend
    pub fn with_defaults() -> Self {
        Self::empty()
            .with(OpenAIProvider::openai())
            .with(OpenAIProvider::compatible())
            .with(AnthropicProvider)
            .with(GoogleProvider)
            .with(PerplexityProvider)
    }

    /// Register a resolver, replacing any previous one for the same kind
    pub fn with(mut self, resolver: impl ProviderResolver + 'static) -> Self {
        self.register(Arc::new(resolver));
        self
    }

    pub fn register(&mut self, resolver: Arc<dyn ProviderResolver>) {
        self.resolvers.insert(resolver.kind(), resolver);
    }

    pub fn supports(&self, kind: ProviderKind) -> bool {
        self.resolvers.contains_key(&kind)
    }

    pub fn providers(&self) -> Vec<ProviderKind> {
        ProviderKind::ALL
            .into_iter()
            .filter(|kind| self.supports(*kind))
            .collect()
    }

    /// Build a fresh model handle for the configured provider.
    pub fn resolve(
        &self,
        settings: &Settings,
        client: &reqwest::Client,
    ) -> Result<Arc<dyn LanguageModel>, LLMError> {
        let resolver = self
            .resolvers
            .get(&settings.provider)
            .ok_or_else(|| LLMError::UnsupportedProvider(settings.provider.to_string()))?;

        debug!(
            provider = %settings.provider,
            model = %settings.model,
            "Resolving model handle"
        );

        resolver.resolve(settings, client)
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
