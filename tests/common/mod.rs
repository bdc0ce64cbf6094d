//! Shared test doubles: a provider resolver whose models never touch the network.

#![allow(dead_code)]

use ask_ai::llm::ConnectionSettings;
use ask_ai::{
    GenerationRequest, GenerationResponse, LLMError, LanguageModel, ProviderKind,
    ProviderRegistry, ProviderResolver, Settings, TokenUsage,
};
use futures::future::BoxFuture;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// What a stub model does when asked to generate.
#[derive(Debug, Clone)]
pub enum Behavior {
    /// Reply with a fixed text and report `model_id`
    Reply {
        text: String,
        model_id: Option<String>,
    },
    /// Fail with a backend error carrying this message
    Fail(String),
    /// Never complete
    Hang,
}

impl Behavior {
    pub fn reply(text: &str) -> Self {
        Behavior::Reply {
            text: text.to_string(),
            model_id: Some("stub-model-2025".to_string()),
        }
    }
}

/// Everything a stub model has been asked, plus the settings it was resolved from.
#[derive(Debug, Default)]
pub struct Recorder {
    pub requests: Mutex<Vec<GenerationRequest>>,
    pub resolutions: Mutex<Vec<ConnectionSettings>>,
}

impl Recorder {
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn resolution_count(&self) -> usize {
        self.resolutions.lock().unwrap().len()
    }
}

pub struct StubResolver {
    kind: ProviderKind,
    behavior: Behavior,
    recorder: Arc<Recorder>,
}

impl StubResolver {
    pub fn new(kind: ProviderKind, behavior: Behavior) -> (Self, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        (
            Self {
                kind,
                behavior,
                recorder: Arc::clone(&recorder),
            },
            recorder,
        )
    }
}

impl ProviderResolver for StubResolver {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn resolve(
        &self,
        settings: &Settings,
        _client: &reqwest::Client,
    ) -> Result<Arc<dyn LanguageModel>, LLMError> {
        self.recorder
            .resolutions
            .lock()
            .unwrap()
            .push(settings.connection());

        Ok(Arc::new(StubModel {
            kind: self.kind,
            model: settings.model.clone(),
            behavior: self.behavior.clone(),
            recorder: Arc::clone(&self.recorder),
        }))
    }
}

struct StubModel {
    kind: ProviderKind,
    model: String,
    behavior: Behavior,
    recorder: Arc<Recorder>,
}

impl LanguageModel for StubModel {
    fn generate(
        &self,
        request: GenerationRequest,
    ) -> BoxFuture<'_, Result<GenerationResponse, LLMError>> {
        Box::pin(async move {
            self.recorder.requests.lock().unwrap().push(request);

            match &self.behavior {
                Behavior::Reply { text, model_id } => Ok(GenerationResponse {
                    text: text.clone(),
                    model_id: model_id.clone(),
                    usage: Some(TokenUsage::new(12, 3)),
                    finish_reason: Some("stop".to_string()),
                }),
                Behavior::Fail(message) => Err(LLMError::Backend(message.clone())),
                Behavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Err(LLMError::Backend("stub timed out".to_string()))
                }
            }
        })
    }

    fn provider(&self) -> ProviderKind {
        self.kind
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

/// A registry with a single stub resolver registered for `kind`.
pub fn stub_registry(kind: ProviderKind, behavior: Behavior) -> (ProviderRegistry, Arc<Recorder>) {
    let (resolver, recorder) = StubResolver::new(kind, behavior);
    (ProviderRegistry::empty().with(resolver), recorder)
}
