//! Integration tests for the query translator
//!
//! These run the full service path against stub model handles, so they cover
//! resolution, prompt construction and error wrapping without any network.

mod common;

use ask_ai::service::{SYSTEM_PROMPT, build_prompt};
use ask_ai::{AskAiService, LLMError, ProviderKind, ProviderRegistry, Query, Settings};
use common::{Behavior, Recorder, stub_registry};
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

fn service_with(settings: Settings, behavior: Behavior) -> (AskAiService, Arc<Recorder>) {
    let (registry, recorder) = stub_registry(settings.provider, behavior);
    (
        AskAiService::with_registry(settings, registry).unwrap(),
        recorder,
    )
}

#[tokio::test]
async fn test_answer_round_trip() {
    let settings = Settings::new(ProviderKind::OpenAI, "o3-2025-04-16")
        .with_api_key("sk-test")
        .with_temperature(0.7)
        .with_max_tokens(10000)
        .with_reasoning_effort("high");
    let (service, recorder) = service_with(settings, Behavior::reply("Use React.memo."));

    let query = Query::new("How do I optimize this component?")
        .with_context("I have a component that renders slowly...");
    let answer = service.answer_query(query.clone()).await.unwrap();

    assert_eq!(answer.text, "Use React.memo.");
    assert_eq!(answer.provider, ProviderKind::OpenAI);
    assert_eq!(answer.resolved_model_id.as_deref(), Some("stub-model-2025"));
    assert_eq!(answer.usage.unwrap().total_tokens, 15);

    let requests = recorder.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.prompt, build_prompt(&query));
    assert_eq!(request.system.as_deref(), Some(SYSTEM_PROMPT));
    assert_eq!(request.temperature, Some(0.7));
    assert_eq!(request.max_tokens, Some(10000));
    assert_eq!(request.max_retries, 0);
    assert_eq!(
        request.reasoning_effort.as_ref().map(|e| e.as_str()),
        Some("high")
    );

    assert_eq!(recorder.resolution_count(), 1);
}

#[tokio::test]
async fn test_each_query_is_independent() {
    let settings = Settings::new(ProviderKind::Anthropic, "claude-opus-4-20250514");
    let (service, recorder) = service_with(settings, Behavior::reply("same"));

    let query = Query::new("Same question").with_context("Same context");
    let first = service.answer_query(query.clone()).await.unwrap();
    let second = service.answer_query(query).await.unwrap();

    assert_eq!(first, second);

    let requests = recorder.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].prompt, requests[1].prompt);
    assert_ne!(requests[0].id, requests[1].id);
    // A fresh handle per query
    assert_eq!(recorder.resolution_count(), 2);
}

#[tokio::test]
async fn test_backend_failure_is_wrapped() {
    let settings = Settings::new(ProviderKind::Google, "gemini-2.5-pro");
    let (service, _) = service_with(settings, Behavior::Fail("boom".to_string()));

    let err = service.answer_query(Query::new("q")).await.unwrap_err();
    assert!(matches!(err, LLMError::Service(_)));
    assert_eq!(err.to_string(), "AI service error: boom");
}

#[tokio::test]
async fn test_empty_backend_message_is_unknown_error() {
    let settings = Settings::new(ProviderKind::Perplexity, "sonar-pro");
    let (service, _) = service_with(settings, Behavior::Fail(String::new()));

    let err = service.answer_query(Query::new("q")).await.unwrap_err();
    assert_eq!(err.to_string(), "AI service error: Unknown error occurred");
}

#[tokio::test]
async fn test_blank_context_is_omitted() {
    let settings = Settings::new(ProviderKind::OpenAI, "gpt-4.1");
    let (service, recorder) = service_with(settings, Behavior::reply("ok"));

    service
        .answer_query(Query::new("Why?").with_context("  \n\t "))
        .await
        .unwrap();

    let prompt = &recorder.requests()[0].prompt;
    assert!(!prompt.contains("<context>"));
    assert!(prompt.contains("<question>\nWhy?\n</question>"));
}

#[tokio::test]
async fn test_every_provider_resolves_through_registry() {
    for kind in ProviderKind::ALL {
        let mut settings = Settings::new(kind, "some-model");
        if kind == ProviderKind::OpenAICompatible {
            settings = settings.with_base_url("http://localhost:8000/v1");
        }
        let (service, _) = service_with(settings, Behavior::reply("hi"));

        let answer = service.answer_query(Query::new("q")).await.unwrap();
        assert_eq!(answer.provider, kind);
    }
}

#[tokio::test]
async fn test_unregistered_provider_is_wrapped() {
    let settings = Settings::new(ProviderKind::Anthropic, "claude-sonnet-4");
    let service = AskAiService::with_registry(settings, ProviderRegistry::empty()).unwrap();

    let err = service.answer_query(Query::new("q")).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "AI service error: Unsupported provider: anthropic"
    );
}

#[tokio::test]
async fn test_compatible_without_base_url_fails_at_query_time() {
    // Default registry: the real openai-compatible resolver checks the base URL
    let settings =
        Settings::new(ProviderKind::OpenAICompatible, "custom-model").with_api_key("test-key");
    let service = AskAiService::new(settings).unwrap();

    let err = service.answer_query(Query::new("q")).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "AI service error: Base URL is required for OpenAI-compatible providers"
    );
}

#[tokio::test]
async fn test_one_shot_answer_query_validates_first() {
    let err = ask_ai::answer_query(Settings::new(ProviderKind::OpenAI, "  "), Query::new("q"))
        .await
        .unwrap_err();
    assert!(err.is_configuration());
    assert_eq!(err.to_string(), "Model is required");
}

/// Log sink shared between the subscriber and the test.
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[tokio::test(flavor = "current_thread")]
async fn test_failure_log_carries_request_id() {
    let logs = CapturedLogs::default();
    let sink = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || sink.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let settings = Settings::new(ProviderKind::OpenAI, "o3");
    let (service, recorder) = service_with(settings, Behavior::Fail("boom".to_string()));
    service.answer_query(Query::new("q")).await.unwrap_err();

    let request_id = recorder.requests()[0].id.to_string();
    let output = logs.contents();
    let failure = output
        .lines()
        .find(|line| line.contains("Query failed"))
        .expect("no failure line logged");
    assert!(failure.contains(&request_id), "{}", failure);

    let asking = output
        .lines()
        .find(|line| line.contains("Asking AI"))
        .expect("no request line logged");
    assert!(asking.contains(&request_id));
}
