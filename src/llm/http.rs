//! HTTP plumbing shared by the backends.

use crate::llm::types::{LLMError, ProviderKind};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

/// Check that a configured base URL is an absolute http(s) URL and return it
/// without a trailing slash.
pub fn validate_base_url(provider: ProviderKind, base_url: &str) -> Result<String, LLMError> {
    let parsed = Url::parse(base_url).map_err(|e| {
        LLMError::Configuration(format!(
            "Invalid base URL '{}' for {}: {}",
            base_url, provider, e
        ))
    })?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(LLMError::Configuration(format!(
            "Invalid base URL '{}' for {}: scheme must be http or https",
            base_url, provider
        )));
    }

    Ok(base_url.trim_end_matches('/').to_string())
}

/// Use the configured key, falling back to the vendor environment variable.
pub fn api_key_or_env(configured: Option<&str>, env_var: &str) -> Option<String> {
    configured
        .map(str::to_string)
        .or_else(|| std::env::var(env_var).ok())
        .filter(|key| !key.trim().is_empty())
}

pub fn require_api_key(
    provider: ProviderKind,
    configured: Option<&str>,
    env_var: &str,
) -> Result<String, LLMError> {
    api_key_or_env(configured, env_var).ok_or_else(|| {
        LLMError::Authentication(format!(
            "{} API key is missing. Pass it using the API_KEY environment variable or set {}",
            provider, env_var
        ))
    })
}

/// POST a JSON body and decode a JSON reply.
///
/// Failed calls are attempted again only while `max_retries` allows it, and
/// only for transport errors, rate limiting and server errors.
pub async fn post_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    provider: ProviderKind,
    url: &str,
    headers: &[(&str, String)],
    body: &Value,
    max_retries: u32,
) -> Result<T, LLMError> {
    let mut attempt = 0;
    loop {
        match post_json_once(client, provider, url, headers, body).await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < max_retries && is_retryable(&err) => {
                attempt += 1;
                let delay = RETRY_BASE_DELAY * 2u32.saturating_pow(attempt - 1);
                warn!(
                    provider = %provider,
                    attempt,
                    error = %err,
                    "Request failed, retrying in {:?}",
                    delay
                );
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}

async fn post_json_once<T: DeserializeOwned>(
    client: &reqwest::Client,
    provider: ProviderKind,
    url: &str,
    headers: &[(&str, String)],
    body: &Value,
) -> Result<T, LLMError> {
    let mut builder = client
        .post(url)
        .header("Content-Type", "application/json")
        .json(body);
    for (name, value) in headers {
        builder = builder.header(*name, value);
    }

    let response = builder
        .send()
        .await
        .map_err(|e| LLMError::Network(format!("Failed to send request to {}: {}", provider, e)))?;

    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| LLMError::Network(format!("Failed to read {} response: {}", provider, e)))?;

    debug!(provider = %provider, status = %status, bytes = text.len(), "Received response");

    if !status.is_success() {
        let message = extract_error_message(&text)
            .or_else(|| status.canonical_reason().map(str::to_string))
            .unwrap_or_else(|| "Unknown error".to_string());
        return Err(LLMError::Api {
            provider,
            status: status.as_u16(),
            message,
        });
    }

    serde_json::from_str(&text).map_err(|e| LLMError::InvalidResponse {
        provider,
        message: e.to_string(),
    })
}

fn is_retryable(err: &LLMError) -> bool {
    match err {
        LLMError::Network(_) => true,
        LLMError::Api { status, .. } => *status == 429 || *status >= 500,
        _ => false,
    }
}

/// Pull a readable message out of a vendor error body.
///
/// Handles `{"error": {"message": ...}}` (OpenAI, Anthropic, Google),
/// `{"error": "..."}` and `{"message": "..."}`, falling back to the raw body.
pub fn extract_error_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    let Ok(value) = serde_json::from_str::<Value>(trimmed) else {
        return Some(trimmed.to_string());
    };

    let message = match value.get("error") {
        Some(Value::Object(error)) => error.get("message").and_then(Value::as_str),
        Some(Value::String(error)) => Some(error.as_str()),
        _ => value.get("message").and_then(Value::as_str),
    };

    Some(message.map(str::to_string).unwrap_or_else(|| trimmed.to_string()))
}
