//! Integration tests for configuration loading
//!
//! These tests mutate the process environment and are serialized.

use ask_ai::cli::{ConfigError, ConfigLoader};
use ask_ai::env::vars;
use ask_ai::{AskAiService, ProviderKind, ReasoningEffort};
use serial_test::serial;
use std::fs;
use tempfile::TempDir;

const ALL_VARS: [&str; 8] = [
    vars::PROVIDER,
    vars::MODEL,
    vars::API_KEY,
    vars::TEMPERATURE,
    vars::MAX_TOKENS,
    vars::BASE_URL,
    vars::REASONING_EFFORT,
    vars::REQUEST_TIMEOUT_SECS,
];

fn clear_env() {
    for var in ALL_VARS {
        // SAFETY: callers are #[serial]
        unsafe { std::env::remove_var(var) };
    }
}

fn set_env(var: &str, value: &str) {
    // SAFETY: callers are #[serial]
    unsafe { std::env::set_var(var, value) };
}

#[test]
#[serial]
fn test_load_from_override_file() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("custom.toml");
    fs::write(
        &config_path,
        r#"
provider = "anthropic"
model = "claude-opus-4-20250514"
api_key = "sk-ant-file"
temperature = 0.4
request_timeout_secs = 120
"#,
    )
    .unwrap();

    let loaded = ConfigLoader::load(Some(&config_path)).unwrap();
    assert_eq!(loaded.source.as_deref(), Some(config_path.as_path()));
    assert_eq!(loaded.settings.provider, ProviderKind::Anthropic);
    assert_eq!(loaded.settings.temperature, Some(0.4));
    assert_eq!(loaded.settings.request_timeout_secs, Some(120));

    // The resolved settings build a working service
    assert!(AskAiService::new(loaded.settings).is_ok());
}

#[test]
#[serial]
fn test_environment_overrides_file() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("ask-ai.toml");
    fs::write(
        &config_path,
        "provider = \"openai\"\nmodel = \"gpt-4.1\"\nmax_tokens = 500\n",
    )
    .unwrap();

    set_env(vars::MODEL, "o3-2025-04-16");
    set_env(vars::REASONING_EFFORT, "max");
    set_env(vars::TEMPERATURE, "");

    let loaded = ConfigLoader::load(Some(&config_path)).unwrap();
    clear_env();

    assert_eq!(loaded.settings.model, "o3-2025-04-16");
    assert_eq!(loaded.settings.max_tokens, Some(500));
    assert_eq!(
        loaded.settings.reasoning_effort,
        Some(ReasoningEffort::Other("max".to_string()))
    );
    assert_eq!(loaded.settings.temperature, None);
}

#[test]
#[serial]
fn test_startup_errors() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    let empty = temp_dir.path().join("empty.toml");
    fs::write(&empty, "").unwrap();

    let err = ConfigLoader::load(Some(&empty)).unwrap_err();
    assert!(matches!(err, ConfigError::Missing(_)));
    assert_eq!(err.to_string(), "PROVIDER environment variable is required");

    set_env(vars::PROVIDER, "openai");
    set_env(vars::MODEL, "o3");
    set_env(vars::MAX_TOKENS, "-5");
    let err = ConfigLoader::load(Some(&empty)).unwrap_err();
    assert_eq!(err.to_string(), "Max tokens must be greater than 0");

    set_env(vars::MAX_TOKENS, "lots");
    let err = ConfigLoader::load(Some(&empty)).unwrap_err();
    assert_eq!(
        err.to_string(),
        "MAX_TOKENS must be a valid integer, got 'lots'"
    );

    set_env(vars::MAX_TOKENS, "100");
    set_env(vars::REQUEST_TIMEOUT_SECS, "0");
    let err = ConfigLoader::load(Some(&empty)).unwrap_err();
    assert_eq!(err.to_string(), "Request timeout must be greater than 0");

    set_env(vars::REQUEST_TIMEOUT_SECS, "60");
    set_env(vars::PROVIDER, "cohere");
    let err = ConfigLoader::load(Some(&empty)).unwrap_err();
    assert_eq!(err.to_string(), "Unsupported provider: cohere");

    clear_env();
}

#[test]
#[serial]
fn test_missing_override_file() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    let err = ConfigLoader::load(Some(&temp_dir.path().join("missing.toml"))).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}
