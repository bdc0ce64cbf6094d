//! Configuration discovery and loading
//!
//! Settings are assembled from two layers, lowest precedence first:
//! 1. A TOML file: the `--config` override, or the first file found in the
//!    discovery hierarchy
//!    - Current directory: ./ask-ai.toml or ./.ask-ai/config.toml
//!    - User config: ~/.ask-ai/config.toml
//!    - System config: /etc/ask-ai/config.toml
//! 2. Process environment (`PROVIDER`, `MODEL`, `API_KEY`, ...)
//!
//! Empty environment values are treated as unset.

use crate::env::{self, vars};
use crate::llm::{LLMError, ProviderKind, ReasoningEffort, Settings};
use serde::{Deserialize, Serialize};
use std::env as std_env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("{var} must be a valid {expected}, got '{value}'")]
    InvalidValue {
        var: &'static str,
        expected: &'static str,
        value: String,
    },

    #[error(transparent)]
    Settings(#[from] LLMError),

    #[error("Failed to read configuration file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Settings as written in a TOML configuration file. Every field is optional
/// because the environment may supply or override any of them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_effort: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
}

impl FileConfig {
    /// Load from TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Resolved settings together with the file they were read from, if any.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub settings: Settings,
    pub source: Option<PathBuf>,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load settings from the override file (or discovered file) and the
    /// process environment.
    pub fn load(config_override: Option<&Path>) -> Result<LoadedConfig, ConfigError> {
        let source = match config_override {
            Some(path) => {
                info!("Loading configuration override from: {:?}", path);
                Some(path.to_path_buf())
            }
            None => ConfigDiscovery::find_config_file(),
        };

        let file = match &source {
            Some(path) => {
                info!("Loading configuration from: {:?}", path);
                FileConfig::from_toml_file(path)?
            }
            None => {
                debug!("No configuration file found, using environment only");
                FileConfig::default()
            }
        };

        let settings = settings_from_vars(|name| std_env::var(name).ok(), file)?;
        Ok(LoadedConfig { settings, source })
    }
}

/// Merge a file layer with variables from `lookup` and validate the result.
///
/// `lookup` takes the variable name and returns its value; it is a parameter
/// so callers can supply something other than the process environment.
pub fn settings_from_vars<F>(lookup: F, file: FileConfig) -> Result<Settings, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

    let provider = var(vars::PROVIDER)
        .or(file.provider)
        .ok_or(ConfigError::Missing(vars::PROVIDER))?;
    let provider = ProviderKind::from_str(&provider)?;

    let model = var(vars::MODEL)
        .or(file.model)
        .filter(|model| !model.trim().is_empty())
        .ok_or(ConfigError::Missing(vars::MODEL))?;

    let temperature = match var(vars::TEMPERATURE) {
        Some(value) => Some(parse_var(vars::TEMPERATURE, "number", &value)?),
        None => file.temperature,
    };
    let max_tokens = match var(vars::MAX_TOKENS) {
        Some(value) => Some(parse_var(vars::MAX_TOKENS, "integer", &value)?),
        None => file.max_tokens,
    };
    let request_timeout_secs = match var(vars::REQUEST_TIMEOUT_SECS) {
        Some(value) => Some(parse_var(
            vars::REQUEST_TIMEOUT_SECS,
            "number of seconds",
            &value,
        )?),
        None => file.request_timeout_secs,
    };

    let settings = Settings {
        provider,
        model,
        api_key: var(vars::API_KEY).or(file.api_key),
        temperature,
        max_tokens,
        base_url: var(vars::BASE_URL).or(file.base_url),
        reasoning_effort: var(vars::REASONING_EFFORT)
            .or(file.reasoning_effort)
            .map(ReasoningEffort::from),
        request_timeout_secs,
    };

    settings.validate()?;
    Ok(settings)
}

fn parse_var<T: FromStr>(
    var: &'static str,
    expected: &'static str,
    value: &str,
) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue {
            var,
            expected,
            value: value.to_string(),
        })
}

/// Configuration discovery system
pub struct ConfigDiscovery;

impl ConfigDiscovery {
    /// Find configuration file using discovery hierarchy
    pub fn find_config_file() -> Option<PathBuf> {
        for candidate in Self::get_config_candidates() {
            debug!("Checking for config file: {:?}", candidate);
            if candidate.is_file() {
                debug!("Found config file: {:?}", candidate);
                return Some(candidate);
            }
        }

        debug!("No config file found in discovery hierarchy");
        None
    }

    /// Configuration file candidates in priority order
    pub fn get_config_candidates() -> Vec<PathBuf> {
        let mut candidates = Vec::new();

        if let Ok(current_dir) = std_env::current_dir() {
            candidates.push(current_dir.join(env::LOCAL_CONFIG_FILE_NAME));
            candidates.push(env::local_config_file_path(&current_dir));
        }

        if let Some(home_dir) = Self::get_home_dir() {
            candidates.push(env::user_config_file_path(&home_dir));
        }

        #[cfg(unix)]
        candidates.push(PathBuf::from("/etc/ask-ai").join(env::CONFIG_FILE_NAME));

        #[cfg(windows)]
        if let Ok(program_data) = std_env::var("PROGRAMDATA") {
            candidates.push(
                PathBuf::from(program_data)
                    .join("ask-ai")
                    .join(env::CONFIG_FILE_NAME),
            );
        }

        candidates
    }

    fn get_home_dir() -> Option<PathBuf> {
        std_env::var("HOME")
            .ok()
            .or_else(|| std_env::var("USERPROFILE").ok())
            .map(PathBuf::from)
    }

    /// Show configuration discovery information for debugging
    pub fn show_discovery_info(config_override: Option<&Path>) {
        println!("Configuration Discovery Hierarchy:");
        println!();

        for (i, candidate) in Self::get_config_candidates().iter().enumerate() {
            let status = if candidate.exists() {
                if candidate.is_file() {
                    "✓ EXISTS"
                } else {
                    "✗ NOT A FILE"
                }
            } else {
                "✗ NOT FOUND"
            };

            println!("  {}. {:?} - {}", i + 1, candidate, status);
        }

        println!();
        match (config_override, Self::find_config_file()) {
            (Some(path), _) => println!("Active configuration: {:?} (--config)", path),
            (None, Some(found)) => println!("Active configuration: {:?}", found),
            (None, None) => println!("Active configuration: environment only"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_environment_only() {
        let settings = settings_from_vars(
            lookup(&[
                ("PROVIDER", "openai"),
                ("MODEL", "o3-2025-04-16"),
                ("TEMPERATURE", "0.7"),
                ("MAX_TOKENS", "10000"),
                ("REASONING_EFFORT", "medium"),
            ]),
            FileConfig::default(),
        )
        .unwrap();

        assert_eq!(settings.provider, ProviderKind::OpenAI);
        assert_eq!(settings.model, "o3-2025-04-16");
        assert_eq!(settings.temperature, Some(0.7));
        assert_eq!(settings.max_tokens, Some(10000));
        assert_eq!(settings.reasoning_effort, Some(ReasoningEffort::Medium));
        assert_eq!(settings.api_key, None);
    }

    #[test]
    fn test_missing_provider_and_model() {
        let err =
            settings_from_vars(lookup(&[("MODEL", "o3")]), FileConfig::default()).unwrap_err();
        assert_eq!(err.to_string(), "PROVIDER environment variable is required");

        let err = settings_from_vars(lookup(&[("PROVIDER", "openai")]), FileConfig::default())
            .unwrap_err();
        assert_eq!(err.to_string(), "MODEL environment variable is required");
    }

    #[test]
    fn test_empty_values_are_absent() {
        let err = settings_from_vars(
            lookup(&[("PROVIDER", "openai"), ("MODEL", "")]),
            FileConfig::default(),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "MODEL environment variable is required");

        let settings = settings_from_vars(
            lookup(&[("PROVIDER", "anthropic"), ("MODEL", "claude"), ("BASE_URL", "")]),
            FileConfig::default(),
        )
        .unwrap();
        assert_eq!(settings.base_url, None);
    }

    #[test]
    fn test_unsupported_provider() {
        let err = settings_from_vars(
            lookup(&[("PROVIDER", "mistral"), ("MODEL", "large")]),
            FileConfig::default(),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Unsupported provider: mistral");
    }

    #[test]
    fn test_invalid_numbers() {
        let err = settings_from_vars(
            lookup(&[("PROVIDER", "openai"), ("MODEL", "o3"), ("TEMPERATURE", "warm")]),
            FileConfig::default(),
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "TEMPERATURE must be a valid number, got 'warm'"
        );

        let err = settings_from_vars(
            lookup(&[("PROVIDER", "openai"), ("MODEL", "o3"), ("MAX_TOKENS", "0")]),
            FileConfig::default(),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Max tokens must be greater than 0");
    }

    #[test]
    fn test_environment_overrides_file() {
        let file = FileConfig {
            provider: Some("google".to_string()),
            model: Some("gemini-2.5-pro".to_string()),
            temperature: Some(0.2),
            api_key: Some("file-key".to_string()),
            ..Default::default()
        };

        let env_vars = lookup(&[("MODEL", "gemini-2.5-flash"), ("API_KEY", "env-key")]);
        let settings = settings_from_vars(env_vars, file).unwrap();

        assert_eq!(settings.provider, ProviderKind::Google);
        assert_eq!(settings.model, "gemini-2.5-flash");
        assert_eq!(settings.temperature, Some(0.2));
        assert_eq!(settings.api_key.as_deref(), Some("env-key"));
    }

    #[test]
    fn test_config_file_operations() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("ask-ai.toml");
        fs::write(
            &config_path,
            r#"
provider = "openai-compatible"
model = "qwen3"
base_url = "http://localhost:11434/v1"
max_tokens = 2048
reasoning_effort = "high"
"#,
        )
        .unwrap();

        let file = FileConfig::from_toml_file(&config_path).unwrap();
        assert_eq!(file.provider.as_deref(), Some("openai-compatible"));
        assert_eq!(file.max_tokens, Some(2048));

        let settings = settings_from_vars(lookup(&[]), file).unwrap();
        assert_eq!(settings.provider, ProviderKind::OpenAICompatible);
        assert_eq!(
            settings.base_url.as_deref(),
            Some("http://localhost:11434/v1")
        );
    }

    #[test]
    fn test_config_file_errors() {
        let temp_dir = TempDir::new().unwrap();

        let missing = FileConfig::from_toml_file(temp_dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(missing, ConfigError::Io { .. }));

        let bad_path = temp_dir.path().join("bad.toml");
        fs::write(&bad_path, "provider = \"openai\"\nunknown_field = 1\n").unwrap();
        let bad = FileConfig::from_toml_file(&bad_path).unwrap_err();
        assert!(matches!(bad, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_config_candidates() {
        let candidates = ConfigDiscovery::get_config_candidates();

        assert!(!candidates.is_empty());
        assert!(candidates[0].file_name().unwrap() == "ask-ai.toml");
    }
}
