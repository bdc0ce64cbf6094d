//! Environment constants and path utilities for the ask-ai server.
//!
//! This module centralizes the environment variable names, configuration file
//! locations and provider endpoints used throughout the application.

use std::path::{Path, PathBuf};

/// Name reported to MCP clients in `serverInfo`.
pub const SERVER_NAME: &str = "ask-ai";

/// Version reported to MCP clients in `serverInfo`.
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Hidden application directory name
pub const APP_DIR_NAME: &str = ".ask-ai";

/// Configuration file name inside [`APP_DIR_NAME`]
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Configuration file name looked up in the current directory
pub const LOCAL_CONFIG_FILE_NAME: &str = "ask-ai.toml";

/// Default tracing filter when `RUST_LOG` is not set
pub const DEFAULT_LOG_FILTER: &str = "ask_ai=info";

/// Variables read by the configuration loader
pub mod vars {
    pub const PROVIDER: &str = "PROVIDER";
    pub const MODEL: &str = "MODEL";
    pub const API_KEY: &str = "API_KEY";
    pub const TEMPERATURE: &str = "TEMPERATURE";
    pub const MAX_TOKENS: &str = "MAX_TOKENS";
    pub const BASE_URL: &str = "BASE_URL";
    pub const REASONING_EFFORT: &str = "REASONING_EFFORT";
    pub const REQUEST_TIMEOUT_SECS: &str = "REQUEST_TIMEOUT_SECS";

    /// Vendor fallbacks consulted when `API_KEY` is not configured
    pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
    pub const ANTHROPIC_API_KEY: &str = "ANTHROPIC_API_KEY";
    pub const GOOGLE_API_KEY: &str = "GOOGLE_GENERATIVE_AI_API_KEY";
    pub const PERPLEXITY_API_KEY: &str = "PERPLEXITY_API_KEY";
}

/// Default provider endpoints
pub mod endpoints {
    pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
    pub const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";
    pub const GOOGLE_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
    pub const PERPLEXITY_BASE_URL: &str = "https://api.perplexity.ai";

    /// Value sent in the `anthropic-version` header
    pub const ANTHROPIC_VERSION: &str = "2023-06-01";
}

/// Build the `.ask-ai` directory path under a root directory
pub fn app_dir_path(root: &Path) -> PathBuf {
    root.join(APP_DIR_NAME)
}

/// Build the `.ask-ai/config.toml` path for a project directory
pub fn local_config_file_path(project_dir: &Path) -> PathBuf {
    app_dir_path(project_dir).join(CONFIG_FILE_NAME)
}

/// Build the `~/.ask-ai/config.toml` path for a home directory
pub fn user_config_file_path(home_dir: &Path) -> PathBuf {
    app_dir_path(home_dir).join(CONFIG_FILE_NAME)
}
