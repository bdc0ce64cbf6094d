//! CLI-specific functionality for the ask-ai binary
//!
//! This module contains argument parsing and configuration discovery.

pub mod args;
pub mod config;

pub use args::{Args, AskConfig, ContextSource, ExecutionMode, ServeConfig, ShowConfigOptions};
pub use config::{ConfigDiscovery, ConfigError, ConfigLoader, FileConfig, LoadedConfig};
