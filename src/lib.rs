//! # Ask AI
//!
//! An MCP server that lets one AI assistant ask a second, independently
//! configured model for help, a second opinion, or brainstorming.
//!
//! ## Architecture Overview
//!
//! - **[`llm`]**: Settings, the provider-agnostic model interface and the
//!   HTTP backends for each supported provider
//! - **[`service`]**: Turns a question plus optional context into exactly one
//!   generation call
//! - **[`mcp`]**: JSON-RPC over stdio exposing the `ask_ai` tool
//! - **[`cli`]**: Argument parsing and configuration discovery
//!
//! ## Supported Providers
//!
//! `openai`, `anthropic`, `google`, `perplexity` and `openai-compatible`
//! (any server speaking the chat-completions API, selected with a base URL).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ask_ai::{AskAiService, ProviderKind, Query, Settings};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::new(ProviderKind::Anthropic, "claude-opus-4-20250514");
//!     let service = AskAiService::new(settings)?;
//!
//!     let answer = service
//!         .answer_query(Query::new("Is this lock ordering safe?").with_context("..."))
//!         .await?;
//!
//!     println!("{}", answer.text);
//!     Ok(())
//! }
//! ```

/// Provider-agnostic LLM interface.
///
/// Settings validation, the provider registry and one HTTP backend per
/// wire format.
pub mod llm;

/// Query translation from a question to a single generation call.
pub mod service;

/// Model Context Protocol server and the `ask_ai` tool.
pub mod mcp;

/// Environment constants and path utilities.
///
/// Centralizes variable names, config file locations and default endpoints.
pub mod env;

// CLI module for command-line interface
pub mod cli;

pub use llm::{
    Answer, GenerationRequest, GenerationResponse, LLMError, LanguageModel, ProviderKind,
    ProviderRegistry, ProviderResolver, Query, ReasoningEffort, Settings, TokenUsage,
};
pub use service::{AskAiService, answer_query};
