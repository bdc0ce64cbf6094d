//! Backend implementations, one resolver per provider kind.
//!
//! - [`openai`]: `openai` and `openai-compatible`, plus the shared chat completions model
//! - [`anthropic`]: Anthropic Messages API
//! - [`google`]: Gemini `generateContent`
//! - [`perplexity`]: Perplexity's chat completions endpoint

pub mod anthropic;
pub mod google;
pub mod openai;
pub mod perplexity;

pub use anthropic::{AnthropicModel, AnthropicProvider};
pub use google::{GoogleModel, GoogleProvider};
pub use openai::{ChatCompletionsConfig, ChatCompletionsModel, OpenAIProvider};
pub use perplexity::PerplexityProvider;
