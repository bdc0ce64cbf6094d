pub mod backends;
pub mod http;
pub mod provider;
pub mod types;

pub use provider::{LanguageModel, ProviderRegistry, ProviderResolver};
pub use types::*;
