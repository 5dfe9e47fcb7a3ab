//! Adapters layer: Concrete implementations of ports.
//!
//! These modules contain the actual integration with external systems:
//! - `dataset`: CSV loading of the training table
//! - `gbdt`: standardization + gradient-boosted trees
//! - `openai` / `gemini`: chat-completion HTTP clients
//! - `scripted`: in-memory text generator for tests
//! - `sanitize`: secret filtering for logs

pub mod dataset;
pub mod gbdt;
pub mod gemini;
mod http;
pub mod openai;
pub mod sanitize;
pub mod scripted;

use std::sync::Arc;

use crate::config::{ConfigError, Provider, ProviderConfig};
use crate::ports::TextGenerator;

pub use dataset::DatasetError;
pub use gemini::GeminiClient;
pub use openai::OpenAiClient;
pub use scripted::ScriptedGenerator;

/// Build the text generator for the configured provider.
///
/// # Errors
/// Returns `ConfigError::HttpClient` if the HTTP client cannot be built.
pub fn text_generator(config: ProviderConfig) -> Result<Arc<dyn TextGenerator>, ConfigError> {
    tracing::info!(
        "Advice provider: {} (model {}, stream {})",
        config.provider,
        config.model,
        config.stream
    );
    let generator: Arc<dyn TextGenerator> = match config.provider {
        Provider::OpenAi => Arc::new(OpenAiClient::new(config)?),
        Provider::Gemini => Arc::new(GeminiClient::new(config)?),
    };
    Ok(generator)
}
