//! Text generation port: Trait for external chat-completion services.
//!
//! This trait abstracts the LLM provider (OpenAI, Gemini) from the advice
//! logic. Streaming and non-streaming backends share one contract: text is
//! pushed to a chunk sink as it arrives and the full text is returned.

use crate::domain::ChatMessage;

/// Errors that can occur while calling a text generation service.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GenerationError {
    #[error("Could not reach {provider}: {message}")]
    Transport { provider: String, message: String },

    #[error("{provider} returned HTTP {status}: {message}")]
    Api {
        provider: String,
        status: u16,
        message: String,
    },

    #[error("Malformed response from {provider}: {message}")]
    Malformed { provider: String, message: String },

    #[error("{provider} returned an empty response")]
    EmptyResponse { provider: String },
}

/// One generation call: role-tagged messages plus sampling settings.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Trait for chat-completion backends.
///
/// Implementations make exactly one request per call and never retry.
pub trait TextGenerator: Send + Sync {
    /// Provider name for logs and error messages.
    fn provider(&self) -> &str;

    /// Model identifier sent to the provider.
    fn model(&self) -> &str;

    /// Run one generation request.
    ///
    /// `on_chunk` is called with each piece of text in arrival order; a
    /// non-streaming backend calls it once with the whole text. The return
    /// value is the concatenation of all chunks.
    ///
    /// # Errors
    /// Returns `GenerationError` if the service is unreachable, rejects the
    /// request, or answers with something that is not a completion.
    fn generate(
        &self,
        request: &GenerationRequest,
        on_chunk: &mut dyn FnMut(&str),
    ) -> Result<String, GenerationError>;

    /// Run one request and buffer the whole answer.
    ///
    /// # Errors
    /// Same as [`TextGenerator::generate`].
    fn complete(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        self.generate(request, &mut |_| {})
    }
}
