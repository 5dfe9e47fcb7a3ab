//! Scripted text generator for tests and offline runs.
//!
//! Replays queued replies (or failures) in order and records every request
//! it receives.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::ports::{GenerationError, GenerationRequest, TextGenerator};

const PROVIDER: &str = "Scripted";

/// Replays scripted replies in order.
#[derive(Debug, Default)]
pub struct ScriptedGenerator {
    replies: Mutex<VecDeque<Result<Vec<String>, GenerationError>>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ScriptedGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply delivered word by word.
    #[must_use]
    pub fn reply(self, text: &str) -> Self {
        let chunks = text.split_inclusive(' ').map(str::to_string).collect();
        lock(&self.replies).push_back(Ok(chunks));
        self
    }

    /// Queue a failure.
    #[must_use]
    pub fn fail(self, error: GenerationError) -> Self {
        lock(&self.replies).push_back(Err(error));
        self
    }

    /// Requests received so far, oldest first.
    #[must_use]
    pub fn requests(&self) -> Vec<GenerationRequest> {
        lock(&self.requests).clone()
    }

    #[must_use]
    pub fn call_count(&self) -> usize {
        lock(&self.requests).len()
    }
}

impl TextGenerator for ScriptedGenerator {
    fn provider(&self) -> &str {
        PROVIDER
    }

    fn model(&self) -> &str {
        "scripted"
    }

    fn generate(
        &self,
        request: &GenerationRequest,
        on_chunk: &mut dyn FnMut(&str),
    ) -> Result<String, GenerationError> {
        lock(&self.requests).push(request.clone());

        let chunks = lock(&self.replies)
            .pop_front()
            .unwrap_or_else(|| {
                Err(GenerationError::Transport {
                    provider: PROVIDER.to_string(),
                    message: "no scripted reply left".to_string(),
                })
            })?;

        let mut full = String::new();
        for chunk in &chunks {
            on_chunk(chunk);
            full.push_str(chunk);
        }
        if full.trim().is_empty() {
            return Err(GenerationError::EmptyResponse {
                provider: PROVIDER.to_string(),
            });
        }
        Ok(full)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ChatMessage;

    fn request() -> GenerationRequest {
        GenerationRequest {
            messages: vec![ChatMessage::user("hello")],
            temperature: 0.5,
            max_tokens: 100,
        }
    }

    #[test]
    fn test_replays_in_order_and_records() {
        let generator = ScriptedGenerator::new()
            .reply("first answer")
            .fail(GenerationError::Api {
                provider: "Scripted".to_string(),
                status: 503,
                message: "overloaded".to_string(),
            });

        let mut chunks = Vec::new();
        let text = generator
            .generate(&request(), &mut |c| chunks.push(c.to_string()))
            .expect("first reply");
        assert_eq!(text, "first answer");
        assert_eq!(chunks, vec!["first ", "answer"]);

        assert!(matches!(
            generator.complete(&request()),
            Err(GenerationError::Api { status: 503, .. })
        ));
        assert!(matches!(
            generator.complete(&request()),
            Err(GenerationError::Transport { .. })
        ));
        assert_eq!(generator.call_count(), 3);
        assert_eq!(generator.requests()[0], request());
    }

    #[test]
    fn test_blank_reply_is_empty_response() {
        let generator = ScriptedGenerator::new().reply("   ");
        assert!(matches!(
            generator.complete(&request()),
            Err(GenerationError::EmptyResponse { .. })
        ));
    }
}
