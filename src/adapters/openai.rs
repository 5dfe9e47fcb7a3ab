//! OpenAI-compatible chat completions client.

use std::fmt;
use std::io::{BufRead, BufReader};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::http::{
    api_error, build_client, incomplete_stream, malformed, non_empty, stream_error,
    transport_error, SseEvents,
};
use crate::config::{ConfigError, ProviderConfig};
use crate::domain::ChatMessage;
use crate::ports::{GenerationError, GenerationRequest, TextGenerator};

const PROVIDER: &str = "OpenAI";

/// Blocking client for `POST {base}/chat/completions`.
pub struct OpenAiClient {
    base_url: String,
    model: String,
    api_key: SecretString,
    stream: bool,
    timeout: Duration,
    client: reqwest::blocking::Client,
}

impl OpenAiClient {
    /// Build a client from resolved provider settings.
    ///
    /// # Errors
    /// Returns `ConfigError::HttpClient` if the HTTP client cannot be built.
    pub fn new(config: ProviderConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            client: build_client(config.timeout)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model,
            api_key: config.api_key,
            stream: config.stream,
            timeout: config.timeout,
        })
    }
}

impl fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &"[REDACTED]")
            .field("stream", &self.stream)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: AssistantMessage,
}

#[derive(Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatCompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Default, Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

/// Text of the first choice in a non-streaming response body.
fn parse_completion(body: &str) -> Result<String, GenerationError> {
    let parsed: ChatCompletionResponse =
        serde_json::from_str(body).map_err(|e| malformed(PROVIDER, e))?;
    let text = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .unwrap_or_default();
    non_empty(PROVIDER, text)
}

/// Forward every delta of an SSE stream to `on_chunk` until `[DONE]`.
///
/// A stream that closes without `[DONE]` or carries an error event fails.
fn read_stream<R: BufRead>(reader: R, on_chunk: &mut dyn FnMut(&str)) -> Result<String, GenerationError> {
    let mut full = String::new();
    let mut finished = false;
    for event in SseEvents::new(reader) {
        let data = event.map_err(|e| GenerationError::Transport {
            provider: PROVIDER.to_string(),
            message: format!("stream interrupted: {e}"),
        })?;
        if data.trim() == "[DONE]" {
            finished = true;
            break;
        }
        if let Some(err) = stream_error(PROVIDER, &data) {
            return Err(err);
        }

        let chunk: ChatCompletionChunk =
            serde_json::from_str(&data).map_err(|e| malformed(PROVIDER, e))?;
        if let Some(text) = chunk
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.delta.content)
            .filter(|t| !t.is_empty())
        {
            on_chunk(&text);
            full.push_str(&text);
        }
    }
    if !finished {
        return Err(incomplete_stream(PROVIDER));
    }
    non_empty(PROVIDER, full)
}

impl TextGenerator for OpenAiClient {
    fn provider(&self) -> &str {
        PROVIDER
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn generate(
        &self,
        request: &GenerationRequest,
        on_chunk: &mut dyn FnMut(&str),
    ) -> Result<String, GenerationError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatCompletionRequest {
            model: &self.model,
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream: self.stream,
        };

        tracing::debug!(
            "OpenAI request: model {}, {} messages, stream {}",
            self.model,
            request.messages.len(),
            self.stream
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .map_err(|e| transport_error(PROVIDER, &e, self.timeout))?;

        if !response.status().is_success() {
            return Err(api_error(PROVIDER, response));
        }

        if self.stream {
            read_stream(BufReader::new(response), on_chunk)
        } else {
            let body = response
                .text()
                .map_err(|e| transport_error(PROVIDER, &e, self.timeout))?;
            let text = parse_completion(&body)?;
            on_chunk(&text);
            Ok(text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Provider;
    use std::io::Cursor;

    #[test]
    fn test_request_body_shape() {
        let messages = vec![ChatMessage::system("be kind"), ChatMessage::user("hi")];
        let body = ChatCompletionRequest {
            model: "gpt-4o",
            messages: &messages,
            temperature: 0.65,
            max_tokens: 650,
            stream: true,
        };
        let json = serde_json::to_value(&body).expect("serialize");
        assert_eq!(json["model"], "gpt-4o");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hi");
        assert_eq!(json["max_tokens"], 650);
        assert_eq!(json["stream"], true);
    }

    #[test]
    fn test_parse_completion() {
        let body = r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"Hello there"},"finish_reason":"stop"}]}"#;
        assert_eq!(parse_completion(body).expect("parse"), "Hello there");
    }

    #[test]
    fn test_parse_completion_errors() {
        assert!(matches!(
            parse_completion("not json"),
            Err(GenerationError::Malformed { .. })
        ));
        assert!(matches!(
            parse_completion(r#"{"choices":[]}"#),
            Err(GenerationError::EmptyResponse { .. })
        ));
        assert!(matches!(
            parse_completion(r#"{"choices":[{"message":{"content":"  "}}]}"#),
            Err(GenerationError::EmptyResponse { .. })
        ));
    }

    #[test]
    fn test_read_stream_appends_deltas_in_order() {
        let raw = concat!(
            "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"Eat \"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"more greens.\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"stop\"}]}\n\n",
            "data: [DONE]\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"ignored\"}}]}\n\n",
        );
        let mut chunks = Vec::new();
        let text = read_stream(Cursor::new(raw), &mut |c| chunks.push(c.to_string()))
            .expect("stream");
        assert_eq!(chunks, vec!["Eat ", "more greens."]);
        assert_eq!(text, "Eat more greens.");
    }

    #[test]
    fn test_read_stream_rejects_garbage_and_empty() {
        assert!(matches!(
            read_stream(Cursor::new("data: {oops\n\n"), &mut |_| {}),
            Err(GenerationError::Malformed { .. })
        ));
        assert!(matches!(
            read_stream(Cursor::new("data: [DONE]\n\n"), &mut |_| {}),
            Err(GenerationError::EmptyResponse { .. })
        ));
    }

    #[test]
    fn test_read_stream_without_done_is_incomplete() {
        let raw = "data: {\"choices\":[{\"delta\":{\"content\":\"You should see a doc\"}}]}\n\n";
        let mut streamed = String::new();
        let result = read_stream(Cursor::new(raw), &mut |c| streamed.push_str(c));
        match result {
            Err(GenerationError::Transport { message, .. }) => {
                assert!(message.contains("before completion"));
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(streamed, "You should see a doc");
    }

    #[test]
    fn test_read_stream_error_event_fails() {
        let raw = concat!(
            "data: {\"choices\":[{\"delta\":{\"content\":\"Eat \"}}]}\n\n",
            "data: {\"error\":{\"message\":\"server overloaded\"}}\n\n",
            "data: [DONE]\n\n",
        );
        match read_stream(Cursor::new(raw), &mut |_| {}) {
            Err(GenerationError::Malformed { message, .. }) => {
                assert!(message.contains("server overloaded"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_unreachable_server_is_transport_error() {
        let client = OpenAiClient::new(ProviderConfig {
            provider: Provider::OpenAi,
            api_key: SecretString::from("sk-test"),
            model: "gpt-4o".to_string(),
            base_url: "http://127.0.0.1:9".to_string(),
            timeout: Duration::from_secs(2),
            stream: false,
        })
        .expect("client");
        let request = GenerationRequest {
            messages: vec![ChatMessage::user("hi")],
            temperature: 0.5,
            max_tokens: 10,
        };
        assert!(matches!(
            client.complete(&request),
            Err(GenerationError::Transport { .. })
        ));
    }

    #[test]
    fn test_debug_redacts_key() {
        let client = OpenAiClient::new(ProviderConfig {
            provider: Provider::OpenAi,
            api_key: SecretString::from("sk-very-secret"),
            model: "gpt-4o".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            timeout: Duration::from_secs(60),
            stream: true,
        })
        .expect("client");
        let debug = format!("{client:?}");
        assert!(!debug.contains("sk-very-secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
