//! Google Gemini `generateContent` client.
//!
//! System messages become `systemInstruction`; user and assistant turns map
//! to the `user` and `model` roles in `contents`.

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
use crate::domain::{ChatMessage, Role};
use crate::ports::{GenerationError, GenerationRequest, TextGenerator};

const PROVIDER: &str = "Gemini";

/// Blocking client for the Gemini REST API.
pub struct GeminiClient {
    base_url: String,
    model: String,
    api_key: SecretString,
    stream: bool,
    timeout: Duration,
    client: reqwest::blocking::Client,
}

impl GeminiClient {
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

    fn endpoint(&self) -> String {
        if self.stream {
            format!(
                "{}/models/{}:streamGenerateContent?alt=sse",
                self.base_url, self.model
            )
        } else {
            format!("{}/models/{}:generateContent", self.base_url, self.model)
        }
    }
}

impl fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &"[REDACTED]")
            .field("stream", &self.stream)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

impl GenerateContentRequest {
    fn from_request(request: &GenerationRequest) -> Self {
        let system: Vec<&str> = request
            .messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect();

        let contents = request
            .messages
            .iter()
            .filter_map(|m: &ChatMessage| {
                let role = match m.role {
                    Role::System => return None,
                    Role::User => "user",
                    Role::Assistant => "model",
                };
                Some(Content {
                    role: Some(role),
                    parts: vec![Part {
                        text: m.content.clone(),
                    }],
                })
            })
            .collect();

        Self {
            system_instruction: (!system.is_empty()).then(|| Content {
                role: None,
                parts: vec![Part {
                    text: system.join("\n\n"),
                }],
            }),
            contents,
            generation_config: GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
            },
        }
    }
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    /// Set on the last slice of an answer
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

impl GenerateContentResponse {
    fn is_finished(&self) -> bool {
        self.candidates
            .first()
            .is_some_and(|c| c.finish_reason.is_some())
    }

    /// Concatenated text of the first candidate's parts.
    fn text(self) -> String {
        self.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default()
    }
}

fn parse_response(body: &str) -> Result<String, GenerationError> {
    let parsed: GenerateContentResponse =
        serde_json::from_str(body).map_err(|e| malformed(PROVIDER, e))?;
    non_empty(PROVIDER, parsed.text())
}

/// Each SSE event is a full `GenerateContentResponse` holding the next slice.
///
/// The answer is complete once a candidate reports a `finishReason`; a stream
/// that closes earlier or carries an error event fails.
fn read_stream<R: BufRead>(reader: R, on_chunk: &mut dyn FnMut(&str)) -> Result<String, GenerationError> {
    let mut full = String::new();
    let mut finished = false;
    for event in SseEvents::new(reader) {
        let data = event.map_err(|e| GenerationError::Transport {
            provider: PROVIDER.to_string(),
            message: format!("stream interrupted: {e}"),
        })?;
        if let Some(err) = stream_error(PROVIDER, &data) {
            return Err(err);
        }

        let parsed: GenerateContentResponse =
            serde_json::from_str(&data).map_err(|e| malformed(PROVIDER, e))?;
        finished |= parsed.is_finished();
        let text = parsed.text();
        if !text.is_empty() {
            on_chunk(&text);
            full.push_str(&text);
        }
    }
    if !finished {
        return Err(incomplete_stream(PROVIDER));
    }
    non_empty(PROVIDER, full)
}

impl TextGenerator for GeminiClient {
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
        let body = GenerateContentRequest::from_request(request);

        tracing::debug!(
            "Gemini request: model {}, {} turns, stream {}",
            self.model,
            body.contents.len(),
            self.stream
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", self.api_key.expose_secret())
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
            let text = parse_response(&body)?;
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

    fn client(stream: bool) -> GeminiClient {
        GeminiClient::new(ProviderConfig {
            provider: Provider::Gemini,
            api_key: SecretString::from("AIzaSyTestKey"),
            model: "gemini-2.5-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta/".to_string(),
            timeout: Duration::from_secs(60),
            stream,
        })
        .expect("client")
    }

    #[test]
    fn test_request_maps_roles() {
        let request = GenerationRequest {
            messages: vec![
                ChatMessage::system("context"),
                ChatMessage::user("question one"),
                ChatMessage::assistant("answer one"),
                ChatMessage::user("question two"),
            ],
            temperature: 0.75,
            max_tokens: 950,
        };
        let json = serde_json::to_value(GenerateContentRequest::from_request(&request))
            .expect("serialize");

        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "context");
        assert!(json["systemInstruction"].get("role").is_none());
        assert_eq!(json["contents"].as_array().map(Vec::len), Some(3));
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][1]["role"], "model");
        assert_eq!(json["contents"][2]["parts"][0]["text"], "question two");
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 950);
    }

    #[test]
    fn test_request_without_system_message() {
        let request = GenerationRequest {
            messages: vec![ChatMessage::user("hi")],
            temperature: 0.5,
            max_tokens: 10,
        };
        let json = serde_json::to_value(GenerateContentRequest::from_request(&request))
            .expect("serialize");
        assert!(json.get("systemInstruction").is_none());
    }

    #[test]
    fn test_endpoints() {
        assert_eq!(
            client(false).endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent"
        );
        assert_eq!(
            client(true).endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:streamGenerateContent?alt=sse"
        );
    }

    #[test]
    fn test_parse_response_joins_parts() {
        let body = r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Hello, "},{"text":"friend."}]},"finishReason":"STOP"}]}"#;
        assert_eq!(parse_response(body).expect("parse"), "Hello, friend.");
    }

    #[test]
    fn test_parse_response_blocked_is_empty() {
        let body = r#"{"candidates":[{"finishReason":"SAFETY"}]}"#;
        assert!(matches!(
            parse_response(body),
            Err(GenerationError::EmptyResponse { .. })
        ));
        assert!(matches!(
            parse_response("<html>"),
            Err(GenerationError::Malformed { .. })
        ));
    }

    #[test]
    fn test_read_stream() {
        let raw = concat!(
            "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"Walk \"}]}}]}\r\n\r\n",
            "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"daily.\"}]},\"finishReason\":\"STOP\"}]}\r\n\r\n",
        );
        let mut chunks = Vec::new();
        let text = read_stream(Cursor::new(raw), &mut |c| chunks.push(c.to_string()))
            .expect("stream");
        assert_eq!(chunks, vec!["Walk ", "daily."]);
        assert_eq!(text, "Walk daily.");
    }

    #[test]
    fn test_read_stream_cut_short_or_failing() {
        let cut = "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"Walk \"}]}}]}\r\n\r\n";
        assert!(matches!(
            read_stream(Cursor::new(cut), &mut |_| {}),
            Err(GenerationError::Transport { .. })
        ));

        let failing = concat!(
            "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"Walk \"}]}}]}\r\n\r\n",
            "data: {\"error\":{\"code\":503,\"message\":\"The model is overloaded.\",\"status\":\"UNAVAILABLE\"}}\r\n\r\n",
        );
        assert!(matches!(
            read_stream(Cursor::new(failing), &mut |_| {}),
            Err(GenerationError::Api { status: 503, .. })
        ));
    }

    #[test]
    fn test_debug_redacts_key() {
        assert!(!format!("{:?}", client(true)).contains("AIzaSyTestKey"));
    }
}
