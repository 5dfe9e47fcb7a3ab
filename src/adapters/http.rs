//! Shared plumbing for the chat-completion HTTP clients.
//!
//! Both vendors answer streaming requests with server-sent events and report
//! failures as `{"error": {"message": ...}}`, so the event reader and error
//! mapping live here.

use std::fmt;
use std::io::BufRead;
use std::time::Duration;

use serde::Deserialize;

use crate::config::ConfigError;
use crate::ports::GenerationError;

/// Build a blocking client with the request timeout applied.
pub(crate) fn build_client(timeout: Duration) -> Result<reqwest::blocking::Client, ConfigError> {
    reqwest::blocking::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("glycoguide/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| ConfigError::HttpClient(e.to_string()))
}

/// Map a failed `send()` to a transport error.
pub(crate) fn transport_error(provider: &str, err: &reqwest::Error, timeout: Duration) -> GenerationError {
    let message = if err.is_timeout() {
        format!("request timed out after {}s", timeout.as_secs())
    } else if err.is_connect() {
        format!("connection failed: {err}")
    } else {
        err.to_string()
    };
    GenerationError::Transport {
        provider: provider.to_string(),
        message,
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
    /// Numeric HTTP-style code (Gemini) or a string code (OpenAI)
    #[serde(default)]
    code: Option<serde_json::Value>,
}

pub(crate) fn malformed(provider: &str, message: impl fmt::Display) -> GenerationError {
    GenerationError::Malformed {
        provider: provider.to_string(),
        message: message.to_string(),
    }
}

/// Reject blank generations.
pub(crate) fn non_empty(provider: &str, text: String) -> Result<String, GenerationError> {
    if text.trim().is_empty() {
        Err(GenerationError::EmptyResponse {
            provider: provider.to_string(),
        })
    } else {
        Ok(text)
    }
}

/// The stream closed before the vendor signalled the end of the answer.
pub(crate) fn incomplete_stream(provider: &str) -> GenerationError {
    GenerationError::Transport {
        provider: provider.to_string(),
        message: "stream ended before completion".to_string(),
    }
}

/// Error reported inside an SSE event after a 200 response, if `data` is one.
///
/// A numeric `code` becomes `Api { status }`; anything else is `Malformed`.
pub(crate) fn stream_error(provider: &str, data: &str) -> Option<GenerationError> {
    let envelope = serde_json::from_str::<ErrorEnvelope>(data).ok()?;
    let status = envelope
        .error
        .code
        .as_ref()
        .and_then(serde_json::Value::as_u64)
        .and_then(|c| u16::try_from(c).ok());
    Some(match status {
        Some(status) => GenerationError::Api {
            provider: provider.to_string(),
            status,
            message: envelope.error.message,
        },
        None => malformed(provider, format!("stream error: {}", envelope.error.message)),
    })
}

/// Turn a non-success response into `GenerationError::Api`.
///
/// Uses the vendor's `error.message` when the body carries one, otherwise
/// the raw body (or the status reason when the body is empty).
pub(crate) fn api_error(provider: &str, response: reqwest::blocking::Response) -> GenerationError {
    let status = response.status();
    let body = response.text().unwrap_or_default();
    GenerationError::Api {
        provider: provider.to_string(),
        status: status.as_u16(),
        message: error_message(&body)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string()),
    }
}

pub(crate) fn error_message(body: &str) -> Option<String> {
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) {
        return Some(envelope.error.message);
    }
    let trimmed = body.trim();
    (!trimmed.is_empty()).then(|| trimmed.chars().take(300).collect())
}

/// Payloads of a server-sent event stream.
///
/// Each item is the `data:` content of one event; multi-line payloads are
/// joined with `\n`. Comments and other fields are ignored.
pub(crate) struct SseEvents<R> {
    reader: R,
    line: String,
    done: bool,
}

impl<R: BufRead> SseEvents<R> {
    pub(crate) fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            done: false,
        }
    }
}

impl<R: BufRead> Iterator for SseEvents<R> {
    type Item = std::io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let mut data: Option<String> = None;
        loop {
            self.line.clear();
            match self.reader.read_line(&mut self.line) {
                Ok(0) => {
                    self.done = true;
                    return data.map(Ok);
                }
                Ok(_) => {}
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }

            let line = self.line.trim_end_matches(['\r', '\n']);
            if line.is_empty() {
                if data.is_some() {
                    return data.map(Ok);
                }
                continue;
            }

            if let Some(value) = line.strip_prefix("data:") {
                let value = value.strip_prefix(' ').unwrap_or(value);
                match &mut data {
                    Some(buf) => {
                        buf.push('\n');
                        buf.push_str(value);
                    }
                    None => data = Some(value.to_string()),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn events(raw: &str) -> Vec<String> {
        SseEvents::new(Cursor::new(raw.as_bytes()))
            .collect::<std::io::Result<Vec<_>>>()
            .expect("in-memory read")
    }

    #[test]
    fn test_events_split_on_blank_lines() {
        let raw = "data: one\n\n: keep-alive\n\ndata: two\r\n\r\ndata: [DONE]\n\n";
        assert_eq!(events(raw), vec!["one", "two", "[DONE]"]);
    }

    #[test]
    fn test_multiline_payload_and_missing_trailing_blank() {
        let raw = "event: message\ndata: {\"a\":\ndata: 1}\n\ndata:last";
        assert_eq!(events(raw), vec!["{\"a\":\n1}", "last"]);
    }

    #[test]
    fn test_error_message_prefers_vendor_message() {
        let body = r#"{"error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}}"#;
        assert_eq!(error_message(body).as_deref(), Some("Incorrect API key provided"));
        assert_eq!(error_message("Bad gateway").as_deref(), Some("Bad gateway"));
        assert_eq!(error_message("  "), None);
    }

    #[test]
    fn test_stream_error_mapping() {
        let gemini = r#"{"error": {"code": 503, "message": "The model is overloaded.", "status": "UNAVAILABLE"}}"#;
        match stream_error("Gemini", gemini) {
            Some(GenerationError::Api { status, message, .. }) => {
                assert_eq!(status, 503);
                assert_eq!(message, "The model is overloaded.");
            }
            other => panic!("unexpected: {other:?}"),
        }

        let openai = r#"{"error": {"message": "server overloaded", "type": "server_error", "code": null}}"#;
        assert!(matches!(
            stream_error("OpenAI", openai),
            Some(GenerationError::Malformed { .. })
        ));

        assert!(stream_error("OpenAI", r#"{"choices":[]}"#).is_none());
        assert!(stream_error("OpenAI", "[DONE]").is_none());
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty("OpenAI", "ok".into()).ok().as_deref(), Some("ok"));
        assert!(matches!(
            non_empty("OpenAI", " \n".into()),
            Err(GenerationError::EmptyResponse { .. })
        ));
    }
}
