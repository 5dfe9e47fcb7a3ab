//! Environment-sourced settings.
//!
//! Everything is read once at startup. Malformed values fail fast; a missing
//! API key only disables the advice features (see [`Settings::credentials`]).

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

pub const DEFAULT_DATASET_PATH: &str = "diabetes_prediction_dataset.csv";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_LOG_FILE: &str = "glycoguide.log";

/// Errors raised while reading settings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} is not set; the advice assistant is unavailable")]
    MissingSecret { var: &'static str },

    #[error("{var} has an invalid value: {value:?}")]
    InvalidValue { var: &'static str, value: String },

    #[error("HTTP client setup failed: {0}")]
    HttpClient(String),
}

/// Chat-completion vendor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenAi,
    Gemini,
}

impl Provider {
    /// Parse `openai` or `gemini` (case-insensitive).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "openai" => Some(Self::OpenAi),
            "gemini" | "google" => Some(Self::Gemini),
            _ => None,
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::OpenAi => "OpenAI",
            Self::Gemini => "Gemini",
        }
    }

    /// Environment variable holding this provider's key.
    #[must_use]
    pub fn key_var(self) -> &'static str {
        match self {
            Self::OpenAi => "OPENAI_API_KEY",
            Self::Gemini => "GOOGLE_API_KEY",
        }
    }

    #[must_use]
    pub fn default_model(self) -> &'static str {
        match self {
            Self::OpenAi => "gpt-4o",
            Self::Gemini => "gemini-2.5-flash",
        }
    }

    #[must_use]
    pub fn default_base_url(self) -> &'static str {
        match self {
            Self::OpenAi => "https://api.openai.com/v1",
            Self::Gemini => "https://generativelanguage.googleapis.com/v1beta",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where log lines go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogMode {
    File,
    Stdout,
    /// File when stdout is a terminal, stdout otherwise.
    Auto,
}

/// Everything needed to build one text generator.
#[derive(Debug)]
pub struct ProviderConfig {
    pub provider: Provider,
    pub api_key: SecretString,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
    pub stream: bool,
}

/// Process-wide settings.
#[derive(Debug)]
pub struct Settings {
    pub dataset_path: PathBuf,
    pub provider: Provider,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
    pub stream: bool,
    pub log_mode: LogMode,
    pub log_file: PathBuf,
    openai_key: Option<SecretString>,
    google_key: Option<SecretString>,
}

impl Settings {
    /// Read settings from the process environment.
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidValue` for malformed values.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Read settings through an arbitrary variable lookup.
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidValue` for malformed values.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Blank values count as unset.
        let get = |var: &str| {
            lookup(var)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let provider = match get("GLYCOGUIDE_PROVIDER") {
            Some(value) => Provider::from_name(&value).ok_or(ConfigError::InvalidValue {
                var: "GLYCOGUIDE_PROVIDER",
                value,
            })?,
            None => Provider::Gemini,
        };

        let timeout_secs = match get("GLYCOGUIDE_HTTP_TIMEOUT_SECS") {
            Some(value) => value
                .parse::<u64>()
                .ok()
                .filter(|&secs| secs > 0)
                .ok_or(ConfigError::InvalidValue {
                    var: "GLYCOGUIDE_HTTP_TIMEOUT_SECS",
                    value,
                })?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        let stream = match get("GLYCOGUIDE_STREAM") {
            Some(value) => parse_bool(&value).ok_or(ConfigError::InvalidValue {
                var: "GLYCOGUIDE_STREAM",
                value,
            })?,
            None => true,
        };

        let log_mode = match get("GLYCOGUIDE_LOG_MODE").as_deref() {
            None | Some("auto") => LogMode::Auto,
            Some("file") => LogMode::File,
            Some("stdout") => LogMode::Stdout,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    var: "GLYCOGUIDE_LOG_MODE",
                    value: other.to_string(),
                })
            }
        };

        Ok(Self {
            dataset_path: get("GLYCOGUIDE_DATASET_PATH")
                .unwrap_or_else(|| DEFAULT_DATASET_PATH.to_string())
                .into(),
            provider,
            model: get("GLYCOGUIDE_MODEL").unwrap_or_else(|| provider.default_model().to_string()),
            base_url: get("GLYCOGUIDE_BASE_URL")
                .unwrap_or_else(|| provider.default_base_url().to_string())
                .trim_end_matches('/')
                .to_string(),
            timeout: Duration::from_secs(timeout_secs),
            stream,
            log_mode,
            log_file: get("GLYCOGUIDE_LOG_FILE")
                .unwrap_or_else(|| DEFAULT_LOG_FILE.to_string())
                .into(),
            openai_key: get("OPENAI_API_KEY").map(SecretString::from),
            google_key: get("GOOGLE_API_KEY").map(SecretString::from),
        })
    }

    /// Provider settings with the selected provider's key.
    ///
    /// # Errors
    /// Returns `ConfigError::MissingSecret` when that key is absent or blank.
    pub fn credentials(&self) -> Result<ProviderConfig, ConfigError> {
        let key = match self.provider {
            Provider::OpenAi => self.openai_key.as_ref(),
            Provider::Gemini => self.google_key.as_ref(),
        }
        .ok_or(ConfigError::MissingSecret {
            var: self.provider.key_var(),
        })?;

        Ok(ProviderConfig {
            provider: self.provider,
            api_key: SecretString::from(key.expose_secret().to_owned()),
            model: self.model.clone(),
            base_url: self.base_url.clone(),
            timeout: self.timeout,
            stream: self.stream,
        })
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Settings::from_lookup(|var| map.get(var).cloned())
    }

    #[test]
    fn test_defaults() {
        let s = settings(&[]).expect("Defaults are valid");
        assert_eq!(s.dataset_path, PathBuf::from(DEFAULT_DATASET_PATH));
        assert_eq!(s.provider, Provider::Gemini);
        assert_eq!(s.model, "gemini-2.5-flash");
        assert_eq!(s.base_url, "https://generativelanguage.googleapis.com/v1beta");
        assert_eq!(s.timeout, Duration::from_secs(60));
        assert!(s.stream);
        assert_eq!(s.log_mode, LogMode::Auto);
        assert_eq!(s.log_file, PathBuf::from("glycoguide.log"));
    }

    #[test]
    fn test_missing_key_is_reported() {
        let s = settings(&[]).expect("Valid");
        assert_eq!(
            s.credentials().expect_err("No key"),
            ConfigError::MissingSecret {
                var: "GOOGLE_API_KEY"
            }
        );

        let s = settings(&[("GLYCOGUIDE_PROVIDER", "openai"), ("OPENAI_API_KEY", "   ")])
            .expect("Valid");
        assert_eq!(
            s.credentials().expect_err("Blank key"),
            ConfigError::MissingSecret {
                var: "OPENAI_API_KEY"
            }
        );
    }

    #[test]
    fn test_openai_credentials() {
        let s = settings(&[
            ("GLYCOGUIDE_PROVIDER", "OpenAI"),
            ("OPENAI_API_KEY", "sk-test-123"),
            ("GLYCOGUIDE_BASE_URL", "http://localhost:8080/v1/"),
            ("GLYCOGUIDE_STREAM", "false"),
            ("GLYCOGUIDE_HTTP_TIMEOUT_SECS", "5"),
        ])
        .expect("Valid");

        let creds = s.credentials().expect("Key present");
        assert_eq!(creds.provider, Provider::OpenAi);
        assert_eq!(creds.model, "gpt-4o");
        assert_eq!(creds.base_url, "http://localhost:8080/v1");
        assert_eq!(creds.api_key.expose_secret(), "sk-test-123");
        assert_eq!(creds.timeout, Duration::from_secs(5));
        assert!(!creds.stream);
    }

    #[test]
    fn test_key_of_other_provider_does_not_count() {
        let s = settings(&[("OPENAI_API_KEY", "sk-test")]).expect("Valid");
        assert!(matches!(
            s.credentials(),
            Err(ConfigError::MissingSecret { .. })
        ));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        for (var, value) in [
            ("GLYCOGUIDE_PROVIDER", "anthropic"),
            ("GLYCOGUIDE_HTTP_TIMEOUT_SECS", "soon"),
            ("GLYCOGUIDE_HTTP_TIMEOUT_SECS", "0"),
            ("GLYCOGUIDE_STREAM", "maybe"),
            ("GLYCOGUIDE_LOG_MODE", "syslog"),
        ] {
            let err = settings(&[(var, value)]).expect_err("Should reject");
            assert!(
                matches!(err, ConfigError::InvalidValue { var: v, .. } if v == var),
                "{var}={value}"
            );
        }
    }

    #[test]
    fn test_debug_does_not_leak_keys() {
        let s = settings(&[("GOOGLE_API_KEY", "AIzaSySecretValue")]).expect("Valid");
        let creds = s.credentials().expect("Key present");
        assert!(!format!("{s:?}").contains("AIzaSySecretValue"));
        assert!(!format!("{creds:?}").contains("AIzaSySecretValue"));
    }
}
