use std::{collections::HashMap, path::PathBuf, str::FromStr, time::Duration};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Backend used to obtain transcription responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Gemini,
    Fixture,
}

impl FromStr for ProviderKind {
    type Err = SettingsError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "gemini" => Ok(Self::Gemini),
            "fixture" => Ok(Self::Fixture),
            other => Err(SettingsError::UnknownProvider {
                provider: other.to_string(),
            }),
        }
    }
}

/// Invalid configuration values.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SettingsError {
    #[error("unknown provider `{provider}` (expected `gemini` or `fixture`)")]
    UnknownProvider { provider: String },
    #[error("invalid value `{value}` for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}

/// Optional values read from a configuration file; environment variables take precedence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceOverrides {
    pub provider: Option<String>,
    pub api_key: Option<String>,
    pub endpoint: Option<String>,
    pub model: Option<String>,
    pub timeout: Option<String>,
    pub max_retries: Option<u32>,
    pub poll_interval: Option<String>,
    pub fixture: Option<PathBuf>,
}

/// Resolved configuration for the transcription service client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSettings {
    pub provider: ProviderKind,
    pub api_key: String,
    pub endpoint: Option<String>,
    pub model: Option<String>,
    pub timeout: Duration,
    pub max_retries: u32,
    pub poll_interval: Duration,
    pub fixture: Option<PathBuf>,
}

impl ServiceSettings {
    const PROVIDER_ENV: &'static str = "OCR_AUDIT_PROVIDER";
    const API_KEY_ENV: &'static str = "GEMINI_API_KEY";
    const ENDPOINT_ENV: &'static str = "OCR_AUDIT_ENDPOINT";
    const MODEL_ENV: &'static str = "OCR_AUDIT_MODEL";
    const TIMEOUT_ENV: &'static str = "OCR_AUDIT_TIMEOUT";
    const RETRIES_ENV: &'static str = "OCR_AUDIT_MAX_RETRIES";
    const POLL_ENV: &'static str = "OCR_AUDIT_POLL_INTERVAL";
    const FIXTURE_ENV: &'static str = "OCR_AUDIT_FIXTURE";

    const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);
    const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
    const DEFAULT_RETRIES: u32 = 2;

    /// Load settings from environment variables only.
    ///
    /// * `OCR_AUDIT_PROVIDER`: `gemini` (default) or `fixture`.
    /// * `GEMINI_API_KEY`: API key (required for `gemini`).
    /// * `OCR_AUDIT_FIXTURE`: canned response file (required for `fixture`).
    pub fn from_env() -> Result<Self> {
        Self::resolve(&ServiceOverrides::default(), std::env::vars().collect())
    }

    /// Merge file-provided values with environment variables, the latter winning.
    pub fn resolve(file: &ServiceOverrides, vars: HashMap<String, String>) -> Result<Self> {
        let env = |key: &str| {
            vars.get(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let pick = |key: &str, fallback: &Option<String>| {
            env(key).or_else(|| {
                fallback
                    .as_ref()
                    .map(|value| value.trim().to_string())
                    .filter(|value| !value.is_empty())
            })
        };

        let provider = match pick(Self::PROVIDER_ENV, &file.provider) {
            Some(value) => value.parse()?,
            None => ProviderKind::Gemini,
        };

        let api_key = pick(Self::API_KEY_ENV, &file.api_key).unwrap_or_default();
        let fixture = env(Self::FIXTURE_ENV)
            .map(PathBuf::from)
            .or_else(|| file.fixture.clone());

        match provider {
            ProviderKind::Gemini if api_key.is_empty() => {
                return Err(anyhow::anyhow!(
                    "environment variable {} must be set for the gemini provider",
                    Self::API_KEY_ENV
                ));
            }
            ProviderKind::Fixture if fixture.is_none() => {
                return Err(anyhow::anyhow!(
                    "environment variable {} must point at a response file for the fixture provider",
                    Self::FIXTURE_ENV
                ));
            }
            _ => {}
        }

        let timeout = parse_duration(Self::TIMEOUT_ENV, pick(Self::TIMEOUT_ENV, &file.timeout))?
            .unwrap_or(Self::DEFAULT_TIMEOUT);
        let poll_interval =
            parse_duration(Self::POLL_ENV, pick(Self::POLL_ENV, &file.poll_interval))?
                .unwrap_or(Self::DEFAULT_POLL_INTERVAL);
        let max_retries = match env(Self::RETRIES_ENV) {
            Some(value) => value.parse::<u32>().map_err(|err| SettingsError::InvalidValue {
                key: Self::RETRIES_ENV.to_string(),
                value: value.clone(),
                reason: err.to_string(),
            })?,
            None => file.max_retries.unwrap_or(Self::DEFAULT_RETRIES),
        };

        Ok(Self {
            provider,
            api_key,
            endpoint: pick(Self::ENDPOINT_ENV, &file.endpoint),
            model: pick(Self::MODEL_ENV, &file.model),
            timeout,
            max_retries,
            poll_interval,
            fixture,
        })
    }
}

fn parse_duration(key: &str, value: Option<String>) -> Result<Option<Duration>> {
    value
        .map(|value| {
            humantime::parse_duration(&value)
                .map_err(|err| SettingsError::InvalidValue {
                    key: key.to_string(),
                    value: value.clone(),
                    reason: err.to_string(),
                })
                .with_context(|| format!("failed to parse {key}"))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn defaults_to_gemini_provider() {
        let settings = ServiceSettings::resolve(
            &ServiceOverrides::default(),
            vars(&[("GEMINI_API_KEY", "secret")]),
        )
        .expect("should load settings");
        assert_eq!(settings.provider, ProviderKind::Gemini);
        assert_eq!(settings.api_key, "secret");
        assert!(settings.endpoint.is_none());
        assert!(settings.model.is_none());
        assert_eq!(settings.max_retries, 2);
        assert_eq!(settings.timeout, Duration::from_secs(120));
        assert_eq!(settings.poll_interval, Duration::from_secs(2));
    }

    #[test]
    fn errors_when_api_key_missing() {
        let err = ServiceSettings::resolve(&ServiceOverrides::default(), vars(&[]))
            .expect_err("missing API key should error");
        assert!(err.to_string().contains("GEMINI_API_KEY"));
    }

    #[test]
    fn fixture_provider_needs_a_file_not_a_key() {
        let settings = ServiceSettings::resolve(
            &ServiceOverrides::default(),
            vars(&[
                ("OCR_AUDIT_PROVIDER", "fixture"),
                ("OCR_AUDIT_FIXTURE", "/tmp/response.txt"),
            ]),
        )
        .expect("fixture should not require key");
        assert_eq!(settings.provider, ProviderKind::Fixture);
        assert!(settings.api_key.is_empty());
        assert_eq!(settings.fixture, Some(PathBuf::from("/tmp/response.txt")));

        let err = ServiceSettings::resolve(
            &ServiceOverrides::default(),
            vars(&[("OCR_AUDIT_PROVIDER", "fixture")]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("OCR_AUDIT_FIXTURE"));
    }

    #[test]
    fn parses_durations_and_retries() {
        let settings = ServiceSettings::resolve(
            &ServiceOverrides::default(),
            vars(&[
                ("GEMINI_API_KEY", "secret"),
                ("OCR_AUDIT_TIMEOUT", "45s"),
                ("OCR_AUDIT_POLL_INTERVAL", "250ms"),
                ("OCR_AUDIT_MAX_RETRIES", "5"),
            ]),
        )
        .expect("should parse timeout/retries");
        assert_eq!(settings.timeout, Duration::from_secs(45));
        assert_eq!(settings.poll_interval, Duration::from_millis(250));
        assert_eq!(settings.max_retries, 5);
    }

    #[test]
    fn rejects_malformed_values() {
        let err = ServiceSettings::resolve(
            &ServiceOverrides::default(),
            vars(&[("GEMINI_API_KEY", "secret"), ("OCR_AUDIT_TIMEOUT", "soon")]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("OCR_AUDIT_TIMEOUT"));

        let err = ServiceSettings::resolve(
            &ServiceOverrides::default(),
            vars(&[("OCR_AUDIT_PROVIDER", "openai")]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("unknown provider `openai`"));
    }

    #[test]
    fn environment_overrides_file_values() {
        let file = ServiceOverrides {
            api_key: Some("from-file".into()),
            model: Some("gemini-file-model".into()),
            max_retries: Some(7),
            ..ServiceOverrides::default()
        };
        let settings = ServiceSettings::resolve(
            &file,
            vars(&[("OCR_AUDIT_MODEL", "gemini-env-model"), ("OCR_AUDIT_ENDPOINT", "  ")]),
        )
        .unwrap();
        assert_eq!(settings.api_key, "from-file");
        assert_eq!(settings.model.as_deref(), Some("gemini-env-model"));
        assert_eq!(settings.max_retries, 7);
        assert!(settings.endpoint.is_none());
    }
}
