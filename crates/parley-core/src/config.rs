//! Runtime configuration
//!
//! Values come from the process environment, optionally seeded from a
//! `.env` file in the working directory. CLI flags override them afterwards.

use crate::{CoreError, Result};
use secrecy::{ExposeSecret, SecretString};
use std::str::FromStr;
use std::time::Duration;

pub const API_KEY_VAR: &str = "GOOGLE_API_KEY";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-lite";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Configuration for a chat session and its LLM provider
#[derive(Debug)]
pub struct ChatConfig {
    pub api_key: Option<SecretString>,
    pub model: String,
    pub api_base: String,
    pub temperature: f32,
    pub memory_capacity: usize,
    pub max_document_chars: usize,
    /// Keep failed turns (with their error text) in conversation memory
    pub record_failed_turns: bool,
    pub request_timeout: Duration,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            temperature: 0.7,
            memory_capacity: parley_memory::DEFAULT_CAPACITY,
            max_document_chars: parley_document::DEFAULT_MAX_CHARS,
            record_failed_turns: true,
            request_timeout: Duration::from_secs(60),
        }
    }
}

impl ChatConfig {
    /// Load from `.env` (if present) and the process environment
    pub fn from_env() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "Loaded .env file");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset keys keep their defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        config.api_key = lookup(API_KEY_VAR)
            .filter(|key| !key.trim().is_empty())
            .map(SecretString::new);
        if let Some(model) = lookup("PARLEY_MODEL") {
            config.model = model;
        }
        if let Some(base) = lookup("PARLEY_API_BASE") {
            config.api_base = base.trim_end_matches('/').to_string();
        }
        if let Some(t) = parse_var(&lookup, "PARLEY_TEMPERATURE")? {
            config.temperature = t;
        }
        if let Some(n) = parse_var(&lookup, "PARLEY_MEMORY_CAPACITY")? {
            config.memory_capacity = n;
        }
        if let Some(n) = parse_var(&lookup, "PARLEY_MAX_DOCUMENT_CHARS")? {
            config.max_document_chars = n;
        }
        if let Some(value) = lookup("PARLEY_RECORD_FAILED_TURNS") {
            config.record_failed_turns = parse_bool("PARLEY_RECORD_FAILED_TURNS", &value)?;
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, "PARLEY_REQUEST_TIMEOUT_SECS")? {
            config.request_timeout = Duration::from_secs(secs);
        }

        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if self.memory_capacity == 0 {
            return Err(CoreError::Config("memory capacity must be at least 1".to_string()));
        }
        if self.max_document_chars == 0 {
            return Err(CoreError::Config("max document chars must be at least 1".to_string()));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(CoreError::Config(format!(
                "temperature must be between 0.0 and 2.0, got {}",
                self.temperature
            )));
        }
        if self.model.trim().is_empty() {
            return Err(CoreError::Config("model must not be empty".to_string()));
        }
        Ok(())
    }

    /// The API key, or a configuration error explaining how to set it
    pub fn require_api_key(&self) -> Result<SecretString> {
        self.api_key
            .as_ref()
            .map(|key| SecretString::new(key.expose_secret().clone()))
            .ok_or_else(|| {
                CoreError::Config(format!(
                    "{} not found. Please set it in your environment or .env file.",
                    API_KEY_VAR
                ))
            })
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| CoreError::Config(format!("invalid value for {}: '{}'", key, raw))),
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(CoreError::Config(format!("invalid value for {}: '{}'", key, raw))),
    }
}
