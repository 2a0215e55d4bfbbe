//! Configuration for the bearpet companion.
//!
//! This module provides the `Config` struct with a builder pattern for the
//! chat endpoint, persona prompt, sampling parameters, credential, clip set
//! and stale-response policy.

use crate::chat::{ChatMessage, ChatRequest};
use crate::clip::ClipSpec;
use crate::error::{Error, Result};
use std::time::Duration;

/// Environment variable the API credential is read from.
pub const API_KEY_ENV: &str = "BEARPET_API_KEY";

/// Default chat-completions endpoint.
const DEFAULT_ENDPOINT: &str = "https://open.bigmodel.cn/api/paas/v4/chat/completions";

/// Default model name.
const DEFAULT_MODEL: &str = "glm-4";

/// Default persona prompt sent as the system message.
const DEFAULT_SYSTEM_PROMPT: &str = "Your name is Ragdoll Bear Miyu. Answer questions in a cute style, and always begin your answer with: Hello, Commander.";

/// Default nucleus sampling parameter.
const DEFAULT_TOP_P: f64 = 0.7;

/// Default sampling temperature.
const DEFAULT_TEMPERATURE: f64 = 0.9;

/// Default request timeout in seconds.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

/// Default text shown while a request is pending.
const DEFAULT_PLACEHOLDER: &str = "Let me think...";

/// Configuration for a pet.
#[derive(Debug, Clone)]
pub struct Config {
    /// Chat-completions endpoint URL.
    pub endpoint: String,

    /// Model name sent with every request.
    pub model: String,

    /// Persona prompt sent as the system message.
    pub system_prompt: String,

    /// Nucleus sampling parameter.
    pub top_p: f64,

    /// Sampling temperature.
    pub temperature: f64,

    /// Bearer credential. Never has a built-in default.
    pub api_key: Option<String>,

    /// Timeout applied to each chat request.
    pub request_timeout: Duration,

    /// Response text shown while a request is pending.
    pub placeholder: String,

    /// Idle and reaction clips.
    pub clips: ClipSpec,

    /// Drop replies to submissions that have since been superseded.
    pub discard_stale_responses: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            top_p: DEFAULT_TOP_P,
            temperature: DEFAULT_TEMPERATURE,
            api_key: None,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
            clips: ClipSpec::default(),
            discard_stale_responses: true,
        }
    }
}

impl Config {
    /// Create a new Config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the chat endpoint.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Set the model name.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the persona prompt.
    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Set the nucleus sampling parameter.
    pub fn top_p(mut self, top_p: f64) -> Self {
        self.top_p = top_p;
        self
    }

    /// Set the sampling temperature.
    pub fn temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the bearer credential.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the request timeout.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the request timeout in seconds.
    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout = Duration::from_secs(secs);
        self
    }

    /// Set the pending placeholder text.
    pub fn placeholder(mut self, text: impl Into<String>) -> Self {
        self.placeholder = text.into();
        self
    }

    /// Set the clip set.
    pub fn clips(mut self, clips: ClipSpec) -> Self {
        self.clips = clips;
        self
    }

    /// Choose whether replies to superseded submissions are dropped.
    pub fn discard_stale_responses(mut self, discard: bool) -> Self {
        self.discard_stale_responses = discard;
        self
    }

    /// The configured credential.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingCredential` if the key is unset or blank.
    pub fn credential(&self) -> Result<&str> {
        match self.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Ok(key),
            _ => Err(Error::MissingCredential {
                variable: API_KEY_ENV,
            }),
        }
    }

    /// Check everything that must hold before the pet starts.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingCredential` without a credential and
    /// `Error::ConfigError` for non-finite sampling parameters, an empty
    /// model name or a zero timeout.
    pub fn validate(&self) -> Result<()> {
        self.credential()?;

        if self.model.trim().is_empty() {
            return Err(Error::config_error("model name is empty"));
        }
        if !self.top_p.is_finite() || !self.temperature.is_finite() {
            return Err(Error::config_error(format!(
                "sampling parameters must be finite (top_p={}, temperature={})",
                self.top_p, self.temperature
            )));
        }
        if self.request_timeout.is_zero() {
            return Err(Error::config_error("request timeout must be non-zero"));
        }
        Ok(())
    }

    /// Build the request body for a user question.
    pub fn chat_request(&self, text: &str) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::system(self.system_prompt.clone()),
                ChatMessage::user(text),
            ],
            top_p: self.top_p,
            temperature: self.temperature,
        }
    }
}
