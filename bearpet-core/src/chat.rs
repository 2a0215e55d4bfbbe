//! Chat-completions request plumbing.
//!
//! This module holds the wire types for the chat-completions endpoint, the
//! [`ChatTransport`] seam the pet loop talks through, the reqwest-backed
//! [`HttpTransport`], and the conversion of a raw reply body into one of the
//! four terminal [`ChatOutcome`]s.

use crate::config::Config;
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Longest slice of an error body kept in a transport error message.
const MAX_ERROR_BODY_CHARS: usize = 200;

/// One message of a chat conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Either "system" or "user".
    pub role: String,
    /// Message text.
    pub content: String,
}

impl ChatMessage {
    /// A system (persona) message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    /// A user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Body of a chat-completions request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Model name.
    pub model: String,
    /// System prompt followed by the user's question.
    pub messages: Vec<ChatMessage>,
    /// Nucleus sampling parameter.
    pub top_p: f64,
    /// Sampling temperature.
    pub temperature: f64,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    content: String,
}

/// Extract `choices[0].message.content` from a reply body.
///
/// # Errors
///
/// Returns `Error::EmptyPayload` for an empty or whitespace-only body and
/// `Error::MalformedPayload` when the body is not JSON or lacks the reply.
pub fn parse_reply(body: &[u8]) -> Result<String> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(Error::EmptyPayload);
    }

    let response: ChatResponse =
        serde_json::from_slice(body).map_err(|e| Error::malformed(e.to_string()))?;

    response
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content)
        .ok_or_else(|| Error::malformed("response has no choices"))
}

/// The terminal outcome of one chat submission.
///
/// Exactly one of these is produced per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatOutcome {
    /// The endpoint answered with a reply.
    Reply(String),
    /// The request never got a usable HTTP answer.
    TransportError(String),
    /// The answer had no body.
    EmptyPayload,
    /// The body did not contain a reply.
    ParseError(String),
}

impl ChatOutcome {
    /// Classify the result of a request.
    pub fn from_result(result: Result<String>) -> Self {
        match result {
            Ok(reply) => Self::Reply(reply),
            Err(Error::EmptyPayload) => Self::EmptyPayload,
            Err(Error::MalformedPayload { message }) => Self::ParseError(message),
            Err(Error::Transport { message }) => Self::TransportError(message),
            Err(other) => Self::TransportError(other.to_string()),
        }
    }

    /// The text shown in the response area.
    pub fn response_text(&self) -> String {
        match self {
            Self::Reply(reply) => reply.clone(),
            Self::TransportError(message) => format!("Network error: {}", message),
            Self::EmptyPayload => "Error: no data received".to_string(),
            Self::ParseError(message) => {
                format!("Error: unable to parse response data ({})", message)
            }
        }
    }

    /// Whether the request produced a reply.
    pub fn is_reply(&self) -> bool {
        matches!(self, Self::Reply(_))
    }

    /// Short label used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Reply(_) => "reply",
            Self::TransportError(_) => "transport_error",
            Self::EmptyPayload => "empty_payload",
            Self::ParseError(_) => "parse_error",
        }
    }
}

/// Something that can deliver a chat request and hand back the raw body.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Send the request and return the response body.
    ///
    /// # Errors
    ///
    /// Returns `Error::Transport` if no successful HTTP answer arrived.
    async fn send(&self, request: &ChatRequest) -> Result<Vec<u8>>;
}

/// Send `request` and reduce whatever happens to a single outcome.
pub async fn fetch_reply(transport: &dyn ChatTransport, request: &ChatRequest) -> ChatOutcome {
    let result = match transport.send(request).await {
        Ok(body) => {
            debug!(bytes = body.len(), "chat response received");
            parse_reply(&body)
        }
        Err(e) => Err(e),
    };
    ChatOutcome::from_result(result)
}

/// Chat transport over HTTPS using reqwest.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    endpoint: Url,
    api_key: String,
}

impl HttpTransport {
    /// Build a transport from the endpoint, credential and timeout in `config`.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingCredential` if no API key is configured and
    /// `Error::ConfigError` if the endpoint is not a valid URL.
    pub fn new(config: &Config) -> Result<Self> {
        let api_key = config.credential()?.to_string();
        let endpoint = Url::parse(&config.endpoint).map_err(|e| {
            Error::config_error(format!("invalid endpoint '{}': {}", config.endpoint, e))
        })?;
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| Error::config_error(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }

    /// The endpoint requests are posted to.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn send(&self, request: &ChatRequest) -> Result<Vec<u8>> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header(CONTENT_TYPE, "application/json")
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let snippet: String = text.trim().chars().take(MAX_ERROR_BODY_CHARS).collect();
            return Err(Error::transport(format!("HTTP {}: {}", status, snippet)));
        }

        Ok(response.bytes().await?.to_vec())
    }
}
