//! Error types for the bearpet companion.
//!
//! This module provides a unified error type for all operations in the
//! bearpet-core library: clip configuration, credential handling, and the
//! chat request boundary.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for bearpet-core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to read a clip set file from disk.
    #[error("failed to read clip file '{path}': {source}")]
    ClipReadError {
        /// The path that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse the clip set JSON content.
    #[error("failed to parse clip JSON from '{path}': {source}")]
    ClipParseError {
        /// The path containing invalid JSON.
        path: PathBuf,
        /// The underlying JSON parse error.
        #[source]
        source: serde_json::Error,
    },

    /// The clip list and the duration list have different lengths.
    #[error("clip configuration mismatch: {clips} clips but {durations} durations")]
    ClipMismatch {
        /// Number of clip identifiers.
        clips: usize,
        /// Number of durations.
        durations: usize,
    },

    /// A reaction sequence was configured with no clips.
    #[error("clip configuration has no reaction clips")]
    EmptyReaction,

    /// A clip duration is zero, negative or not a finite number.
    #[error("invalid duration for clip '{clip}': {seconds}s")]
    InvalidDuration {
        /// The clip the duration belongs to.
        clip: String,
        /// The rejected value in seconds.
        seconds: f64,
    },

    /// No bearer credential was configured.
    #[error("missing API credential: set {variable}")]
    MissingCredential {
        /// Environment variable the credential is read from.
        variable: &'static str,
    },

    /// The chat request could not be delivered or answered.
    #[error("network error: {message}")]
    Transport {
        /// Description of the transport failure.
        message: String,
    },

    /// The chat endpoint answered with no body.
    #[error("no data received")]
    EmptyPayload,

    /// The chat endpoint answered with a body lacking the expected reply.
    #[error("unable to parse response data: {message}")]
    MalformedPayload {
        /// What was wrong with the payload.
        message: String,
    },

    /// Configuration error.
    #[error("configuration error: {message}")]
    ConfigError {
        /// Description of the configuration problem.
        message: String,
    },

    /// The state loop is no longer running.
    #[error("pet loop has stopped")]
    Stopped,
}

impl Error {
    /// Create a new `Transport` error with the given message.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create a new `MalformedPayload` error with the given message.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedPayload {
            message: message.into(),
        }
    }

    /// Create a new `ConfigError` with the given message.
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::transport(err.to_string())
    }
}

/// A specialized `Result` type for bearpet-core operations.
pub type Result<T> = std::result::Result<T, Error>;
