//! Error types for the dynamic API client.
//!
//! # Design
//! Every failure is surfaced synchronously to the caller of the failing
//! invocation. Nothing in the crate retries or buffers. `RemoteService`
//! gets a dedicated variant because the service reports most failures in
//! the response body rather than through the HTTP status.

use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ChimpError>;

/// Errors returned by `Client` and the free-standing decoders.
#[derive(Debug, Error)]
pub enum ChimpError {
    /// The API key is absent or does not look like `<secret>-<region>`.
    #[error("invalid API key '{raw}'")]
    InvalidCredential { raw: String },

    /// A line of the response body did not match the wire shape expected
    /// for the selected mode.
    #[error("malformed response at line {line}: {reason} (content: {content:?})")]
    Decode {
        line: usize,
        content: String,
        reason: String,
    },

    /// The service answered with a structured error payload.
    #[error("remote service error: {message}")]
    RemoteService {
        message: String,
        code: Option<i64>,
        name: Option<String>,
    },

    /// The request did not complete within the configured timeout.
    #[error("request timed out after {timeout:?}")]
    TransportTimeout { timeout: Duration },

    /// Any other network-level failure.
    #[error("transport failure: {0}")]
    Transport(String),

    /// A method was invoked with the wrong number of positional arguments.
    #[error("wrong number of arguments ({given} for {expected})")]
    ArgumentCount { given: usize, expected: usize },

    /// A `ClientConfig` value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A positional argument had the wrong JSON shape.
    #[error("invalid argument: {0}")]
    InvalidPayload(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ChimpError {
    /// Message carried by a `RemoteService` error, if this is one.
    pub fn remote_message(&self) -> Option<&str> {
        match self {
            ChimpError::RemoteService { message, .. } => Some(message),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argument_count_display_lists_given_and_expected() {
        let err = ChimpError::ArgumentCount { given: 1, expected: 0 };
        assert_eq!(err.to_string(), "wrong number of arguments (1 for 0)");
    }

    #[test]
    fn remote_message_only_for_remote_errors() {
        let err = ChimpError::RemoteService {
            message: "boom".to_string(),
            code: None,
            name: None,
        };
        assert_eq!(err.remote_message(), Some("boom"));
        assert!(ChimpError::Transport("reset".into()).remote_message().is_none());
    }
}
