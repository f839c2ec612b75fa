use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Aggregates every failure mode exposed by the relay.
///
/// The taxonomy is deliberately small: callers decide between fixing their
/// configuration ([`LLMError::Config`]), retrying on their own terms
/// ([`LLMError::Transport`]), or treating the call as expired
/// ([`LLMError::Timeout`]). The crate itself never retries.
#[derive(Debug, Error)]
pub enum LLMError {
    /// Invalid or unsupported provider identifier, or a privacy-policy
    /// verification that determined the account is ineligible. Carries a
    /// remediation hint and is never worth retrying unchanged.
    #[error("configuration error: {message}")]
    Config { message: String },
    /// Network failure, non-2xx status not attributable to policy, or a
    /// malformed response body. The upstream status and message are kept
    /// verbatim for diagnostics; retry policy is the caller's business.
    #[error("transport error: {message}")]
    Transport {
        /// HTTP status when the fault occurred after a response line arrived.
        status: Option<u16>,
        message: String,
    },
    /// A stream exceeded its wall-clock budget. Always terminal; the
    /// underlying transport is closed before this error is surfaced.
    #[error("stream timed out after {budget:?}")]
    Timeout { budget: Duration },
    /// Request construction failed before any network activity.
    #[error("invalid request: {message}")]
    Validation { message: String },
}

impl LLMError {
    /// Shorthand for a [`LLMError::Transport`] without an HTTP status.
    pub fn transport<T: Into<String>>(message: T) -> Self {
        Self::Transport {
            status: None,
            message: message.into(),
        }
    }

    /// Builds a [`LLMError::Transport`] that preserves the upstream status
    /// code and raw body excerpt.
    pub fn transport_status<T: Into<String>>(status: u16, message: T) -> Self {
        Self::Transport {
            status: Some(status),
            message: message.into(),
        }
    }

    /// Shorthand for a [`LLMError::Config`].
    pub fn config<T: Into<String>>(message: T) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Wire-level category tag used by push consumers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config { .. } => ErrorKind::Config,
            Self::Transport { .. } => ErrorKind::Transport,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Validation { .. } => ErrorKind::Validation,
        }
    }
}

/// Coarse error category carried by serialized stream error events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Config,
    Transport,
    Timeout,
    Validation,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_status_keeps_code_and_body() {
        let err = LLMError::transport_status(503, "upstream unavailable");
        match err {
            LLMError::Transport { status, message } => {
                assert_eq!(status, Some(503));
                assert!(message.contains("unavailable"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn kind_matches_variant() {
        assert_eq!(LLMError::config("x").kind(), ErrorKind::Config);
        assert_eq!(LLMError::transport("x").kind(), ErrorKind::Transport);
        assert_eq!(
            LLMError::Timeout {
                budget: Duration::from_secs(1)
            }
            .kind(),
            ErrorKind::Timeout
        );
    }

    #[test]
    fn error_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::Timeout).expect("serialize");
        assert_eq!(json, "\"timeout\"");
    }
}
