//! # Error Handling
//!
//! Unified error type for every platform call made by the SDK. Each variant
//! carries enough structure (kind, platform message, optional status code) for
//! callers to decide whether to retry; nothing in this crate retries on its own.

use std::fmt;

use serde_json::Value;
use thiserror::Error;

/// Maximum number of characters of a platform message kept in an error.
const MESSAGE_SNIPPET_LIMIT: usize = 200;

/// Why a call failed before any response was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// The request exceeded the configured timeout.
    Timeout,
    /// The platform could not be reached.
    Connect,
    /// Any other failure while sending the request or reading the body.
    Other,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportErrorKind::Timeout => write!(f, "timeout"),
            TransportErrorKind::Connect => write!(f, "connect"),
            TransportErrorKind::Other => write!(f, "other"),
        }
    }
}

/// Errors surfaced by the directory client, proxy executor and OAuth coordinator.
#[derive(Debug, Clone, Error)]
pub enum PlatformError {
    #[error("transport error ({kind}): {message}")]
    Transport {
        kind: TransportErrorKind,
        message: String,
    },
    #[error("protocol error: {details}")]
    Protocol { details: String },
    #[error("proxy error{}: {message}", fmt_status(.status_code))]
    Proxy {
        message: String,
        status_code: Option<u16>,
    },
    #[error("OAuth initiation failed{}: {message}", fmt_status(.status_code))]
    OAuthInit {
        message: String,
        status_code: Option<u16>,
    },
    #[error("OAuth completion failed{}: {message}", fmt_status(.status_code))]
    OAuthCompletion {
        message: String,
        status_code: Option<u16>,
    },
    #[error("{resource} '{id}' not found")]
    NotFound { resource: &'static str, id: String },
    #[error("unknown connector type: {message}")]
    UnknownConnectorType { message: String },
    #[error("invalid connection config: {message}")]
    InvalidConfig { message: String },
    #[error("delete failed (status {status_code}): {message}")]
    DeleteFailed { status_code: u16, message: String },
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },
    #[error("unexpected platform status {status_code}: {message}")]
    UnexpectedStatus { status_code: u16, message: String },
}

fn fmt_status(status_code: &Option<u16>) -> String {
    status_code
        .map(|code| format!(" (status {})", code))
        .unwrap_or_default()
}

impl PlatformError {
    pub fn timeout<S: Into<String>>(message: S) -> Self {
        Self::Transport {
            kind: TransportErrorKind::Timeout,
            message: message.into(),
        }
    }

    pub fn protocol<S: Into<String>>(details: S) -> Self {
        Self::Protocol {
            details: details.into(),
        }
    }

    pub fn invalid_request<S: Into<String>>(message: S) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Status code attached to the failure, if the platform reported one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            PlatformError::Proxy { status_code, .. }
            | PlatformError::OAuthInit { status_code, .. }
            | PlatformError::OAuthCompletion { status_code, .. } => *status_code,
            PlatformError::DeleteFailed { status_code, .. }
            | PlatformError::UnexpectedStatus { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }

    /// True when the outcome of the call is unknown: the request may have
    /// been applied platform-side even though no response arrived.
    pub fn is_indeterminate(&self) -> bool {
        matches!(
            self,
            PlatformError::Transport {
                kind: TransportErrorKind::Timeout,
                ..
            }
        )
    }

    /// Hint for callers that implement their own retry policy.
    pub fn is_retryable(&self) -> bool {
        match self {
            PlatformError::Transport { .. } => true,
            PlatformError::Proxy {
                status_code: Some(code),
                ..
            }
            | PlatformError::UnexpectedStatus {
                status_code: code, ..
            } => *code == 429 || (500..600).contains(code),
            _ => false,
        }
    }
}

impl From<reqwest::Error> for PlatformError {
    fn from(error: reqwest::Error) -> Self {
        let kind = if error.is_timeout() {
            TransportErrorKind::Timeout
        } else if error.is_connect() {
            TransportErrorKind::Connect
        } else {
            TransportErrorKind::Other
        };

        PlatformError::Transport {
            kind,
            message: error.to_string(),
        }
    }
}

/// Extract the human-readable failure text from a platform error body.
///
/// Looks for `detail`, `error` or `message` string fields first and falls back
/// to the raw body text. The result is truncated for log safety.
pub fn platform_message(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);

    let from_json = serde_json::from_slice::<Value>(body).ok().and_then(|value| {
        ["detail", "error", "message"]
            .iter()
            .find_map(|key| value.get(*key))
            .map(|field| match field {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
    });

    let message = from_json.unwrap_or_else(|| text.trim().to_string());
    if message.is_empty() {
        return "no error detail provided".to_string();
    }
    truncate_snippet(message)
}

pub(crate) fn truncate_snippet(text: String) -> String {
    if text.chars().count() > MESSAGE_SNIPPET_LIMIT {
        let truncated: String = text.chars().take(MESSAGE_SNIPPET_LIMIT).collect();
        format!("{}...", truncated)
    } else {
        text
    }
}
