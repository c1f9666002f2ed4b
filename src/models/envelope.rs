//! Platform response envelope for proxied calls.

use std::collections::BTreeMap;

use base64::{Engine as _, engine::general_purpose};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{PlatformError, truncate_snippet};

/// Raw `{success, status_code?, data?, error?}` body returned by `/proxy/execute`.
///
/// Only meant to be decoded and turned into a [`ProxyOutcome`] right away.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponseEnvelope {
    pub success: bool,
    #[serde(default)]
    pub status_code: Option<u16>,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub headers: Option<BTreeMap<String, String>>,
}

/// Interpreted envelope. A failed call exposes no data.
#[derive(Debug, Clone, PartialEq)]
pub enum ProxyOutcome {
    Success {
        status_code: Option<u16>,
        data: Value,
        headers: BTreeMap<String, String>,
    },
    Failure {
        status_code: Option<u16>,
        message: String,
    },
}

impl ApiResponseEnvelope {
    /// Convert into an outcome. The `success` flag decides; the status code
    /// only travels along.
    pub fn into_outcome(self) -> ProxyOutcome {
        if self.success {
            return ProxyOutcome::Success {
                status_code: self.status_code,
                data: match self.data {
                    Some(Value::Null) | None => Value::Object(Map::new()),
                    Some(data) => data,
                },
                headers: self.headers.unwrap_or_default(),
            };
        }

        let message = match self.error.filter(|e| !e.trim().is_empty()) {
            Some(error) => error,
            None => synthesize_failure_message(self.status_code, self.data.as_ref()),
        };

        ProxyOutcome::Failure {
            status_code: self.status_code,
            message,
        }
    }

    /// True when the status code disagrees with the success flag.
    pub fn has_inconsistent_status(&self) -> bool {
        match self.status_code {
            Some(code) => self.success != (200..400).contains(&code),
            None => false,
        }
    }
}

fn synthesize_failure_message(status_code: Option<u16>, data: Option<&Value>) -> String {
    let prefix = match status_code {
        Some(code) => format!("upstream returned status {}", code),
        None => "upstream call failed".to_string(),
    };

    match data {
        Some(Value::Null) | None => prefix,
        Some(Value::String(text)) => truncate_snippet(format!("{}: {}", prefix, text)),
        Some(other) => truncate_snippet(format!("{}: {}", prefix, other)),
    }
}

impl ProxyOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ProxyOutcome::Success { .. })
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            ProxyOutcome::Success { status_code, .. }
            | ProxyOutcome::Failure { status_code, .. } => *status_code,
        }
    }

    /// The data payload of a successful call, or `Proxy` for a failure.
    pub fn into_result(self) -> Result<Value, PlatformError> {
        match self {
            ProxyOutcome::Success { data, .. } => Ok(data),
            ProxyOutcome::Failure {
                status_code,
                message,
            } => Err(PlatformError::Proxy {
                message,
                status_code,
            }),
        }
    }
}

/// Payload the platform returns for `binary` response types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryContent {
    /// Base64-encoded body
    pub content: String,
    #[serde(default = "default_content_type")]
    pub content_type: String,
}

fn default_content_type() -> String {
    "application/octet-stream".to_string()
}

impl BinaryContent {
    pub fn from_data(data: Value) -> Result<Self, PlatformError> {
        serde_json::from_value(data).map_err(|err| {
            PlatformError::protocol(format!("binary payload has unexpected shape: {}", err))
        })
    }

    pub fn decode(&self) -> Result<Vec<u8>, PlatformError> {
        general_purpose::STANDARD
            .decode(self.content.as_bytes())
            .map_err(|err| {
                PlatformError::protocol(format!("binary payload is not base64: {}", err))
            })
    }
}
