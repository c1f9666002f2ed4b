//! OAuth session and callback payloads.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;

/// Body of `POST /oauth/authorize`.
#[derive(Debug, Clone, Serialize)]
pub struct OAuthAuthorizeRequest<'a> {
    pub connector_type: &'a str,
    pub redirect_uri: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_id: Option<&'a str>,
}

/// Raw `{authorization_url, state}` response of `POST /oauth/authorize`.
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthAuthorizeResponse {
    pub authorization_url: String,
    pub state: String,
    #[serde(default)]
    pub connection_id: Option<String>,
}

/// Body of `POST /oauth/callback`.
#[derive(Debug, Clone, Serialize)]
pub struct OAuthCallbackRequest<'a> {
    pub connection_id: &'a str,
    pub code: &'a str,
    pub redirect_uri: &'a str,
}

/// A minted authorization session.
///
/// Deliberately not `Clone`: completing a session consumes it, so the same
/// session cannot be completed twice through this SDK.
#[derive(Debug, PartialEq, Eq)]
pub struct OAuthSession {
    pub authorization_url: Url,
    pub state: String,
    pub connector_type: String,
    pub redirect_uri: String,
    pub connection_id: Option<String>,
}

/// Result of a successful code exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct OAuthCompletion {
    pub connection_id: String,
    pub message: Option<String>,
    /// Full platform response, unknown fields included.
    pub raw: Map<String, Value>,
}

impl OAuthCompletion {
    pub(crate) fn from_response(requested_connection_id: &str, raw: Map<String, Value>) -> Self {
        let connection_id = raw
            .get("connection_id")
            .and_then(Value::as_str)
            .unwrap_or(requested_connection_id)
            .to_string();
        let message = raw
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string);

        Self {
            connection_id,
            message,
            raw,
        }
    }
}
