//! OAuth flow coordinator.
//!
//! Drives a connection from unauthorized to active through the platform's
//! authorization-code handshake. The platform mints the authorization URL and
//! performs the code exchange; this side only carries values between the
//! caller and the platform.
//!
//! Code exchange is not idempotent: an authorization code is single use, so
//! nothing here retries `complete_oauth`.

use serde_json::{Map, Value};
use subtle::ConstantTimeEq;
use tracing::{info, warn};
use url::Url;

use crate::directory::require_non_empty;
use crate::error::PlatformError;
use crate::models::oauth::{OAuthAuthorizeRequest, OAuthAuthorizeResponse, OAuthCallbackRequest};
use crate::models::{ConnectionStatus, OAuthCompletion, OAuthSession};
use crate::transport::PlatformTransport;

#[derive(Debug, Clone)]
pub struct OAuthCoordinator {
    transport: PlatformTransport,
}

impl OAuthCoordinator {
    pub fn new(transport: PlatformTransport) -> Self {
        Self { transport }
    }

    /// Ask the platform for an authorization URL.
    pub async fn initiate_oauth(
        &self,
        connector_type: &str,
        redirect_uri: &str,
        connection_id: Option<&str>,
    ) -> Result<OAuthSession, PlatformError> {
        require_non_empty(connector_type, "connector type")?;
        validate_redirect_uri(redirect_uri)?;

        let request = OAuthAuthorizeRequest {
            connector_type,
            redirect_uri,
            connection_id,
        };
        let response = self
            .transport
            .post_json(&["oauth", "authorize"], &request)
            .await?;

        if !response.is_success() {
            let message = response.message();
            warn!(
                connector_type,
                status = response.status,
                message = %message,
                "OAuth initiation rejected"
            );
            return Err(PlatformError::OAuthInit {
                message,
                status_code: Some(response.status),
            });
        }

        let body: OAuthAuthorizeResponse = response.json()?;
        let authorization_url = Url::parse(&body.authorization_url).map_err(|err| {
            PlatformError::protocol(format!(
                "authorization url '{}' is not absolute: {}",
                body.authorization_url, err
            ))
        })?;
        if body.state.is_empty() {
            return Err(PlatformError::protocol("authorization response has empty state"));
        }

        info!(connector_type, "OAuth session initiated");
        Ok(OAuthSession {
            authorization_url,
            state: body.state,
            connector_type: connector_type.to_string(),
            redirect_uri: redirect_uri.to_string(),
            connection_id: body
                .connection_id
                .or_else(|| connection_id.map(str::to_string)),
        })
    }

    /// Exchange an authorization code. On success the platform has stored the
    /// credentials and marked the connection `active`; on failure it marks the
    /// connection `error`.
    pub async fn complete_oauth(
        &self,
        connection_id: &str,
        code: &str,
        redirect_uri: &str,
    ) -> Result<OAuthCompletion, PlatformError> {
        require_non_empty(connection_id, "connection id")?;
        require_non_empty(code, "authorization code")?;

        let request = OAuthCallbackRequest {
            connection_id,
            code,
            redirect_uri,
        };
        let response = match self
            .transport
            .post_json(&["oauth", "callback"], &request)
            .await
        {
            Ok(response) => response,
            Err(err) => {
                if err.is_indeterminate() {
                    warn!(
                        connection_id,
                        "OAuth completion timed out; connection state unknown"
                    );
                }
                return Err(err);
            }
        };

        if !response.is_success() {
            let message = response.message();
            warn!(
                connection_id,
                status = response.status,
                message = %message,
                "OAuth completion rejected"
            );
            return Err(PlatformError::OAuthCompletion {
                message,
                status_code: Some(response.status),
            });
        }

        let raw: Map<String, Value> = response.json()?;
        info!(connection_id, "OAuth completed");
        Ok(OAuthCompletion::from_response(connection_id, raw))
    }

    /// Complete a session after checking that it was issued for
    /// `connection_id` and that the authorization server returned its state.
    /// The session is consumed whatever the outcome.
    pub async fn complete_session(
        &self,
        session: OAuthSession,
        connection_id: &str,
        code: &str,
        returned_state: &str,
    ) -> Result<OAuthCompletion, PlatformError> {
        if let Some(bound) = session.connection_id.as_deref()
            && bound != connection_id
        {
            warn!(
                connection_id,
                session_connection_id = bound,
                "OAuth session belongs to another connection"
            );
            return Err(PlatformError::OAuthCompletion {
                message: format!(
                    "session was issued for connection '{}', not '{}'",
                    bound, connection_id
                ),
                status_code: None,
            });
        }
        if !state_matches(&session.state, returned_state) {
            warn!(connection_id, "OAuth state mismatch");
            return Err(PlatformError::OAuthCompletion {
                message: "state returned by the authorization server does not match the session"
                    .to_string(),
                status_code: None,
            });
        }
        self.complete_oauth(connection_id, code, &session.redirect_uri)
            .await
    }
}

fn state_matches(expected: &str, returned: &str) -> bool {
    expected.len() == returned.len() && bool::from(expected.as_bytes().ct_eq(returned.as_bytes()))
}

fn validate_redirect_uri(redirect_uri: &str) -> Result<(), PlatformError> {
    let parsed = Url::parse(redirect_uri).map_err(|err| PlatformError::OAuthInit {
        message: format!("redirect uri '{}' is not an absolute URL: {}", redirect_uri, err),
        status_code: None,
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(PlatformError::OAuthInit {
            message: format!("redirect uri must use http or https, got '{}'", parsed.scheme()),
            status_code: None,
        });
    }
    Ok(())
}

/// Local view of one connection's authorization progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OAuthFlowState {
    Unauthorized,
    Initiated {
        /// Set when a completion attempt timed out; the platform may or may not
        /// have exchanged the code.
        outcome_unknown: bool,
    },
    Active,
    Failed { reason: String },
}

/// Per-connection flow enforcing `Unauthorized -> Initiated -> Active | Failed`.
#[derive(Debug)]
pub struct OAuthFlow {
    connection_id: String,
    state: OAuthFlowState,
    session: Option<OAuthSession>,
}

impl OAuthFlow {
    pub fn new<S: Into<String>>(connection_id: S) -> Self {
        Self {
            connection_id: connection_id.into(),
            state: OAuthFlowState::Unauthorized,
            session: None,
        }
    }

    pub fn connection_id(&self) -> &str {
        &self.connection_id
    }

    pub fn state(&self) -> &OAuthFlowState {
        &self.state
    }

    /// Authorization URL to send the user to, once initiated.
    pub fn authorization_url(&self) -> Option<&Url> {
        self.session.as_ref().map(|s| &s.authorization_url)
    }

    /// Initiate authorization. Allowed from `Unauthorized`, `Failed`, and an
    /// `Initiated` flow whose last completion had an unknown outcome.
    pub async fn initiate(
        &mut self,
        coordinator: &OAuthCoordinator,
        connector_type: &str,
        redirect_uri: &str,
    ) -> Result<&Url, PlatformError> {
        if matches!(
            self.state,
            OAuthFlowState::Initiated {
                outcome_unknown: false
            } | OAuthFlowState::Active
        ) {
            return Err(PlatformError::OAuthInit {
                message: format!(
                    "connection '{}' cannot be initiated from state {:?}",
                    self.connection_id, self.state
                ),
                status_code: None,
            });
        }

        let session = coordinator
            .initiate_oauth(connector_type, redirect_uri, Some(&self.connection_id))
            .await?;
        self.state = OAuthFlowState::Initiated {
            outcome_unknown: false,
        };
        Ok(&self.session.insert(session).authorization_url)
    }

    /// Complete authorization with the code and state from the redirect.
    ///
    /// A timeout keeps the flow `Initiated` with `outcome_unknown` set; the
    /// caller should fetch the connection to learn the real status.
    pub async fn complete(
        &mut self,
        coordinator: &OAuthCoordinator,
        code: &str,
        returned_state: &str,
    ) -> Result<OAuthCompletion, PlatformError> {
        let OAuthFlowState::Initiated { .. } = self.state else {
            return Err(self.not_initiated());
        };
        let Some(session) = self.session.take() else {
            return Err(self.not_initiated());
        };

        let result = coordinator
            .complete_session(session, &self.connection_id, code, returned_state)
            .await;

        self.state = match &result {
            Ok(_) => OAuthFlowState::Active,
            Err(err) if err.is_indeterminate() => OAuthFlowState::Initiated {
                outcome_unknown: true,
            },
            Err(err) => OAuthFlowState::Failed {
                reason: err.to_string(),
            },
        };
        result
    }

    /// Align the flow with the connection status read back from the platform,
    /// typically after a completion with unknown outcome.
    pub fn reconcile(&mut self, status: &ConnectionStatus) {
        let implied = self.implied_status();
        if !implied.can_transition_to(status) {
            warn!(
                connection_id = %self.connection_id,
                from = %implied,
                to = %status,
                "ignoring connection status that cannot follow the flow state"
            );
            return;
        }
        match status {
            ConnectionStatus::Active => {
                self.session = None;
                self.state = OAuthFlowState::Active;
            }
            ConnectionStatus::Error | ConnectionStatus::Revoked => {
                self.session = None;
                self.state = OAuthFlowState::Failed {
                    reason: format!("platform reports connection status '{}'", status),
                };
            }
            ConnectionStatus::Pending | ConnectionStatus::Unknown(_) => {}
        }
    }

    /// Connection status the platform should report for the current state.
    fn implied_status(&self) -> ConnectionStatus {
        match self.state {
            OAuthFlowState::Unauthorized | OAuthFlowState::Initiated { .. } => {
                ConnectionStatus::Pending
            }
            OAuthFlowState::Active => ConnectionStatus::Active,
            OAuthFlowState::Failed { .. } => ConnectionStatus::Error,
        }
    }

    fn not_initiated(&self) -> PlatformError {
        PlatformError::OAuthCompletion {
            message: format!(
                "connection '{}' has no pending authorization (state {:?})",
                self.connection_id, self.state
            ),
            status_code: None,
        }
    }
}
