//! Proxy executor.
//!
//! Sends one proxied call for a connection through `POST /proxy/execute` and
//! turns the platform envelope into a [`ProxyOutcome`]. The caller never sees
//! credentials; the platform injects them from the connection.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{Instrument, debug, warn};

use crate::connectors::EndpointCall;
use crate::directory::require_non_empty;
use crate::error::PlatformError;
use crate::models::{
    ApiResponseEnvelope, EndpointConfig, ProxyOutcome, ProxyParams, ProxyRequest,
};
use crate::transport::{PlatformTransport, RawResponse};

/// Anything able to run a proxied call. Typed connectors are written against
/// this so they can be exercised without a platform.
#[async_trait]
pub trait ProxyBackend: Send + Sync {
    async fn execute_outcome(
        &self,
        connection_id: &str,
        endpoint: &EndpointConfig,
        params: &ProxyParams,
    ) -> Result<ProxyOutcome, PlatformError>;
}

#[async_trait]
impl<T: ProxyBackend + ?Sized> ProxyBackend for Arc<T> {
    async fn execute_outcome(
        &self,
        connection_id: &str,
        endpoint: &EndpointConfig,
        params: &ProxyParams,
    ) -> Result<ProxyOutcome, PlatformError> {
        (**self).execute_outcome(connection_id, endpoint, params).await
    }
}

#[derive(Debug, Clone)]
pub struct ProxyExecutor {
    transport: PlatformTransport,
}

impl ProxyExecutor {
    pub fn new(transport: PlatformTransport) -> Self {
        Self { transport }
    }

    /// Execute a call and return the upstream data, or `Proxy` for a failed
    /// upstream call.
    pub async fn execute(
        &self,
        connection_id: &str,
        endpoint: &EndpointConfig,
        params: Option<Map<String, Value>>,
        body: Option<Map<String, Value>>,
        path_params: Option<Map<String, Value>>,
    ) -> Result<Value, PlatformError> {
        let params = ProxyParams {
            params,
            body,
            path_params,
        };
        self.execute_outcome(connection_id, endpoint, &params)
            .await?
            .into_result()
    }

    /// Execute a typed connector call.
    pub async fn execute_call<C: EndpointCall + ?Sized>(
        &self,
        connection_id: &str,
        call: &C,
    ) -> Result<Value, PlatformError> {
        let endpoint = call.endpoint();
        let params = call.params();
        self.execute_outcome(connection_id, &endpoint, &params)
            .await?
            .into_result()
    }

    async fn send(
        &self,
        connection_id: &str,
        endpoint: &EndpointConfig,
        params: &ProxyParams,
    ) -> Result<ProxyOutcome, PlatformError> {
        require_non_empty(connection_id, "connection id")?;
        endpoint.validate(params)?;

        let request = ProxyRequest::new(connection_id, endpoint, params);
        let response = self
            .transport
            .post_json(&["proxy", "execute"], &request)
            .await?;

        let outcome = interpret_response(&response)?;
        match &outcome {
            ProxyOutcome::Success { status_code, .. } => {
                debug!(status_code = ?status_code, "proxied call succeeded");
            }
            ProxyOutcome::Failure {
                status_code,
                message,
            } => {
                debug!(
                    status_code = ?status_code,
                    message = %message,
                    "proxied call failed upstream"
                );
            }
        }
        Ok(outcome)
    }
}

#[async_trait]
impl ProxyBackend for ProxyExecutor {
    async fn execute_outcome(
        &self,
        connection_id: &str,
        endpoint: &EndpointConfig,
        params: &ProxyParams,
    ) -> Result<ProxyOutcome, PlatformError> {
        let span = tracing::info_span!(
            "proxy_execute",
            connection_id,
            method = %endpoint.method,
            endpoint = endpoint.name.as_deref().unwrap_or(endpoint.path.as_str()),
        );
        self.send(connection_id, endpoint, params)
            .instrument(span)
            .await
    }
}

/// Map a `/proxy/execute` response to an outcome.
///
/// A body that is not JSON is a protocol error whatever the HTTP status. A
/// non-2xx JSON body carrying `detail` is a platform-level rejection of the
/// call itself (unknown connection, bad endpoint config).
fn interpret_response(response: &RawResponse) -> Result<ProxyOutcome, PlatformError> {
    let body: Value = response.json()?;

    if !response.is_success() {
        if body.get("success").is_none() {
            return Err(PlatformError::Proxy {
                message: response.message(),
                status_code: Some(response.status),
            });
        }
        debug!(
            status = response.status,
            "envelope delivered with non-2xx platform status"
        );
    }

    let mut envelope: ApiResponseEnvelope = serde_json::from_value(body).map_err(|err| {
        PlatformError::protocol(format!("malformed proxy envelope: {}", err))
    })?;
    if !response.is_success() && envelope.status_code.is_none() {
        envelope.status_code = Some(response.status);
    }

    if envelope.has_inconsistent_status() {
        warn!(
            success = envelope.success,
            status_code = ?envelope.status_code,
            "envelope status code disagrees with success flag; trusting success flag"
        );
    }

    Ok(envelope.into_outcome())
}
