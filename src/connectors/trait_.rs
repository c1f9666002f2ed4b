//! Endpoint call trait
//!
//! Defines how a typed connector describes one remote operation so the proxy
//! executor can run it.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::PlatformError;
use crate::models::{EndpointConfig, ProxyParams};
use crate::proxy::ProxyBackend;

/// One call of a connector type's endpoint catalogue.
///
/// Implementations are plain data: building the endpoint and parameters must
/// not perform I/O.
pub trait EndpointCall: Send + Sync {
    /// Connector type tag the call belongs to (e.g. "gmail").
    fn connector_type(&self) -> &'static str;

    /// Catalogue name of the endpoint (e.g. "list_messages").
    fn name(&self) -> &'static str;

    /// Endpoint description sent to the platform.
    fn endpoint(&self) -> EndpointConfig;

    /// Query, body and path parameters of this call.
    fn params(&self) -> ProxyParams;
}

/// A connection bound to a proxy backend and one connector type.
///
/// Typed connectors wrap this and add per-endpoint helpers.
#[derive(Debug, Clone)]
pub struct BoundConnection<B> {
    backend: B,
    connection_id: String,
    connector_type: &'static str,
}

impl<B: ProxyBackend> BoundConnection<B> {
    pub fn new<S: Into<String>>(
        backend: B,
        connection_id: S,
        connector_type: &'static str,
    ) -> Self {
        Self {
            backend,
            connection_id: connection_id.into(),
            connector_type,
        }
    }

    pub fn connection_id(&self) -> &str {
        &self.connection_id
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Run a call and return the upstream data.
    pub async fn call<C: EndpointCall>(&self, call: &C) -> Result<Value, PlatformError> {
        if call.connector_type() != self.connector_type {
            return Err(PlatformError::invalid_request(format!(
                "{} call '{}' cannot run on a {} connection",
                call.connector_type(),
                call.name(),
                self.connector_type
            )));
        }

        let endpoint = call.endpoint();
        let params = call.params();
        self.backend
            .execute_outcome(&self.connection_id, &endpoint, &params)
            .await?
            .into_result()
    }

    /// Run a call and deserialize the upstream data.
    pub async fn call_as<C: EndpointCall, T: DeserializeOwned>(
        &self,
        call: &C,
    ) -> Result<T, PlatformError> {
        let data = self.call(call).await?;
        serde_json::from_value(data).map_err(|err| {
            PlatformError::protocol(format!(
                "unexpected {} payload for '{}': {}",
                self.connector_type,
                call.name(),
                err
            ))
        })
    }
}
