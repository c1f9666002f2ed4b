//! Connection directory client.
//!
//! CRUD access to the platform's connection registry and connector catalogue.

use tracing::{debug, info, warn};

use crate::error::PlatformError;
use crate::models::{
    Connection, ConnectionConfig, ConnectionStatus, ConnectionSummary, ConnectorTypeDescriptor,
    CreateConnectionRequest, DeleteOutcome, EndpointConfig,
};
use crate::transport::{PlatformTransport, RawResponse};

#[derive(Debug, Clone)]
pub struct DirectoryClient {
    transport: PlatformTransport,
}

impl DirectoryClient {
    pub fn new(transport: PlatformTransport) -> Self {
        Self { transport }
    }

    /// List every connector type the platform offers, in platform order.
    pub async fn list_connector_types(
        &self,
    ) -> Result<Vec<ConnectorTypeDescriptor>, PlatformError> {
        let response = self.transport.get(&["connectors"], &[]).await?;
        if !response.is_success() {
            return Err(unexpected_status(&response));
        }
        response.json()
    }

    /// Fetch one connector type descriptor.
    pub async fn get_connector_type(
        &self,
        name: &str,
    ) -> Result<ConnectorTypeDescriptor, PlatformError> {
        require_non_empty(name, "connector type")?;
        let response = self.transport.get(&["connectors", name], &[]).await?;
        match response.status {
            404 => Err(PlatformError::UnknownConnectorType {
                message: response.message(),
            }),
            _ if response.is_success() => response.json(),
            _ => Err(unexpected_status(&response)),
        }
    }

    /// Endpoint catalogue the platform publishes for a connector type.
    pub async fn list_connector_endpoints(
        &self,
        name: &str,
    ) -> Result<Vec<EndpointConfig>, PlatformError> {
        require_non_empty(name, "connector type")?;
        let response = self
            .transport
            .get(&["connectors", name, "endpoints"], &[])
            .await?;
        match response.status {
            404 => Err(PlatformError::UnknownConnectorType {
                message: response.message(),
            }),
            _ if response.is_success() => response.json(),
            _ => Err(unexpected_status(&response)),
        }
    }

    /// Register a new connection. The platform returns it in `pending`, or
    /// `active` for connector types that need no authorization.
    pub async fn create_connection(
        &self,
        connector_type: &str,
        name: &str,
        user_id: &str,
        config: &ConnectionConfig,
    ) -> Result<Connection, PlatformError> {
        require_non_empty(connector_type, "connector type")?;
        require_non_empty(user_id, "user id")?;

        let request = CreateConnectionRequest {
            connector_type,
            name,
            user_id,
            config,
        };
        let response = self.transport.post_json(&["connections"], &request).await?;

        match response.status {
            404 => Err(PlatformError::UnknownConnectorType {
                message: response.message(),
            }),
            400 | 422 => Err(PlatformError::InvalidConfig {
                message: response.message(),
            }),
            _ if response.is_success() => {
                let connection: Connection = response.json()?;
                info!(
                    connection_id = %connection.id,
                    connector_type = %connection.connector_type,
                    status = %connection.status,
                    "connection created"
                );
                Ok(connection)
            }
            _ => Err(unexpected_status(&response)),
        }
    }

    /// Fetch a connection. Revoked connections are reported as not found.
    pub async fn get_connection(&self, connection_id: &str) -> Result<Connection, PlatformError> {
        require_non_empty(connection_id, "connection id")?;
        let response = self
            .transport
            .get(&["connections", connection_id], &[])
            .await?;

        match response.status {
            404 => Err(not_found(connection_id)),
            _ if response.is_success() => {
                let connection: Connection = response.json()?;
                if connection.status == ConnectionStatus::Revoked {
                    debug!(connection_id, "connection is revoked");
                    return Err(not_found(connection_id));
                }
                Ok(connection)
            }
            _ => Err(unexpected_status(&response)),
        }
    }

    /// Connections owned by `user_id`, optionally filtered by connector type.
    pub async fn list_connections(
        &self,
        user_id: &str,
        connector_type: Option<&str>,
    ) -> Result<Vec<ConnectionSummary>, PlatformError> {
        require_non_empty(user_id, "user id")?;

        let mut query = vec![("user_id", user_id)];
        if let Some(connector_type) = connector_type {
            query.push(("connector_type", connector_type));
        }

        let response = self.transport.get(&["connections"], &query).await?;
        if !response.is_success() {
            return Err(unexpected_status(&response));
        }
        response.json()
    }

    /// Delete a connection. Deleting an absent connection succeeds with
    /// [`DeleteOutcome::AlreadyGone`].
    pub async fn delete_connection(
        &self,
        connection_id: &str,
    ) -> Result<DeleteOutcome, PlatformError> {
        require_non_empty(connection_id, "connection id")?;
        let response = self.transport.delete(&["connections", connection_id]).await?;

        match response.status {
            404 => {
                debug!(connection_id, "connection already gone");
                Ok(DeleteOutcome::AlreadyGone)
            }
            _ if response.is_success() => {
                info!(connection_id, "connection deleted");
                Ok(DeleteOutcome::Deleted)
            }
            status => {
                let message = response.message();
                warn!(connection_id, status, message = %message, "connection delete rejected");
                Err(PlatformError::DeleteFailed {
                    status_code: status,
                    message,
                })
            }
        }
    }
}

pub(crate) fn require_non_empty(value: &str, what: &str) -> Result<(), PlatformError> {
    if value.trim().is_empty() {
        return Err(PlatformError::invalid_request(format!(
            "{} must not be empty",
            what
        )));
    }
    Ok(())
}

fn not_found(connection_id: &str) -> PlatformError {
    PlatformError::NotFound {
        resource: "connection",
        id: connection_id.to_string(),
    }
}

pub(crate) fn unexpected_status(response: &RawResponse) -> PlatformError {
    PlatformError::UnexpectedStatus {
        status_code: response.status,
        message: response.message(),
    }
}
