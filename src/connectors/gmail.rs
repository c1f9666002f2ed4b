//! Gmail connector
//!
//! Endpoint catalogue for the Gmail REST API (`https://gmail.googleapis.com`)
//! as exposed through the platform proxy.

use serde_json::Value;

use crate::connectors::trait_::{BoundConnection, EndpointCall};
use crate::error::PlatformError;
use crate::models::{EndpointConfig, HttpMethod, ParameterSchema, ProxyParams};
use crate::normalization::{self, EmailMessage, EmailMessageList};
use crate::proxy::ProxyBackend;

pub const GMAIL_CONNECTOR_TYPE: &str = "gmail";

/// Calls of the Gmail endpoint catalogue.
#[derive(Debug, Clone, PartialEq)]
pub enum GmailCall {
    ListMessages {
        max_results: Option<u32>,
        query: Option<String>,
    },
    GetMessage {
        message_id: String,
        /// `full`, `metadata`, `minimal` or `raw`
        format: Option<String>,
    },
    SendMessage {
        /// Base64url-encoded RFC 2822 message
        raw: String,
    },
    DeleteMessage {
        message_id: String,
    },
    ListLabels,
    ModifyMessage {
        message_id: String,
        add_label_ids: Vec<String>,
        remove_label_ids: Vec<String>,
    },
}

impl EndpointCall for GmailCall {
    fn connector_type(&self) -> &'static str {
        GMAIL_CONNECTOR_TYPE
    }

    fn name(&self) -> &'static str {
        match self {
            GmailCall::ListMessages { .. } => "list_messages",
            GmailCall::GetMessage { .. } => "get_message",
            GmailCall::SendMessage { .. } => "send_message",
            GmailCall::DeleteMessage { .. } => "delete_message",
            GmailCall::ListLabels => "list_labels",
            GmailCall::ModifyMessage { .. } => "modify_message",
        }
    }

    fn endpoint(&self) -> EndpointConfig {
        let endpoint = match self {
            GmailCall::ListMessages { .. } => {
                EndpointConfig::new(HttpMethod::Get, "/gmail/v1/users/me/messages")
                    .with_parameter(ParameterSchema::query("maxResults"))
                    .with_parameter(ParameterSchema::query("q"))
            }
            GmailCall::GetMessage { .. } => {
                EndpointConfig::new(HttpMethod::Get, "/gmail/v1/users/me/messages/{messageId}")
                    .with_parameter(ParameterSchema::path("messageId"))
                    .with_parameter(ParameterSchema::query("format"))
            }
            GmailCall::SendMessage { .. } => {
                EndpointConfig::new(HttpMethod::Post, "/gmail/v1/users/me/messages/send")
                    .with_parameter(ParameterSchema::required_body("raw"))
            }
            GmailCall::DeleteMessage { .. } => {
                EndpointConfig::new(HttpMethod::Delete, "/gmail/v1/users/me/messages/{messageId}")
                    .with_parameter(ParameterSchema::path("messageId"))
            }
            GmailCall::ListLabels => {
                EndpointConfig::new(HttpMethod::Get, "/gmail/v1/users/me/labels")
            }
            GmailCall::ModifyMessage { .. } => EndpointConfig::new(
                HttpMethod::Post,
                "/gmail/v1/users/me/messages/{messageId}/modify",
            )
            .with_parameter(ParameterSchema::path("messageId"))
            .with_parameter(ParameterSchema::body("addLabelIds"))
            .with_parameter(ParameterSchema::body("removeLabelIds")),
        };
        endpoint.named(self.name())
    }

    fn params(&self) -> ProxyParams {
        match self {
            GmailCall::ListMessages { max_results, query } => ProxyParams::new()
                .query_opt("maxResults", *max_results)
                .query_opt("q", query.clone()),
            GmailCall::GetMessage { message_id, format } => ProxyParams::new()
                .path("messageId", message_id.as_str())
                .query_opt("format", format.clone()),
            GmailCall::SendMessage { raw } => ProxyParams::new().body_field("raw", raw.as_str()),
            GmailCall::DeleteMessage { message_id } => {
                ProxyParams::new().path("messageId", message_id.as_str())
            }
            GmailCall::ListLabels => ProxyParams::new(),
            GmailCall::ModifyMessage {
                message_id,
                add_label_ids,
                remove_label_ids,
            } => {
                let params = ProxyParams::new().path("messageId", message_id.as_str());
                let params = if add_label_ids.is_empty() {
                    params
                } else {
                    params.body_field("addLabelIds", add_label_ids.clone())
                };
                if remove_label_ids.is_empty() {
                    params
                } else {
                    params.body_field("removeLabelIds", remove_label_ids.clone())
                }
            }
        }
    }
}

/// Gmail access through one connection.
#[derive(Debug, Clone)]
pub struct GmailConnector<B> {
    connection: BoundConnection<B>,
}

impl<B: ProxyBackend> GmailConnector<B> {
    pub fn new<S: Into<String>>(backend: B, connection_id: S) -> Self {
        Self {
            connection: BoundConnection::new(backend, connection_id, GMAIL_CONNECTOR_TYPE),
        }
    }

    pub fn connection_id(&self) -> &str {
        self.connection.connection_id()
    }

    /// Run any Gmail call and return the raw payload.
    pub async fn call(&self, call: &GmailCall) -> Result<Value, PlatformError> {
        self.connection.call(call).await
    }

    pub async fn list_messages(
        &self,
        max_results: Option<u32>,
        query: Option<&str>,
    ) -> Result<EmailMessageList, PlatformError> {
        let data = self
            .call(&GmailCall::ListMessages {
                max_results,
                query: query.map(str::to_string),
            })
            .await?;
        normalization::gmail_message_list(&data)
            .map_err(|err| PlatformError::protocol(format!("gmail list_messages: {}", err)))
    }

    pub async fn get_message(&self, message_id: &str) -> Result<EmailMessage, PlatformError> {
        let data = self
            .call(&GmailCall::GetMessage {
                message_id: message_id.to_string(),
                format: Some("full".to_string()),
            })
            .await?;
        normalization::gmail_message(&data)
            .map_err(|err| PlatformError::protocol(format!("gmail get_message: {}", err)))
    }

    /// Send a base64url-encoded RFC 2822 message; returns the sent message resource.
    pub async fn send_message(&self, raw: &str) -> Result<Value, PlatformError> {
        self.call(&GmailCall::SendMessage {
            raw: raw.to_string(),
        })
        .await
    }

    pub async fn delete_message(&self, message_id: &str) -> Result<(), PlatformError> {
        self.call(&GmailCall::DeleteMessage {
            message_id: message_id.to_string(),
        })
        .await
        .map(|_| ())
    }

    pub async fn list_labels(&self) -> Result<Value, PlatformError> {
        self.call(&GmailCall::ListLabels).await
    }

    pub async fn modify_labels(
        &self,
        message_id: &str,
        add: &[&str],
        remove: &[&str],
    ) -> Result<Value, PlatformError> {
        self.call(&GmailCall::ModifyMessage {
            message_id: message_id.to_string(),
            add_label_ids: add.iter().map(|s| s.to_string()).collect(),
            remove_label_ids: remove.iter().map(|s| s.to_string()).collect(),
        })
        .await
    }
}
