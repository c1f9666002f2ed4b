//! OneDrive connector
//!
//! Endpoint catalogue for Microsoft Graph drive items
//! (`https://graph.microsoft.com/v1.0`).

use serde_json::{Value, json};

use crate::connectors::trait_::{BoundConnection, EndpointCall};
use crate::error::PlatformError;
use crate::models::{
    BinaryContent, EndpointConfig, HttpMethod, ParameterSchema, ProxyParams, ResponseType,
};
use crate::normalization::{self, CloudStorageFile, CloudStorageFileList};
use crate::proxy::ProxyBackend;

pub const ONEDRIVE_CONNECTOR_TYPE: &str = "onedrive";

#[derive(Debug, Clone, PartialEq)]
pub enum OneDriveCall {
    ListFiles {
        top: Option<u32>,
        order_by: Option<String>,
    },
    GetFile {
        item_id: String,
    },
    DownloadFile {
        item_id: String,
    },
    UploadFile {
        filename: String,
        content: String,
    },
    CreateFolder {
        name: String,
    },
    DeleteItem {
        item_id: String,
    },
    SearchFiles {
        query: String,
        top: Option<u32>,
    },
    CopyItem {
        item_id: String,
        /// Graph `itemReference` of the destination folder
        parent_reference: Value,
        name: Option<String>,
    },
}

impl EndpointCall for OneDriveCall {
    fn connector_type(&self) -> &'static str {
        ONEDRIVE_CONNECTOR_TYPE
    }

    fn name(&self) -> &'static str {
        match self {
            OneDriveCall::ListFiles { .. } => "list_files",
            OneDriveCall::GetFile { .. } => "get_file",
            OneDriveCall::DownloadFile { .. } => "download_file",
            OneDriveCall::UploadFile { .. } => "upload_file",
            OneDriveCall::CreateFolder { .. } => "create_folder",
            OneDriveCall::DeleteItem { .. } => "delete_item",
            OneDriveCall::SearchFiles { .. } => "search_files",
            OneDriveCall::CopyItem { .. } => "copy_item",
        }
    }

    fn endpoint(&self) -> EndpointConfig {
        let endpoint = match self {
            OneDriveCall::ListFiles { .. } => {
                EndpointConfig::new(HttpMethod::Get, "/me/drive/root/children")
                    .with_parameter(ParameterSchema::query("top"))
                    .with_parameter(ParameterSchema::query("orderby"))
            }
            OneDriveCall::GetFile { .. } => {
                EndpointConfig::new(HttpMethod::Get, "/me/drive/items/{itemId}")
                    .with_parameter(ParameterSchema::path("itemId"))
            }
            OneDriveCall::DownloadFile { .. } => {
                EndpointConfig::new(HttpMethod::Get, "/me/drive/items/{itemId}/content")
                    .with_parameter(ParameterSchema::path("itemId"))
                    .with_response_type(ResponseType::Binary)
            }
            OneDriveCall::UploadFile { .. } => {
                EndpointConfig::new(HttpMethod::Put, "/me/drive/root:/{filename}:/content")
                    .with_parameter(ParameterSchema::path("filename"))
                    .with_parameter(ParameterSchema::required_body("content"))
            }
            OneDriveCall::CreateFolder { .. } => {
                EndpointConfig::new(HttpMethod::Post, "/me/drive/root/children")
                    .with_parameter(ParameterSchema::required_body("name"))
                    .with_parameter(ParameterSchema::required_body("folder"))
            }
            OneDriveCall::DeleteItem { .. } => {
                EndpointConfig::new(HttpMethod::Delete, "/me/drive/items/{itemId}")
                    .with_parameter(ParameterSchema::path("itemId"))
            }
            OneDriveCall::SearchFiles { .. } => {
                EndpointConfig::new(HttpMethod::Get, "/me/drive/root/search(q='{query}')")
                    .with_parameter(ParameterSchema::path("query"))
                    .with_parameter(ParameterSchema::query("top"))
            }
            OneDriveCall::CopyItem { .. } => {
                EndpointConfig::new(HttpMethod::Post, "/me/drive/items/{itemId}/copy")
                    .with_parameter(ParameterSchema::path("itemId"))
                    .with_parameter(ParameterSchema::required_body("parentReference"))
                    .with_parameter(ParameterSchema::body("name"))
            }
        };
        endpoint.named(self.name())
    }

    fn params(&self) -> ProxyParams {
        match self {
            OneDriveCall::ListFiles { top, order_by } => ProxyParams::new()
                .query_opt("top", *top)
                .query_opt("orderby", order_by.clone()),
            OneDriveCall::GetFile { item_id }
            | OneDriveCall::DownloadFile { item_id }
            | OneDriveCall::DeleteItem { item_id } => {
                ProxyParams::new().path("itemId", item_id.as_str())
            }
            OneDriveCall::UploadFile { filename, content } => ProxyParams::new()
                .path("filename", filename.as_str())
                .body_field("content", content.as_str()),
            OneDriveCall::CreateFolder { name } => ProxyParams::new()
                .body_field("name", name.as_str())
                .body_field("folder", json!({})),
            OneDriveCall::SearchFiles { query, top } => ProxyParams::new()
                .path("query", query.as_str())
                .query_opt("top", *top),
            OneDriveCall::CopyItem {
                item_id,
                parent_reference,
                name,
            } => ProxyParams::new()
                .path("itemId", item_id.as_str())
                .body_field("parentReference", parent_reference.clone())
                .body_opt("name", name.clone()),
        }
    }
}

/// OneDrive access through one connection.
#[derive(Debug, Clone)]
pub struct OneDriveConnector<B> {
    connection: BoundConnection<B>,
}

impl<B: ProxyBackend> OneDriveConnector<B> {
    pub fn new<S: Into<String>>(backend: B, connection_id: S) -> Self {
        Self {
            connection: BoundConnection::new(backend, connection_id, ONEDRIVE_CONNECTOR_TYPE),
        }
    }

    pub fn connection_id(&self) -> &str {
        self.connection.connection_id()
    }

    pub async fn call(&self, call: &OneDriveCall) -> Result<Value, PlatformError> {
        self.connection.call(call).await
    }

    pub async fn list_files(
        &self,
        top: Option<u32>,
    ) -> Result<CloudStorageFileList, PlatformError> {
        let data = self
            .call(&OneDriveCall::ListFiles {
                top,
                order_by: None,
            })
            .await?;
        normalization::onedrive_file_list(&data)
            .map_err(|err| PlatformError::protocol(format!("onedrive list_files: {}", err)))
    }

    pub async fn get_file(&self, item_id: &str) -> Result<CloudStorageFile, PlatformError> {
        let data = self
            .call(&OneDriveCall::GetFile {
                item_id: item_id.to_string(),
            })
            .await?;
        normalization::onedrive_file(&data)
            .map_err(|err| PlatformError::protocol(format!("onedrive get_file: {}", err)))
    }

    pub async fn search(&self, query: &str) -> Result<CloudStorageFileList, PlatformError> {
        let data = self
            .call(&OneDriveCall::SearchFiles {
                query: query.to_string(),
                top: None,
            })
            .await?;
        normalization::onedrive_file_list(&data)
            .map_err(|err| PlatformError::protocol(format!("onedrive search_files: {}", err)))
    }

    pub async fn download(&self, item_id: &str) -> Result<Vec<u8>, PlatformError> {
        let data = self
            .call(&OneDriveCall::DownloadFile {
                item_id: item_id.to_string(),
            })
            .await?;
        BinaryContent::from_data(data)?.decode()
    }

    pub async fn upload(&self, filename: &str, content: &str) -> Result<Value, PlatformError> {
        self.call(&OneDriveCall::UploadFile {
            filename: filename.to_string(),
            content: content.to_string(),
        })
        .await
    }

    pub async fn create_folder(&self, name: &str) -> Result<Value, PlatformError> {
        self.call(&OneDriveCall::CreateFolder {
            name: name.to_string(),
        })
        .await
    }

    pub async fn delete(&self, item_id: &str) -> Result<(), PlatformError> {
        self.call(&OneDriveCall::DeleteItem {
            item_id: item_id.to_string(),
        })
        .await
        .map(|_| ())
    }

    /// Copy an item into the folder with id `parent_id`. Graph copies
    /// asynchronously; the response carries only the monitor location.
    pub async fn copy_item(
        &self,
        item_id: &str,
        parent_id: &str,
        name: Option<&str>,
    ) -> Result<Value, PlatformError> {
        self.call(&OneDriveCall::CopyItem {
            item_id: item_id.to_string(),
            parent_reference: json!({ "id": parent_id }),
            name: name.map(str::to_string),
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectors::dropbox::DropboxCall;
    use crate::connectors::trait_::testing::RecordingBackend;
    use crate::connectors::BoundConnection;
    use std::sync::Arc;

    #[test]
    fn search_uses_path_placeholder() {
        let call = OneDriveCall::SearchFiles {
            query: "budget".to_string(),
            top: Some(5),
        };
        let endpoint = call.endpoint();
        assert_eq!(endpoint.path_placeholders(), vec!["query"]);
        let params = call.params();
        assert!(endpoint.validate(&params).is_ok());
        assert_eq!(params.params.unwrap()["top"], json!(5));
    }

    #[tokio::test]
    async fn list_files_normalizes_collection() {
        let backend = Arc::new(RecordingBackend::returning(json!({
            "value": [{"id": "1", "name": "a.txt", "file": {"mimeType": "text/plain"}}]
        })));
        let onedrive = OneDriveConnector::new(backend.clone(), "conn-od");

        let list = onedrive.list_files(Some(10)).await.unwrap();
        assert_eq!(list.total_count, 1);
        assert!(!list.has_more);

        let (_, endpoint, params) = backend.last_call();
        assert_eq!(endpoint.method, HttpMethod::Get);
        assert_eq!(params.params.unwrap()["top"], json!(10));
    }

    #[tokio::test]
    async fn foreign_call_is_rejected_before_sending() {
        let backend = Arc::new(RecordingBackend::returning(json!({})));
        let connection = BoundConnection::new(backend.clone(), "conn-od", ONEDRIVE_CONNECTOR_TYPE);

        let result = connection
            .call(&DropboxCall::DeleteItem {
                path: "/a".to_string(),
            })
            .await;
        assert!(matches!(result, Err(PlatformError::InvalidRequest { .. })));
        assert!(backend.calls.lock().unwrap().is_empty());
    }
}
