//! Dropbox connector
//!
//! Endpoint catalogue for the Dropbox API v2 (`https://api.dropboxapi.com/2`).
//! Every Dropbox RPC is a POST with a JSON body; content endpoints pass their
//! arguments in the `Dropbox-API-Arg` header instead.

use serde_json::{Value, json};

use crate::connectors::trait_::{BoundConnection, EndpointCall};
use crate::error::PlatformError;
use crate::models::{
    BinaryContent, EndpointConfig, HttpMethod, ParameterSchema, ProxyParams, ResponseType,
};
use crate::normalization::{self, CloudStorageFile, CloudStorageFileList};
use crate::proxy::ProxyBackend;

pub const DROPBOX_CONNECTOR_TYPE: &str = "dropbox";

const API_ARG_HEADER: &str = "Dropbox-API-Arg";

#[derive(Debug, Clone, PartialEq)]
pub enum DropboxCall {
    ListFolder {
        /// Empty string for the root folder
        path: String,
        recursive: Option<bool>,
        limit: Option<u32>,
    },
    GetMetadata {
        path: String,
    },
    DownloadFile {
        path: String,
    },
    UploadFile {
        path: String,
        content: String,
    },
    CreateFolder {
        path: String,
        autorename: Option<bool>,
    },
    DeleteItem {
        path: String,
    },
    MoveItem {
        from_path: String,
        to_path: String,
        autorename: Option<bool>,
    },
    SearchFiles {
        query: String,
        options: Option<Value>,
    },
    CreateSharedLink {
        path: String,
        settings: Option<Value>,
    },
}

impl EndpointCall for DropboxCall {
    fn connector_type(&self) -> &'static str {
        DROPBOX_CONNECTOR_TYPE
    }

    fn name(&self) -> &'static str {
        match self {
            DropboxCall::ListFolder { .. } => "list_folder",
            DropboxCall::GetMetadata { .. } => "get_metadata",
            DropboxCall::DownloadFile { .. } => "download_file",
            DropboxCall::UploadFile { .. } => "upload_file",
            DropboxCall::CreateFolder { .. } => "create_folder",
            DropboxCall::DeleteItem { .. } => "delete_item",
            DropboxCall::MoveItem { .. } => "move_item",
            DropboxCall::SearchFiles { .. } => "search_files",
            DropboxCall::CreateSharedLink { .. } => "create_shared_link",
        }
    }

    fn endpoint(&self) -> EndpointConfig {
        let endpoint = match self {
            DropboxCall::ListFolder { .. } => rpc("/files/list_folder")
                .with_parameter(ParameterSchema::required_body("path"))
                .with_parameter(ParameterSchema::body("recursive"))
                .with_parameter(ParameterSchema::body("limit")),
            DropboxCall::GetMetadata { .. } => {
                rpc("/files/get_metadata").with_parameter(ParameterSchema::required_body("path"))
            }
            DropboxCall::DownloadFile { path } => rpc("/files/download")
                .with_header(API_ARG_HEADER, json!({ "path": path }).to_string())
                .with_parameter(ParameterSchema::required_body("path"))
                .with_response_type(ResponseType::Binary),
            DropboxCall::UploadFile { path, .. } => rpc("/files/upload")
                .with_header("Content-Type", "application/octet-stream")
                .with_header(
                    API_ARG_HEADER,
                    json!({ "path": path, "mode": "add", "autorename": true }).to_string(),
                )
                .with_parameter(ParameterSchema::required_body("path"))
                .with_parameter(ParameterSchema::required_body("content")),
            DropboxCall::CreateFolder { .. } => rpc("/files/create_folder_v2")
                .with_parameter(ParameterSchema::required_body("path"))
                .with_parameter(ParameterSchema::body("autorename")),
            DropboxCall::DeleteItem { .. } => {
                rpc("/files/delete_v2").with_parameter(ParameterSchema::required_body("path"))
            }
            DropboxCall::MoveItem { .. } => rpc("/files/move_v2")
                .with_parameter(ParameterSchema::required_body("from_path"))
                .with_parameter(ParameterSchema::required_body("to_path"))
                .with_parameter(ParameterSchema::body("autorename")),
            DropboxCall::SearchFiles { .. } => rpc("/files/search_v2")
                .with_parameter(ParameterSchema::required_body("query"))
                .with_parameter(ParameterSchema::body("options")),
            DropboxCall::CreateSharedLink { .. } => {
                rpc("/sharing/create_shared_link_with_settings")
                    .with_parameter(ParameterSchema::required_body("path"))
                    .with_parameter(ParameterSchema::body("settings"))
            }
        };
        endpoint.named(self.name())
    }

    fn params(&self) -> ProxyParams {
        match self {
            DropboxCall::ListFolder {
                path,
                recursive,
                limit,
            } => ProxyParams::new()
                .body_field("path", path.as_str())
                .body_opt("recursive", *recursive)
                .body_opt("limit", *limit),
            DropboxCall::GetMetadata { path }
            | DropboxCall::DownloadFile { path }
            | DropboxCall::DeleteItem { path } => {
                ProxyParams::new().body_field("path", path.as_str())
            }
            DropboxCall::UploadFile { path, content } => ProxyParams::new()
                .body_field("path", path.as_str())
                .body_field("content", content.as_str()),
            DropboxCall::CreateFolder { path, autorename } => ProxyParams::new()
                .body_field("path", path.as_str())
                .body_opt("autorename", *autorename),
            DropboxCall::MoveItem {
                from_path,
                to_path,
                autorename,
            } => ProxyParams::new()
                .body_field("from_path", from_path.as_str())
                .body_field("to_path", to_path.as_str())
                .body_opt("autorename", *autorename),
            DropboxCall::SearchFiles { query, options } => ProxyParams::new()
                .body_field("query", query.as_str())
                .body_opt("options", options.clone()),
            DropboxCall::CreateSharedLink { path, settings } => ProxyParams::new()
                .body_field("path", path.as_str())
                .body_opt("settings", settings.clone()),
        }
    }
}

fn rpc(path: &str) -> EndpointConfig {
    EndpointConfig::new(HttpMethod::Post, path)
}

/// Dropbox access through one connection.
#[derive(Debug, Clone)]
pub struct DropboxConnector<B> {
    connection: BoundConnection<B>,
}

impl<B: ProxyBackend> DropboxConnector<B> {
    pub fn new<S: Into<String>>(backend: B, connection_id: S) -> Self {
        Self {
            connection: BoundConnection::new(backend, connection_id, DROPBOX_CONNECTOR_TYPE),
        }
    }

    pub fn connection_id(&self) -> &str {
        self.connection.connection_id()
    }

    pub async fn call(&self, call: &DropboxCall) -> Result<Value, PlatformError> {
        self.connection.call(call).await
    }

    pub async fn list_folder(
        &self,
        path: &str,
        recursive: bool,
    ) -> Result<CloudStorageFileList, PlatformError> {
        let data = self
            .call(&DropboxCall::ListFolder {
                path: path.to_string(),
                recursive: Some(recursive),
                limit: None,
            })
            .await?;
        normalization::dropbox_file_list(&data)
            .map_err(|err| PlatformError::protocol(format!("dropbox list_folder: {}", err)))
    }

    pub async fn get_metadata(&self, path: &str) -> Result<CloudStorageFile, PlatformError> {
        let data = self
            .call(&DropboxCall::GetMetadata {
                path: path.to_string(),
            })
            .await?;
        normalization::dropbox_file(&data)
            .map_err(|err| PlatformError::protocol(format!("dropbox get_metadata: {}", err)))
    }

    pub async fn search(&self, query: &str) -> Result<CloudStorageFileList, PlatformError> {
        let data = self
            .call(&DropboxCall::SearchFiles {
                query: query.to_string(),
                options: None,
            })
            .await?;
        normalization::dropbox_search_results(&data)
            .map_err(|err| PlatformError::protocol(format!("dropbox search_files: {}", err)))
    }

    /// Download a file's bytes.
    pub async fn download(&self, path: &str) -> Result<Vec<u8>, PlatformError> {
        let data = self
            .call(&DropboxCall::DownloadFile {
                path: path.to_string(),
            })
            .await?;
        BinaryContent::from_data(data)?.decode()
    }

    pub async fn create_folder(&self, path: &str) -> Result<Value, PlatformError> {
        self.call(&DropboxCall::CreateFolder {
            path: path.to_string(),
            autorename: None,
        })
        .await
    }

    pub async fn delete(&self, path: &str) -> Result<Value, PlatformError> {
        self.call(&DropboxCall::DeleteItem {
            path: path.to_string(),
        })
        .await
    }

    pub async fn move_item(&self, from_path: &str, to_path: &str) -> Result<Value, PlatformError> {
        self.call(&DropboxCall::MoveItem {
            from_path: from_path.to_string(),
            to_path: to_path.to_string(),
            autorename: None,
        })
        .await
    }

    /// Create a shared link and return its URL.
    pub async fn create_shared_link(&self, path: &str) -> Result<String, PlatformError> {
        let data = self
            .call(&DropboxCall::CreateSharedLink {
                path: path.to_string(),
                settings: None,
            })
            .await?;
        data.get("url")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| PlatformError::protocol("dropbox shared link response has no url"))
    }
}
