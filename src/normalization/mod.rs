//! Mapping of connector payloads onto common data models.
//!
//! Proxied calls return the upstream service's own JSON. The functions here
//! turn the payloads of list/get endpoints into [`CloudStorageFile`] and
//! [`EmailMessage`] records so callers can treat Dropbox and OneDrive (or any
//! mail service) alike. Payloads of other endpoints are left untouched.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use thiserror::Error;

use crate::models::parse_timestamp;

/// Family of common models a connector type normalizes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataCategory {
    CloudStorage,
    Email,
}

impl DataCategory {
    pub const fn as_str(self) -> &'static str {
        match self {
            DataCategory::CloudStorage => "cloud_storage",
            DataCategory::Email => "email",
        }
    }

    /// Category of a connector type, if it has a normalizer.
    pub fn for_connector(connector_type: &str) -> Option<Self> {
        match connector_type {
            "dropbox" | "onedrive" => Some(DataCategory::CloudStorage),
            "gmail" => Some(DataCategory::Email),
            _ => None,
        }
    }
}

impl fmt::Display for DataCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur while mapping connector payloads to common models.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NormalizationError {
    #[error("connector type not supported: {0}")]
    ConnectorNotSupported(String),
    #[error("endpoint has no common model: {0}")]
    EndpointNotSupported(String),
    #[error("payload missing required field: {field}")]
    MissingField { field: &'static str },
    #[error("payload is not a JSON object")]
    NotAnObject,
}

/// File or folder of a cloud storage service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudStorageFile {
    pub id: String,
    pub name: String,
    pub path: String,
    /// "file" or "folder" (Dropbox may also report "deleted")
    #[serde(rename = "type")]
    pub kind: String,
    pub size: Option<u64>,
    pub created_at: Option<DateTime<Utc>>,
    pub modified_at: Option<DateTime<Utc>>,
    pub mime_type: Option<String>,
    pub is_folder: bool,
    pub parent_id: Option<String>,
    pub download_url: Option<String>,
    pub shared: bool,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudStorageFileList {
    pub files: Vec<CloudStorageFile>,
    pub total_count: usize,
    pub has_more: bool,
    pub next_cursor: Option<String>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

/// Mail message. List endpoints only carry ids, so list entries have empty
/// subject and addresses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub id: String,
    pub thread_id: Option<String>,
    pub subject: String,
    pub from_address: String,
    pub to_addresses: Vec<String>,
    pub cc_addresses: Option<Vec<String>>,
    pub snippet: Option<String>,
    pub received_at: Option<DateTime<Utc>>,
    pub labels: Vec<String>,
    pub is_read: bool,
    pub is_starred: bool,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailMessageList {
    pub messages: Vec<EmailMessage>,
    pub total_count: u64,
    pub has_more: bool,
    pub next_page_token: Option<String>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

/// Result of [`normalize`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Normalized {
    File(CloudStorageFile),
    FileList(CloudStorageFileList),
    Message(EmailMessage),
    MessageList(EmailMessageList),
}

/// Normalize the payload of `endpoint` for `connector_type`.
pub fn normalize(
    connector_type: &str,
    endpoint: &str,
    payload: &Value,
) -> Result<Normalized, NormalizationError> {
    match (connector_type, endpoint) {
        ("onedrive", "list_files" | "search_files") => {
            onedrive_file_list(payload).map(Normalized::FileList)
        }
        ("onedrive", "get_file") => onedrive_file(payload).map(Normalized::File),
        ("dropbox", "list_folder") => dropbox_file_list(payload).map(Normalized::FileList),
        ("dropbox", "search_files") => dropbox_search_results(payload).map(Normalized::FileList),
        ("dropbox", "get_metadata") => dropbox_file(payload).map(Normalized::File),
        ("gmail", "list_messages") => gmail_message_list(payload).map(Normalized::MessageList),
        ("gmail", "get_message") => gmail_message(payload).map(Normalized::Message),
        (other, _) if DataCategory::for_connector(other).is_none() => {
            Err(NormalizationError::ConnectorNotSupported(other.to_string()))
        }
        (_, endpoint) => Err(NormalizationError::EndpointNotSupported(endpoint.to_string())),
    }
}

fn as_object(payload: &Value) -> Result<&Map<String, Value>, NormalizationError> {
    payload.as_object().ok_or(NormalizationError::NotAnObject)
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

fn str_at(value: &Value, pointer: &str) -> Option<String> {
    value.pointer(pointer).and_then(Value::as_str).map(str::to_string)
}

fn timestamp_field(value: &Value, key: &str) -> Option<DateTime<Utc>> {
    value.get(key).and_then(Value::as_str).and_then(parse_timestamp)
}

fn connector_metadata(connector: &str, raw_count: usize) -> Map<String, Value> {
    let mut metadata = Map::new();
    metadata.insert("connector".to_string(), json!(connector));
    metadata.insert("raw_count".to_string(), json!(raw_count));
    metadata
}

/// Map a OneDrive `driveItem`.
pub fn onedrive_file(item: &Value) -> Result<CloudStorageFile, NormalizationError> {
    as_object(item)?;
    let id = str_field(item, "id").ok_or(NormalizationError::MissingField { field: "id" })?;
    let name = str_field(item, "name").unwrap_or_default();
    let parent_path = str_at(item, "/parentReference/path").unwrap_or_default();
    let is_folder = item.get("folder").is_some();

    let mut metadata = Map::new();
    metadata.insert("web_url".to_string(), json!(str_field(item, "webUrl")));
    metadata.insert(
        "created_by".to_string(),
        json!(str_at(item, "/createdBy/user/displayName")),
    );
    metadata.insert(
        "modified_by".to_string(),
        json!(str_at(item, "/lastModifiedBy/user/displayName")),
    );

    Ok(CloudStorageFile {
        path: format!("{}/{}", parent_path, name),
        id,
        kind: (if item.get("file").is_some() { "file" } else { "folder" }).to_string(),
        size: item.get("size").and_then(Value::as_u64),
        created_at: timestamp_field(item, "createdDateTime"),
        modified_at: timestamp_field(item, "lastModifiedDateTime"),
        mime_type: str_at(item, "/file/mimeType"),
        is_folder,
        parent_id: str_at(item, "/parentReference/id"),
        download_url: str_field(item, "@microsoft.graph.downloadUrl"),
        shared: item.get("shared").is_some_and(|v| !v.is_null()),
        metadata,
        name,
    })
}

/// Map a OneDrive collection (`{value: [...], @odata.nextLink}`).
pub fn onedrive_file_list(payload: &Value) -> Result<CloudStorageFileList, NormalizationError> {
    as_object(payload)?;
    let items = payload
        .get("value")
        .and_then(Value::as_array)
        .ok_or(NormalizationError::MissingField { field: "value" })?;
    let files = items
        .iter()
        .map(onedrive_file)
        .collect::<Result<Vec<_>, _>>()?;
    let next_cursor = str_field(payload, "@odata.nextLink");

    Ok(CloudStorageFileList {
        total_count: files.len(),
        has_more: next_cursor.is_some(),
        next_cursor,
        metadata: connector_metadata("onedrive", items.len()),
        files,
    })
}

/// Map a Dropbox metadata entry.
pub fn dropbox_file(entry: &Value) -> Result<CloudStorageFile, NormalizationError> {
    as_object(entry)?;
    let tag = str_field(entry, ".tag").unwrap_or_else(|| "file".to_string());
    let path_display = str_field(entry, "path_display").unwrap_or_default();
    let id = str_field(entry, "id").unwrap_or_else(|| path_display.clone());
    if id.is_empty() {
        return Err(NormalizationError::MissingField { field: "id" });
    }

    let parent_id = str_field(entry, "path_lower").and_then(|lower| {
        lower
            .rsplit_once('/')
            .map(|(parent, _)| parent.to_string())
    });

    let modified_at = timestamp_field(entry, "client_modified")
        .or_else(|| timestamp_field(entry, "server_modified"));

    let mut metadata = Map::new();
    metadata.insert("rev".to_string(), json!(str_field(entry, "rev")));
    metadata.insert(
        "content_hash".to_string(),
        json!(str_field(entry, "content_hash")),
    );

    Ok(CloudStorageFile {
        id,
        name: str_field(entry, "name").unwrap_or_default(),
        path: path_display,
        is_folder: tag == "folder",
        kind: tag,
        size: entry.get("size").and_then(Value::as_u64),
        created_at: None,
        modified_at,
        mime_type: None,
        parent_id,
        download_url: None,
        shared: entry.get("sharing_info").is_some_and(|v| !v.is_null()),
        metadata,
    })
}

/// Map a Dropbox folder listing (`{entries, has_more, cursor}`).
pub fn dropbox_file_list(payload: &Value) -> Result<CloudStorageFileList, NormalizationError> {
    as_object(payload)?;
    let entries = payload
        .get("entries")
        .and_then(Value::as_array)
        .ok_or(NormalizationError::MissingField { field: "entries" })?;
    let files = entries
        .iter()
        .map(dropbox_file)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CloudStorageFileList {
        total_count: files.len(),
        has_more: payload
            .get("has_more")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        next_cursor: str_field(payload, "cursor"),
        metadata: connector_metadata("dropbox", entries.len()),
        files,
    })
}

/// Map Dropbox `search_v2` results (`{matches: [{metadata: {metadata: ..}}]}`).
pub fn dropbox_search_results(payload: &Value) -> Result<CloudStorageFileList, NormalizationError> {
    as_object(payload)?;
    let matches = payload
        .get("matches")
        .and_then(Value::as_array)
        .ok_or(NormalizationError::MissingField { field: "matches" })?;
    let files = matches
        .iter()
        .filter_map(|m| m.pointer("/metadata/metadata"))
        .map(dropbox_file)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CloudStorageFileList {
        total_count: files.len(),
        has_more: payload
            .get("has_more")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        next_cursor: str_field(payload, "cursor"),
        metadata: connector_metadata("dropbox", matches.len()),
        files,
    })
}

/// Map a Gmail message list. Entries only carry ids.
pub fn gmail_message_list(payload: &Value) -> Result<EmailMessageList, NormalizationError> {
    as_object(payload)?;
    let entries: &[Value] = match payload.get("messages") {
        Some(Value::Array(entries)) => entries.as_slice(),
        // An empty mailbox omits the field.
        _ => &[],
    };

    let messages = entries
        .iter()
        .map(|entry| {
            let id = str_field(entry, "id").unwrap_or_default();
            let mut metadata = Map::new();
            metadata.insert("gmail_id".to_string(), json!(id));
            EmailMessage {
                thread_id: str_field(entry, "threadId"),
                subject: String::new(),
                from_address: String::new(),
                to_addresses: Vec::new(),
                cc_addresses: None,
                snippet: None,
                received_at: None,
                labels: Vec::new(),
                is_read: false,
                is_starred: false,
                metadata,
                id,
            }
        })
        .collect::<Vec<_>>();

    let next_page_token = str_field(payload, "nextPageToken");
    let total_count = payload
        .get("resultSizeEstimate")
        .and_then(Value::as_u64)
        .unwrap_or(messages.len() as u64);

    let mut metadata = Map::new();
    metadata.insert("connector".to_string(), json!("gmail"));

    Ok(EmailMessageList {
        total_count,
        has_more: next_page_token.is_some(),
        next_page_token,
        metadata,
        messages,
    })
}

/// Map a full Gmail message resource.
pub fn gmail_message(message: &Value) -> Result<EmailMessage, NormalizationError> {
    as_object(message)?;
    let id = str_field(message, "id").ok_or(NormalizationError::MissingField { field: "id" })?;

    let header = |name: &str| -> Option<String> {
        message
            .pointer("/payload/headers")
            .and_then(Value::as_array)?
            .iter()
            .find(|h| {
                h.get("name")
                    .and_then(Value::as_str)
                    .is_some_and(|n| n.eq_ignore_ascii_case(name))
            })
            .and_then(|h| str_field(h, "value"))
    };

    let labels: Vec<String> = message
        .get("labelIds")
        .and_then(Value::as_array)
        .map(|ids| {
            ids.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let mut metadata = Map::new();
    metadata.insert("gmail_id".to_string(), json!(id));
    metadata.insert("history_id".to_string(), json!(str_field(message, "historyId")));
    metadata.insert(
        "internal_date".to_string(),
        json!(str_field(message, "internalDate")),
    );

    Ok(EmailMessage {
        thread_id: str_field(message, "threadId"),
        subject: header("Subject").unwrap_or_default(),
        from_address: header("From").unwrap_or_default(),
        to_addresses: split_addresses(header("To")),
        cc_addresses: header("Cc").map(|cc| split_addresses(Some(cc))),
        snippet: str_field(message, "snippet"),
        received_at: header("Date").as_deref().and_then(parse_mail_date),
        is_read: !labels.iter().any(|l| l == "UNREAD"),
        is_starred: labels.iter().any(|l| l == "STARRED"),
        labels,
        metadata,
        id,
    })
}

fn split_addresses(raw: Option<String>) -> Vec<String> {
    raw.map(|value| {
        value
            .split(',')
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

/// Parse an RFC 2822 `Date` header. Gmail appends a zone comment such as
/// `(UTC)`, which chrono rejects, so it is stripped first.
fn parse_mail_date(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = match raw.find(" (") {
        Some(index) => &raw[..index],
        None => raw,
    };
    DateTime::parse_from_rfc2822(trimmed.trim())
        .ok()
        .map(|date| date.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn onedrive_list_maps_items() {
        let payload = json!({
            "value": [
                {
                    "id": "01ABC",
                    "name": "report.pdf",
                    "size": 1024,
                    "createdDateTime": "2024-03-01T09:00:00Z",
                    "lastModifiedDateTime": "2024-03-02T09:00:00Z",
                    "file": {"mimeType": "application/pdf"},
                    "parentReference": {"id": "01ROOT", "path": "/drive/root:"},
                    "@microsoft.graph.downloadUrl": "https://download.example.com/01ABC",
                    "createdBy": {"user": {"displayName": "Ada"}}
                },
                {"id": "01DEF", "name": "Photos", "folder": {"childCount": 3}}
            ],
            "@odata.nextLink": "https://graph.microsoft.com/v1.0/me/drive/root/children?$skiptoken=x"
        });

        let list = onedrive_file_list(&payload).unwrap();
        assert_eq!(list.total_count, 2);
        assert!(list.has_more);

        let file = &list.files[0];
        assert_eq!(file.path, "/drive/root:/report.pdf");
        assert_eq!(file.kind, "file");
        assert_eq!(file.mime_type.as_deref(), Some("application/pdf"));
        assert_eq!(file.parent_id.as_deref(), Some("01ROOT"));
        assert_eq!(file.metadata["created_by"], json!("Ada"));
        assert!(file.modified_at.is_some());

        let folder = &list.files[1];
        assert!(folder.is_folder);
        assert_eq!(folder.kind, "folder");
    }

    #[test]
    fn dropbox_listing_maps_entries() {
        let payload = json!({
            "entries": [
                {
                    ".tag": "file",
                    "id": "id:a4ayc_80_OEAAAAAAAAAXw",
                    "name": "Prime_Numbers.txt",
                    "path_lower": "/homework/math/prime_numbers.txt",
                    "path_display": "/Homework/math/Prime_Numbers.txt",
                    "client_modified": "2015-05-12T15:50:38Z",
                    "rev": "a1c10ce0dd78",
                    "size": 7212,
                    "sharing_info": {"read_only": true}
                },
                {
                    ".tag": "folder",
                    "id": "id:folder",
                    "name": "math",
                    "path_lower": "/homework/math",
                    "path_display": "/Homework/math"
                }
            ],
            "cursor": "ZtkX9_EHj3x7PMkVuFIhwKYXEpwpLwyxp9vMKomUhllil9q7eWiAu",
            "has_more": false
        });

        let list = dropbox_file_list(&payload).unwrap();
        assert_eq!(list.total_count, 2);
        assert!(!list.has_more);
        assert!(list.next_cursor.is_some());

        let file = &list.files[0];
        assert_eq!(file.parent_id.as_deref(), Some("/homework/math"));
        assert!(file.shared);
        assert_eq!(file.metadata["rev"], json!("a1c10ce0dd78"));
        assert!(list.files[1].is_folder);
    }

    #[test]
    fn gmail_message_reads_headers_and_labels() {
        let payload = json!({
            "id": "18c2",
            "threadId": "18c1",
            "labelIds": ["INBOX", "STARRED"],
            "snippet": "Quarterly numbers attached",
            "historyId": "9876",
            "payload": {
                "headers": [
                    {"name": "Subject", "value": "Q3 report"},
                    {"name": "From", "value": "ada@example.com"},
                    {"name": "To", "value": "bob@example.com, carol@example.com"},
                    {"name": "Date", "value": "Tue, 1 Oct 2024 10:15:00 +0000 (UTC)"}
                ]
            }
        });

        let message = gmail_message(&payload).unwrap();
        assert_eq!(message.subject, "Q3 report");
        assert_eq!(message.to_addresses, vec!["bob@example.com", "carol@example.com"]);
        assert!(message.cc_addresses.is_none());
        assert!(message.is_read);
        assert!(message.is_starred);
        assert_eq!(
            message.received_at.map(|d| d.to_rfc3339()),
            Some("2024-10-01T10:15:00+00:00".to_string())
        );
    }

    #[test]
    fn gmail_list_handles_empty_mailbox() {
        let list = gmail_message_list(&json!({"resultSizeEstimate": 0})).unwrap();
        assert!(list.messages.is_empty());
        assert!(!list.has_more);
        assert_eq!(list.total_count, 0);
    }

    #[test]
    fn normalize_dispatches_and_rejects_unknown() {
        let payload = json!({"messages": [{"id": "a", "threadId": "t"}], "nextPageToken": "p2"});
        match normalize("gmail", "list_messages", &payload).unwrap() {
            Normalized::MessageList(list) => {
                assert_eq!(list.messages[0].id, "a");
                assert!(list.has_more);
            }
            other => panic!("unexpected {:?}", other),
        }

        assert_eq!(
            normalize("slack", "list_messages", &payload),
            Err(NormalizationError::ConnectorNotSupported("slack".to_string()))
        );
        assert_eq!(
            normalize("gmail", "send_message", &payload),
            Err(NormalizationError::EndpointNotSupported("send_message".to_string()))
        );
        assert_eq!(
            normalize("dropbox", "list_folder", &json!([])),
            Err(NormalizationError::NotAnObject)
        );
    }
}
