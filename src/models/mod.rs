//! Data models exchanged with the connector platform.

pub mod connection;
pub mod connector_type;
pub mod endpoint;
pub mod envelope;
pub mod oauth;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;

pub use connection::{
    Connection, ConnectionConfig, ConnectionStatus, ConnectionSummary, CreateConnectionRequest,
    DeleteOutcome,
};
pub use connector_type::{AuthType, ConnectorTypeDescriptor};
pub use endpoint::{
    EndpointConfig, HttpMethod, ParameterLocation, ParameterSchema, ProxyParams, ProxyRequest,
    ResponseType,
};
pub use envelope::{ApiResponseEnvelope, BinaryContent, ProxyOutcome};
pub use oauth::{OAuthCompletion, OAuthSession};

/// Parse an RFC 3339 timestamp, or a naive ISO 8601 one assumed to be UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Serde helper for timestamps the platform may send with or without offset.
/// Unparseable values become `None` rather than failing the whole record.
pub(crate) fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_timestamp))
}
