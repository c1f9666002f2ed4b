//! Connection model
//!
//! A connection binds a user, a connector type and platform-held credentials.
//! The platform owns every mutation; this crate only reads the record.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::lenient_timestamp;
use crate::error::PlatformError;

/// Lifecycle status of a connection as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConnectionStatus {
    Pending,
    Active,
    Error,
    Revoked,
    /// A status string this SDK does not know yet, kept verbatim.
    Unknown(String),
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &str {
        match self {
            ConnectionStatus::Pending => "pending",
            ConnectionStatus::Active => "active",
            ConnectionStatus::Error => "error",
            ConnectionStatus::Revoked => "revoked",
            ConnectionStatus::Unknown(other) => other,
        }
    }

    /// Whether the platform may move a connection from `self` to `next`.
    ///
    /// Progress is monotonic (`pending → active|error → revoked`) with the
    /// single exception of `error → pending` for a retried authorization.
    pub fn can_transition_to(&self, next: &ConnectionStatus) -> bool {
        use ConnectionStatus::*;
        match (self, next) {
            (Unknown(_), _) | (_, Unknown(_)) => false,
            (current, next) if current == next => true,
            (Pending, Active | Error | Revoked) => true,
            (Active, Error | Revoked) => true,
            (Error, Pending | Active | Revoked) => true,
            _ => false,
        }
    }

    pub fn is_usable(&self) -> bool {
        matches!(self, ConnectionStatus::Active)
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for ConnectionStatus {
    fn from(value: &str) -> Self {
        match value {
            "pending" => ConnectionStatus::Pending,
            "active" => ConnectionStatus::Active,
            "error" => ConnectionStatus::Error,
            "revoked" => ConnectionStatus::Revoked,
            other => ConnectionStatus::Unknown(other.to_string()),
        }
    }
}

impl Serialize for ConnectionStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ConnectionStatus {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(ConnectionStatus::from(raw.as_str()))
    }
}

/// Connector-type-specific configuration attached to a connection.
///
/// Always a JSON object. Building one from typed settings fails locally when
/// the settings do not serialize to an object, before any network call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionConfig(Map<String, Value>);

impl ConnectionConfig {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Serialize typed settings into a connection config.
    pub fn from_settings<T: Serialize>(settings: &T) -> Result<Self, PlatformError> {
        let value = serde_json::to_value(settings).map_err(|err| PlatformError::InvalidConfig {
            message: format!("settings could not be serialized: {}", err),
        })?;
        Self::try_from(value)
    }

    /// Read the config back as typed settings.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, PlatformError> {
        serde_json::from_value(Value::Object(self.0.clone())).map_err(|err| {
            PlatformError::InvalidConfig {
                message: err.to_string(),
            }
        })
    }

    pub fn insert<K: Into<String>, V: Into<Value>>(mut self, key: K, value: V) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl TryFrom<Value> for ConnectionConfig {
    type Error = PlatformError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            Value::Null => Ok(Self::new()),
            other => Err(PlatformError::InvalidConfig {
                message: format!("connection config must be a JSON object, got {}", other),
            }),
        }
    }
}

impl From<Map<String, Value>> for ConnectionConfig {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

fn null_as_empty_config<'de, D>(deserializer: D) -> Result<ConnectionConfig, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<ConnectionConfig>::deserialize(deserializer)?.unwrap_or_default())
}

/// Connection record returned by `GET /connections/{id}` and `POST /connections`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub id: String,
    pub connector_type: String,
    pub name: String,
    pub user_id: String,
    pub status: ConnectionStatus,
    #[serde(default, deserialize_with = "null_as_empty_config")]
    pub config: ConnectionConfig,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_timestamp"
    )]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_timestamp"
    )]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Reduced record returned when listing a user's connections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionSummary {
    pub id: String,
    pub connector_type: String,
    pub name: String,
    pub status: ConnectionStatus,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_timestamp"
    )]
    pub created_at: Option<DateTime<Utc>>,
}

/// Body of `POST /connections`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateConnectionRequest<'a> {
    pub connector_type: &'a str,
    pub name: &'a str,
    pub user_id: &'a str,
    pub config: &'a ConnectionConfig,
}

/// Result of an idempotent delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The platform removed the connection on this call.
    Deleted,
    /// The connection was already revoked or never existed.
    AlreadyGone,
}
