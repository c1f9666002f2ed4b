//! Connector type descriptors
//!
//! Describes the categories of third-party services exposed by the platform's
//! connector registry.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Authentication type required by a connector type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AuthType {
    /// OAuth 2.0 authorization code flow
    OAuth2,
    /// API key authentication
    ApiKey,
    /// Basic authentication (username/password)
    Basic,
    /// Any other scheme the platform reports
    Custom(String),
}

impl AuthType {
    pub fn as_str(&self) -> &str {
        match self {
            AuthType::OAuth2 => "oauth2",
            AuthType::ApiKey => "api_key",
            AuthType::Basic => "basic",
            AuthType::Custom(other) => other,
        }
    }
}

impl fmt::Display for AuthType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for AuthType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for AuthType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(match raw.as_str() {
            "oauth2" => AuthType::OAuth2,
            "api_key" => AuthType::ApiKey,
            "basic" => AuthType::Basic,
            _ => AuthType::Custom(raw),
        })
    }
}

fn default_version() -> String {
    "1.0.0".to_string()
}

/// Entry returned by `GET /connectors` and `GET /connectors/{name}`.
///
/// The listing carries a flat `auth_type`; the detail route returns the
/// registry entry with the auth type nested under `auth.type`. Both decode to
/// the same descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawDescriptor")]
pub struct ConnectorTypeDescriptor {
    /// Unique identifier of the connector type (e.g. "gmail")
    pub name: String,
    pub display_name: Option<String>,
    pub description: String,
    pub auth_type: Option<AuthType>,
    pub version: String,
}

#[derive(Deserialize)]
struct AuthSection {
    #[serde(default, rename = "type")]
    kind: Option<AuthType>,
}

#[derive(Deserialize)]
struct RawDescriptor {
    name: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    description: String,
    #[serde(default)]
    auth_type: Option<AuthType>,
    #[serde(default)]
    auth: Option<AuthSection>,
    #[serde(default = "default_version")]
    version: String,
}

impl From<RawDescriptor> for ConnectorTypeDescriptor {
    fn from(raw: RawDescriptor) -> Self {
        Self {
            name: raw.name,
            display_name: raw.display_name,
            description: raw.description,
            auth_type: raw.auth_type.or(raw.auth.and_then(|auth| auth.kind)),
            version: raw.version,
        }
    }
}

impl ConnectorTypeDescriptor {
    /// Connections of this type need the authorization-code flow before use.
    pub fn requires_oauth(&self) -> bool {
        matches!(self.auth_type, Some(AuthType::OAuth2))
    }

    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }
}
