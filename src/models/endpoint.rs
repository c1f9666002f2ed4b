//! Endpoint descriptions and proxy request payloads
//!
//! An [`EndpointConfig`] says *what* remote operation to invoke. It never
//! carries authentication material; the platform injects that from the
//! connection's stored credentials.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::PlatformError;

static PATH_PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder pattern is valid")
});

/// HTTP method of the upstream call. Serialized upper case; decoded in any case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// Methods for which the platform forwards a JSON body upstream.
    pub fn carries_body(&self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for HttpMethod {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for HttpMethod {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

impl std::str::FromStr for HttpMethod {
    type Err = PlatformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "PATCH" => Ok(HttpMethod::Patch),
            "DELETE" => Ok(HttpMethod::Delete),
            other => Err(PlatformError::invalid_request(format!(
                "unsupported HTTP method '{}'",
                other
            ))),
        }
    }
}

/// Where a parameter travels in the upstream request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    #[default]
    Query,
    Path,
    Header,
    Body,
}

/// Declared parameter of an endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSchema {
    pub name: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default)]
    pub location: ParameterLocation,
}

impl ParameterSchema {
    fn new(name: &str, location: ParameterLocation, required: bool) -> Self {
        Self {
            name: name.to_string(),
            kind: None,
            required,
            description: String::new(),
            location,
        }
    }

    pub fn path(name: &str) -> Self {
        Self::new(name, ParameterLocation::Path, true)
    }

    pub fn query(name: &str) -> Self {
        Self::new(name, ParameterLocation::Query, false)
    }

    pub fn required_query(name: &str) -> Self {
        Self::new(name, ParameterLocation::Query, true)
    }

    pub fn body(name: &str) -> Self {
        Self::new(name, ParameterLocation::Body, false)
    }

    pub fn required_body(name: &str) -> Self {
        Self::new(name, ParameterLocation::Body, true)
    }
}

/// How the platform should render the upstream response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    #[default]
    Json,
    Binary,
    Text,
}

/// Connector-type-specific description of one remote operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub method: HttpMethod,
    pub path: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<ParameterSchema>,
    #[serde(default)]
    pub response_type: ResponseType,
}

impl EndpointConfig {
    pub fn new<P: Into<String>>(method: HttpMethod, path: P) -> Self {
        Self {
            name: None,
            method,
            path: path.into(),
            headers: BTreeMap::new(),
            parameters: Vec::new(),
            response_type: ResponseType::Json,
        }
    }

    pub fn named<N: Into<String>>(mut self, name: N) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_header<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn with_parameter(mut self, parameter: ParameterSchema) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn with_response_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = response_type;
        self
    }

    /// Placeholder names in the path template, in order of appearance.
    pub fn path_placeholders(&self) -> Vec<&str> {
        PATH_PLACEHOLDER
            .captures_iter(&self.path)
            .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
            .collect()
    }

    /// Check the call parameters against the endpoint before anything is sent.
    pub fn validate(&self, params: &ProxyParams) -> Result<(), PlatformError> {
        if !self.path.starts_with('/') {
            return Err(PlatformError::invalid_request(format!(
                "endpoint path '{}' must start with '/'",
                self.path
            )));
        }

        for placeholder in self.path_placeholders() {
            if !has_value(params.path_params.as_ref(), placeholder) {
                return Err(PlatformError::invalid_request(format!(
                    "missing path parameter '{}' for {} {}",
                    placeholder, self.method, self.path
                )));
            }
        }

        for parameter in self.parameters.iter().filter(|p| p.required) {
            let source = match parameter.location {
                ParameterLocation::Query => params.params.as_ref(),
                ParameterLocation::Path => params.path_params.as_ref(),
                ParameterLocation::Body => params.body.as_ref(),
                // Header values come from the endpoint's static headers.
                ParameterLocation::Header => continue,
            };
            if !has_value(source, &parameter.name) {
                return Err(PlatformError::invalid_request(format!(
                    "missing required {:?} parameter '{}'",
                    parameter.location, parameter.name
                )));
            }
        }

        if params.body.is_some() && !self.method.carries_body() {
            tracing::debug!(
                method = %self.method,
                path = %self.path,
                "request body supplied for a method without body; the platform will drop it"
            );
        }

        Ok(())
    }
}

fn has_value(map: Option<&Map<String, Value>>, key: &str) -> bool {
    map.and_then(|m| m.get(key)).is_some_and(|v| !v.is_null())
}

/// Optional query, body and path parameters of one proxied call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProxyParams {
    pub params: Option<Map<String, Value>>,
    pub body: Option<Map<String, Value>>,
    pub path_params: Option<Map<String, Value>>,
}

impl ProxyParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query<K: Into<String>, V: Into<Value>>(mut self, key: K, value: V) -> Self {
        self.params
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn body_field<K: Into<String>, V: Into<Value>>(mut self, key: K, value: V) -> Self {
        self.body
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn path<K: Into<String>, V: Into<Value>>(mut self, key: K, value: V) -> Self {
        self.path_params
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }

    /// Add a query parameter only when a value is present.
    pub fn query_opt<K: Into<String>, V: Into<Value>>(self, key: K, value: Option<V>) -> Self {
        match value {
            Some(value) => self.query(key, value),
            None => self,
        }
    }

    /// Add a body field only when a value is present.
    pub fn body_opt<K: Into<String>, V: Into<Value>>(self, key: K, value: Option<V>) -> Self {
        match value {
            Some(value) => self.body_field(key, value),
            None => self,
        }
    }
}

/// Body of `POST /proxy/execute`.
#[derive(Debug, Clone, Serialize)]
pub struct ProxyRequest<'a> {
    pub connection_id: &'a str,
    pub endpoint_config: &'a EndpointConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<&'a Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<&'a Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path_params: Option<&'a Map<String, Value>>,
}

impl<'a> ProxyRequest<'a> {
    pub fn new(
        connection_id: &'a str,
        endpoint_config: &'a EndpointConfig,
        params: &'a ProxyParams,
    ) -> Self {
        Self {
            connection_id,
            endpoint_config,
            params: params.params.as_ref(),
            body: params.body.as_ref(),
            path_params: params.path_params.as_ref(),
        }
    }
}
