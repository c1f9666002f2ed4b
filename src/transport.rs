//! HTTP transport to the connector platform.
//!
//! Every byte the SDK sends leaves through [`PlatformTransport`]. It owns one
//! `reqwest::Client` configured from [`SdkConfig`], attaches a correlation id
//! to each request and hands back the raw status and body. Interpreting the
//! body is left to the calling component.

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::Instrument;
use url::Url;

use crate::config::{ConfigError, SdkConfig};
use crate::error::{PlatformError, platform_message};
use crate::telemetry;

/// Header carrying the per-request correlation id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Status and body of a platform response.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode the body as JSON. Any failure is a protocol error.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, PlatformError> {
        serde_json::from_slice(&self.body).map_err(|err| {
            PlatformError::protocol(format!(
                "undecodable platform response (status {}): {}",
                self.status, err
            ))
        })
    }

    /// Human-readable platform message extracted from the body.
    pub fn message(&self) -> String {
        platform_message(&self.body)
    }
}

/// Shared HTTP client bound to one platform.
///
/// Cloning is cheap and clones share the connection pool.
#[derive(Debug, Clone)]
pub struct PlatformTransport {
    client: reqwest::Client,
    api_root: Url,
}

impl PlatformTransport {
    pub fn new(config: &SdkConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let api_root = config.api_root()?;

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self { client, api_root })
    }

    pub fn api_root(&self) -> &Url {
        &self.api_root
    }

    /// Resolve path segments against the API root. Each segment is
    /// percent-encoded, so ids can never escape their position in the path.
    pub fn url(&self, segments: &[&str]) -> Result<Url, PlatformError> {
        let mut url = self.api_root.clone();
        url.path_segments_mut()
            .map_err(|_| {
                PlatformError::invalid_request(format!(
                    "platform url '{}' cannot carry a path",
                    self.api_root
                ))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub async fn get(
        &self,
        segments: &[&str],
        query: &[(&str, &str)],
    ) -> Result<RawResponse, PlatformError> {
        let url = self.url(segments)?;
        let request = self.client.get(url).query(query);
        self.send("GET", request).await
    }

    pub async fn post_json<B: Serialize + ?Sized>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> Result<RawResponse, PlatformError> {
        let url = self.url(segments)?;
        let request = self.client.post(url).json(body);
        self.send("POST", request).await
    }

    pub async fn delete(&self, segments: &[&str]) -> Result<RawResponse, PlatformError> {
        let url = self.url(segments)?;
        let request = self.client.delete(url);
        self.send("DELETE", request).await
    }

    async fn send(
        &self,
        method: &'static str,
        request: reqwest::RequestBuilder,
    ) -> Result<RawResponse, PlatformError> {
        let request_id = telemetry::request_id();
        let request = request.header(REQUEST_ID_HEADER, &request_id).build()?;

        let span = tracing::debug_span!(
            "platform_request",
            method,
            path = %request.url().path(),
            request_id = %request_id,
        );

        async {
            let response = match self.client.execute(request).await {
                Ok(response) => response,
                Err(err) => {
                    let error = PlatformError::from(err);
                    tracing::warn!(error = %error, "platform request failed");
                    return Err(error);
                }
            };

            let status = response.status().as_u16();
            let body = response.bytes().await?.to_vec();
            tracing::debug!(status, bytes = body.len(), "platform responded");

            Ok(RawResponse { status, body })
        }
        .instrument(span)
        .await
    }
}
