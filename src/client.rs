//! Platform client facade.

use crate::config::{ConfigError, SdkConfig};
use crate::connectors::{DropboxConnector, GmailConnector, OneDriveConnector};
use crate::directory::DirectoryClient;
use crate::oauth::{OAuthCoordinator, OAuthFlow};
use crate::proxy::ProxyExecutor;
use crate::transport::PlatformTransport;

/// Directory client, proxy executor and OAuth coordinator sharing one
/// transport to one platform.
#[derive(Debug, Clone)]
pub struct PlatformClient {
    config: SdkConfig,
    directory: DirectoryClient,
    proxy: ProxyExecutor,
    oauth: OAuthCoordinator,
}

impl PlatformClient {
    pub fn new(config: SdkConfig) -> Result<Self, ConfigError> {
        let transport = PlatformTransport::new(&config)?;
        tracing::debug!(api_root = %transport.api_root(), "platform client ready");

        Ok(Self {
            directory: DirectoryClient::new(transport.clone()),
            proxy: ProxyExecutor::new(transport.clone()),
            oauth: OAuthCoordinator::new(transport),
            config,
        })
    }

    pub fn config(&self) -> &SdkConfig {
        &self.config
    }

    pub fn directory(&self) -> &DirectoryClient {
        &self.directory
    }

    pub fn proxy(&self) -> &ProxyExecutor {
        &self.proxy
    }

    pub fn oauth(&self) -> &OAuthCoordinator {
        &self.oauth
    }

    /// Start tracking the authorization of `connection_id`.
    pub fn oauth_flow<S: Into<String>>(&self, connection_id: S) -> OAuthFlow {
        OAuthFlow::new(connection_id)
    }

    pub fn gmail<S: Into<String>>(&self, connection_id: S) -> GmailConnector<ProxyExecutor> {
        GmailConnector::new(self.proxy.clone(), connection_id)
    }

    pub fn dropbox<S: Into<String>>(&self, connection_id: S) -> DropboxConnector<ProxyExecutor> {
        DropboxConnector::new(self.proxy.clone(), connection_id)
    }

    pub fn onedrive<S: Into<String>>(&self, connection_id: S) -> OneDriveConnector<ProxyExecutor> {
        OneDriveConnector::new(self.proxy.clone(), connection_id)
    }
}
