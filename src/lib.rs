//! # Connector SDK
//!
//! Client library for a connector platform that owns third-party credentials
//! and per-service endpoint knowledge. Application code creates connections,
//! brings them through OAuth authorization and issues proxied calls; the
//! platform injects credentials and forwards the calls upstream.

pub mod client;
pub mod config;
pub mod connectors;
pub mod directory;
pub mod error;
pub mod models;
pub mod normalization;
pub mod oauth;
pub mod proxy;
pub mod telemetry;
pub mod transport;

pub use client::PlatformClient;
pub use config::{ConfigError, ConfigLoader, SdkConfig};
pub use directory::DirectoryClient;
pub use error::{PlatformError, TransportErrorKind};
pub use oauth::{OAuthCoordinator, OAuthFlow, OAuthFlowState};
pub use proxy::{ProxyBackend, ProxyExecutor};
