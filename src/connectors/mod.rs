//! Connectors module
//!
//! Typed endpoint catalogues for the connector types the platform ships:
//! - The `EndpointCall` trait every catalogue entry implements
//! - `BoundConnection`, which runs calls for one connection id
//! - Gmail, Dropbox and OneDrive call enums plus thin connector wrappers

pub mod dropbox;
pub mod gmail;
pub mod onedrive;
pub mod trait_;

pub use dropbox::{DROPBOX_CONNECTOR_TYPE, DropboxCall, DropboxConnector};
pub use gmail::{GMAIL_CONNECTOR_TYPE, GmailCall, GmailConnector};
pub use onedrive::{ONEDRIVE_CONNECTOR_TYPE, OneDriveCall, OneDriveConnector};
pub use trait_::{BoundConnection, EndpointCall};
