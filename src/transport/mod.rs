//! The messaging transport as seen by the command core.
//!
//! Session handling, the wire protocol and E2EE cryptography live behind this
//! trait; the core only needs the operations below.

pub mod http;
#[cfg(test)]
pub mod mock;

use async_trait::async_trait;

use crate::mention;
use crate::message::{Contact, ContentMetadata, InboundEvent, Message};

pub use http::HttpTransport;

/// Result type for transport operations
pub type TransportResult<T> = Result<T, TransportError>;

/// Transport errors
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Transport returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Decryption failed: {0}")]
    Decryption(String),
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Identifier of the logged-in account
    fn self_mid(&self) -> &str;

    /// Wait for the next batch of events (may be empty on poll timeout)
    async fn poll_events(&self) -> TransportResult<Vec<InboundEvent>>;

    /// Server time in epoch milliseconds
    async fn server_time(&self) -> TransportResult<i64>;

    /// Send a contact card for `mid` into conversation `to`
    async fn send_contact(&self, to: &str, mid: &str, display_name: &str) -> TransportResult<()>;

    async fn get_contact(&self, mid: &str) -> TransportResult<Contact>;

    /// Identifiers mentioned in `message`
    fn mentionees(&self, message: &Message) -> Vec<String> {
        mention::mentionees(message)
    }

    /// Fetch this account's registered E2EE key; errors when none exists
    async fn e2ee_self_key(&self) -> TransportResult<()>;

    async fn register_e2ee_self_key(&self) -> TransportResult<()>;

    async fn decrypt_e2ee_text(&self, message: &Message) -> TransportResult<String>;

    async fn send_text(
        &self,
        to: &str,
        text: &str,
        metadata: Option<&ContentMetadata>,
    ) -> TransportResult<()>;

    async fn send_e2ee_text(
        &self,
        to: &str,
        text: &str,
        metadata: Option<&ContentMetadata>,
    ) -> TransportResult<()>;

    /// Upload and send the image at `path`
    async fn send_image(&self, to: &str, path: &str) -> TransportResult<()>;

    async fn send_e2ee_image(&self, to: &str, path: &str) -> TransportResult<()>;
}
