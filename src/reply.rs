use std::sync::Arc;

use tracing::{debug, error};

use crate::mention::{self, MentionSpan};
use crate::message::{ContentMetadata, Message};
use crate::transport::Transport;

/// Metadata key selecting the content kind of an outbound message
pub const ATTR_CONTENT_TYPE: &str = "ATTR_CONTENT_TYPE";

/// What a command handler produced
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Text(String),
    TextWithAnnotations(String, Vec<MentionSpan>),
    /// The handler already did its work; nothing to send
    Silent,
    /// A user-visible error, delivered like a normal reply
    Failure(String),
}

impl Reply {
    /// Text and metadata to send, or `None` for `Silent`
    pub fn into_outbound(self) -> Option<(String, Option<ContentMetadata>)> {
        match self {
            Reply::Text(text) | Reply::Failure(text) => Some((text, None)),
            Reply::TextWithAnnotations(text, spans) => {
                Some((text, Some(mention::to_metadata(&spans))))
            }
            Reply::Silent => None,
        }
    }
}

/// The transport primitive a reply goes out through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendRoute {
    E2eeImage,
    Image,
    E2eeText,
    Text,
}

impl SendRoute {
    pub fn select(message: &Message, metadata: Option<&ContentMetadata>) -> Self {
        let is_image = metadata
            .and_then(|m| m.get(ATTR_CONTENT_TYPE))
            .is_some_and(|kind| kind == "image");

        match (is_image, message.uses_e2ee()) {
            (true, true) => SendRoute::E2eeImage,
            (true, false) => SendRoute::Image,
            (false, true) => SendRoute::E2eeText,
            (false, false) => SendRoute::Text,
        }
    }
}

/// Sends replies back into the conversation a message came from
#[derive(Clone)]
pub struct ReplySender {
    transport: Arc<dyn Transport>,
}

impl ReplySender {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Send `text` (a file path for images) in reply to `message`.
    /// Delivery failures are logged and dropped.
    pub async fn send(&self, message: &Message, text: &str, metadata: Option<&ContentMetadata>) {
        let to = message.to.as_str();
        let route = SendRoute::select(message, metadata);
        debug!("Replying to {} via {:?}", to, route);

        let result = match route {
            SendRoute::E2eeImage => self.transport.send_e2ee_image(to, text).await,
            SendRoute::Image => self.transport.send_image(to, text).await,
            SendRoute::E2eeText => self.transport.send_e2ee_text(to, text, metadata).await,
            SendRoute::Text => self.transport.send_text(to, text, metadata).await,
        };

        if let Err(e) = result {
            error!("Failed to send message to {}: {}", to, e);
        }
    }
}
