use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Operation type carrying a chat message
pub const OP_MESSAGE: i32 = 25;

/// Plain text content; the only kind eligible for commands
pub const CONTENT_TYPE_PLAIN: i32 = 0;

/// Target kind of the conversations commands are accepted from
pub const TO_TYPE_CHAT: i32 = 2;

/// Metadata key whose presence marks an end-to-end encrypted text
pub const E2EE_VERSION_KEY: &str = "e2eeVersion";

/// Free-form string metadata attached to a message
pub type ContentMetadata = HashMap<String, String>;

/// An event delivered by the transport's event stream
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InboundEvent {
    #[serde(rename = "type")]
    pub op_type: i32,
    #[serde(default)]
    pub message: Option<Message>,
}

/// A chat message as seen by the transport
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Sender identifier
    pub from: String,
    /// Conversation identifier
    pub to: String,
    #[serde(default)]
    pub content_type: i32,
    #[serde(default)]
    pub to_type: i32,
    /// Plaintext body, absent for encrypted messages
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub content_metadata: ContentMetadata,
    #[serde(default)]
    pub chunks: Vec<String>,
    #[serde(default, rename = "isE2EE")]
    pub is_e2ee: bool,
}

impl Message {
    /// Whether the text has to go through the transport's decryption
    pub fn is_encrypted_text(&self) -> bool {
        self.content_metadata
            .get(E2EE_VERSION_KEY)
            .is_some_and(|v| !v.is_empty())
    }

    /// Whether replies to this message must use the E2EE send path
    pub fn uses_e2ee(&self) -> bool {
        self.is_e2ee || !self.chunks.is_empty()
    }
}

/// Directory entry returned by a contact lookup
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub display_name: String,
    pub mid: String,
    #[serde(default)]
    pub status_message: String,
    #[serde(default)]
    pub picture_status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_event_with_camel_case_fields() {
        let raw = r#"{
            "type": 25,
            "message": {
                "from": "u1",
                "to": "c1",
                "contentType": 0,
                "toType": 2,
                "text": "!gid",
                "contentMetadata": {"e2eeVersion": "2"},
                "chunks": ["a", "b"],
                "isE2EE": true
            }
        }"#;
        let event: InboundEvent = serde_json::from_str(raw).unwrap();
        assert_eq!(event.op_type, OP_MESSAGE);
        let msg = event.message.unwrap();
        assert_eq!(msg.from, "u1");
        assert_eq!(msg.to_type, TO_TYPE_CHAT);
        assert!(msg.is_encrypted_text());
        assert!(msg.uses_e2ee());
    }

    #[test]
    fn test_missing_optional_fields_default() {
        let raw = r#"{"type": 26}"#;
        let event: InboundEvent = serde_json::from_str(raw).unwrap();
        assert!(event.message.is_none());

        let msg: Message = serde_json::from_str(r#"{"from": "u1", "to": "c1"}"#).unwrap();
        assert!(msg.text.is_none());
        assert!(!msg.is_encrypted_text());
        assert!(!msg.uses_e2ee());
    }

    #[test]
    fn test_empty_e2ee_version_is_plaintext() {
        let mut msg = Message::default();
        msg.content_metadata
            .insert(E2EE_VERSION_KEY.to_string(), String::new());
        assert!(!msg.is_encrypted_text());
    }

    #[test]
    fn test_chunks_alone_select_e2ee() {
        let msg = Message {
            chunks: vec!["x".to_string()],
            ..Default::default()
        };
        assert!(msg.uses_e2ee());
    }
}
