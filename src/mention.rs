//! Mention annotations.
//!
//! Mentions travel in a message's content metadata under the `MENTION` key as
//! a JSON document: `{"MENTIONEES":[{"S":"0","E":"5","M":"u..."}]}`, where
//! `S`/`E` are character offsets of the highlighted substring and `M` is the
//! mentioned identifier.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::message::{ContentMetadata, Message};

pub const MENTION_KEY: &str = "MENTION";

/// Which substring of a reply highlights which user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MentionSpan {
    pub start: usize,
    pub length: usize,
    pub target: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct MentionData {
    #[serde(rename = "MENTIONEES", default)]
    mentionees: Vec<Mentionee>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Mentionee {
    #[serde(rename = "S", default, skip_serializing_if = "Option::is_none")]
    start: Option<String>,
    #[serde(rename = "E", default, skip_serializing_if = "Option::is_none")]
    end: Option<String>,
    #[serde(rename = "M")]
    mid: String,
}

/// Identifiers mentioned in a message, in the order they were annotated.
///
/// Malformed mention metadata is logged and treated as no mentions.
pub fn mentionees(message: &Message) -> Vec<String> {
    let Some(raw) = message.content_metadata.get(MENTION_KEY) else {
        return Vec::new();
    };

    match serde_json::from_str::<MentionData>(raw) {
        Ok(data) => data.mentionees.into_iter().map(|m| m.mid).collect(),
        Err(e) => {
            warn!("Ignoring malformed mention metadata: {}", e);
            Vec::new()
        }
    }
}

/// Encode spans as outbound content metadata
pub fn to_metadata(spans: &[MentionSpan]) -> ContentMetadata {
    let data = MentionData {
        mentionees: spans
            .iter()
            .map(|span| Mentionee {
                start: Some(span.start.to_string()),
                end: Some((span.start + span.length).to_string()),
                mid: span.target.clone(),
            })
            .collect(),
    };

    // Serializing plain strings into a JSON object cannot fail
    let encoded = serde_json::to_string(&data).unwrap_or_default();
    ContentMetadata::from([(MENTION_KEY.to_string(), encoded)])
}
