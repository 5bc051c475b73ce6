//! In-memory transport for tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::{Transport, TransportError, TransportResult};
use crate::message::{Contact, ContentMetadata, InboundEvent, Message};

/// One recorded outbound operation
#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Text {
        to: String,
        text: String,
        metadata: Option<ContentMetadata>,
    },
    E2eeText {
        to: String,
        text: String,
        metadata: Option<ContentMetadata>,
    },
    Image {
        to: String,
        path: String,
    },
    E2eeImage {
        to: String,
        path: String,
    },
    Contact {
        to: String,
        mid: String,
        display_name: String,
    },
}

impl Sent {
    /// Text of a text send, if this is one
    pub fn text(&self) -> Option<&str> {
        match self {
            Sent::Text { text, .. } | Sent::E2eeText { text, .. } => Some(text),
            _ => None,
        }
    }
}

#[derive(Default)]
struct MockState {
    sent: Vec<Sent>,
    contacts: HashMap<String, Contact>,
    events: VecDeque<Vec<InboundEvent>>,
    decrypted: Option<String>,
    server_time: i64,
    has_e2ee_key: bool,
    registered_keys: usize,
    fail_sends: bool,
    fail_contact_card: bool,
}

#[derive(Clone)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
    mid: String,
}

impl MockTransport {
    pub fn new(mid: &str) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState::default())),
            mid: mid.to_string(),
        }
    }

    pub fn add_contact(&self, contact: Contact) {
        let mut state = self.state.lock().unwrap();
        state.contacts.insert(contact.mid.clone(), contact);
    }

    pub fn push_events(&self, events: Vec<InboundEvent>) {
        self.state.lock().unwrap().events.push_back(events);
    }

    pub fn set_decrypted(&self, text: Option<&str>) {
        self.state.lock().unwrap().decrypted = text.map(str::to_string);
    }

    pub fn set_server_time(&self, millis: i64) {
        self.state.lock().unwrap().server_time = millis;
    }

    pub fn set_has_e2ee_key(&self, present: bool) {
        self.state.lock().unwrap().has_e2ee_key = present;
    }

    pub fn set_fail_sends(&self, fail: bool) {
        self.state.lock().unwrap().fail_sends = fail;
    }

    pub fn set_fail_contact_card(&self, fail: bool) {
        self.state.lock().unwrap().fail_contact_card = fail;
    }

    pub fn registered_keys(&self) -> usize {
        self.state.lock().unwrap().registered_keys
    }

    /// Outbound operations for assertions
    pub fn sent(&self) -> Vec<Sent> {
        self.state.lock().unwrap().sent.clone()
    }

    fn record(&self, sent: Sent) -> TransportResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_sends {
            return Err(TransportError::Network("connection reset".to_string()));
        }
        state.sent.push(sent);
        Ok(())
    }
}

#[async_trait]
impl Transport for MockTransport {
    fn self_mid(&self) -> &str {
        &self.mid
    }

    async fn poll_events(&self) -> TransportResult<Vec<InboundEvent>> {
        let batch = self.state.lock().unwrap().events.pop_front();
        match batch {
            Some(events) => Ok(events),
            None => {
                // Stand-in for a long poll timing out
                tokio::time::sleep(Duration::from_millis(10)).await;
                Ok(Vec::new())
            }
        }
    }

    async fn server_time(&self) -> TransportResult<i64> {
        Ok(self.state.lock().unwrap().server_time)
    }

    async fn send_contact(&self, to: &str, mid: &str, display_name: &str) -> TransportResult<()> {
        if self.state.lock().unwrap().fail_contact_card {
            return Err(TransportError::Status {
                status: 403,
                body: "contact card rejected".to_string(),
            });
        }
        self.record(Sent::Contact {
            to: to.to_string(),
            mid: mid.to_string(),
            display_name: display_name.to_string(),
        })
    }

    async fn get_contact(&self, mid: &str) -> TransportResult<Contact> {
        self.state
            .lock()
            .unwrap()
            .contacts
            .get(mid)
            .cloned()
            .ok_or_else(|| TransportError::NotFound(mid.to_string()))
    }

    async fn e2ee_self_key(&self) -> TransportResult<()> {
        if self.state.lock().unwrap().has_e2ee_key {
            Ok(())
        } else {
            Err(TransportError::NotFound("e2ee self key".to_string()))
        }
    }

    async fn register_e2ee_self_key(&self) -> TransportResult<()> {
        let mut state = self.state.lock().unwrap();
        state.has_e2ee_key = true;
        state.registered_keys += 1;
        Ok(())
    }

    async fn decrypt_e2ee_text(&self, _message: &Message) -> TransportResult<String> {
        self.state
            .lock()
            .unwrap()
            .decrypted
            .clone()
            .ok_or_else(|| TransportError::Decryption("no session key".to_string()))
    }

    async fn send_text(
        &self,
        to: &str,
        text: &str,
        metadata: Option<&ContentMetadata>,
    ) -> TransportResult<()> {
        self.record(Sent::Text {
            to: to.to_string(),
            text: text.to_string(),
            metadata: metadata.cloned(),
        })
    }

    async fn send_e2ee_text(
        &self,
        to: &str,
        text: &str,
        metadata: Option<&ContentMetadata>,
    ) -> TransportResult<()> {
        self.record(Sent::E2eeText {
            to: to.to_string(),
            text: text.to_string(),
            metadata: metadata.cloned(),
        })
    }

    async fn send_image(&self, to: &str, path: &str) -> TransportResult<()> {
        self.record(Sent::Image {
            to: to.to_string(),
            path: path.to_string(),
        })
    }

    async fn send_e2ee_image(&self, to: &str, path: &str) -> TransportResult<()> {
        self.record(Sent::E2eeImage {
            to: to.to_string(),
            path: path.to_string(),
        })
    }
}
