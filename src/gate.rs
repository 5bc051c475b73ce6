use crate::auth::AuthorizationContext;
use crate::message::{InboundEvent, Message, CONTENT_TYPE_PLAIN, OP_MESSAGE, TO_TYPE_CHAT};

/// Why an event was not admitted. Both are normal filtering, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Not a plain chat message in an eligible conversation
    Malformed,
    /// Sender is neither owner nor admin
    Unauthorized,
}

/// Decides whether an inbound event may reach a command handler
pub struct MessageGate {
    auth: AuthorizationContext,
}

impl MessageGate {
    pub fn new(auth: AuthorizationContext) -> Self {
        Self { auth }
    }

    pub fn admit<'a>(&self, event: &'a InboundEvent) -> Result<&'a Message, Rejection> {
        if event.op_type != OP_MESSAGE {
            return Err(Rejection::Malformed);
        }
        let message = event.message.as_ref().ok_or(Rejection::Malformed)?;
        if message.content_type != CONTENT_TYPE_PLAIN || message.to_type != TO_TYPE_CHAT {
            return Err(Rejection::Malformed);
        }
        if !self.auth.is_authorized(&message.from) {
            return Err(Rejection::Unauthorized);
        }
        Ok(message)
    }

    #[cfg(test)]
    pub fn is_eligible(&self, event: &InboundEvent) -> bool {
        self.admit(event).is_ok()
    }
}
