use std::sync::Arc;

use tracing::{debug, error, info};

use crate::auth::AuthorizationContext;
use crate::commands::{invoke_and_deliver, CommandRegistry, Invocation};
use crate::config::CommandsConfig;
use crate::gate::MessageGate;
use crate::message::{InboundEvent, Message};
use crate::reply::ReplySender;
use crate::transport::{Transport, TransportResult};

/// Parameterized form of `userinfo`; matched before exact tokens
pub const USERINFO_PREFIX: &str = "/userinfo:";

/// Display text of a message, decrypting E2EE text through the transport
pub async fn extract_text(transport: &dyn Transport, message: &Message) -> TransportResult<String> {
    if message.is_encrypted_text() {
        transport.decrypt_e2ee_text(message).await
    } else {
        Ok(message.text.clone().unwrap_or_default())
    }
}

/// Routes admitted messages to command handlers
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
    gate: MessageGate,
    registry: CommandRegistry,
    settings: CommandsConfig,
    sender: ReplySender,
}

impl Dispatcher {
    pub fn new(
        transport: Arc<dyn Transport>,
        auth: AuthorizationContext,
        registry: CommandRegistry,
        settings: CommandsConfig,
    ) -> Self {
        Self {
            sender: ReplySender::new(transport.clone()),
            transport,
            gate: MessageGate::new(auth),
            registry,
            settings,
        }
    }

    #[cfg(test)]
    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// Handle one inbound event. Never fails; problems are logged.
    pub async fn dispatch(&self, event: &InboundEvent) {
        let message = match self.gate.admit(event) {
            Ok(message) => message,
            Err(rejection) => {
                debug!("Dropping event (type {}): {:?}", event.op_type, rejection);
                return;
            }
        };

        let text = match extract_text(self.transport.as_ref(), message).await {
            Ok(text) => text,
            Err(e) => {
                error!("Failed to read message from {}: {}", message.from, e);
                return;
            }
        };

        let (command, argument) = if text.starts_with(USERINFO_PREFIX) {
            (self.registry.by_keyword("userinfo"), Some(text.as_str()))
        } else {
            (self.registry.lookup(&text), None)
        };

        let Some(command) = command else {
            return;
        };

        info!("Command {} from {} in {}", command.token, message.from, message.to);

        let invocation = Invocation {
            transport: self.transport.as_ref(),
            registry: &self.registry,
            settings: &self.settings,
            message,
            argument,
        };
        invoke_and_deliver(command, &invocation, &self.sender).await;
    }
}
