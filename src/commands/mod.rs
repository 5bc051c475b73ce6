pub mod handlers;

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;

use anyhow::Result;
use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::{error, info};

use crate::config::CommandsConfig;
use crate::message::Message;
use crate::reply::{Reply, ReplySender};
use crate::transport::Transport;

/// Shown in the help listing for commands without a description
pub const NO_DESCRIPTION: &str = "No description available.";

/// Everything a handler may look at while running
pub struct Invocation<'a> {
    pub transport: &'a dyn Transport,
    pub registry: &'a CommandRegistry,
    pub settings: &'a CommandsConfig,
    pub message: &'a Message,
    /// Raw text for parameterized commands
    pub argument: Option<&'a str>,
}

pub type HandlerFn = for<'a> fn(&'a Invocation<'a>) -> BoxFuture<'a, Result<Reply>>;

/// A registered command
pub struct Command {
    pub token: String,
    pub keyword: &'static str,
    pub description: &'static str,
    pub handler: HandlerFn,
}

/// Maps `prefix + keyword` tokens to handlers, in registration order
pub struct CommandRegistry {
    prefix: String,
    commands: Vec<Command>,
    by_token: HashMap<String, usize>,
}

impl CommandRegistry {
    /// Registry with no commands
    pub fn empty(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            commands: Vec::new(),
            by_token: HashMap::new(),
        }
    }

    /// Registry with all built-in commands
    pub fn new(prefix: &str) -> Self {
        let mut registry = Self::empty(prefix);
        for (keyword, description, handler) in handlers::builtin() {
            registry.register(keyword, description, handler);
        }
        info!("Registered {} commands", registry.len());
        registry
    }

    pub fn register(&mut self, keyword: &'static str, description: &'static str, handler: HandlerFn) {
        let token = format!("{}{}", self.prefix, keyword);
        self.by_token.insert(token.clone(), self.commands.len());
        self.commands.push(Command {
            token,
            keyword,
            description,
            handler,
        });
    }

    /// Exact-match lookup of a full message text
    pub fn lookup(&self, text: &str) -> Option<&Command> {
        self.by_token.get(text).map(|&i| &self.commands[i])
    }

    pub fn by_keyword(&self, keyword: &str) -> Option<&Command> {
        self.commands.iter().find(|c| c.keyword == keyword)
    }

    #[cfg(test)]
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// One `"<token> - <description>"` line per command
    pub fn help_text(&self) -> String {
        self.commands
            .iter()
            .map(|c| {
                let description = c.description.trim();
                let description = if description.is_empty() {
                    NO_DESCRIPTION
                } else {
                    description
                };
                format!("{} - {}", c.token, description)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Run a handler and send whatever it produced.
///
/// Handler errors and panics are logged and dropped so the event loop keeps
/// going; nothing is sent for them.
pub async fn invoke_and_deliver(command: &Command, invocation: &Invocation<'_>, sender: &ReplySender) {
    let outcome = AssertUnwindSafe((command.handler)(invocation))
        .catch_unwind()
        .await;

    let reply = match outcome {
        Ok(Ok(reply)) => reply,
        Ok(Err(e)) => {
            error!("Command {} failed: {:#}", command.token, e);
            return;
        }
        Err(_) => {
            error!("Command {} panicked", command.token);
            return;
        }
    };

    if let Some((text, metadata)) = reply.into_outbound() {
        sender.send(invocation.message, &text, metadata.as_ref()).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::transport::mock::MockTransport;

    fn undocumented<'a>(_inv: &'a Invocation<'a>) -> BoxFuture<'a, Result<Reply>> {
        Box::pin(async { Ok(Reply::Text("ok".to_string())) })
    }

    fn failing<'a>(_inv: &'a Invocation<'a>) -> BoxFuture<'a, Result<Reply>> {
        Box::pin(async { Err(anyhow::anyhow!("handler exploded")) })
    }

    fn panicking<'a>(inv: &'a Invocation<'a>) -> BoxFuture<'a, Result<Reply>> {
        Box::pin(async move {
            if inv.argument.is_none() {
                panic!("handler panicked");
            }
            Ok(Reply::Silent)
        })
    }

    #[test]
    fn test_tokens_are_prefix_plus_keyword() {
        let registry = CommandRegistry::new("!");
        let tokens: Vec<&str> = registry.commands().iter().map(|c| c.token.as_str()).collect();
        assert_eq!(
            tokens,
            vec!["!help", "!speed", "!time", "!me", "!mid", "!gid", "!userinfo"]
        );
        assert!(registry.lookup("!gid").is_some());
        assert!(registry.lookup("!gid ").is_none());
        assert!(registry.lookup("gid").is_none());
    }

    #[test]
    fn test_help_has_one_line_per_command() {
        let registry = CommandRegistry::new(".");
        let help = registry.help_text();
        let lines: Vec<&str> = help.lines().collect();
        assert_eq!(lines.len(), registry.len());
        for (line, command) in lines.iter().zip(registry.commands()) {
            assert!(line.starts_with(&format!("{} - ", command.token)));
        }
    }

    #[test]
    fn test_help_placeholder_for_missing_description() {
        let mut registry = CommandRegistry::empty("!");
        registry.register("quiet", "", undocumented);
        assert_eq!(registry.help_text(), format!("!quiet - {}", NO_DESCRIPTION));
    }

    async fn deliver(handler: HandlerFn) -> MockTransport {
        let mock = MockTransport::new("self");
        let transport: Arc<dyn Transport> = Arc::new(mock.clone());
        let mut registry = CommandRegistry::empty("!");
        registry.register("x", "test", handler);
        let settings = CommandsConfig::default();
        let message = Message {
            from: "u1".to_string(),
            to: "chat".to_string(),
            ..Default::default()
        };
        let invocation = Invocation {
            transport: transport.as_ref(),
            registry: &registry,
            settings: &settings,
            message: &message,
            argument: None,
        };
        let sender = ReplySender::new(transport.clone());
        let command = registry.lookup("!x").unwrap();
        invoke_and_deliver(command, &invocation, &sender).await;
        mock
    }

    #[tokio::test]
    async fn test_reply_is_delivered() {
        let mock = deliver(undocumented).await;
        let sent = mock.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].text(), Some("ok"));
    }

    #[tokio::test]
    async fn test_handler_error_sends_nothing() {
        assert!(deliver(failing).await.sent().is_empty());
    }

    #[tokio::test]
    async fn test_handler_panic_is_contained() {
        assert!(deliver(panicking).await.sent().is_empty());
    }
}
