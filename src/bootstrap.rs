use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use crate::auth::AuthorizationContext;
use crate::commands::CommandRegistry;
use crate::config::Config;
use crate::dispatcher::Dispatcher;
use crate::transport::{HttpTransport, Transport};

/// Pause after a failed event poll
const POLL_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Make sure this account has an E2EE key, registering one if missing
pub async fn ensure_e2ee_key(transport: &dyn Transport) -> Result<()> {
    match transport.e2ee_self_key().await {
        Ok(()) => {
            info!("E2EE key present for {}", transport.self_mid());
            Ok(())
        }
        Err(e) => {
            error!("Error retrieving E2EE key: {}", e);
            transport
                .register_e2ee_self_key()
                .await
                .context("Failed to register E2EE key")?;
            info!("Registered E2EE key for {}", transport.self_mid());
            Ok(())
        }
    }
}

/// Poll events and dispatch them one at a time, in arrival order
pub async fn run_event_loop(transport: &dyn Transport, dispatcher: &Dispatcher) {
    loop {
        let events = match transport.poll_events().await {
            Ok(events) => events,
            Err(e) => {
                warn!("Failed to poll events: {}", e);
                tokio::time::sleep(POLL_RETRY_DELAY).await;
                continue;
            }
        };

        for event in &events {
            dispatcher.dispatch(event).await;
        }
    }
}

/// Build a dispatcher over an already-open transport
pub async fn prepare(transport: Arc<dyn Transport>, config: &Config) -> Result<Dispatcher> {
    let auth = AuthorizationContext::load(&config.auth.path)?;
    ensure_e2ee_key(transport.as_ref()).await?;

    let registry = CommandRegistry::new(&config.commands.prefix);
    Ok(Dispatcher::new(
        transport,
        auth,
        registry,
        config.commands.clone(),
    ))
}

/// Open the session and serve commands until Ctrl-C
pub async fn run(config: Config) -> Result<()> {
    let transport: Arc<dyn Transport> = Arc::new(
        HttpTransport::connect(&config.transport)
            .await
            .with_context(|| format!("Failed to connect to {}", config.transport.base_url))?,
    );

    let dispatcher = prepare(transport.clone(), &config).await?;

    info!("Listening for commands...");
    tokio::select! {
        _ = run_event_loop(transport.as_ref(), &dispatcher) => {}
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for Ctrl-C")?;
            info!("Shutting down");
        }
    }

    Ok(())
}
