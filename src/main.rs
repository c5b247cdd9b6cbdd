//! Robomotion Client
//!
//! Headless runner for the competitor portal client: restores the stored
//! session, keeps session info and permission countdowns current, and logs
//! every state change until interrupted.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use robomotion_client::config::Config;
use robomotion_client::context::{Client, ClientParts};
use robomotion_client::gateway::HttpGateway;
use robomotion_client::push::PushHub;
use robomotion_client::session::CountdownTicker;
use robomotion_client::storage::{init_storage, SqliteStorage};
use robomotion_client::ui::{TracingNavigator, TracingUi};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env();

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Robomotion client");
    tracing::info!("API URL: {}", config.api_url);
    tracing::info!("Storage path: {:?}", config.storage_path);
    tracing::info!("Session poll interval: {:?}", config.session_poll_interval);

    // Initialize durable storage
    let pool = init_storage(&config.storage_path).await?;
    let storage = Arc::new(SqliteStorage::new(pool));

    let gateway = Arc::new(HttpGateway::new(&config.api_url));
    let push = Arc::new(PushHub::new());

    let client = Client::start(ClientParts {
        account: gateway.clone(),
        competition: gateway,
        storage,
        push: push.clone(),
        ui: Arc::new(TracingUi),
        navigator: Arc::new(TracingNavigator::new("/")),
    });

    if client.session.restore().await {
        tracing::info!(
            "Signed in until {:?}",
            client.session.expires_at().map(|at| at.to_rfc3339())
        );
    } else {
        tracing::info!("Not signed in");
    }

    let poller = client
        .session
        .spawn_session_poller(config.session_poll_interval);
    let countdown = CountdownTicker::spawn(client.session.clone());

    let mut connection = push.connection();
    let mut state = countdown.state();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            Ok(()) = connection.changed() => {
                let auth = connection.borrow_and_update().clone();
                tracing::info!(
                    generation = auth.generation,
                    authenticated = auth.token.is_some(),
                    "Push connection re-authenticated"
                );
            }
            Ok(()) = state.changed() => {
                let snapshot = state.borrow_and_update().clone();
                tracing::trace!(?snapshot, "Permission countdown");
            }
        }
    }

    tracing::info!("Shutting down");
    poller.abort();
    Ok(())
}
