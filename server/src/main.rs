//! Copilot Relay Server - Main Entry Point

use anyhow::Result;
use tracing::{info, warn};

use relay_server::{api, config};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "relay_server=debug,tower_http=debug".into()),
        )
        .json()
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        model = %config.llm_model,
        backend = %config.llm_base_url,
        "Starting Copilot relay"
    );

    let state = api::AppState::new(config.clone())?;

    // Warm the key cache; requests still work if the authority is down now
    match state.verifier.key_store().current_key().await {
        Ok(Some(key)) => info!(key_id = %key.identifier, "Signing keys loaded"),
        Ok(None) => warn!("Key authority returned no current key"),
        Err(e) => warn!(error = %e, "Could not prefetch signing keys"),
    }

    // Build router
    let app = api::create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    info!(address = %config.bind_address, "Server listening");

    // Graceful shutdown handler
    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
        info!("Received shutdown signal, cleaning up...");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
