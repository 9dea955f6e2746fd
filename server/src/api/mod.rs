//! API Router and Application State
//!
//! Central routing configuration and shared state.

pub mod error;

pub use error::{ErrorResponse, RequestError, RequestResult};

use anyhow::Context;
use axum::{extract::DefaultBodyLimit, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{compression::CompressionLayer, trace::TraceLayer};

use crate::{
    agent::{self, IdentityClient, ModelClient},
    config::Config,
    signing::{KeyStore, SignatureVerifier},
    skills,
};

/// Connect timeout shared by every outbound call.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration
    pub config: Arc<Config>,
    /// Signature checks backed by the cached key set
    pub verifier: SignatureVerifier,
    /// Caller profile lookups for prompt enrichment
    pub identity: IdentityClient,
    /// Streaming model backend
    pub model: ModelClient,
}

impl AppState {
    /// Create application state with one shared outbound HTTP client.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(crate::USER_AGENT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;

        let keys = KeyStore::new(
            http.clone(),
            config.public_keys_url.clone(),
            config.key_cache_ttl,
            config.key_refresh_cooldown,
        );

        Ok(Self {
            verifier: SignatureVerifier::new(Arc::new(keys)),
            identity: IdentityClient::new(http.clone(), config.identity_url.clone()),
            model: ModelClient::new(http, &config.llm_base_url, config.llm_model.clone()),
            config: Arc::new(config),
        })
    }
}

/// Create the main application router.
pub fn create_router(state: AppState) -> Router {
    let max_body_size = state.config.max_body_size;

    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Signed agent endpoint
        .merge(agent::router(state.clone()))
        // Skillset endpoints and manifest
        .merge(skills::router(state.clone()))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(DefaultBodyLimit::max(max_body_size))
        // State
        .with_state(state)
}

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    /// Service status
    status: &'static str,
}

/// Health check endpoint.
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}
