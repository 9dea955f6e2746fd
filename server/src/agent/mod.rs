//! Copilot Agent
//!
//! Signed chat requests in, model output streamed back as Server-Sent
//! Events.

pub mod backend;
pub mod handlers;
pub mod identity;
pub mod prompt;

use axum::{middleware::from_fn_with_state, routing::post, Router};

use crate::api::AppState;
use crate::signing::require_signature;

pub use backend::{BackendError, ModelClient};
pub use identity::{EnrichmentError, IdentityClient};

/// Header carrying the caller's platform token.
pub const TOKEN_HEADER: &str = "x-github-token";

/// Create the agent router.
pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::infer))
        .layer(from_fn_with_state(state, require_signature))
}
