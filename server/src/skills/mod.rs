//! Copilot Skillset
//!
//! Skill endpoints the platform calls with structured parameters, plus the
//! manifest that advertises them.

pub mod handlers;
pub mod types;

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};

use crate::api::AppState;
use crate::signing::require_signature;

/// Create the skills router. Skill invocations must be signed; the manifest
/// is public.
pub fn router(state: AppState) -> Router<AppState> {
    let signed = Router::new()
        .route("/skills/getWeather", post(handlers::get_weather))
        .route("/skills/searchDocs", post(handlers::search_docs))
        .layer(from_fn_with_state(state, require_signature));

    Router::new()
        .route("/manifest.json", get(handlers::manifest))
        .merge(signed)
}
