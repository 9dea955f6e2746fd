//! Inference Handler
//!
//! Runs after [`require_signature`](crate::signing::require_signature) has
//! accepted the request:
//!
//! 1. parse the verified body and assemble the model prompt
//! 2. open the event stream (headers go out before the model is called)
//! 3. call the model and pipe its stream, or write an apology on failure
//! 4. end the stream, on every path

use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::Response,
    Extension,
};
use relay_common::{ConversationMessage, InferenceRequest};
use tracing::{debug, error, info, instrument, warn, Instrument, Span};
use uuid::Uuid;

use super::backend::{BackendError, ModelClient};
use super::{prompt, TOKEN_HEADER};
use crate::api::{AppState, RequestError, RequestResult};
use crate::relay::{RelayError, StreamRelay};
use crate::signing::middleware::header_value;
use crate::signing::VerifiedRequest;

/// Sent when the model backend cannot be reached.
pub const TRANSPORT_APOLOGY: &str = "Sorry, I encountered an error contacting the model.";

/// Sent when the model backend answers with an error.
pub const STATUS_APOLOGY: &str = "Sorry, the model returned an error.";

/// POST /
#[instrument(
    skip_all,
    fields(request_id = %Uuid::now_v7(), key_id = %verified.key_id)
)]
pub async fn infer(
    State(state): State<AppState>,
    Extension(verified): Extension<VerifiedRequest>,
    headers: HeaderMap,
    body: Bytes,
) -> RequestResult<Response> {
    let request: InferenceRequest =
        serde_json::from_slice(&body).map_err(|e| RequestError::InvalidBody(e.to_string()))?;

    let token = header_value(&headers, TOKEN_HEADER);

    let login = match token.as_deref() {
        Some(token) => match state.identity.lookup_login(token).await {
            Ok(login) => Some(login),
            Err(e) => {
                warn!(error = %e, "Identity lookup failed, continuing without it");
                None
            }
        },
        None => None,
    };

    let messages = prompt::build_messages(
        &state.config.system_prompt,
        login.as_deref(),
        request.messages,
    );
    info!(messages = messages.len(), enriched = login.is_some(), "Relaying conversation");

    let credential = token.or_else(|| state.config.llm_api_key.clone());

    let (relay, response) = StreamRelay::start(state.config.upstream_idle_timeout);
    tokio::spawn(
        generate(state.model.clone(), relay, messages, credential).instrument(Span::current()),
    );

    Ok(response)
}

/// Drive one completion through the relay. Ends the relay exactly once.
///
/// Waiting for the backend's response headers is bounded by the relay's
/// idle timeout and abandoned as soon as the client goes away.
async fn generate(
    model: ModelClient,
    mut relay: StreamRelay,
    messages: Vec<ConversationMessage>,
    credential: Option<String>,
) {
    let wait = relay.idle_timeout();
    let call = tokio::time::timeout(
        wait,
        model.stream_completion(messages, credential.as_deref()),
    );

    let outcome = tokio::select! {
        outcome = call => Some(outcome.unwrap_or(Err(BackendError::NoResponse(wait)))),
        () = relay.closed() => None,
    };

    match outcome {
        None => debug!("Client disconnected before the model responded"),
        Some(Ok(upstream)) => match relay.pipe(upstream).await {
            Ok(()) => debug!("Completion relayed"),
            Err(RelayError::ClientGone) => debug!("Client disconnected mid-stream"),
            Err(e) => warn!(error = %e, "Model stream interrupted"),
        },
        Some(Err(e)) => {
            let apology = match &e {
                BackendError::Transport(_) | BackendError::NoResponse(_) => TRANSPORT_APOLOGY,
                BackendError::Status { .. } | BackendError::MissingBody => STATUS_APOLOGY,
            };
            error!(error = %e, "Model request failed");
            if let Err(e) = relay.write_token(apology).await {
                debug!(error = %e, "Could not deliver apology");
            }
        }
    }

    relay.end().await;
}
