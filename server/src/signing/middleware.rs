//! Signature Middleware

use axum::{
    body::Body,
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use http_body_util::LengthLimitError;
use tracing::warn;

use crate::api::{AppState, RequestError};

use super::{KEY_IDENTIFIER_HEADER, SIGNATURE_HEADER};

/// Identity of the key that signed the current request, injected into
/// request extensions by [`require_signature`].
#[derive(Debug, Clone)]
pub struct VerifiedRequest {
    pub key_id: String,
}

/// Middleware to require a valid platform signature.
///
/// Buffers the body, verifies the exact bytes, then hands the same bytes
/// to the next handler so whatever it parses is what was verified.
///
/// - missing header or empty body: 400
/// - body over `max_body_size`: 413
/// - any verification failure (unknown key, bad signature, key fetch): 401
pub async fn require_signature(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, RequestError> {
    let (parts, body) = request.into_parts();

    let key_id = header_value(&parts.headers, KEY_IDENTIFIER_HEADER)
        .ok_or(RequestError::MissingCredentials)?;
    let signature =
        header_value(&parts.headers, SIGNATURE_HEADER).ok_or(RequestError::MissingCredentials)?;

    let limit = state.config.max_body_size;
    let raw_body = axum::body::to_bytes(body, limit).await.map_err(|e| {
        if exceeds_limit(&e) {
            RequestError::PayloadTooLarge(limit)
        } else {
            RequestError::InvalidBody(e.to_string())
        }
    })?;
    if raw_body.is_empty() {
        return Err(RequestError::MissingCredentials);
    }

    if let Err(e) = state.verifier.verify(&raw_body, &key_id, &signature).await {
        warn!(key_id = %key_id, error = %e, "Signature verification failed");
        return Err(RequestError::Unauthorized);
    }

    let mut request = Request::from_parts(parts, Body::from(raw_body));
    request.extensions_mut().insert(VerifiedRequest { key_id });

    Ok(next.run(request).await)
}

/// Non-empty header value as an owned string.
pub(crate) fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Whether reading the body failed on the size limit.
fn exceeds_limit(err: &axum::Error) -> bool {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(e) = source {
        if e.is::<LengthLimitError>() {
            return true;
        }
        source = e.source();
    }
    false
}
