//! Model Backend Client
//!
//! Streams chat completions from an OpenAI-compatible `/chat/completions`
//! endpoint (GitHub Models, Azure OpenAI, OpenAI, ...).

use std::time::Duration;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use relay_common::{ChatCompletionRequest, ConversationMessage};
use thiserror::Error;
use tracing::debug;

/// Longest slice of an error body kept for logs, in characters.
const ERROR_BODY_PREVIEW: usize = 500;

/// Bytes read from an error body; enough for the preview in any encoding.
const ERROR_BODY_READ_LIMIT: usize = ERROR_BODY_PREVIEW * 4;

#[derive(Debug, Error)]
pub enum BackendError {
    /// Request never got a response.
    #[error("Model backend unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    /// Backend answered with a non-success status.
    #[error("Model backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Backend answered successfully with an empty body.
    #[error("Model backend returned no body")]
    MissingBody,

    /// Backend accepted the request but sent no response headers in time.
    #[error("Model backend sent no response within {0:?}")]
    NoResponse(Duration),
}

/// Client for the model backend.
#[derive(Clone)]
pub struct ModelClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
}

impl ModelClient {
    pub fn new(http: reqwest::Client, base_url: &str, model: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            model: model.into(),
        }
    }

    /// Start a streaming completion and return its raw event stream.
    ///
    /// `credential` is sent as a bearer token; no `Authorization` header is
    /// sent when there is none.
    pub async fn stream_completion(
        &self,
        messages: Vec<ConversationMessage>,
        credential: Option<&str>,
    ) -> Result<impl Stream<Item = reqwest::Result<Bytes>>, BackendError> {
        let payload = ChatCompletionRequest {
            model: self.model.clone(),
            messages,
            stream: true,
        };

        let mut request = self.http.post(&self.endpoint).json(&payload);
        match credential {
            Some(credential) => request = request.bearer_auth(credential),
            None => debug!("No model credential available, sending unauthenticated request"),
        }

        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Status {
                status: status.as_u16(),
                body: error_preview(response.bytes_stream()).await,
            });
        }

        if response.content_length() == Some(0) {
            return Err(BackendError::MissingBody);
        }

        Ok(response.bytes_stream())
    }
}

/// Leading part of an error body. Stops reading once the preview is full.
async fn error_preview<S, E>(body: S) -> String
where
    S: Stream<Item = Result<Bytes, E>>,
{
    let mut body = std::pin::pin!(body);
    let mut prefix = Vec::new();
    while prefix.len() < ERROR_BODY_READ_LIMIT {
        match body.next().await {
            Some(Ok(chunk)) => prefix.extend_from_slice(&chunk),
            Some(Err(_)) | None => break,
        }
    }
    prefix.truncate(ERROR_BODY_READ_LIMIT);
    String::from_utf8_lossy(&prefix)
        .chars()
        .take(ERROR_BODY_PREVIEW)
        .collect()
}
