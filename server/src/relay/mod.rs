//! Server-Sent Events Stream Relay
//!
//! Owns the outbound half of one streaming response. A relay only exists
//! once its response headers exist ([`StreamRelay::start`]) and [`end`]
//! consumes it, so writes before `start` or after `end` do not compile.
//!
//! Wire format, one event per write:
//!
//! ```text
//! data: {"choices":[{"delta":{"content":"Hello"},"index":0}]}
//!
//! data: [DONE]
//!
//! ```
//!
//! [`end`]: StreamRelay::end

pub mod lines;

use std::convert::Infallible;
use std::fmt::Display;
use std::time::Duration;

use axum::body::Body;
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::http::HeaderName;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use relay_common::DeltaChunk;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use lines::{LineSplitter, PendingOverflow, Segment};

/// Terminal event closing every session.
pub const DONE_EVENT: &str = "data: [DONE]\n\n";

/// Events buffered between the relay and the client connection.
const CHANNEL_CAPACITY: usize = 32;

/// Longest unterminated upstream line held while waiting for its newline.
const MAX_PENDING_LINE: usize = 1024 * 1024;

const X_ACCEL_BUFFERING: HeaderName = HeaderName::from_static("x-accel-buffering");

/// Relay errors.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Client disconnected; nothing more can be delivered.
    #[error("Client disconnected")]
    ClientGone,

    /// Upstream body failed mid-stream.
    #[error("Upstream stream error: {0}")]
    Upstream(String),

    /// Upstream went quiet for longer than the idle timeout.
    #[error("Upstream idle for {0:?}")]
    UpstreamIdle(Duration),

    /// Upstream sent a line longer than the pending-line bound.
    #[error("Upstream line exceeds {0} bytes")]
    FrameTooLarge(usize),

    #[error("Failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),
}

impl From<PendingOverflow> for RelayError {
    fn from(overflow: PendingOverflow) -> Self {
        Self::FrameTooLarge(overflow.0)
    }
}

/// Writer side of one event stream.
pub struct StreamRelay {
    tx: mpsc::Sender<Bytes>,
    idle_timeout: Duration,
    /// A piped event has lines on the wire but no terminating blank line yet.
    event_open: bool,
    ended: bool,
}

impl StreamRelay {
    /// Open a session: returns the relay and the response that must be sent
    /// to the client right away. Headers disable caching and proxy buffering.
    pub fn start(idle_timeout: Duration) -> (Self, Response) {
        let (tx, rx) = mpsc::channel::<Bytes>(CHANNEL_CAPACITY);

        let events = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|event| (Ok::<_, Infallible>(event), rx))
        });

        let response = (
            [
                (CONTENT_TYPE, "text/event-stream"),
                (CACHE_CONTROL, "no-cache"),
                (X_ACCEL_BUFFERING, "no"),
            ],
            Body::from_stream(events),
        )
            .into_response();

        let relay = Self {
            tx,
            idle_timeout,
            event_open: false,
            ended: false,
        };

        (relay, response)
    }

    /// Whether the client has gone away.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Resolves once the client has gone away.
    pub async fn closed(&self) {
        self.tx.closed().await;
    }

    /// Longest wait for the next upstream event.
    pub const fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    /// Emit locally generated text as a single delta event.
    pub async fn write_token(&mut self, text: &str) -> Result<(), RelayError> {
        let payload = serde_json::to_string(&DeltaChunk::content(text))?;
        let event = format!("{}data: {payload}\n\n", self.close_open_event());
        self.send(Bytes::from(event)).await
    }

    /// Forward an upstream event stream line by line.
    ///
    /// Upstream is expected to already speak this wire format; lines are
    /// passed through unvalidated. Runs of blank lines collapse into one
    /// event separator, so upstream event boundaries survive arbitrary
    /// chunking. The upstream's own `[DONE]` is withheld because
    /// [`end`](Self::end) emits the session's.
    pub async fn pipe<S, E>(&mut self, upstream: S) -> Result<(), RelayError>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: Display,
    {
        let mut upstream = std::pin::pin!(upstream);
        let mut splitter = LineSplitter::new(MAX_PENDING_LINE);

        loop {
            let next = tokio::select! {
                next = tokio::time::timeout(self.idle_timeout, upstream.next()) => next,
                () = self.tx.closed() => return Err(RelayError::ClientGone),
            };

            let chunk = match next {
                Err(_) => return Err(RelayError::UpstreamIdle(self.idle_timeout)),
                Ok(None) => break,
                Ok(Some(Err(e))) => return Err(RelayError::Upstream(e.to_string())),
                Ok(Some(Ok(chunk))) => chunk,
            };

            let segments = splitter.push(&chunk)?;
            self.write_segments(segments).await?;
        }

        let mut rest: Vec<Segment> = splitter.finish().map(Segment::Line).into_iter().collect();
        rest.push(Segment::Boundary);
        self.write_segments(rest).await
    }

    /// Emit the terminal event and close the stream.
    pub async fn end(mut self) {
        self.ended = true;
        let event = format!("{}{DONE_EVENT}", self.close_open_event());
        if self.send(Bytes::from(event)).await.is_err() {
            debug!("Client gone before end of stream");
        }
    }

    async fn write_segments(&mut self, segments: Vec<Segment>) -> Result<(), RelayError> {
        let mut frame = String::new();
        for segment in segments {
            match segment {
                Segment::Line(line) if is_done_marker(&line) => {}
                Segment::Line(line) => {
                    frame.push_str(&line);
                    frame.push('\n');
                    self.event_open = true;
                }
                Segment::Boundary => frame.push_str(self.close_open_event()),
            }
        }
        if frame.is_empty() {
            return Ok(());
        }
        self.send(Bytes::from(frame)).await
    }

    /// Separator needed before anything else may be written.
    fn close_open_event(&mut self) -> &'static str {
        if std::mem::take(&mut self.event_open) {
            "\n"
        } else {
            ""
        }
    }

    async fn send(&mut self, event: Bytes) -> Result<(), RelayError> {
        self.tx
            .send(event)
            .await
            .map_err(|_| RelayError::ClientGone)
    }
}

impl Drop for StreamRelay {
    fn drop(&mut self) {
        if !self.ended {
            warn!("Stream relay dropped without end event");
        }
    }
}

fn is_done_marker(line: &str) -> bool {
    line.strip_prefix("data:")
        .is_some_and(|data| data.trim() == "[DONE]")
}
