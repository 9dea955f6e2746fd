//! Reusable test helpers for HTTP integration tests.
//!
//! Provides `TestApp` for sending requests through the full axum router,
//! plus mock upstreams (key authority, model backend, identity endpoint)
//! served on ephemeral local ports.
//!
//! ## Signing
//!
//! [`test_signing_key()`] is deterministic; [`key_entry()`] publishes it the
//! way the key authority does and [`signed_request()`] signs a body with it.
#![allow(dead_code)]

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{self, header, HeaderMap, Method, Request, Response, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use http_body_util::BodyExt;
use p256::ecdsa::signature::Signer as _;
use p256::ecdsa::{Signature, SigningKey};
use p256::pkcs8::{EncodePublicKey, LineEnding};
use relay_server::api::{create_router, AppState};
use relay_server::config::Config;
use serde_json::{json, Value};
use tokio::task::JoinHandle;
use tower::ServiceExt;

/// Identifier the mock authority publishes for [`test_signing_key()`].
pub const TEST_KEY_ID: &str = "test-key-1";

/// Simulated key authority latency, long enough for concurrent lookups to
/// overlap.
const AUTHORITY_DELAY: Duration = Duration::from_millis(50);

// ============================================================================
// Test App
// ============================================================================

/// A test application wrapping the full axum router.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub config: Arc<Config>,
}

impl TestApp {
    /// Create a test app with a custom config.
    pub fn with_config(config: Config) -> Self {
        let state = AppState::new(config).expect("Failed to build app state");
        let config = Arc::clone(&state.config);
        let router = create_router(state.clone());

        Self {
            router,
            state,
            config,
        }
    }

    /// Build an HTTP request with the given method and URI.
    pub fn request(method: Method, uri: &str) -> http::request::Builder {
        Request::builder().method(method).uri(uri)
    }

    /// Send a request through the router via `tower::ServiceExt::oneshot`.
    pub async fn oneshot(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("oneshot request failed")
    }
}

/// Config pointing at the given key authority and model backend.
pub fn config_with(authority: &MockKeyAuthority, model_base_url: &str) -> Config {
    Config {
        public_keys_url: authority.url.clone(),
        llm_base_url: model_base_url.to_string(),
        ..Config::default_for_test()
    }
}

// ============================================================================
// Test Server
// ============================================================================

/// A router served on an ephemeral local port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub url: String,
    _handle: JoinHandle<()>,
}

/// Serve `router` on `127.0.0.1:0`.
pub async fn spawn_test_server(router: Router) -> TestServer {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test server");
    let addr = listener.local_addr().expect("Failed to get local addr");
    let url = format!("http://{addr}");

    let handle = tokio::spawn(async move {
        axum::serve(listener, router)
            .await
            .expect("Test server failed");
    });

    TestServer {
        addr,
        url,
        _handle: handle,
    }
}

/// URL of a local port with nothing listening on it.
pub async fn closed_port_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind probe listener");
    let addr = listener.local_addr().expect("Failed to get local addr");
    drop(listener);
    format!("http://{addr}")
}

// ============================================================================
// Signing helpers
// ============================================================================

/// Deterministic signing key; `seed` picks one of several distinct keys.
pub fn signing_key(seed: u8) -> SigningKey {
    SigningKey::from_slice(&[seed; 32]).expect("valid scalar")
}

pub fn test_signing_key() -> SigningKey {
    signing_key(7)
}

/// Key entry as published by the authority.
pub fn key_entry(key_id: &str, key: &SigningKey, is_current: bool) -> Value {
    let pem = key
        .verifying_key()
        .to_public_key_pem(LineEnding::LF)
        .expect("PEM encoding");
    json!({
        "key_identifier": key_id,
        "key": pem,
        "is_current": is_current,
    })
}

/// Base64 P1363 signature over `body`.
pub fn sign(key: &SigningKey, body: &[u8]) -> String {
    let signature: Signature = key.sign(body);
    STANDARD.encode(signature.to_bytes())
}

/// POST `body` to `uri` signed with `key` under `key_id`.
pub fn signed_request(uri: &str, body: &[u8], key_id: &str, key: &SigningKey) -> Request<Body> {
    TestApp::request(Method::POST, uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-github-public-key-identifier", key_id)
        .header("x-github-public-key-signature", sign(key, body))
        .body(Body::from(body.to_vec()))
        .unwrap()
}

/// POST `body` to `uri` signed with the published test key.
pub fn signed_test_request(uri: &str, body: &Value) -> Request<Body> {
    let raw = serde_json::to_vec(body).unwrap();
    signed_request(uri, &raw, TEST_KEY_ID, &test_signing_key())
}

// ============================================================================
// Mock key authority
// ============================================================================

#[derive(Clone)]
struct AuthorityState {
    keys: Arc<Mutex<Vec<Value>>>,
    hits: Arc<AtomicUsize>,
}

/// Serves `{"public_keys": [...]}` and counts fetches.
pub struct MockKeyAuthority {
    pub url: String,
    state: AuthorityState,
    _server: TestServer,
}

impl MockKeyAuthority {
    pub async fn start(entries: Vec<Value>) -> Self {
        let state = AuthorityState {
            keys: Arc::new(Mutex::new(entries)),
            hits: Arc::new(AtomicUsize::new(0)),
        };
        let router = Router::new()
            .route("/keys", get(serve_keys))
            .with_state(state.clone());
        let server = spawn_test_server(router).await;

        Self {
            url: format!("{}/keys", server.url),
            state,
            _server: server,
        }
    }

    /// Authority publishing only the test key, flagged current.
    pub async fn with_test_key() -> Self {
        Self::start(vec![key_entry(TEST_KEY_ID, &test_signing_key(), true)]).await
    }

    /// Replace the published key set.
    pub fn set_keys(&self, entries: Vec<Value>) {
        *self.state.keys.lock().unwrap() = entries;
    }

    pub fn hits(&self) -> usize {
        self.state.hits.load(Ordering::SeqCst)
    }
}

async fn serve_keys(State(state): State<AuthorityState>) -> Json<Value> {
    state.hits.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(AUTHORITY_DELAY).await;
    let keys = state.keys.lock().unwrap().clone();
    Json(json!({ "public_keys": keys }))
}

// ============================================================================
// Mock model backend
// ============================================================================

/// How the mock model answers `/chat/completions`.
#[derive(Clone)]
pub enum ModelReply {
    /// 200 event stream sending these chunks as-is.
    Stream(Vec<&'static str>),
    /// Error status with a text body.
    Status(u16, &'static str),
    /// Accepts the request and never answers.
    Hang,
}

/// One request as the model backend received it.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub body: Value,
    pub authorization: Option<String>,
}

#[derive(Clone)]
struct ModelState {
    reply: ModelReply,
    captured: Arc<Mutex<Vec<CapturedRequest>>>,
}

pub struct MockModel {
    pub base_url: String,
    captured: Arc<Mutex<Vec<CapturedRequest>>>,
    _server: TestServer,
}

impl MockModel {
    pub async fn start(reply: ModelReply) -> Self {
        let captured = Arc::new(Mutex::new(Vec::new()));
        let state = ModelState {
            reply,
            captured: Arc::clone(&captured),
        };
        let router = Router::new()
            .route("/chat/completions", post(completions))
            .with_state(state);
        let server = spawn_test_server(router).await;

        Self {
            base_url: server.url.clone(),
            captured,
            _server: server,
        }
    }

    /// Streams a single "Hello" delta followed by the upstream `[DONE]`.
    pub async fn hello() -> Self {
        Self::start(ModelReply::Stream(vec![
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hello\"},\"index\":0}]}\n\n",
            "data: [DONE]\n\n",
        ]))
        .await
    }

    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.captured.lock().unwrap().clone()
    }

    /// The only request received; panics unless exactly one arrived.
    pub fn single_request(&self) -> CapturedRequest {
        let requests = self.requests();
        assert_eq!(requests.len(), 1, "expected exactly one model request");
        requests.into_iter().next().unwrap()
    }
}

async fn completions(
    State(state): State<ModelState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response<Body> {
    state.captured.lock().unwrap().push(CapturedRequest {
        body,
        authorization: authorization(&headers),
    });

    match state.reply {
        ModelReply::Stream(chunks) => {
            let chunks = futures::stream::iter(
                chunks
                    .into_iter()
                    .map(|c| Ok::<_, Infallible>(Bytes::from_static(c.as_bytes()))),
            );
            (
                [(header::CONTENT_TYPE, "text/event-stream")],
                Body::from_stream(chunks),
            )
                .into_response()
        }
        ModelReply::Status(code, text) => {
            (StatusCode::from_u16(code).unwrap(), text).into_response()
        }
        ModelReply::Hang => std::future::pending().await,
    }
}

// ============================================================================
// Mock identity endpoint
// ============================================================================

#[derive(Clone)]
pub enum IdentityReply {
    Login(&'static str),
    Status(u16),
}

#[derive(Clone)]
struct IdentityState {
    reply: IdentityReply,
    tokens: Arc<Mutex<Vec<Option<String>>>>,
}

pub struct MockIdentity {
    pub url: String,
    tokens: Arc<Mutex<Vec<Option<String>>>>,
    _server: TestServer,
}

impl MockIdentity {
    pub async fn start(reply: IdentityReply) -> Self {
        let tokens = Arc::new(Mutex::new(Vec::new()));
        let state = IdentityState {
            reply,
            tokens: Arc::clone(&tokens),
        };
        let router = Router::new()
            .route("/user", get(profile))
            .with_state(state);
        let server = spawn_test_server(router).await;

        Self {
            url: format!("{}/user", server.url),
            tokens,
            _server: server,
        }
    }

    /// Authorization headers received so far.
    pub fn authorizations(&self) -> Vec<Option<String>> {
        self.tokens.lock().unwrap().clone()
    }
}

async fn profile(State(state): State<IdentityState>, headers: HeaderMap) -> Response<Body> {
    state.tokens.lock().unwrap().push(authorization(&headers));

    match state.reply {
        IdentityReply::Login(login) => Json(json!({ "login": login, "id": 1 })).into_response(),
        IdentityReply::Status(code) => StatusCode::from_u16(code).unwrap().into_response(),
    }
}

fn authorization(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

// ============================================================================
// Response helpers
// ============================================================================

/// Extract the response body as bytes.
pub async fn body_to_bytes(resp: Response<Body>) -> Bytes {
    resp.into_body()
        .collect()
        .await
        .expect("Failed to read body")
        .to_bytes()
}

/// Extract the response body as a UTF-8 string.
pub async fn body_to_text(resp: Response<Body>) -> String {
    String::from_utf8(body_to_bytes(resp).await.to_vec()).expect("Body is not UTF-8")
}

/// Extract the response body as JSON.
pub async fn body_to_json(resp: Response<Body>) -> Value {
    serde_json::from_slice(&body_to_bytes(resp).await).expect("Body is not valid JSON")
}

/// The `data:` payloads of an event stream, in order.
pub fn event_payloads(stream: &str) -> Vec<String> {
    stream
        .split("\n\n")
        .filter(|event| !event.is_empty())
        .map(|event| {
            event
                .lines()
                .filter_map(|line| line.strip_prefix("data: "))
                .collect::<Vec<_>>()
                .join("\n")
        })
        .collect()
}

/// Delta content carried by a relayed event payload.
pub fn delta_content(payload: &str) -> String {
    let value: Value = serde_json::from_str(payload).expect("Event payload is not JSON");
    value["choices"][0]["delta"]["content"]
        .as_str()
        .expect("Missing delta content")
        .to_string()
}
