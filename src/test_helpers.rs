//! Scripted fake gateway for unit tests.
//!
//! An Axum router bound to `127.0.0.1:0` that records every request and
//! answers from a queue of scripted replies. Unscripted requests get a plain
//! `{"janus":"success"}` envelope.

use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};
use tracing::field::{Field, Visit};
use tracing::subscriber::DefaultGuard;
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

use crate::config::{GatewayConfig, GatewayTimeouts};
use crate::server::WIRE_TARGET;

pub const API_SECRET: &str = "api-secret";

// =============================================================================
// SCRIPT
// =============================================================================

/// One scripted reply.
#[derive(Debug, Clone)]
pub struct Reply {
    status: u16,
    body: String,
    delay: Option<Duration>,
}

impl Reply {
    pub fn json(body: Value) -> Self {
        Self { status: 200, body: body.to_string(), delay: None }
    }

    pub fn raw(status: u16, body: &str) -> Self {
        Self { status, body: body.to_owned(), delay: None }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

/// A request as seen by the fake gateway.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    /// Parsed JSON body, `Value::Null` for empty or non-JSON bodies.
    pub body: Value,
}

impl Recorded {
    /// The `janus` verb of a POST body.
    pub fn verb(&self) -> Option<&str> {
        self.body.get("janus").and_then(Value::as_str)
    }
}

#[derive(Default)]
struct Script {
    replies: VecDeque<Reply>,
    requests: Vec<Recorded>,
}

type Shared = Arc<Mutex<Script>>;

// =============================================================================
// FAKE GATEWAY
// =============================================================================

pub struct FakeGateway {
    addr: SocketAddr,
    script: Shared,
}

impl FakeGateway {
    pub async fn start() -> Self {
        let script: Shared = Arc::default();
        let app = Router::new().fallback(handle).with_state(script.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake gateway");
        let addr = listener.local_addr().expect("fake gateway addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Self { addr, script }
    }

    pub fn endpoint(&self) -> String {
        format!("http://{}/janus", self.addr)
    }

    pub fn admin_endpoint(&self) -> String {
        format!("http://{}/admin", self.addr)
    }

    /// Config pointing at this gateway with a known secret and short timeouts.
    pub fn config(&self) -> GatewayConfig {
        GatewayConfig::new(self.endpoint())
            .with_admin_endpoint(self.admin_endpoint())
            .with_api_secret(API_SECRET)
            .with_verify_tls(false)
            .with_timeouts(GatewayTimeouts {
                request: Duration::from_secs(5),
                connect: Duration::from_secs(2),
            })
    }

    pub fn push(&self, reply: Reply) {
        self.script.lock().unwrap().replies.push_back(reply);
    }

    pub fn push_json(&self, body: Value) {
        self.push(Reply::json(body));
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.script.lock().unwrap().requests.clone()
    }

    pub fn request(&self, index: usize) -> Recorded {
        self.requests()
            .get(index)
            .cloned()
            .unwrap_or_else(|| panic!("no request #{index} recorded"))
    }

    pub fn request_count(&self) -> usize {
        self.script.lock().unwrap().requests.len()
    }

    /// Path prefix of the standard endpoint, e.g. `/janus`.
    pub fn path(suffix: &str) -> String {
        format!("/janus{suffix}")
    }
}

async fn handle(State(script): State<Shared>, method: Method, uri: Uri, body: Bytes) -> Response {
    let reply = {
        let mut script = script.lock().unwrap();
        script.requests.push(Recorded {
            method: method.to_string(),
            path: uri.path().to_owned(),
            body: serde_json::from_slice(&body).unwrap_or(Value::Null),
        });
        script.replies.pop_front()
    };
    let reply = reply.unwrap_or_else(|| Reply::json(success()));

    if let Some(delay) = reply.delay {
        tokio::time::sleep(delay).await;
    }
    let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, [(header::CONTENT_TYPE, "application/json")], reply.body).into_response()
}

// =============================================================================
// ENVELOPES
// =============================================================================

pub fn success() -> Value {
    json!({ "janus": "success" })
}

/// Success envelope carrying `data.id`, as returned by create/attach.
pub fn with_id(id: impl Into<Value>) -> Value {
    json!({ "janus": "success", "data": { "id": id.into() } })
}

/// Success envelope carrying plugin data.
pub fn plugin_reply(plugin: &str, data: Value) -> Value {
    json!({
        "janus": "success",
        "sender": 5678,
        "plugindata": { "plugin": plugin, "data": data }
    })
}

pub fn gateway_error(code: i64, reason: &str) -> Value {
    json!({ "janus": "error", "error": { "code": code, "reason": reason } })
}

// =============================================================================
// WIRE LOG
// =============================================================================

/// Fields of one event, rendered as strings.
pub type Fields = BTreeMap<String, String>;

/// Tracing layer that keeps every `janus_rest::wire` event.
#[derive(Clone, Default)]
pub struct WireLog {
    events: Arc<Mutex<Vec<Fields>>>,
}

impl WireLog {
    /// Install a capturing subscriber on the current thread until the guard
    /// drops. `#[tokio::test]` runs on one thread, so this covers the test.
    pub fn capture() -> (Self, DefaultGuard) {
        let log = Self::default();
        let subscriber = tracing_subscriber::registry().with(log.clone());
        (log, tracing::subscriber::set_default(subscriber))
    }

    pub fn events(&self) -> Vec<Fields> {
        self.events.lock().unwrap().clone()
    }
}

impl<S: Subscriber> Layer<S> for WireLog {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if event.metadata().target() != WIRE_TARGET {
            return;
        }
        let mut fields = FieldCollector::default();
        event.record(&mut fields);
        self.events.lock().unwrap().push(fields.0);
    }
}

#[derive(Default)]
struct FieldCollector(Fields);

impl Visit for FieldCollector {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_owned(), value.to_owned());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.0.insert(field.name().to_owned(), format!("{value:?}"));
    }
}
