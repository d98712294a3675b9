//! Transport/session client: one correlated HTTP exchange per call.
//!
//! ARCHITECTURE
//! ============
//! `GatewayServer` owns the HTTP client, the connection config and the
//! current session/handle scope. Every call is addressed purely from the
//! scope that is currently set:
//!
//! ```text
//! base [/session [/handle]] [/route]
//! ```
//!
//! so once [`crate::Janus`] has established a session and handle, every
//! later call routes to it without the caller repeating identifiers.
//!
//! DESIGN
//! ======
//! - The server never infers state from responses. Scope only changes via
//!   the explicit setters, which [`crate::Janus`] drives.
//! - Each outbound payload gets a fresh random `transaction` token. The
//!   transport is strictly request/response with one call in flight, so the
//!   token is never stored for correlation.
//! - All wire methods take `&mut self`: one instance can never overlap two
//!   exchanges. Use one instance per concurrent logical session.

use std::fmt;
use std::time::{Duration, Instant};

use rand::Rng;
use rand::distr::Alphanumeric;
use serde_json::{Map, Value};

use crate::config::GatewayConfig;
use crate::types::{
    API_SECRET_FIELD, Endpoint, GatewayError, GatewayId, PROTOCOL_TAG, ServerDetails, SessionState,
    TRANSACTION_FIELD, TRANSACTION_LEN, TransportCause,
};

/// Tracing target for the debug-mode exchange dump.
pub const WIRE_TARGET: &str = "janus_rest::wire";

// =============================================================================
// SCOPE
// =============================================================================

/// Session/handle addressing. Handle and plugin only exist inside a session,
/// and are always set or cleared together.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Scope {
    Idle,
    Session(GatewayId),
    Handle { session: GatewayId, handle: GatewayId, plugin: String },
}

// =============================================================================
// CLIENT
// =============================================================================

#[derive(Debug)]
pub struct GatewayServer {
    http: reqwest::Client,
    config: GatewayConfig,
    scope: Scope,
    latency_ms: Option<u64>,
    last_payload: Option<Value>,
    last_response: Option<Value>,
}

impl GatewayServer {
    /// Build a client for the given gateway.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::HttpClientBuild`] if the HTTP client fails to
    /// build (e.g. the TLS backend cannot initialize).
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeouts.request)
            .connect_timeout(config.timeouts.connect)
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()
            .map_err(|e| GatewayError::HttpClientBuild(e.to_string()))?;
        Ok(Self {
            http,
            config,
            scope: Scope::Idle,
            latency_ms: None,
            last_payload: None,
            last_response: None,
        })
    }

    #[must_use]
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    // -------------------------------------------------------------------------
    // state
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn state(&self) -> SessionState {
        match self.scope {
            Scope::Idle => SessionState::Idle,
            Scope::Session(_) => SessionState::Connected,
            Scope::Handle { .. } => SessionState::Attached,
        }
    }

    #[must_use]
    pub fn session_id(&self) -> Option<&GatewayId> {
        match &self.scope {
            Scope::Idle => None,
            Scope::Session(session) | Scope::Handle { session, .. } => Some(session),
        }
    }

    #[must_use]
    pub fn handle_id(&self) -> Option<&GatewayId> {
        match &self.scope {
            Scope::Handle { handle, .. } => Some(handle),
            _ => None,
        }
    }

    /// Fully-qualified name of the attached plugin.
    #[must_use]
    pub fn plugin(&self) -> Option<&str> {
        match &self.scope {
            Scope::Handle { plugin, .. } => Some(plugin),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_session_active(&self) -> bool {
        self.session_id().is_some()
    }

    /// Session, handle and plugin name are all set.
    #[must_use]
    pub fn is_plugin_attached(&self) -> bool {
        matches!(self.scope, Scope::Handle { .. })
    }

    /// Replace the session. Any attached handle belongs to the old session
    /// and is dropped with it.
    pub fn set_session_id(&mut self, session_id: Option<GatewayId>) {
        self.scope = session_id.map_or(Scope::Idle, Scope::Session);
    }

    /// Record a handle attached to `plugin` within the current session.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NoSession`] when no session is active; a
    /// handle never exists outside a session.
    pub fn set_attachment(&mut self, handle_id: GatewayId, plugin: impl Into<String>) -> Result<(), GatewayError> {
        let Some(session) = self.session_id().cloned() else {
            return Err(GatewayError::NoSession { verb: "attach" });
        };
        self.scope = Scope::Handle { session, handle: handle_id, plugin: plugin.into() };
        Ok(())
    }

    /// Drop the handle and plugin name, keeping the session.
    pub fn clear_attachment(&mut self) {
        if let Scope::Handle { session, .. } = &self.scope {
            self.scope = Scope::Session(session.clone());
        }
    }

    // -------------------------------------------------------------------------
    // accessors
    // -------------------------------------------------------------------------

    /// Round-trip time of the most recent successful exchange.
    #[must_use]
    pub fn latency_ms(&self) -> Option<u64> {
        self.latency_ms
    }

    #[must_use]
    pub fn last_payload(&self) -> Option<&Value> {
        self.last_payload.as_ref()
    }

    /// A top-level field of the last payload; `None` means "not present".
    #[must_use]
    pub fn last_payload_field(&self, key: &str) -> Option<&Value> {
        self.last_payload.as_ref()?.get(key)
    }

    #[must_use]
    pub fn last_response(&self) -> Option<&Value> {
        self.last_response.as_ref()
    }

    /// A top-level field of the last response; `None` means "not present".
    #[must_use]
    pub fn last_response_field(&self, key: &str) -> Option<&Value> {
        self.last_response.as_ref()?.get(key)
    }

    /// The `plugindata.data` object of the last response.
    #[must_use]
    pub fn plugin_data(&self) -> Option<&Value> {
        self.last_response.as_ref()?.get("plugindata")?.get("data")
    }

    /// A single key inside `plugindata.data`.
    #[must_use]
    pub fn plugin_data_field(&self, key: &str) -> Option<&Value> {
        self.plugin_data()?.get(key)
    }

    #[must_use]
    pub fn details(&self) -> ServerDetails {
        ServerDetails {
            server_endpoint: self.config.server_endpoint.clone(),
            admin_endpoint: self.config.admin_endpoint.clone(),
            api_secret_set: self.config.api_secret.is_some(),
            verify_tls: self.config.verify_tls,
            debug: self.config.debug,
            state: self.state(),
            session_id: self.session_id().cloned(),
            handle_id: self.handle_id().cloned(),
            plugin: self.plugin().map(ToOwned::to_owned),
            latency_ms: self.latency_ms,
            last_payload: self.last_payload.clone(),
            last_response: self.last_response.clone(),
        }
    }

    // -------------------------------------------------------------------------
    // wire
    // -------------------------------------------------------------------------

    /// Address for a call from the current scope.
    #[must_use]
    pub fn uri(&self, endpoint: Endpoint, route: Option<&str>) -> String {
        let mut uri = self.config.endpoint(endpoint).to_owned();
        if let Some(session) = self.session_id() {
            uri.push('/');
            uri.push_str(session.as_str());
        }
        if let Some(handle) = self.handle_id() {
            uri.push('/');
            uri.push_str(handle.as_str());
        }
        append_route(&mut uri, route);
        uri
    }

    /// POST `fields` (merged over `transaction`/`apisecret`) to the current
    /// scope.
    ///
    /// # Errors
    ///
    /// [`GatewayError::Transport`] when the exchange fails or returns a
    /// non-2xx status; [`GatewayError::Protocol`] when the envelope has no
    /// `janus` tag or reports `"error"`.
    pub async fn post(&mut self, fields: Map<String, Value>, endpoint: Endpoint) -> Result<Value, GatewayError> {
        let uri = self.uri(endpoint, None);
        let payload = self.build_payload(fields);
        self.exchange(uri, Some(payload)).await
    }

    /// POST to the bare endpoint regardless of the current scope. Used for
    /// gateway-level verbs such as `ping`.
    ///
    /// # Errors
    ///
    /// Same as [`GatewayServer::post`].
    pub async fn post_unscoped(&mut self, fields: Map<String, Value>, endpoint: Endpoint) -> Result<Value, GatewayError> {
        let uri = self.config.endpoint(endpoint).to_owned();
        let payload = self.build_payload(fields);
        self.exchange(uri, Some(payload)).await
    }

    /// GET the current scope, optionally suffixed with a fixed route such
    /// as `info`.
    ///
    /// # Errors
    ///
    /// Same as [`GatewayServer::post`].
    pub async fn get(&mut self, route: Option<&str>, endpoint: Endpoint) -> Result<Value, GatewayError> {
        let uri = self.uri(endpoint, route);
        self.exchange(uri, None).await
    }

    /// GET the bare endpoint plus `route`, ignoring any session or handle.
    ///
    /// # Errors
    ///
    /// Same as [`GatewayServer::post`].
    pub async fn get_unscoped(&mut self, route: Option<&str>, endpoint: Endpoint) -> Result<Value, GatewayError> {
        let mut uri = self.config.endpoint(endpoint).to_owned();
        append_route(&mut uri, route);
        self.exchange(uri, None).await
    }

    fn build_payload(&self, fields: Map<String, Value>) -> Map<String, Value> {
        let mut payload = Map::new();
        payload.insert(TRANSACTION_FIELD.to_owned(), Value::String(transaction_token()));
        if let Some(secret) = &self.config.api_secret {
            payload.insert(API_SECRET_FIELD.to_owned(), Value::String(secret.clone()));
        }
        payload.extend(fields);
        payload
    }

    async fn exchange(&mut self, uri: String, payload: Option<Map<String, Value>>) -> Result<Value, GatewayError> {
        self.latency_ms = None;
        self.last_response = None;
        self.last_payload = payload.clone().map(Value::Object);

        let (method, request) = match payload {
            Some(body) => ("POST", self.http.post(&uri).json(&body)),
            None => ("GET", self.http.get(&uri)),
        };

        let started = Instant::now();
        let (status, text) = send(request)
            .await
            .map_err(|e| GatewayError::Transport { method, uri: uri.clone(), cause: TransportCause::Request(e) })?;
        let elapsed = started.elapsed();

        if !status.is_success() {
            self.dump(method, &uri, status.as_u16(), &text);
            return Err(GatewayError::Transport {
                method,
                uri,
                cause: TransportCause::Status { status: status.as_u16(), body: text },
            });
        }
        self.latency_ms = Some(round_millis(elapsed));

        let response = serde_json::from_str::<Value>(&text).unwrap_or(Value::String(text));
        self.dump(method, &uri, status.as_u16(), &response);

        if !envelope_ok(&response) {
            return Err(GatewayError::protocol(uri, self.last_payload.clone(), response));
        }

        self.last_response = Some(response.clone());
        Ok(response)
    }

    fn dump(&self, method: &str, uri: &str, status: u16, response: &dyn fmt::Display) {
        if !self.config.debug {
            return;
        }
        let payload = self.last_payload.as_ref().map(Value::to_string).unwrap_or_default();
        tracing::debug!(
            target: WIRE_TARGET,
            method,
            uri,
            status,
            payload = %payload,
            response = %response,
            latency_ms = self.latency_ms,
            "gateway exchange"
        );
    }
}

// =============================================================================
// HELPERS
// =============================================================================

async fn send(request: reqwest::RequestBuilder) -> Result<(reqwest::StatusCode, String), reqwest::Error> {
    let response = request.send().await?;
    let status = response.status();
    let text = response.text().await?;
    Ok((status, text))
}

/// The envelope must carry a `janus` status string other than `"error"`.
fn envelope_ok(response: &Value) -> bool {
    match response.get(PROTOCOL_TAG).and_then(Value::as_str) {
        Some(status) => status != "error",
        None => false,
    }
}

fn append_route(uri: &mut String, route: Option<&str>) {
    let Some(route) = route.map(|r| r.trim_matches('/')).filter(|r| !r.is_empty()) else {
        return;
    };
    uri.push('/');
    uri.push_str(route);
}

fn transaction_token() -> String {
    random_token(TRANSACTION_LEN)
}

/// Random alphanumeric string, used for transactions and generated room
/// credentials.
pub(crate) fn random_token(len: usize) -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn round_millis(elapsed: Duration) -> u64 {
    (elapsed.as_secs_f64() * 1000.0).round() as u64
}

#[cfg(test)]
#[path = "server_test.rs"]
mod tests;
