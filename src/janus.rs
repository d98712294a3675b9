//! Session orchestrator: the create/attach/message/detach/destroy state
//! machine on top of [`GatewayServer`].
//!
//! ARCHITECTURE
//! ============
//! ```text
//!   Idle ──connect──▶ Connected ──attach(plugin)──▶ Attached ◀─┐
//!                         ▲                            │       │ send / trickle
//!                         └────────── detach ──────────┤───────┘
//!   any ──connect──▶ Connected                         │
//!   any ──disconnect──▶ Idle ◀─────────────────────────┘
//! ```
//!
//! `GatewayServer` only stores identifiers; this module is the one place
//! that reads them out of responses and decides transitions.
//!
//! TRADE-OFFS
//! ==========
//! A success envelope without `data.id` is reported as `NotConnected` /
//! `NotAttached` rather than an error under the default
//! [`MissingIdPolicy::Clear`]. Set [`MissingIdPolicy::Fail`] to turn it into
//! [`GatewayError::MissingId`].

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::{GatewayConfig, MissingIdPolicy};
use crate::server::GatewayServer;
use crate::types::{
    AttachOutcome, ConnectOutcome, Endpoint, GatewayError, GatewayId, PROTOCOL_TAG, PingResult, SessionState,
    Teardown, Verb,
};

/// Fixed route of the server info endpoint.
const INFO_ROUTE: &str = "info";

/// Envelope status of a successful ping.
const PONG: &str = "pong";

pub struct Janus {
    server: GatewayServer,
}

impl Janus {
    /// # Errors
    ///
    /// Returns [`GatewayError::HttpClientBuild`] if the HTTP client fails to
    /// build.
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        Ok(Self::from_server(GatewayServer::new(config)?))
    }

    #[must_use]
    pub fn from_server(server: GatewayServer) -> Self {
        Self { server }
    }

    #[must_use]
    pub fn server(&self) -> &GatewayServer {
        &self.server
    }

    pub fn server_mut(&mut self) -> &mut GatewayServer {
        &mut self.server
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.server.state()
    }

    // =========================================================================
    // GATEWAY-LEVEL
    // =========================================================================

    /// Server instance details (`GET <endpoint>/info`). Gateway-level, so the
    /// request ignores any open session or handle.
    ///
    /// # Errors
    ///
    /// Propagates transport and protocol errors.
    pub async fn info(&mut self) -> Result<Value, GatewayError> {
        self.server.get_unscoped(Some(INFO_ROUTE), Endpoint::Standard).await
    }

    /// Health check. Never fails: any error, or an envelope other than
    /// `pong`, degrades to `pong = false`.
    pub async fn ping(&mut self) -> PingResult {
        match self.server.post_unscoped(Verb::Ping.fields(), Endpoint::Standard).await {
            Ok(response) if response.get(PROTOCOL_TAG).and_then(Value::as_str) == Some(PONG) => {
                PingResult { pong: true, latency_ms: self.server.latency_ms() }
            }
            Ok(response) => {
                warn!(%response, "gateway ping: unexpected envelope");
                PingResult { pong: false, latency_ms: None }
            }
            Err(e) => {
                warn!(error = %e, "gateway ping failed");
                PingResult { pong: false, latency_ms: None }
            }
        }
    }

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    /// Open a fresh session. Any current session and handle are forgotten
    /// locally before `create` is sent.
    ///
    /// # Errors
    ///
    /// Propagates transport and protocol errors, and
    /// [`GatewayError::MissingId`] under [`MissingIdPolicy::Fail`].
    pub async fn connect(&mut self) -> Result<ConnectOutcome, GatewayError> {
        self.server.set_session_id(None);
        let response = self.server.post(Verb::Create.fields(), Endpoint::Standard).await?;

        match self.issued_id(Verb::Create, &response)? {
            Some(session_id) => {
                info!(%session_id, "gateway session created");
                self.server.set_session_id(Some(session_id.clone()));
                Ok(ConnectOutcome::Connected(session_id))
            }
            None => Ok(ConnectOutcome::NotConnected),
        }
    }

    /// Attach the current session to `plugin`, replacing any existing handle.
    ///
    /// # Errors
    ///
    /// [`GatewayError::NoSession`] without a session (nothing is sent);
    /// otherwise as [`Janus::connect`].
    pub async fn attach(&mut self, plugin: &str) -> Result<AttachOutcome, GatewayError> {
        if !self.server.is_session_active() {
            return Err(GatewayError::NoSession { verb: Verb::Attach.as_str() });
        }
        self.server.clear_attachment();

        let mut fields = Verb::Attach.fields();
        fields.insert("plugin".to_owned(), Value::String(plugin.to_owned()));
        let response = self.server.post(fields, Endpoint::Standard).await?;

        match self.issued_id(Verb::Attach, &response)? {
            Some(handle_id) => {
                info!(%handle_id, plugin, "gateway plugin attached");
                self.server.set_attachment(handle_id.clone(), plugin)?;
                Ok(AttachOutcome::Attached(handle_id))
            }
            None => Ok(AttachOutcome::NotAttached),
        }
    }

    /// Release the current handle. Without a handle this is a no-op. The
    /// handle is cleared locally whatever the gateway answers.
    ///
    /// # Errors
    ///
    /// Propagates transport and protocol errors from the `detach` call.
    pub async fn detach(&mut self) -> Result<(), GatewayError> {
        if !self.server.is_plugin_attached() {
            return Ok(());
        }
        let result = self.server.post(Verb::Detach.fields(), Endpoint::Standard).await;
        if let Some(handle_id) = self.server.handle_id() {
            debug!(%handle_id, "gateway plugin detached");
        }
        self.server.clear_attachment();
        result.map(|_| ())
    }

    /// Destroy the current session. Always ends `Idle`.
    pub async fn disconnect(&mut self) -> Teardown {
        self.server.clear_attachment();
        let Some(session_id) = self.server.session_id().cloned() else {
            return Teardown::Skipped;
        };

        let result = self.server.post(Verb::Destroy.fields(), Endpoint::Standard).await;
        self.server.set_session_id(None);

        // Ignore-and-clear: local state is already gone, a failed destroy is
        // reported but never raised.
        match result {
            Ok(_) => {
                debug!(%session_id, "gateway session destroyed");
                Teardown::Destroyed
            }
            Err(e) => {
                warn!(%session_id, error = %e, "gateway destroy failed; session cleared locally");
                Teardown::Unconfirmed(e)
            }
        }
    }

    // =========================================================================
    // MESSAGING
    // =========================================================================

    /// Post a plugin message, with an optional JSEP negotiation payload.
    ///
    /// # Errors
    ///
    /// [`GatewayError::NotAttached`] without a handle (nothing is sent);
    /// otherwise transport and protocol errors.
    pub async fn send(&mut self, body: Value, jsep: Option<Value>) -> Result<Value, GatewayError> {
        self.require_handle(Verb::Message)?;
        let mut fields = Verb::Message.fields();
        fields.insert("body".to_owned(), body);
        if let Some(jsep) = jsep {
            fields.insert("jsep".to_owned(), jsep);
        }
        self.server.post(fields, Endpoint::Standard).await
    }

    /// Post a trickle candidate. The candidate may be a single candidate
    /// object, an array, or `{"completed": true}`.
    ///
    /// # Errors
    ///
    /// As [`Janus::send`].
    pub async fn trickle(&mut self, candidate: Value) -> Result<Value, GatewayError> {
        self.require_handle(Verb::Trickle)?;
        let mut fields = Verb::Trickle.fields();
        fields.insert("candidate".to_owned(), candidate);
        self.server.post(fields, Endpoint::Standard).await
    }

    /// Send `body` to `plugin`, connecting and attaching first unless
    /// already attached to that plugin.
    ///
    /// # Errors
    ///
    /// Any error from the steps taken. A connect that yields no session
    /// surfaces as [`GatewayError::NoSession`], an attach that yields no
    /// handle as [`GatewayError::NotAttached`].
    pub async fn emit_to_plugin(&mut self, plugin: &str, body: Value) -> Result<Value, GatewayError> {
        if self.server.plugin() != Some(plugin) {
            self.connect().await?;
            self.attach(plugin).await?;
        }
        self.send(body, None).await
    }

    // =========================================================================
    // HELPERS
    // =========================================================================

    fn require_handle(&self, verb: Verb) -> Result<(), GatewayError> {
        if self.server.is_plugin_attached() {
            Ok(())
        } else {
            Err(GatewayError::NotAttached { verb: verb.as_str() })
        }
    }

    /// `data.id` of a create/attach response, subject to the missing-id
    /// policy.
    fn issued_id(&self, verb: Verb, response: &Value) -> Result<Option<GatewayId>, GatewayError> {
        let id = response.get("data").and_then(|d| d.get("id")).and_then(GatewayId::from_value);
        match (id, self.server.config().missing_id_policy) {
            (Some(id), _) => Ok(Some(id)),
            (None, MissingIdPolicy::Clear) => Ok(None),
            (None, MissingIdPolicy::Fail) => Err(GatewayError::MissingId { verb: verb.as_str(), response: response.clone() }),
        }
    }
}

#[cfg(test)]
#[path = "janus_test.rs"]
mod tests;
