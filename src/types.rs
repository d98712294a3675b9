//! Wire vocabulary, identifiers, outcomes and errors.
//!
//! DESIGN
//! ======
//! The gateway answers HTTP 200 for protocol failures too, so errors are
//! split by where they were detected: `Transport` (the HTTP exchange itself
//! failed) versus `Protocol` (the exchange succeeded but the `janus` envelope
//! says otherwise). Precondition failures (`NoSession`, `NotAttached`) are
//! raised locally before anything goes on the wire.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// =============================================================================
// WIRE FIELDS
// =============================================================================

/// Top-level status/verb field present on every request and response.
pub const PROTOCOL_TAG: &str = "janus";

/// Per-call correlation token field.
pub const TRANSACTION_FIELD: &str = "transaction";

/// Shared secret field, merged only when a secret is configured.
pub const API_SECRET_FIELD: &str = "apisecret";

/// Length of the random transaction token.
pub const TRANSACTION_LEN: usize = 12;

/// Which configured base URL a call goes to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Endpoint {
    #[default]
    Standard,
    Admin,
}

/// Gateway-level verbs sent in the `janus` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Create,
    Attach,
    Detach,
    Destroy,
    Message,
    Trickle,
    Ping,
}

impl Verb {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Attach => "attach",
            Self::Detach => "detach",
            Self::Destroy => "destroy",
            Self::Message => "message",
            Self::Trickle => "trickle",
            Self::Ping => "ping",
        }
    }

    /// Request fields carrying only this verb, ready for extra fields.
    #[must_use]
    pub fn fields(self) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert(PROTOCOL_TAG.to_owned(), Value::String(self.as_str().to_owned()));
        fields
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Opaque session or handle identifier issued by the gateway.
///
/// The gateway issues integers; older deployments and proxies sometimes
/// hand back strings. Both are kept in their textual form since they are
/// only ever used as URI segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GatewayId(String);

impl GatewayId {
    /// Read an identifier from a JSON value, accepting strings and integers.
    /// Empty strings and every other type yield `None`.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) if !s.is_empty() => Some(Self(s.clone())),
            Value::Number(n) if n.is_u64() || n.is_i64() => Some(Self(n.to_string())),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GatewayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GatewayId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for GatewayId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<u64> for GatewayId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

// =============================================================================
// STATE AND OUTCOMES
// =============================================================================

/// Position in the session/handle lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Connected,
    Attached,
}

/// Result of `connect`. A success envelope without `data.id` is
/// `NotConnected` under the default missing-id policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectOutcome {
    Connected(GatewayId),
    NotConnected,
}

impl ConnectOutcome {
    #[must_use]
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected(_))
    }
}

/// Result of `attach`, mirroring [`ConnectOutcome`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachOutcome {
    Attached(GatewayId),
    NotAttached,
}

impl AttachOutcome {
    #[must_use]
    pub fn is_attached(&self) -> bool {
        matches!(self, Self::Attached(_))
    }
}

/// What happened to the remote session during `disconnect`.
///
/// Local state is cleared in every case; this only reports whether the
/// gateway confirmed the destroy.
#[derive(Debug)]
pub enum Teardown {
    /// The gateway acknowledged the destroy.
    Destroyed,
    /// No session was active, nothing was sent.
    Skipped,
    /// The destroy call failed and the error was swallowed.
    Unconfirmed(GatewayError),
}

impl Teardown {
    #[must_use]
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Self::Destroyed)
    }
}

/// Health-check result. Never an error: failures degrade to `pong = false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PingResult {
    pub pong: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

/// Diagnostic snapshot of a [`crate::GatewayServer`]. The API secret is
/// reported only as present/absent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerDetails {
    pub server_endpoint: String,
    pub admin_endpoint: String,
    pub api_secret_set: bool,
    pub verify_tls: bool,
    pub debug: bool,
    pub state: SessionState,
    pub session_id: Option<GatewayId>,
    pub handle_id: Option<GatewayId>,
    pub plugin: Option<String>,
    pub latency_ms: Option<u64>,
    pub last_payload: Option<Value>,
    pub last_response: Option<Value>,
}

// =============================================================================
// ERROR
// =============================================================================

/// Grepable error code and retryable hint.
pub trait ErrorCode: fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

/// Why an HTTP exchange failed.
#[derive(Debug, thiserror::Error)]
pub enum TransportCause {
    /// Connection failure, timeout, or the body could not be read.
    #[error("{0}")]
    Request(#[from] reqwest::Error),

    /// The gateway answered with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
}

/// Errors produced by gateway client operations.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The HTTP exchange itself failed.
    #[error("gateway {method} failed | {uri} | {cause}")]
    Transport {
        method: &'static str,
        uri: String,
        #[source]
        cause: TransportCause,
    },

    /// HTTP succeeded but the envelope is missing its status tag or reports
    /// an error.
    #[error("gateway error | {uri} | {response}")]
    Protocol {
        uri: String,
        /// Outbound payload, `None` for GET calls.
        payload: Option<Value>,
        /// Raw inbound body; non-JSON bodies are kept as a JSON string.
        response: Value,
        code: Option<i64>,
        reason: Option<String>,
    },

    /// A verb that needs a session was issued while idle.
    #[error("no active gateway session for '{verb}'")]
    NoSession { verb: &'static str },

    /// A verb that needs a plugin handle was issued without one.
    #[error("no plugin attached for '{verb}'")]
    NotAttached { verb: &'static str },

    /// Strict mode: a success envelope carried no `data.id`.
    #[error("gateway response to '{verb}' is missing data.id | {response}")]
    MissingId { verb: &'static str, response: Value },

    /// The plugin answered with a status other than the one expected.
    #[error("plugin error | {plugin} | expected '{expected}', got {found:?} | {response}")]
    UnexpectedPluginResponse {
        plugin: String,
        expected: String,
        found: Option<String>,
        payload: Value,
        response: Value,
    },

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),

    /// A configuration value could not be parsed.
    #[error("config parse failed: {0}")]
    ConfigParse(String),

    /// A required configuration variable is not set.
    #[error("missing config: env var {var} not set")]
    MissingConfig { var: String },
}

impl GatewayError {
    /// Build a protocol error from a rejected envelope, lifting the
    /// gateway's `error.code`/`error.reason` when present.
    #[must_use]
    pub fn protocol(uri: String, payload: Option<Value>, response: Value) -> Self {
        let error = response.get("error");
        let code = error.and_then(|e| e.get("code")).and_then(Value::as_i64);
        let reason = error
            .and_then(|e| e.get("reason"))
            .and_then(Value::as_str)
            .map(ToOwned::to_owned);
        Self::Protocol { uri, payload, response, code, reason }
    }

    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    #[must_use]
    pub fn is_protocol(&self) -> bool {
        matches!(self, Self::Protocol { .. })
    }

    /// `true` when the exchange hit the configured request/connect timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport { cause: TransportCause::Request(e), .. } if e.is_timeout())
    }
}

impl ErrorCode for GatewayError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Transport { .. } => "E_GATEWAY_TRANSPORT",
            Self::Protocol { .. } => "E_GATEWAY_PROTOCOL",
            Self::NoSession { .. } => "E_NO_SESSION",
            Self::NotAttached { .. } => "E_NOT_ATTACHED",
            Self::MissingId { .. } => "E_MISSING_ID",
            Self::UnexpectedPluginResponse { .. } => "E_PLUGIN_RESPONSE",
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT_BUILD",
            Self::ConfigParse(_) => "E_CONFIG_PARSE",
            Self::MissingConfig { .. } => "E_MISSING_CONFIG",
        }
    }

    fn retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport { cause: TransportCause::Request(_), .. }
                | Self::Transport { cause: TransportCause::Status { status: 429 | 500..=599, .. }, .. }
        )
    }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
