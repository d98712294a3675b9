//! Gateway connection configuration.
//!
//! DESIGN
//! ======
//! Configuration is a plain value handed to [`crate::GatewayServer::new`].
//! Nothing is read lazily or cached process-wide; `from_env` is a
//! convenience for binaries, the library itself never touches the
//! environment.

use std::time::Duration;

use crate::types::{Endpoint, GatewayError};

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Suffix appended to the standard endpoint when no admin endpoint is given.
const DEFAULT_ADMIN_SUFFIX: &str = "/admin";

// =============================================================================
// TYPES
// =============================================================================

/// Per-call network limits applied to every exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatewayTimeouts {
    pub request: Duration,
    pub connect: Duration,
}

impl Default for GatewayTimeouts {
    fn default() -> Self {
        Self {
            request: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            connect: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }
}

/// What `connect`/`attach` do when a success envelope carries no `data.id`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MissingIdPolicy {
    /// Leave the identifier cleared and report `NotConnected`/`NotAttached`.
    #[default]
    Clear,
    /// Fail the call with [`GatewayError::MissingId`].
    Fail,
}

/// Immutable connection settings for one client instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub server_endpoint: String,
    pub admin_endpoint: String,
    /// Merged into every payload as `apisecret` when set.
    pub api_secret: Option<String>,
    pub verify_tls: bool,
    /// Dump every exchange to the `janus_rest::wire` tracing target.
    pub debug: bool,
    pub timeouts: GatewayTimeouts,
    pub missing_id_policy: MissingIdPolicy,
}

impl GatewayConfig {
    /// Config with defaults for everything but the standard endpoint.
    /// The admin endpoint defaults to `<endpoint>/admin`.
    #[must_use]
    pub fn new(server_endpoint: impl Into<String>) -> Self {
        let server_endpoint = trim_endpoint(&server_endpoint.into());
        let admin_endpoint = format!("{server_endpoint}{DEFAULT_ADMIN_SUFFIX}");
        Self {
            server_endpoint,
            admin_endpoint,
            api_secret: None,
            verify_tls: true,
            debug: false,
            timeouts: GatewayTimeouts::default(),
            missing_id_policy: MissingIdPolicy::Clear,
        }
    }

    #[must_use]
    pub fn with_admin_endpoint(mut self, admin_endpoint: impl Into<String>) -> Self {
        self.admin_endpoint = trim_endpoint(&admin_endpoint.into());
        self
    }

    #[must_use]
    pub fn with_api_secret(mut self, api_secret: impl Into<String>) -> Self {
        self.api_secret = Some(api_secret.into());
        self
    }

    #[must_use]
    pub fn with_verify_tls(mut self, verify_tls: bool) -> Self {
        self.verify_tls = verify_tls;
        self
    }

    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    #[must_use]
    pub fn with_timeouts(mut self, timeouts: GatewayTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    #[must_use]
    pub fn with_missing_id_policy(mut self, policy: MissingIdPolicy) -> Self {
        self.missing_id_policy = policy;
        self
    }

    /// Base URL for the given endpoint, without a trailing slash.
    #[must_use]
    pub fn endpoint(&self, endpoint: Endpoint) -> &str {
        match endpoint {
            Endpoint::Standard => &self.server_endpoint,
            Endpoint::Admin => &self.admin_endpoint,
        }
    }

    /// Build typed gateway config from environment variables.
    ///
    /// Required:
    /// - `JANUS_SERVER_ENDPOINT`
    ///
    /// Optional:
    /// - `JANUS_SERVER_ADMIN_ENDPOINT`: default `<endpoint>/admin`
    /// - `JANUS_API_SECRET`
    /// - `JANUS_VERIFY_TLS` (or legacy `JANUS_BACKEND_SSL`): default `true`
    /// - `JANUS_BACKEND_DEBUG`: default `false`
    /// - `JANUS_REQUEST_TIMEOUT_SECS`: default 15
    /// - `JANUS_CONNECT_TIMEOUT_SECS`: default 10
    /// - `JANUS_STRICT_IDS`: default `false`
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::MissingConfig`] when the endpoint is unset and
    /// [`GatewayError::ConfigParse`] for malformed boolean flags.
    pub fn from_env() -> Result<Self, GatewayError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`GatewayConfig::from_env`], reading each `JANUS_*` key
    /// through `lookup`. Lets a binary put its own flags in front of the
    /// environment without a second parser.
    ///
    /// # Errors
    ///
    /// As [`GatewayConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, GatewayError> {
        let endpoint = lookup("JANUS_SERVER_ENDPOINT")
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| GatewayError::MissingConfig { var: "JANUS_SERVER_ENDPOINT".into() })?;
        let mut config = Self::new(endpoint);

        if let Some(admin) = lookup("JANUS_SERVER_ADMIN_ENDPOINT").filter(|s| !s.trim().is_empty()) {
            config = config.with_admin_endpoint(admin);
        }
        config.api_secret = lookup("JANUS_API_SECRET").filter(|s| !s.is_empty());

        let verify = lookup("JANUS_VERIFY_TLS").or_else(|| lookup("JANUS_BACKEND_SSL"));
        config.verify_tls = parse_flag("JANUS_VERIFY_TLS", verify.as_deref(), true)?;
        config.debug = parse_flag("JANUS_BACKEND_DEBUG", lookup("JANUS_BACKEND_DEBUG").as_deref(), false)?;
        if parse_flag("JANUS_STRICT_IDS", lookup("JANUS_STRICT_IDS").as_deref(), false)? {
            config.missing_id_policy = MissingIdPolicy::Fail;
        }

        config.timeouts = GatewayTimeouts {
            request: Duration::from_secs(parse_u64(
                lookup("JANUS_REQUEST_TIMEOUT_SECS").as_deref(),
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )),
            connect: Duration::from_secs(parse_u64(
                lookup("JANUS_CONNECT_TIMEOUT_SECS").as_deref(),
                DEFAULT_CONNECT_TIMEOUT_SECS,
            )),
        };

        Ok(config)
    }
}

// =============================================================================
// PARSING
// =============================================================================

fn trim_endpoint(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

fn parse_u64(raw: Option<&str>, default: u64) -> u64 {
    raw.and_then(|v| v.trim().parse::<u64>().ok()).unwrap_or(default)
}

fn parse_flag(key: &str, raw: Option<&str>, default: bool) -> Result<bool, GatewayError> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "" => Ok(default),
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(GatewayError::ConfigParse(format!("{key}: expected a boolean, got '{other}'"))),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
