//! Plugin layer: typed request vocabularies on top of [`Janus`].
//!
//! DESIGN
//! ======
//! A plugin is a small capability contract ([`JanusPlugin`]: name, status
//! key, payload shape) composed with a [`PluginHost`], which owns the
//! orchestrator and the shared call pattern:
//!
//! ```text
//! emit (connect + attach if needed) → check plugindata status → read data → auto-disconnect
//! ```
//!
//! Auto-disconnect tears the session down after every call. For a batch of
//! calls, switch it off with [`PluginHost::without_disconnect`] and finish
//! with `disconnect(true)`.

pub mod videoroom;

use serde_json::{Map, Value};

use crate::janus::Janus;
use crate::types::{GatewayError, Teardown};

/// Key of the request verb inside a plugin message body.
pub const REQUEST_FIELD: &str = "request";

// =============================================================================
// CONTRACT
// =============================================================================

pub trait JanusPlugin {
    /// Fully-qualified plugin name sent with `attach`, e.g.
    /// `janus.plugin.videoroom`.
    fn name(&self) -> &'static str;

    /// Key inside `plugindata.data` that carries the plugin's status.
    fn status_key(&self) -> &'static str;

    /// Message body for `request`. `params` override anything set here.
    fn build_payload(&self, request: &str, params: Map<String, Value>) -> Map<String, Value> {
        let mut payload = Map::new();
        payload.insert(REQUEST_FIELD.to_owned(), Value::String(request.to_owned()));
        payload.extend(params);
        payload
    }
}

// =============================================================================
// HOST
// =============================================================================

pub struct PluginHost<P> {
    janus: Janus,
    plugin: P,
    auto_disconnect: bool,
}

impl<P: JanusPlugin> PluginHost<P> {
    #[must_use]
    pub fn new(janus: Janus, plugin: P) -> Self {
        Self { janus, plugin, auto_disconnect: true }
    }

    #[must_use]
    pub fn plugin(&self) -> &P {
        &self.plugin
    }

    #[must_use]
    pub fn janus(&self) -> &Janus {
        &self.janus
    }

    pub fn janus_mut(&mut self) -> &mut Janus {
        &mut self.janus
    }

    #[must_use]
    pub fn into_janus(self) -> Janus {
        self.janus
    }

    #[must_use]
    pub fn auto_disconnect(&self) -> bool {
        self.auto_disconnect
    }

    /// Keep the session open between calls until `disconnect(true)`.
    pub fn without_disconnect(&mut self) -> &mut Self {
        self.auto_disconnect = false;
        self
    }

    /// Tear the session down if auto-disconnect is on or `force` is set.
    /// Otherwise nothing is sent and [`Teardown::Skipped`] is returned.
    pub async fn disconnect(&mut self, force: bool) -> Teardown {
        if self.auto_disconnect || force {
            self.janus.disconnect().await
        } else {
            Teardown::Skipped
        }
    }

    /// Send `body` to this plugin, connecting and attaching when needed.
    ///
    /// # Errors
    ///
    /// See [`Janus::emit_to_plugin`].
    pub async fn emit(&mut self, body: Map<String, Value>) -> Result<Value, GatewayError> {
        self.janus.emit_to_plugin(self.plugin.name(), Value::Object(body)).await
    }

    /// A top-level field of the last outbound payload.
    #[must_use]
    pub fn plugin_payload(&self, key: &str) -> Option<&Value> {
        self.janus.server().last_payload_field(key)
    }

    /// A field of the last response's `plugindata.data`.
    #[must_use]
    pub fn plugin_response(&self, key: &str) -> Option<&Value> {
        self.janus.server().plugin_data_field(key)
    }

    /// Check the plugin status of the last response.
    ///
    /// # Errors
    ///
    /// [`GatewayError::UnexpectedPluginResponse`] when the status key is
    /// missing or differs from `expected`.
    pub fn expect_status(&self, expected: &str) -> Result<(), GatewayError> {
        let found = self.plugin_response(self.plugin.status_key()).and_then(Value::as_str);
        if found == Some(expected) {
            return Ok(());
        }
        let server = self.janus.server();
        Err(GatewayError::UnexpectedPluginResponse {
            plugin: self.plugin.name().to_owned(),
            expected: expected.to_owned(),
            found: found.map(ToOwned::to_owned),
            payload: server.last_payload().cloned().unwrap_or(Value::Null),
            response: server.last_response().cloned().unwrap_or(Value::Null),
        })
    }

    /// Run one plugin request: emit, check for `expected`, return
    /// `plugindata.data`, then auto-disconnect. The teardown also runs when
    /// the request fails.
    ///
    /// # Errors
    ///
    /// Any error from [`PluginHost::emit`] or [`PluginHost::expect_status`].
    pub async fn call(&mut self, body: Map<String, Value>, expected: &str) -> Result<Value, GatewayError> {
        let result = self.exchange(body, expected).await;
        self.disconnect(false).await;
        result
    }

    /// [`PluginHost::call`] with the body built by the plugin contract.
    ///
    /// # Errors
    ///
    /// As [`PluginHost::call`].
    pub async fn request(
        &mut self,
        request: &str,
        params: Map<String, Value>,
        expected: &str,
    ) -> Result<Value, GatewayError> {
        let body = self.plugin.build_payload(request, params);
        self.call(body, expected).await
    }

    async fn exchange(&mut self, body: Map<String, Value>, expected: &str) -> Result<Value, GatewayError> {
        self.emit(body).await?;
        self.expect_status(expected)?;
        Ok(self.janus.server().plugin_data().cloned().unwrap_or(Value::Null))
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
