//! VideoRoom plugin (`janus.plugin.videoroom`) room management requests.
//!
//! Every method is one [`PluginHost::request`]: it returns the plugin's
//! `plugindata.data` object and tears the session down afterwards unless
//! [`VideoRoom::without_disconnect`] was called.

use serde::Serialize;
use serde_json::{Map, Value, json};

use super::{JanusPlugin, PluginHost};
use crate::janus::Janus;
use crate::server::random_token;
use crate::types::{GatewayError, Teardown};

pub const PLUGIN_NAME: &str = "janus.plugin.videoroom";

const STATUS_KEY: &str = "videoroom";

const PIN_LEN: usize = 6;
const SECRET_LEN: usize = 12;
const DESCRIPTION_LEN: usize = 10;

// Expected `videoroom` status per request.
const SUCCESS: &str = "success";
const CREATED: &str = "created";
const EDITED: &str = "edited";
const DESTROYED: &str = "destroyed";
const PARTICIPANTS: &str = "participants";
const FORWARDERS: &str = "forwarders";

#[derive(Debug, Clone, Copy, Default)]
pub struct VideoRoomPlugin;

impl JanusPlugin for VideoRoomPlugin {
    fn name(&self) -> &'static str {
        PLUGIN_NAME
    }

    fn status_key(&self) -> &'static str {
        STATUS_KEY
    }
}

/// `allowed` request actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AllowedAction {
    /// Start checking tokens on join.
    Enable,
    /// Stop checking tokens.
    Disable,
    Add,
    Remove,
}

pub struct VideoRoom {
    host: PluginHost<VideoRoomPlugin>,
    admin_key: Option<String>,
}

impl VideoRoom {
    #[must_use]
    pub fn new(janus: Janus) -> Self {
        Self { host: PluginHost::new(janus, VideoRoomPlugin), admin_key: None }
    }

    /// Admin key sent with `create`, required when the plugin is configured
    /// with `admin_key`.
    #[must_use]
    pub fn with_admin_key(mut self, admin_key: Option<String>) -> Self {
        self.admin_key = admin_key.filter(|k| !k.is_empty());
        self
    }

    #[must_use]
    pub fn host(&self) -> &PluginHost<VideoRoomPlugin> {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut PluginHost<VideoRoomPlugin> {
        &mut self.host
    }

    pub fn without_disconnect(&mut self) -> &mut Self {
        self.host.without_disconnect();
        self
    }

    pub async fn disconnect(&mut self, force: bool) -> Teardown {
        self.host.disconnect(force).await
    }

    // =========================================================================
    // ROOMS
    // =========================================================================

    /// All rooms on the server (`list` key of the returned data).
    ///
    /// # Errors
    ///
    /// Transport, protocol or plugin status errors.
    pub async fn list(&mut self) -> Result<Value, GatewayError> {
        self.host.request("list", Map::new(), SUCCESS).await
    }

    /// # Errors
    ///
    /// Transport, protocol or plugin status errors.
    pub async fn exists(&mut self, room: u64) -> Result<bool, GatewayError> {
        let data = self.host.request("exists", room_params(room, None), SUCCESS).await?;
        Ok(data.get("exists").and_then(Value::as_bool).unwrap_or(false))
    }

    /// Create a room. `params` override the defaults below. A random pin
    /// and secret are generated unless disabled; the returned data carries
    /// the effective `pin` and `secret` (null when unset).
    ///
    /// # Errors
    ///
    /// Transport, protocol or plugin status errors.
    pub async fn create(
        &mut self,
        params: Map<String, Value>,
        use_pin: bool,
        use_secret: bool,
    ) -> Result<Value, GatewayError> {
        let mut payload = self.create_defaults(use_pin, use_secret);
        payload.extend(params);
        let pin = credential(&payload, "pin");
        let secret = credential(&payload, "secret");

        let mut data = self.host.request("create", payload, CREATED).await?;
        if let Value::Object(data) = &mut data {
            data.insert("pin".to_owned(), pin);
            data.insert("secret".to_owned(), secret);
        }
        Ok(data)
    }

    /// # Errors
    ///
    /// Transport, protocol or plugin status errors.
    pub async fn edit(
        &mut self,
        room: u64,
        params: Map<String, Value>,
        secret: Option<&str>,
    ) -> Result<Value, GatewayError> {
        let mut payload = room_params(room, secret);
        payload.extend(params);
        self.host.request("edit", payload, EDITED).await
    }

    /// # Errors
    ///
    /// Transport, protocol or plugin status errors.
    pub async fn destroy(&mut self, room: u64, secret: Option<&str>) -> Result<Value, GatewayError> {
        self.host.request("destroy", room_params(room, secret), DESTROYED).await
    }

    /// Toggle token checks or edit the list of tokens allowed to join.
    ///
    /// # Errors
    ///
    /// Transport, protocol or plugin status errors.
    pub async fn allowed(
        &mut self,
        room: u64,
        action: AllowedAction,
        allowed: Option<&[String]>,
        secret: Option<&str>,
    ) -> Result<Value, GatewayError> {
        let mut payload = room_params(room, secret);
        payload.insert("action".to_owned(), json!(action));
        if let Some(allowed) = allowed {
            payload.insert("allowed".to_owned(), json!(allowed));
        }
        self.host.request("allowed", payload, SUCCESS).await
    }

    // =========================================================================
    // PARTICIPANTS
    // =========================================================================

    /// # Errors
    ///
    /// Transport, protocol or plugin status errors.
    pub async fn kick(&mut self, room: u64, participant: u64, secret: Option<&str>) -> Result<Value, GatewayError> {
        let mut payload = room_params(room, secret);
        payload.insert("id".to_owned(), json!(participant));
        self.host.request("kick", payload, SUCCESS).await
    }

    /// # Errors
    ///
    /// Transport, protocol or plugin status errors.
    pub async fn list_participants(&mut self, room: u64) -> Result<Value, GatewayError> {
        self.host.request("listparticipants", room_params(room, None), PARTICIPANTS).await
    }

    /// # Errors
    ///
    /// Transport, protocol or plugin status errors.
    pub async fn list_forwarders(&mut self, room: u64, secret: Option<&str>) -> Result<Value, GatewayError> {
        self.host.request("listforwarders", room_params(room, secret), FORWARDERS).await
    }

    /// Mute or unmute one stream (`mid`) of a participant, or all of them.
    ///
    /// # Errors
    ///
    /// Transport, protocol or plugin status errors.
    pub async fn moderate(
        &mut self,
        room: u64,
        participant: u64,
        mute: bool,
        mid: Option<&str>,
        secret: Option<&str>,
    ) -> Result<Value, GatewayError> {
        let mut payload = room_params(room, secret);
        payload.insert("id".to_owned(), json!(participant));
        payload.insert("mute".to_owned(), json!(mute));
        if let Some(mid) = mid {
            payload.insert("mid".to_owned(), json!(mid));
        }
        self.host.request("moderate", payload, SUCCESS).await
    }

    /// # Errors
    ///
    /// Transport, protocol or plugin status errors.
    pub async fn enable_recording(
        &mut self,
        room: u64,
        record: bool,
        secret: Option<&str>,
        pin: Option<&str>,
    ) -> Result<Value, GatewayError> {
        let mut payload = room_params(room, secret);
        payload.insert("record".to_owned(), json!(record));
        if let Some(pin) = pin {
            payload.insert("pin".to_owned(), json!(pin));
        }
        self.host.request("enable_recording", payload, SUCCESS).await
    }

    fn create_defaults(&self, use_pin: bool, use_secret: bool) -> Map<String, Value> {
        let mut payload = Map::new();
        payload.insert("publishers".to_owned(), json!(2));
        payload.insert("description".to_owned(), json!(random_token(DESCRIPTION_LEN)));
        payload.insert("audiolevel_event".to_owned(), json!(true));
        payload.insert("audiolevel_ext".to_owned(), json!(true));
        payload.insert("audio_active_packets".to_owned(), json!(50));
        payload.insert("audio_level_average".to_owned(), json!(25));
        payload.insert("notify_joining".to_owned(), json!(true));
        payload.insert("bitrate".to_owned(), json!(600_000));
        if use_pin {
            payload.insert("pin".to_owned(), json!(random_token(PIN_LEN)));
        }
        if use_secret {
            payload.insert("secret".to_owned(), json!(random_token(SECRET_LEN)));
        }
        if let Some(admin_key) = &self.admin_key {
            payload.insert("admin_key".to_owned(), json!(admin_key));
        }
        payload
    }
}

// =============================================================================
// HELPERS
// =============================================================================

/// `room` plus `secret` when one is given.
fn room_params(room: u64, secret: Option<&str>) -> Map<String, Value> {
    let mut params = Map::new();
    params.insert("room".to_owned(), json!(room));
    if let Some(secret) = secret.filter(|s| !s.is_empty()) {
        params.insert("secret".to_owned(), json!(secret));
    }
    params
}

/// The credential sent in the create payload, or null when absent or empty.
fn credential(payload: &Map<String, Value>, key: &str) -> Value {
    match payload.get(key) {
        None => Value::Null,
        Some(Value::String(s)) if s.is_empty() => Value::Null,
        Some(value) => value.clone(),
    }
}

#[cfg(test)]
#[path = "videoroom_test.rs"]
mod tests;
