//! REST client for the Janus WebRTC gateway.
//!
//! ARCHITECTURE
//! ============
//! ```text
//! VideoRoom ─▶ PluginHost ─▶ Janus (state machine) ─▶ GatewayServer (HTTP) ─▶ gateway
//! ```
//!
//! - [`GatewayServer`] performs one addressed, correlated HTTP exchange and
//!   classifies failures as transport or protocol errors.
//! - [`Janus`] sequences create/attach/message/detach/destroy and owns every
//!   state transition.
//! - [`plugins`] layers typed plugin vocabularies on top.
//!
//! One instance handles one logical session at a time; every wire call
//! takes `&mut self`.

pub mod config;
pub mod janus;
pub mod plugins;
pub mod server;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use config::{GatewayConfig, GatewayTimeouts, MissingIdPolicy};
pub use janus::Janus;
pub use plugins::videoroom::{AllowedAction, VideoRoom};
pub use plugins::{JanusPlugin, PluginHost};
pub use server::GatewayServer;
pub use types::{
    AttachOutcome, ConnectOutcome, Endpoint, ErrorCode, GatewayError, GatewayId, PingResult, ServerDetails,
    SessionState, Teardown, TransportCause, Verb,
};
