//! # relay-server
//!
//! Web side of the chat relay.
//!
//! - [`relay::Relay`]: the hub that owns the message cache, the session
//!   registry, and the outbound webhook
//! - [`server::RelayServer`]: Axum router (`/`, `/static/js/script.js`,
//!   `/health`, `/metrics`, `/ws`) and listener
//! - [`websocket`]: per-session tasks, connection state, fan-out
//! - [`bridge`]: runs the gateway listener and feeds its events to the hub
//! - Graceful shutdown via [`shutdown::ShutdownCoordinator`]

#![deny(unsafe_code)]

pub mod bridge;
pub mod config;
pub mod health;
pub mod metrics;
pub mod page;
pub mod relay;
pub mod server;
pub mod shutdown;
pub mod websocket;

#[cfg(test)]
mod test_support;
