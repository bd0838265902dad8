//! # relay-discord
//!
//! Platform side of the chat relay.
//!
//! - **Gateway**: [`gateway::GatewayListener`] holds one Discord Gateway
//!   connection and forwards `READY` and `MESSAGE_CREATE` as
//!   [`gateway::ListenerEvent`]s over an `mpsc` channel
//! - **Webhook**: [`webhook::DiscordWebhook`], the `reqwest` implementation of
//!   [`relay_core::WebhookClient`]
//!
//! Neither side retries. A failed gateway connection ends the listener with a
//! [`errors::GatewayError`].

#![deny(unsafe_code)]

pub mod errors;
pub mod gateway;
pub mod protocol;
pub mod webhook;

pub use errors::GatewayError;
pub use gateway::{GatewayConfig, GatewayListener, ListenerEvent};
pub use webhook::DiscordWebhook;
