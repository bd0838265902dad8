//! # relay-core
//!
//! Foundation types for the chat relay.
//!
//! - **IDs**: [`ids::SessionId`] for live browser sessions
//! - **Messages**: [`message::CachedMessage`] and [`message::InboundEvent`]
//! - **Cache**: [`cache::MessageBuffer`], the bounded FIFO of relayed messages
//! - **Registry**: [`registry::SessionRegistry`], display names per session
//! - **Wire events**: [`events::ServerEvent`] and [`events::ClientFrame`]
//! - **Webhook**: [`webhook::WebhookClient`] trait and [`webhook::WebhookPayload`]
//! - **Errors**: [`errors::RelayError`]
//! - **Logging**: [`logging::init_subscriber`]
//!
//! ## Crate Position
//!
//! Foundation crate. Depended on by all other relay crates.

#![deny(unsafe_code)]

pub mod cache;
pub mod errors;
pub mod events;
pub mod ids;
pub mod logging;
pub mod message;
pub mod registry;
pub mod webhook;

pub use cache::{MAX_CACHE_SIZE, MessageBuffer};
pub use errors::RelayError;
pub use events::{ClientEvent, ClientFrame, FrameError, ServerEvent};
pub use ids::SessionId;
pub use logging::{LogFormat, init_subscriber};
pub use message::{CachedMessage, InboundEvent};
pub use registry::{DEFAULT_DISPLAY_NAME, SessionRegistry};
pub use webhook::{WEB_USER_LABEL, WebhookClient, WebhookPayload};
