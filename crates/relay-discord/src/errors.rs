//! Gateway listener errors.

use thiserror::Error;

/// Close code the gateway sends for an invalid bot token.
pub const CLOSE_AUTHENTICATION_FAILED: u16 = 4004;

/// Why the gateway listener stopped.
///
/// Every variant is terminal for the listener; nothing reconnects.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// The WebSocket handshake failed.
    #[error("failed to connect to gateway: {0}")]
    Connect(String),
    /// Reading or writing the socket failed mid-session.
    #[error("gateway transport error: {0}")]
    Transport(String),
    /// The gateway sent something the listener could not interpret.
    #[error("gateway protocol error: {0}")]
    Protocol(String),
    /// The bot token was rejected (close code 4004).
    #[error("gateway rejected the bot token")]
    AuthenticationFailed,
    /// The gateway closed the connection.
    #[error("gateway closed the connection (code {code}): {reason}")]
    Closed {
        /// WebSocket close code.
        code: u16,
        /// Close reason text, possibly empty.
        reason: String,
    },
    /// No heartbeat ack arrived before the next heartbeat was due.
    #[error("gateway stopped acknowledging heartbeats")]
    HeartbeatTimeout,
    /// The gateway asked the client to reconnect (op 7).
    #[error("gateway requested a reconnect")]
    ReconnectRequested,
    /// The gateway invalidated the session (op 9).
    #[error("gateway invalidated the session")]
    InvalidSession,
}

impl GatewayError {
    /// Map a close frame to an error.
    pub fn from_close(code: u16, reason: &str) -> Self {
        if code == CLOSE_AUTHENTICATION_FAILED {
            Self::AuthenticationFailed
        } else {
            Self::Closed {
                code,
                reason: reason.to_owned(),
            }
        }
    }
}
