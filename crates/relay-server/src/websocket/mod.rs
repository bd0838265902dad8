//! WebSocket sessions: connection state, frame dispatch, and fan-out.

pub mod connection;
pub mod fanout;
pub mod handler;
pub mod session;
