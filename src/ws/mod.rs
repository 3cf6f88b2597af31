//! WebSocket transport, wire protocol and per-connection sessions

pub mod handler;
pub mod hub;
pub mod protocol;
pub mod session;

pub use handler::ws_handler;
