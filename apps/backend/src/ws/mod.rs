//! Websocket transport: wire protocol, connection registry and the
//! per-socket session actor.

pub mod hub;
pub mod protocol;
pub mod session;

pub use hub::ConnectionRegistry;
pub use protocol::{ClientMsg, ServerMsg, PROTOCOL_VERSION};
