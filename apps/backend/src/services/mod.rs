//! Services: the lobby manager and what it needs around the pure engine.

pub mod game_flow;
pub mod grace;
pub mod lobbies;

pub use grace::GraceTimers;
pub use lobbies::{CreateLobby, LobbyManager, Resume};
