use std::sync::Arc;

use time::OffsetDateTime;

use crate::services::lobbies::LobbyManager;
use crate::ws::hub::ConnectionRegistry;

/// Application state shared by every worker.
#[derive(Clone)]
pub struct AppState {
    /// The one lobby manager for this process.
    pub lobbies: LobbyManager,
    pub started_at: OffsetDateTime,
}

impl AppState {
    pub fn new(lobbies: LobbyManager) -> Self {
        Self {
            lobbies,
            started_at: OffsetDateTime::now_utc(),
        }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        self.lobbies.registry()
    }
}
