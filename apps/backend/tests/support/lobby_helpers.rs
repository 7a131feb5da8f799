// Lobby manager fixtures: a manager with a short grace period and
// players driven directly through the manager, without a socket.

use std::sync::Arc;
use std::time::Duration;

use backend::adapters::payment_oracle::{InMemoryPaymentOracle, PaymentOracle};
use backend::config::GameConfig;
use backend::domain::state::{ConnectionId, LobbyId, LobbyKind, PlayerId};
use backend::domain::Card;
use backend::services::lobbies::{CreateLobby, LobbyManager, Resume};
use backend::ws::hub::ConnectionRegistry;
use backend::ws::protocol::ServerMsg;
use backend_test_support::unique_helpers::{unique_player, unique_str};
use tokio::sync::mpsc::UnboundedReceiver;
use uuid::Uuid;

pub const TEST_GRACE: Duration = Duration::from_millis(100);

/// Comfortably longer than `TEST_GRACE`, so an expiry has run.
pub const PAST_GRACE: Duration = Duration::from_millis(400);

pub fn test_config() -> GameConfig {
    GameConfig {
        grace_period: TEST_GRACE,
        ..GameConfig::default()
    }
}

pub fn manager() -> LobbyManager {
    manager_with(test_config(), Arc::new(InMemoryPaymentOracle::new()))
}

pub fn manager_with(config: GameConfig, oracle: Arc<dyn PaymentOracle>) -> LobbyManager {
    LobbyManager::new(config, oracle, Arc::new(ConnectionRegistry::new()))
}

/// A player as the manager sees one: identity, live connection and the
/// receiving end of their push channel.
pub struct Seat {
    pub id: PlayerId,
    pub name: String,
    pub conn: ConnectionId,
    pub rx: UnboundedReceiver<ServerMsg>,
}

impl Seat {
    pub async fn connect(lobbies: &LobbyManager, prefix: &str) -> Self {
        Self::connect_as(lobbies, PlayerId::new(unique_player(prefix)), prefix).await
    }

    pub async fn connect_as(lobbies: &LobbyManager, id: PlayerId, name: &str) -> Self {
        let conn = Uuid::new_v4();
        let (rx, _) = lobbies.connect(&id, conn).await;
        Self {
            id,
            name: name.to_string(),
            conn,
            rx,
        }
    }

    /// New transport for the same player.
    pub async fn reconnect(&mut self, lobbies: &LobbyManager) -> Option<Resume> {
        self.conn = Uuid::new_v4();
        let (rx, resume) = lobbies.connect(&self.id, self.conn).await;
        self.rx = rx;
        resume
    }

    /// What the websocket session does when its socket goes away.
    pub async fn disconnect(&self, lobbies: &LobbyManager) {
        lobbies.registry().unregister(&self.id, self.conn);
        lobbies.handle_disconnect(&self.id, self.conn).await;
    }

    pub fn drain(&mut self) -> Vec<ServerMsg> {
        let mut out = Vec::new();
        while let Ok(msg) = self.rx.try_recv() {
            out.push(msg);
        }
        out
    }

    /// Latest private hand pushed to this seat, consuming the backlog.
    pub fn last_hand(&mut self) -> Option<Vec<Card>> {
        self.drain().into_iter().rev().find_map(|msg| match msg {
            ServerMsg::YourHand { hand, .. } => Some(hand),
            _ => None,
        })
    }
}

pub fn public_lobby() -> CreateLobby {
    CreateLobby {
        name: unique_str("table"),
        kind: LobbyKind::Public,
        capacity: None,
        password: None,
        payment: None,
    }
}

pub async fn open_lobby(lobbies: &LobbyManager, host: &Seat) -> LobbyId {
    lobbies
        .create_lobby(&host.id, &host.name, host.conn, public_lobby())
        .await
        .expect("create lobby")
        .id
}

pub async fn join(lobbies: &LobbyManager, lobby_id: &LobbyId, seat: &Seat) {
    lobbies
        .join_lobby(lobby_id, &seat.id, &seat.name, seat.conn, None, None)
        .await
        .expect("join lobby");
}

/// `n` players seated in a running game; the first seat is host and holds
/// the opening turn.
pub async fn started_game(lobbies: &LobbyManager, n: usize) -> (LobbyId, Vec<Seat>) {
    let mut seats = Vec::with_capacity(n);
    for i in 0..n {
        seats.push(Seat::connect(lobbies, &format!("p{i}")).await);
    }
    let lobby_id = open_lobby(lobbies, &seats[0]).await;
    for seat in &seats[1..] {
        join(lobbies, &lobby_id, seat).await;
    }
    lobbies
        .start_game(&lobby_id, &seats[0].id)
        .await
        .expect("start game");
    (lobby_id, seats)
}
