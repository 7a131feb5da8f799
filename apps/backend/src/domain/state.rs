use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use ulid::Ulid;
use uuid::Uuid;

use crate::domain::rules::{LobbyRules, DECK_SIZE};
use crate::domain::{Card, Color};
use crate::errors::domain::{DomainError, IllegalMoveKind, NotFoundKind, UnauthorizedKind};

/// Persistent player identity, stable across reconnects. Supplied by the
/// client in `hello` (typically a wallet address).
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LobbyId(Ulid);

impl LobbyId {
    pub fn generate() -> Self {
        Self(Ulid::new())
    }
}

impl fmt::Display for LobbyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for LobbyId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ulid::from_string(s)
            .map(LobbyId)
            .map_err(|_| DomainError::not_found(NotFoundKind::Lobby, format!("Lobby {s}")))
    }
}

/// Identifier of the escrow contract's lobby record.
pub type OnchainLobbyId = u64;

/// Handle of one websocket connection. A player's handle changes on
/// reconnect, so pushes addressed to an old handle are dropped.
pub type ConnectionId = Uuid;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LobbyKind {
    Public,
    Private,
    Paid,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LobbyStatus {
    Waiting,
    InGame,
    Finished,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Clockwise,
    CounterClockwise,
}

impl Direction {
    /// +1 or −1.
    pub fn sign(self) -> i64 {
        match self {
            Direction::Clockwise => 1,
            Direction::CounterClockwise => -1,
        }
    }

    pub fn flipped(self) -> Self {
        match self {
            Direction::Clockwise => Direction::CounterClockwise,
            Direction::CounterClockwise => Direction::Clockwise,
        }
    }
}

/// A Wild was played and its owner still has to name a color.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ColorChoice {
    pub player_id: PlayerId,
    /// Hand index the Wild was played from.
    pub card_index: usize,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct WinnerEntry {
    pub player_id: PlayerId,
    pub rank: u32,
}

#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub display_name: String,
    /// Current transport; `None` while disconnected.
    pub connection: Option<ConnectionId>,
    pub hand: Vec<Card>,
    pub is_host: bool,
    pub is_connected: bool,
    pub joined_at: OffsetDateTime,
    pub disconnected_at: Option<OffsetDateTime>,
    /// Bumped on every disconnect so a stale grace timer can tell it lost
    /// the race against a reconnect.
    pub disconnect_epoch: u64,
}

impl Player {
    pub fn new(id: PlayerId, display_name: impl Into<String>, connection: ConnectionId) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            connection: Some(connection),
            hand: Vec::new(),
            is_host: false,
            is_connected: true,
            joined_at: OffsetDateTime::now_utc(),
            disconnected_at: None,
            disconnect_epoch: 0,
        }
    }
}

/// Full state of one lobby, including its game.
#[derive(Debug, Clone)]
pub struct Lobby {
    pub id: LobbyId,
    pub name: String,
    pub kind: LobbyKind,
    pub host_id: PlayerId,
    pub capacity: usize,
    /// Active rotation; order is join order.
    pub players: Vec<Player>,
    /// Ranked players out of the rotation. Still members until teardown.
    pub finished_players: Vec<Player>,
    pub status: LobbyStatus,
    pub draw_pile: Vec<Card>,
    /// Top is the last element.
    pub discard_pile: Vec<Card>,
    pub turn_index: usize,
    pub direction: Direction,
    pub active_color: Option<Color>,
    pub pending_draw_count: u32,
    pub pending_draw_active: bool,
    pub has_drawn_this_turn: HashSet<PlayerId>,
    pub color_choice: Option<ColorChoice>,
    pub winners: Vec<WinnerEntry>,
    /// Players seated when the game started; fixes the winners target.
    pub starting_players: usize,
    pub rules: LobbyRules,
    pub password_hash: Option<[u8; 32]>,
    pub onchain_lobby_id: Option<OnchainLobbyId>,
    pub used_payment_proofs: HashSet<String>,
    pub created_at: OffsetDateTime,
}

impl Lobby {
    pub fn new(
        id: LobbyId,
        name: impl Into<String>,
        kind: LobbyKind,
        host_id: PlayerId,
        capacity: usize,
        rules: LobbyRules,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            host_id,
            capacity,
            players: Vec::new(),
            finished_players: Vec::new(),
            status: LobbyStatus::Waiting,
            draw_pile: Vec::new(),
            discard_pile: Vec::new(),
            turn_index: 0,
            direction: Direction::Clockwise,
            active_color: None,
            pending_draw_count: 0,
            pending_draw_active: false,
            has_drawn_this_turn: HashSet::new(),
            color_choice: None,
            winners: Vec::new(),
            starting_players: 0,
            rules,
            password_hash: None,
            onchain_lobby_id: None,
            used_payment_proofs: HashSet::new(),
            created_at: OffsetDateTime::now_utc(),
        }
    }

    pub fn top_card(&self) -> Option<&Card> {
        self.discard_pile.last()
    }

    pub fn player_index(&self, id: &PlayerId) -> Option<usize> {
        self.players.iter().position(|p| &p.id == id)
    }

    pub fn player(&self, id: &PlayerId) -> Option<&Player> {
        self.players
            .iter()
            .chain(self.finished_players.iter())
            .find(|p| &p.id == id)
    }

    pub fn player_mut(&mut self, id: &PlayerId) -> Option<&mut Player> {
        self.players
            .iter_mut()
            .chain(self.finished_players.iter_mut())
            .find(|p| &p.id == id)
    }

    pub fn is_member(&self, id: &PlayerId) -> bool {
        self.player(id).is_some()
    }

    /// Everyone who receives lobby broadcasts.
    pub fn member_ids(&self) -> Vec<PlayerId> {
        self.players
            .iter()
            .chain(self.finished_players.iter())
            .map(|p| p.id.clone())
            .collect()
    }

    pub fn member_count(&self) -> usize {
        self.players.len() + self.finished_players.len()
    }

    pub fn current_player(&self) -> Option<&Player> {
        if self.status != LobbyStatus::InGame {
            return None;
        }
        self.players.get(self.turn_index)
    }

    pub fn is_ranked(&self, id: &PlayerId) -> bool {
        self.winners.iter().any(|w| &w.player_id == id)
    }

    pub fn total_cards(&self) -> usize {
        self.draw_pile.len()
            + self.discard_pile.len()
            + self
                .players
                .iter()
                .chain(self.finished_players.iter())
                .map(|p| p.hand.len())
                .sum::<usize>()
    }
}

pub fn require_in_game(lobby: &Lobby) -> Result<(), DomainError> {
    if lobby.status != LobbyStatus::InGame {
        return Err(DomainError::illegal(
            IllegalMoveKind::GameNotInProgress,
            format!("Lobby {} is not in a game", lobby.id),
        ));
    }
    Ok(())
}

/// Index of `actor` in the rotation, provided it is their turn.
pub fn require_turn(lobby: &Lobby, actor: &PlayerId) -> Result<usize, DomainError> {
    require_in_game(lobby)?;
    let idx = lobby.player_index(actor).ok_or_else(|| {
        if lobby.is_member(actor) {
            DomainError::unauthorized(UnauthorizedKind::NotYourTurn, "Player has finished")
        } else {
            DomainError::unauthorized(UnauthorizedKind::NotAMember, format!("Player {actor}"))
        }
    })?;
    if idx != lobby.turn_index {
        return Err(DomainError::unauthorized(
            UnauthorizedKind::NotYourTurn,
            format!("It is not {actor}'s turn"),
        ));
    }
    Ok(idx)
}

pub fn require_top_card(lobby: &Lobby, ctx: &'static str) -> Result<Card, DomainError> {
    lobby.top_card().copied().ok_or_else(|| {
        DomainError::invariant(format!("discard pile must not be empty ({ctx})"))
    })
}

pub fn require_active_color(lobby: &Lobby, ctx: &'static str) -> Result<Color, DomainError> {
    lobby
        .active_color
        .ok_or_else(|| DomainError::invariant(format!("active color must be set ({ctx})")))
}

/// Card conservation and turn-index range. Only meaningful during a game.
pub fn check_invariants(lobby: &Lobby) -> Result<(), DomainError> {
    if lobby.status != LobbyStatus::InGame {
        return Ok(());
    }
    let total = lobby.total_cards();
    if total != DECK_SIZE {
        return Err(DomainError::invariant(format!(
            "card count is {total}, expected {DECK_SIZE}"
        )));
    }
    if !lobby.players.is_empty() && lobby.turn_index >= lobby.players.len() {
        return Err(DomainError::invariant(format!(
            "turn index {} out of range for {} players",
            lobby.turn_index,
            lobby.players.len()
        )));
    }
    Ok(())
}
