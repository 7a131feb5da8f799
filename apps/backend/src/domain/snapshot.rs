//! Public views of a lobby: listing summaries, the shared table view and a
//! player's own hand. Hands of other players are never exposed, only counts.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::domain::cards_logic::playable_indices;
use crate::domain::state::{
    Direction, Lobby, LobbyId, LobbyKind, LobbyStatus, OnchainLobbyId, Player, PlayerId,
    WinnerEntry,
};
use crate::domain::{Card, Color};

/// Listing entry. Rebuilt after every mutation and stored next to the
/// lobby so listings never touch lobby state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LobbySummary {
    pub id: LobbyId,
    pub name: String,
    pub kind: LobbyKind,
    pub status: LobbyStatus,
    pub host_id: PlayerId,
    pub player_count: usize,
    pub capacity: usize,
    pub has_password: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub onchain_lobby_id: Option<OnchainLobbyId>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<&Lobby> for LobbySummary {
    fn from(lobby: &Lobby) -> Self {
        Self {
            id: lobby.id,
            name: lobby.name.clone(),
            kind: lobby.kind,
            status: lobby.status,
            host_id: lobby.host_id.clone(),
            player_count: lobby.member_count(),
            capacity: lobby.capacity,
            has_password: lobby.password_hash.is_some(),
            onchain_lobby_id: lobby.onchain_lobby_id,
            created_at: lobby.created_at,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerPublic {
    pub id: PlayerId,
    pub display_name: String,
    pub card_count: usize,
    pub is_host: bool,
    pub is_connected: bool,
    /// Set once the player is ranked.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<u32>,
}

impl PlayerPublic {
    fn of(player: &Player, lobby: &Lobby) -> Self {
        Self {
            id: player.id.clone(),
            display_name: player.display_name.clone(),
            card_count: player.hand.len(),
            is_host: player.is_host,
            is_connected: player.is_connected,
            rank: lobby
                .winners
                .iter()
                .find(|w| w.player_id == player.id)
                .map(|w| w.rank),
        }
    }
}

/// Shared table view sent to every member.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LobbySnapshot {
    pub id: LobbyId,
    pub name: String,
    pub kind: LobbyKind,
    pub status: LobbyStatus,
    pub host_id: PlayerId,
    pub capacity: usize,
    /// Active rotation in turn order.
    pub players: Vec<PlayerPublic>,
    pub finished_players: Vec<PlayerPublic>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_player: Option<PlayerId>,
    pub direction: Direction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_card: Option<Card>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_color: Option<Color>,
    pub draw_pile_count: usize,
    pub pending_draw_count: u32,
    pub pending_draw_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub awaiting_color_from: Option<PlayerId>,
    pub winners: Vec<WinnerEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub onchain_lobby_id: Option<OnchainLobbyId>,
}

pub fn snapshot(lobby: &Lobby) -> LobbySnapshot {
    LobbySnapshot {
        id: lobby.id,
        name: lobby.name.clone(),
        kind: lobby.kind,
        status: lobby.status,
        host_id: lobby.host_id.clone(),
        capacity: lobby.capacity,
        players: lobby
            .players
            .iter()
            .map(|p| PlayerPublic::of(p, lobby))
            .collect(),
        finished_players: lobby
            .finished_players
            .iter()
            .map(|p| PlayerPublic::of(p, lobby))
            .collect(),
        current_player: lobby.current_player().map(|p| p.id.clone()),
        direction: lobby.direction,
        top_card: lobby.top_card().copied(),
        active_color: lobby.active_color,
        draw_pile_count: lobby.draw_pile.len(),
        pending_draw_count: lobby.pending_draw_count,
        pending_draw_active: lobby.pending_draw_active,
        awaiting_color_from: lobby.color_choice.as_ref().map(|c| c.player_id.clone()),
        winners: lobby.winners.clone(),
        onchain_lobby_id: lobby.onchain_lobby_id,
    }
}

/// A player's private hand with the indices they may legally play now.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HandView {
    pub hand: Vec<Card>,
    pub playable: Vec<usize>,
}

/// `None` when `viewer` is not a member. `playable` is empty unless it is
/// the viewer's turn and no color choice is pending.
pub fn hand_view(lobby: &Lobby, viewer: &PlayerId) -> Option<HandView> {
    let player = lobby.player(viewer)?;
    let my_turn = lobby
        .current_player()
        .is_some_and(|p| &p.id == viewer)
        && lobby.color_choice.is_none();
    let playable = match (my_turn, lobby.top_card(), lobby.active_color) {
        (true, Some(top), Some(color)) => {
            playable_indices(&player.hand, top, color, lobby.pending_draw_active)
        }
        _ => Vec::new(),
    };
    Some(HandView {
        hand: player.hand.clone(),
        playable,
    })
}
