//! Turns engine events into websocket pushes.
//!
//! Shared state goes to every member; hands and color prompts only to
//! their owner. Called with the lobby lock held, after the command
//! committed, so every member sees the same order.

use crate::domain::play::GameEvent;
use crate::domain::snapshot::{hand_view, snapshot, LobbySnapshot};
use crate::domain::state::{Lobby, LobbyStatus, PlayerId};
use crate::ws::hub::ConnectionRegistry;
use crate::ws::protocol::ServerMsg;

/// The message each member receives for one event.
pub fn public_message(lobby: &Lobby, view: &LobbySnapshot, event: &GameEvent) -> ServerMsg {
    match event {
        GameEvent::WinnerFound { player_id, rank } => ServerMsg::WinnerFound {
            lobby_id: lobby.id,
            player_id: player_id.clone(),
            rank: *rank,
        },
        GameEvent::GameOver { winners } => ServerMsg::GameOver {
            lobby_id: lobby.id,
            winners: winners.clone(),
        },
        other => ServerMsg::GameUpdate {
            lobby: Box::new(view.clone()),
            event: other.clone(),
            next_turn: view.current_player.clone(),
        },
    }
}

/// Broadcast `events` and refresh every member's private hand.
pub fn fan_out(registry: &ConnectionRegistry, lobby: &Lobby, events: &[GameEvent]) {
    let members = lobby.member_ids();
    let view = snapshot(lobby);

    for event in events {
        registry.broadcast(&members, &public_message(lobby, &view, event));

        if let GameEvent::ColorChoiceRequired {
            player_id,
            card_index,
        } = event
        {
            // Only prompt while the choice is still owed; a later event in
            // the same batch may have cleared it.
            if lobby
                .color_choice
                .as_ref()
                .is_some_and(|c| &c.player_id == player_id)
            {
                registry.send(
                    player_id,
                    ServerMsg::ChooseColor {
                        lobby_id: lobby.id,
                        card_index: *card_index,
                    },
                );
            }
        }
    }

    if lobby.status == LobbyStatus::InGame {
        for member in &members {
            send_hand(registry, lobby, member);
        }
    }
}

pub fn send_hand(registry: &ConnectionRegistry, lobby: &Lobby, player: &PlayerId) {
    if let Some(view) = hand_view(lobby, player) {
        registry.send(
            player,
            ServerMsg::YourHand {
                lobby_id: lobby.id,
                hand: view.hand,
                playable: view.playable,
            },
        );
    }
}

/// Membership, host or connection changed. `except` already got a more
/// specific message.
pub fn lobby_update(registry: &ConnectionRegistry, lobby: &Lobby, except: Option<&PlayerId>) {
    let msg = ServerMsg::LobbyUpdate {
        lobby: Box::new(snapshot(lobby)),
    };
    let members = lobby.member_ids();
    let targets = members.iter().filter(|m| Some(*m) != except);
    registry.broadcast(targets, &msg);
}
