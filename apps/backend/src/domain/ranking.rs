//! Winner ranking and game completion.

use crate::domain::play::GameEvent;
use crate::domain::state::{Lobby, LobbyStatus, PlayerId, WinnerEntry};
use crate::domain::turns::remove_player_at;

/// Rank `player_id` next, move them out of the rotation and finish the
/// game when the quota is met or one active player is left. No-op for a
/// player who is already ranked.
pub fn award_winner(lobby: &mut Lobby, player_id: &PlayerId) -> Vec<GameEvent> {
    if lobby.is_ranked(player_id) {
        return Vec::new();
    }
    let mut events = vec![rank_and_retire(lobby, player_id)];

    if lobby.players.len() <= 1 {
        events.extend(finish_if_last_standing(lobby));
    } else if lobby.winners.len() >= lobby.rules.winners_target(lobby.starting_players) {
        events.extend(finish(lobby));
    }
    events
}

/// With fewer than two active players the game is over: the survivor, if
/// any, is ranked last.
pub fn finish_if_last_standing(lobby: &mut Lobby) -> Vec<GameEvent> {
    if lobby.status != LobbyStatus::InGame || lobby.players.len() >= 2 {
        return Vec::new();
    }
    let mut events = Vec::new();
    if let Some(last) = lobby.players.first().map(|p| p.id.clone()) {
        events.push(rank_and_retire(lobby, &last));
    }
    events.extend(finish(lobby));
    events
}

/// Idempotent transition to `finished`. Returns whether anything changed.
pub fn end_game(lobby: &mut Lobby) -> bool {
    if lobby.status == LobbyStatus::Finished {
        return false;
    }
    lobby.status = LobbyStatus::Finished;
    lobby.pending_draw_count = 0;
    lobby.pending_draw_active = false;
    lobby.color_choice = None;
    lobby.has_drawn_this_turn.clear();
    true
}

fn finish(lobby: &mut Lobby) -> Vec<GameEvent> {
    if end_game(lobby) {
        vec![GameEvent::GameOver {
            winners: lobby.winners.clone(),
        }]
    } else {
        Vec::new()
    }
}

fn rank_and_retire(lobby: &mut Lobby, player_id: &PlayerId) -> GameEvent {
    let rank = lobby.winners.len() as u32 + 1;
    lobby.winners.push(WinnerEntry {
        player_id: player_id.clone(),
        rank,
    });
    if let Some(idx) = lobby.player_index(player_id) {
        let player = remove_player_at(lobby, idx);
        lobby.finished_players.push(player);
    }
    GameEvent::WinnerFound {
        player_id: player_id.clone(),
        rank,
    }
}
