//! Turn pointer arithmetic over the active rotation.
//!
//! Turn order is the position in `Lobby::players`. Every advance and every
//! removal clears the has-drawn set; removals also re-derive `turn_index`
//! against the shrunk rotation.

use crate::domain::state::{Direction, Lobby, Player};

/// `((turn + steps·dir) mod n + n) mod n`. Returns 0 for an empty rotation.
#[inline]
pub fn step_index(turn: usize, steps: i64, direction: Direction, n: usize) -> usize {
    if n == 0 {
        return 0;
    }
    let n = n as i64;
    (turn as i64 + steps * direction.sign()).rem_euclid(n) as usize
}

/// Move the turn `steps` places in the current direction.
pub fn advance(lobby: &mut Lobby, steps: i64) {
    lobby.turn_index = step_index(
        lobby.turn_index,
        steps,
        lobby.direction,
        lobby.players.len(),
    );
    lobby.has_drawn_this_turn.clear();
}

/// Turn index after removing position `removed` from a rotation of `n`.
///
/// Players after the removed one shift down by one. If the removed player
/// held the turn, it passes to the next player in `direction`.
pub fn renormalized_turn(turn: usize, removed: usize, n: usize, direction: Direction) -> usize {
    let remaining = n.saturating_sub(1);
    if remaining == 0 {
        return 0;
    }
    if removed < turn {
        turn - 1
    } else if removed > turn {
        turn.min(remaining - 1)
    } else {
        match direction {
            Direction::Clockwise => removed % remaining,
            Direction::CounterClockwise => (removed + remaining - 1) % remaining,
        }
    }
}

/// Take the player at `idx` out of the rotation and fix the turn pointer.
/// A color choice owed by that player is dropped.
pub fn remove_player_at(lobby: &mut Lobby, idx: usize) -> Player {
    let n = lobby.players.len();
    let removed = lobby.players.remove(idx);
    lobby.turn_index = renormalized_turn(lobby.turn_index, idx, n, lobby.direction);
    lobby.has_drawn_this_turn.clear();
    if lobby
        .color_choice
        .as_ref()
        .is_some_and(|c| c.player_id == removed.id)
    {
        lobby.color_choice = None;
    }
    removed
}
