use crate::errors::domain::DomainError;

/// Cards in a standard deck: 4 × 25 colored plus 4 Wild plus 4 WildDrawFour.
pub const DECK_SIZE: usize = 108;
pub const HAND_SIZE: usize = 7;
pub const MIN_PLAYERS: usize = 2;
pub const DEFAULT_WINNERS_QUOTA: usize = 3;
pub const MAX_LOBBY_NAME_LEN: usize = 64;

/// Per-lobby rules, copied from configuration when the lobby is created so a
/// config change never affects a running game.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct LobbyRules {
    pub hand_size: usize,
    pub winners_quota: usize,
}

impl Default for LobbyRules {
    fn default() -> Self {
        Self {
            hand_size: HAND_SIZE,
            winners_quota: DEFAULT_WINNERS_QUOTA,
        }
    }
}

impl LobbyRules {
    /// The deck must cover every hand plus the starting card.
    pub fn check_deal(&self, players: usize) -> Result<(), DomainError> {
        if self.hand_size == 0 {
            return Err(DomainError::validation("Hand size must be at least 1"));
        }
        let needed = players * self.hand_size + 1;
        if needed > DECK_SIZE {
            return Err(DomainError::validation(format!(
                "Dealing {} cards to {players} players exceeds the deck",
                self.hand_size
            )));
        }
        Ok(())
    }

    /// Ranked winners before the game is over: min(players, quota).
    pub fn winners_target(&self, starting_players: usize) -> usize {
        starting_players.min(self.winners_quota.max(1))
    }
}
