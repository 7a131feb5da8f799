//! Domain layer: pure card-game logic over a single lobby.

pub mod cards_logic;
pub mod cards_parsing;
pub mod cards_serde;
pub mod cards_types;
pub mod deck;
pub mod play;
pub mod ranking;
pub mod rules;
pub mod snapshot;
pub mod state;
pub mod turns;

#[cfg(test)]
mod test_gens;
#[cfg(test)]
mod test_prelude;
#[cfg(test)]
mod test_state_helpers;
#[cfg(test)]
mod tests_props_engine;
#[cfg(test)]
mod tests_props_validator;
#[cfg(test)]
mod tests_scenarios;

// Re-exports for ergonomics
pub use cards_logic::{is_valid_play, playable_indices};
pub use cards_parsing::try_parse_cards;
pub use cards_types::{Card, CardKind, Color, Value};
pub use play::GameEvent;
pub use state::{Lobby, LobbyId, LobbyKind, LobbyStatus, PlayerId};
