//! Property tests over random command sequences: card conservation, turn
//! index range, and rejected commands leaving the lobby untouched.

use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::domain::cards_logic::playable_indices;
use crate::domain::play::{
    choose_color, draw_card, forfeit, pass_turn, play_card, start_game_with, GameEvent,
};
use crate::domain::snapshot::{hand_view, snapshot, LobbySnapshot};
use crate::domain::state::{check_invariants, Lobby, LobbyStatus, PlayerId};
use crate::domain::test_gens::{self, Command};
use crate::domain::test_prelude;
use crate::domain::test_state_helpers::waiting_lobby;
use crate::errors::domain::DomainError;

type Fingerprint = (LobbySnapshot, Vec<Vec<String>>);

fn fingerprint(lobby: &Lobby) -> Fingerprint {
    let hands = lobby
        .member_ids()
        .iter()
        .map(|id| {
            hand_view(lobby, id)
                .map(|h| h.hand.iter().map(|c| c.to_string()).collect())
                .unwrap_or_default()
        })
        .collect();
    (snapshot(lobby), hands)
}

/// Whoever may act right now: the color chooser, else the turn holder.
fn actor(lobby: &Lobby) -> Option<PlayerId> {
    if let Some(choice) = &lobby.color_choice {
        return Some(choice.player_id.clone());
    }
    lobby.current_player().map(|p| p.id.clone())
}

fn apply(lobby: &mut Lobby, actor: &PlayerId, cmd: &Command) -> Result<Vec<GameEvent>, DomainError> {
    match cmd {
        Command::Play(i) => {
            let len = lobby.player(actor).map(|p| p.hand.len()).unwrap_or(0).max(1);
            play_card(lobby, actor, i % len)
        }
        Command::PlayFirstLegal => {
            let idx = match (lobby.player(actor), lobby.top_card(), lobby.active_color) {
                (Some(p), Some(top), Some(color)) => {
                    playable_indices(&p.hand, top, color, lobby.pending_draw_active)
                        .first()
                        .copied()
                }
                _ => None,
            };
            match idx {
                Some(i) => play_card(lobby, actor, i),
                None => draw_card(lobby, actor),
            }
        }
        Command::Draw => draw_card(lobby, actor),
        Command::Pass => pass_turn(lobby, actor),
        Command::ChooseColor(color) => choose_color(lobby, actor, *color, None),
        Command::Forfeit(i) => {
            let target = lobby.players[i % lobby.players.len()].id.clone();
            forfeit(lobby, &target)
        }
    }
}

proptest! {
    #![proptest_config(test_prelude::proptest_config())]

    /// Property: 108 cards and a valid turn index after every command, and
    /// a rejected command never mutates the lobby.
    #[test]
    fn prop_conservation_and_turn_range(
        players in 2usize..=6,
        seed in any::<u64>(),
        cmds in test_gens::commands(200),
    ) {
        let mut lobby = waiting_lobby(players);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        start_game_with(&mut lobby, &mut rng).unwrap();

        let mut game_overs = 0;
        for cmd in &cmds {
            if lobby.status != LobbyStatus::InGame {
                break;
            }
            let Some(who) = actor(&lobby) else { break };
            let before = fingerprint(&lobby);

            match apply(&mut lobby, &who, cmd) {
                Ok(events) => {
                    game_overs += events
                        .iter()
                        .filter(|e| matches!(e, GameEvent::GameOver { .. }))
                        .count();
                }
                Err(err) => {
                    prop_assert!(!err.is_fatal(), "fatal error {:?} from {:?}", err, cmd);
                    prop_assert_eq!(fingerprint(&lobby), before, "rejected {:?} mutated state", cmd);
                }
            }

            if lobby.status == LobbyStatus::InGame {
                prop_assert!(check_invariants(&lobby).is_ok(), "{:?}", check_invariants(&lobby));
                prop_assert!(lobby.turn_index < lobby.players.len());
                prop_assert!(lobby.players.len() >= 2);
            }
        }

        prop_assert!(game_overs <= 1);
        if lobby.status == LobbyStatus::Finished {
            prop_assert_eq!(game_overs, 1);
        }
    }

    /// Property: ranks are 1..=k in order with no player ranked twice.
    #[test]
    fn prop_ranks_are_dense_and_unique(
        players in 2usize..=5,
        seed in any::<u64>(),
        cmds in test_gens::commands(300),
    ) {
        let mut lobby = waiting_lobby(players);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        start_game_with(&mut lobby, &mut rng).unwrap();

        for cmd in &cmds {
            if lobby.status != LobbyStatus::InGame {
                break;
            }
            let Some(who) = actor(&lobby) else { break };
            let _ = apply(&mut lobby, &who, cmd);
        }

        for (i, w) in lobby.winners.iter().enumerate() {
            prop_assert_eq!(w.rank as usize, i + 1);
        }
        let mut ids: Vec<_> = lobby.winners.iter().map(|w| w.player_id.clone()).collect();
        ids.sort();
        ids.dedup();
        prop_assert_eq!(ids.len(), lobby.winners.len());
    }
}
