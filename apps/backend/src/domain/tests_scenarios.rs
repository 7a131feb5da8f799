//! Rule scenarios driven through the turn engine on rigged lobbies.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::domain::play::{
    choose_color, draw_card, forfeit, pass_turn, play_card, start_game_with, GameEvent,
};
use crate::domain::state::{check_invariants, Direction, LobbyStatus, WinnerEntry};
use crate::domain::test_state_helpers::{
    current, hand_tokens, pid, rigged, stack_draw_pile, waiting_lobby,
};
use crate::domain::Color;
use crate::errors::domain::{DomainError, IllegalMoveKind};

fn illegal_kind(err: DomainError) -> IllegalMoveKind {
    match err {
        DomainError::IllegalMove(kind, _) => kind,
        other => panic!("expected IllegalMove, got {other:?}"),
    }
}

#[test]
fn dealing_leaves_108_minus_7n_minus_1() {
    for n in 2..=10 {
        let mut lobby = waiting_lobby(n);
        let mut rng = ChaCha8Rng::seed_from_u64(n as u64);
        start_game_with(&mut lobby, &mut rng).unwrap();
        assert_eq!(lobby.draw_pile.len(), 108 - 7 * n - 1, "n={n}");
        assert!(lobby.players.iter().all(|p| p.hand.len() == 7));
        check_invariants(&lobby).unwrap();
    }
}

#[test]
fn reverse_with_two_players_keeps_the_turn() {
    let mut lobby = rigged(&[&["RR", "R1"], &["B2", "B3"]], "R5");
    play_card(&mut lobby, &pid("p0"), 0).unwrap();
    assert_eq!(current(&lobby), "p0");
    assert_eq!(lobby.direction, Direction::CounterClockwise);
    check_invariants(&lobby).unwrap();
}

#[test]
fn reverse_with_three_players_turns_back() {
    let mut lobby = rigged(&[&["RR", "R1"], &["B2", "B3"], &["R2", "R3"]], "R5");
    play_card(&mut lobby, &pid("p0"), 0).unwrap();
    assert_eq!(current(&lobby), "p2");
    play_card(&mut lobby, &pid("p2"), 0).unwrap();
    assert_eq!(current(&lobby), "p1");
}

#[test]
fn draw_two_then_penalty_draw() {
    let mut lobby = rigged(&[&["RD2", "G1"], &["B2", "B3"], &["Y1", "Y2"]], "R5");

    play_card(&mut lobby, &pid("p0"), 0).unwrap();
    assert_eq!(lobby.pending_draw_count, 2);
    assert!(lobby.pending_draw_active);
    assert_eq!(current(&lobby), "p1");

    let events = draw_card(&mut lobby, &pid("p1")).unwrap();
    assert_eq!(
        events,
        vec![GameEvent::CardsDrawn {
            player_id: pid("p1"),
            count: 2,
            penalty: true
        }]
    );
    assert_eq!(hand_tokens(&lobby, "p1").len(), 4);
    assert_eq!(lobby.pending_draw_count, 0);
    assert!(!lobby.pending_draw_active);
    assert_eq!(current(&lobby), "p2");
    check_invariants(&lobby).unwrap();
}

#[test]
fn draw_twos_stack_and_block_other_moves() {
    let mut lobby = rigged(&[&["RD2", "G1"], &["BD2", "B3"], &["Y1", "Y2"]], "R5");
    play_card(&mut lobby, &pid("p0"), 0).unwrap();

    let err = play_card(&mut lobby, &pid("p1"), 1).unwrap_err();
    assert_eq!(illegal_kind(err), IllegalMoveKind::MustRespondToStack);
    let err = pass_turn(&mut lobby, &pid("p1")).unwrap_err();
    assert_eq!(illegal_kind(err), IllegalMoveKind::MustRespondToStack);

    play_card(&mut lobby, &pid("p1"), 0).unwrap();
    assert_eq!(lobby.pending_draw_count, 4);
    assert_eq!(lobby.active_color, Some(Color::Blue));
    assert_eq!(current(&lobby), "p2");

    draw_card(&mut lobby, &pid("p2")).unwrap();
    assert_eq!(hand_tokens(&lobby, "p2").len(), 6);
    assert_eq!(current(&lobby), "p0");
}

#[test]
fn wild_draw_four_requires_color_choice_then_stacks() {
    let mut lobby = rigged(&[&["WD4", "R7"], &["WD4", "G2"], &["G3", "B4"]], "R5");

    let events = play_card(&mut lobby, &pid("p0"), 0).unwrap();
    assert!(events.contains(&GameEvent::ColorChoiceRequired {
        player_id: pid("p0"),
        card_index: 0
    }));
    assert_eq!(current(&lobby), "p0", "no advance before the color is named");
    assert_eq!(lobby.pending_draw_count, 4);

    let err = play_card(&mut lobby, &pid("p0"), 0).unwrap_err();
    assert_eq!(illegal_kind(err), IllegalMoveKind::AwaitingColorChoice);
    let err = draw_card(&mut lobby, &pid("p0")).unwrap_err();
    assert_eq!(illegal_kind(err), IllegalMoveKind::AwaitingColorChoice);
    let err = choose_color(&mut lobby, &pid("p1"), Color::Green, None).unwrap_err();
    assert_eq!(illegal_kind(err), IllegalMoveKind::NoColorChoicePending);
    let err = choose_color(&mut lobby, &pid("p0"), Color::Wild, None).unwrap_err();
    assert_eq!(illegal_kind(err), IllegalMoveKind::InvalidColor);
    let err = choose_color(&mut lobby, &pid("p0"), Color::Green, Some(1)).unwrap_err();
    assert_eq!(illegal_kind(err), IllegalMoveKind::CardMismatch);

    choose_color(&mut lobby, &pid("p0"), Color::Green, Some(0)).unwrap();
    assert_eq!(lobby.active_color, Some(Color::Green));
    assert_eq!(current(&lobby), "p1");

    let err = play_card(&mut lobby, &pid("p1"), 1).unwrap_err();
    assert_eq!(illegal_kind(err), IllegalMoveKind::MustRespondToStack);
    play_card(&mut lobby, &pid("p1"), 0).unwrap();
    choose_color(&mut lobby, &pid("p1"), Color::Blue, None).unwrap();
    assert_eq!(lobby.pending_draw_count, 8);
    assert_eq!(current(&lobby), "p2");

    draw_card(&mut lobby, &pid("p2")).unwrap();
    assert_eq!(hand_tokens(&lobby, "p2").len(), 10);
    assert_eq!(current(&lobby), "p0");
    check_invariants(&lobby).unwrap();
}

#[test]
fn wild_sets_declared_color() {
    let mut lobby = rigged(&[&["W", "R7"], &["B9", "R8"]], "R5");
    play_card(&mut lobby, &pid("p0"), 0).unwrap();
    assert!(!lobby.pending_draw_active);
    choose_color(&mut lobby, &pid("p0"), Color::Blue, None).unwrap();
    assert_eq!(current(&lobby), "p1");

    let err = play_card(&mut lobby, &pid("p1"), 1).unwrap_err();
    assert_eq!(illegal_kind(err), IllegalMoveKind::NotPlayable);
    play_card(&mut lobby, &pid("p1"), 0).unwrap();
}

#[test]
fn skip_jumps_one_player() {
    let mut lobby = rigged(&[&["RS", "R1"], &["B2", "B3"], &["Y1", "Y2"]], "R5");
    play_card(&mut lobby, &pid("p0"), 0).unwrap();
    assert_eq!(current(&lobby), "p2");
}

#[test]
fn voluntary_draw_then_pass() {
    let mut lobby = rigged(&[&["B1", "B2"], &["G1", "G2"]], "R5");
    stack_draw_pile(&mut lobby, &["Y9"]);

    let err = pass_turn(&mut lobby, &pid("p0")).unwrap_err();
    assert_eq!(illegal_kind(err), IllegalMoveKind::MustDrawFirst);

    draw_card(&mut lobby, &pid("p0")).unwrap();
    assert_eq!(hand_tokens(&lobby, "p0"), ["B1", "B2", "Y9"]);
    assert_eq!(current(&lobby), "p0");
    assert_eq!(
        draw_card(&mut lobby, &pid("p0")).unwrap_err(),
        DomainError::AlreadyDrawn
    );

    pass_turn(&mut lobby, &pid("p0")).unwrap();
    assert_eq!(current(&lobby), "p1");
    assert!(lobby.has_drawn_this_turn.is_empty());
}

#[test]
fn drawn_card_may_be_played() {
    let mut lobby = rigged(&[&["B1", "B2"], &["G1", "G2"]], "R5");
    stack_draw_pile(&mut lobby, &["R9"]);
    draw_card(&mut lobby, &pid("p0")).unwrap();
    play_card(&mut lobby, &pid("p0"), 2).unwrap();
    assert_eq!(current(&lobby), "p1");
    assert!(!lobby.has_drawn_this_turn.contains(&pid("p0")));
}

#[test]
fn voluntary_draw_from_empty_piles_still_allows_pass() {
    let mut lobby = rigged(&[&["B1", "B2"], &["G1"]], "R5");
    let rest = std::mem::take(&mut lobby.draw_pile);
    lobby.players[1].hand.extend(rest);
    check_invariants(&lobby).unwrap();

    let events = draw_card(&mut lobby, &pid("p0")).unwrap();
    assert_eq!(
        events,
        vec![GameEvent::CardsDrawn {
            player_id: pid("p0"),
            count: 0,
            penalty: false
        }]
    );
    pass_turn(&mut lobby, &pid("p0")).unwrap();
    assert_eq!(current(&lobby), "p1");
}

#[test]
fn penalty_draw_delivers_what_exists() {
    let mut lobby = rigged(&[&["RD2", "B2"], &["G1"]], "R5");
    let rest = std::mem::take(&mut lobby.draw_pile);
    lobby.players[1].hand.extend(rest);
    let before = hand_tokens(&lobby, "p1").len();

    play_card(&mut lobby, &pid("p0"), 0).unwrap();
    let events = draw_card(&mut lobby, &pid("p1")).unwrap();

    assert_eq!(
        events,
        vec![GameEvent::CardsDrawn {
            player_id: pid("p1"),
            count: 1,
            penalty: true
        }]
    );
    assert_eq!(hand_tokens(&lobby, "p1").len(), before + 1);
    assert_eq!(lobby.discard_pile.len(), 1);
    assert!(!lobby.pending_draw_active);
    check_invariants(&lobby).unwrap();
}

#[test]
fn four_players_rank_three_and_auto_rank_the_last() {
    let mut lobby = rigged(&[&["R1"], &["R2"], &["R3"], &["B9", "B8"]], "R5");

    play_card(&mut lobby, &pid("p0"), 0).unwrap();
    assert_eq!(current(&lobby), "p1");
    play_card(&mut lobby, &pid("p1"), 0).unwrap();
    assert_eq!(current(&lobby), "p2");
    let events = play_card(&mut lobby, &pid("p2"), 0).unwrap();

    assert_eq!(lobby.status, LobbyStatus::Finished);
    let ranks: Vec<(String, u32)> = lobby
        .winners
        .iter()
        .map(|w| (w.player_id.to_string(), w.rank))
        .collect();
    assert_eq!(
        ranks,
        [
            ("p0".to_string(), 1),
            ("p1".to_string(), 2),
            ("p2".to_string(), 3),
            ("p3".to_string(), 4)
        ]
    );
    let game_overs = events
        .iter()
        .filter(|e| matches!(e, GameEvent::GameOver { .. }))
        .count();
    assert_eq!(game_overs, 1);
}

#[test]
fn winning_action_card_is_not_applied() {
    let mut lobby = rigged(&[&["RS"], &["B1", "B2"], &["G1", "G2"]], "R5");
    play_card(&mut lobby, &pid("p0"), 0).unwrap();
    assert_eq!(lobby.status, LobbyStatus::InGame);
    assert_eq!(current(&lobby), "p1");
    assert_eq!(
        lobby.winners,
        vec![WinnerEntry {
            player_id: pid("p0"),
            rank: 1
        }]
    );
}

#[test]
fn forfeit_of_turn_holder_passes_turn() {
    let mut lobby = rigged(&[&["R1", "R2"], &["B1", "B2"], &["G1", "G2"]], "R5");
    forfeit(&mut lobby, &pid("p0")).unwrap();
    assert_eq!(current(&lobby), "p1");
    assert_eq!(lobby.players.len(), 2);
    check_invariants(&lobby).unwrap();
}

#[test]
fn forfeit_of_other_player_keeps_turn() {
    let mut lobby = rigged(&[&["R1", "R2"], &["B1", "B2"], &["G1", "G2"]], "R5");
    forfeit(&mut lobby, &pid("p1")).unwrap();
    assert_eq!(current(&lobby), "p0");
}

#[test]
fn forfeit_down_to_one_finishes_game() {
    let mut lobby = rigged(&[&["R1", "R2"], &["B1", "B2"]], "R5");
    let events = forfeit(&mut lobby, &pid("p1")).unwrap();
    assert_eq!(lobby.status, LobbyStatus::Finished);
    assert_eq!(
        lobby.winners,
        vec![WinnerEntry {
            player_id: pid("p0"),
            rank: 1
        }]
    );
    assert!(matches!(events.last(), Some(GameEvent::GameOver { .. })));
}

#[test]
fn forfeit_cancels_owed_color_choice() {
    let mut lobby = rigged(&[&["W", "R1"], &["R2", "B2"], &["G1", "G2"]], "R5");
    play_card(&mut lobby, &pid("p0"), 0).unwrap();
    forfeit(&mut lobby, &pid("p0")).unwrap();

    assert!(lobby.color_choice.is_none());
    assert_eq!(current(&lobby), "p1");
    assert_eq!(lobby.active_color, Some(Color::Red));
    play_card(&mut lobby, &pid("p1"), 0).unwrap();
    check_invariants(&lobby).unwrap();
}

#[test]
fn finished_player_leaving_does_not_touch_the_game() {
    let mut lobby = rigged(&[&["R1"], &["B1", "B2"], &["G1", "G2"]], "R5");
    play_card(&mut lobby, &pid("p0"), 0).unwrap();
    let turn = lobby.turn_index;

    let events = forfeit(&mut lobby, &pid("p0")).unwrap();
    assert!(events.is_empty());
    assert!(lobby.finished_players.is_empty());
    assert_eq!(lobby.turn_index, turn);
    assert_eq!(lobby.winners.len(), 1);
}
