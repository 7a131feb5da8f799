//! Turn engine: starting a game and the in-game commands.
//!
//! Every command validates fully before mutating, so an `Err` leaves the
//! lobby untouched. Successful commands return the events they produced.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use crate::domain::cards_logic::is_valid_play;
use crate::domain::deck::{build_standard_deck, draw, drawable, shuffle_with};
use crate::domain::ranking::{award_winner, finish_if_last_standing};
use crate::domain::rules::MIN_PLAYERS;
use crate::domain::state::{
    require_active_color, require_in_game, require_top_card, require_turn, ColorChoice, Direction,
    Lobby, LobbyStatus, PlayerId, WinnerEntry,
};
use crate::domain::turns::{advance, remove_player_at};
use crate::domain::{Card, CardKind, Color, Value};
use crate::errors::domain::{DomainError, IllegalMoveKind, UnauthorizedKind};

/// Something that happened in a lobby's game, in order of occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GameEvent {
    GameStarted {
        first_player: PlayerId,
        top_card: Card,
        active_color: Color,
    },
    CardPlayed {
        player_id: PlayerId,
        card: Card,
        card_index: usize,
        cards_left: usize,
    },
    /// Count only; the drawn cards go to the drawer privately.
    CardsDrawn {
        player_id: PlayerId,
        count: usize,
        penalty: bool,
    },
    TurnPassed {
        player_id: PlayerId,
    },
    ColorChoiceRequired {
        player_id: PlayerId,
        card_index: usize,
    },
    ColorChosen {
        player_id: PlayerId,
        color: Color,
    },
    WinnerFound {
        player_id: PlayerId,
        rank: u32,
    },
    PlayerRemoved {
        player_id: PlayerId,
        cards_returned: usize,
    },
    GameOver {
        winners: Vec<WinnerEntry>,
    },
}

pub fn start_game(lobby: &mut Lobby) -> Result<Vec<GameEvent>, DomainError> {
    let mut rng = ChaCha8Rng::from_os_rng();
    start_game_with(lobby, &mut rng)
}

/// Deal and flip the starting card using `rng` for every shuffle.
pub fn start_game_with<R: Rng + ?Sized>(
    lobby: &mut Lobby,
    rng: &mut R,
) -> Result<Vec<GameEvent>, DomainError> {
    if lobby.status != LobbyStatus::Waiting {
        return Err(DomainError::AlreadyStarted);
    }
    let n = lobby.players.len();
    if n < MIN_PLAYERS {
        return Err(DomainError::illegal(
            IllegalMoveKind::NotEnoughPlayers,
            format!("Need at least {MIN_PLAYERS} players, have {n}"),
        ));
    }
    lobby.rules.check_deal(n)?;

    let mut deck = build_standard_deck();
    shuffle_with(&mut deck, rng);

    let mut hands = Vec::with_capacity(n);
    for _ in 0..n {
        let at = deck.len() - lobby.rules.hand_size;
        hands.push(deck.split_off(at));
    }

    if !deck.iter().any(|c| c.kind() == CardKind::Number) {
        return Err(DomainError::invariant(
            "no number card left to start the discard pile",
        ));
    }
    let starter = loop {
        let candidate = deck
            .pop()
            .ok_or_else(|| DomainError::invariant("draw pile empty while flipping starter"))?;
        if candidate.kind() == CardKind::Number {
            break candidate;
        }
        deck.push(candidate);
        shuffle_with(&mut deck, rng);
    };

    for (player, hand) in lobby.players.iter_mut().zip(hands) {
        player.hand = hand;
    }
    lobby.draw_pile = deck;
    lobby.discard_pile = vec![starter];
    lobby.active_color = Some(starter.color);
    lobby.turn_index = 0;
    lobby.direction = Direction::Clockwise;
    lobby.pending_draw_count = 0;
    lobby.pending_draw_active = false;
    lobby.has_drawn_this_turn.clear();
    lobby.color_choice = None;
    lobby.winners.clear();
    lobby.starting_players = n;
    lobby.status = LobbyStatus::InGame;

    Ok(vec![GameEvent::GameStarted {
        first_player: lobby.players[0].id.clone(),
        top_card: starter,
        active_color: starter.color,
    }])
}

pub fn play_card(
    lobby: &mut Lobby,
    actor: &PlayerId,
    card_index: usize,
) -> Result<Vec<GameEvent>, DomainError> {
    let idx = require_turn(lobby, actor)?;
    if lobby.color_choice.is_some() {
        return Err(DomainError::illegal(
            IllegalMoveKind::AwaitingColorChoice,
            "Choose a color for the Wild first",
        ));
    }
    let card = *lobby.players[idx].hand.get(card_index).ok_or_else(|| {
        DomainError::illegal(
            IllegalMoveKind::CardIndexOutOfRange,
            format!("No card at index {card_index}"),
        )
    })?;
    let top = require_top_card(lobby, "play_card")?;
    let active_color = require_active_color(lobby, "play_card")?;
    if !is_valid_play(&card, &top, active_color, lobby.pending_draw_active) {
        return Err(if lobby.pending_draw_active {
            DomainError::illegal(
                IllegalMoveKind::MustRespondToStack,
                format!(
                    "{} cards pending; stack a {} or draw",
                    lobby.pending_draw_count, top
                ),
            )
        } else {
            DomainError::illegal(
                IllegalMoveKind::NotPlayable,
                format!("{card} does not match {top}"),
            )
        });
    }

    let player = &mut lobby.players[idx];
    player.hand.remove(card_index);
    let cards_left = player.hand.len();
    lobby.discard_pile.push(card);
    lobby.has_drawn_this_turn.remove(actor);
    if !card.is_wild() {
        lobby.active_color = Some(card.color);
    }

    let mut events = vec![GameEvent::CardPlayed {
        player_id: actor.clone(),
        card,
        card_index,
        cards_left,
    }];

    if cards_left == 0 {
        events.extend(award_winner(lobby, actor));
        return Ok(events);
    }

    match card.value {
        Value::Number(_) => advance(lobby, 1),
        Value::Skip => advance(lobby, 2),
        Value::Reverse => {
            lobby.direction = lobby.direction.flipped();
            let steps = if lobby.players.len() == 2 { 0 } else { 1 };
            advance(lobby, steps);
        }
        Value::DrawTwo => {
            lobby.pending_draw_count += card.value.penalty();
            lobby.pending_draw_active = true;
            advance(lobby, 1);
        }
        Value::WildDrawFour | Value::Wild => {
            if card.value == Value::WildDrawFour {
                lobby.pending_draw_count += card.value.penalty();
                lobby.pending_draw_active = true;
            }
            lobby.color_choice = Some(ColorChoice {
                player_id: actor.clone(),
                card_index,
            });
            events.push(GameEvent::ColorChoiceRequired {
                player_id: actor.clone(),
                card_index,
            });
        }
    }
    Ok(events)
}

/// Name the color for a Wild the actor just played, then pass the turn.
pub fn choose_color(
    lobby: &mut Lobby,
    actor: &PlayerId,
    color: Color,
    card_index: Option<usize>,
) -> Result<Vec<GameEvent>, DomainError> {
    require_in_game(lobby)?;
    let Some(choice) = lobby
        .color_choice
        .as_ref()
        .filter(|c| &c.player_id == actor)
    else {
        return Err(DomainError::illegal(
            IllegalMoveKind::NoColorChoicePending,
            "No color choice pending for this player",
        ));
    };
    if !color.is_real() {
        return Err(DomainError::illegal(
            IllegalMoveKind::InvalidColor,
            "Color must be red, blue, green or yellow",
        ));
    }
    if let Some(i) = card_index {
        if i != choice.card_index {
            return Err(DomainError::illegal(
                IllegalMoveKind::CardMismatch,
                format!("Wild was played from index {}, not {i}", choice.card_index),
            ));
        }
    }

    lobby.active_color = Some(color);
    lobby.color_choice = None;
    advance(lobby, 1);
    Ok(vec![GameEvent::ColorChosen {
        player_id: actor.clone(),
        color,
    }])
}

/// Draw the pending penalty (ending the turn) or a single voluntary card.
pub fn draw_card(lobby: &mut Lobby, actor: &PlayerId) -> Result<Vec<GameEvent>, DomainError> {
    let idx = require_turn(lobby, actor)?;
    if lobby.color_choice.is_some() {
        return Err(DomainError::illegal(
            IllegalMoveKind::AwaitingColorChoice,
            "Choose a color for the Wild first",
        ));
    }

    if lobby.pending_draw_active {
        let wanted = lobby.pending_draw_count as usize;
        let count = wanted.min(drawable(lobby));
        for _ in 0..count {
            let card = draw(lobby)?;
            lobby.players[idx].hand.push(card);
        }
        lobby.pending_draw_count = 0;
        lobby.pending_draw_active = false;
        advance(lobby, 1);
        return Ok(vec![GameEvent::CardsDrawn {
            player_id: actor.clone(),
            count,
            penalty: true,
        }]);
    }

    if lobby.has_drawn_this_turn.contains(actor) {
        return Err(DomainError::AlreadyDrawn);
    }
    let count = if drawable(lobby) > 0 {
        let card = draw(lobby)?;
        lobby.players[idx].hand.push(card);
        1
    } else {
        0
    };
    lobby.has_drawn_this_turn.insert(actor.clone());
    Ok(vec![GameEvent::CardsDrawn {
        player_id: actor.clone(),
        count,
        penalty: false,
    }])
}

pub fn pass_turn(lobby: &mut Lobby, actor: &PlayerId) -> Result<Vec<GameEvent>, DomainError> {
    require_turn(lobby, actor)?;
    if lobby.color_choice.is_some() {
        return Err(DomainError::illegal(
            IllegalMoveKind::AwaitingColorChoice,
            "Choose a color for the Wild first",
        ));
    }
    if lobby.pending_draw_active {
        return Err(DomainError::illegal(
            IllegalMoveKind::MustRespondToStack,
            "Draw the pending penalty instead of passing",
        ));
    }
    if !lobby.has_drawn_this_turn.contains(actor) {
        return Err(DomainError::illegal(
            IllegalMoveKind::MustDrawFirst,
            "Draw a card before passing",
        ));
    }
    advance(lobby, 1);
    Ok(vec![GameEvent::TurnPassed {
        player_id: actor.clone(),
    }])
}

/// Take a player out of a running game (leave or expulsion).
///
/// An active player's hand goes to the bottom of the draw pile and the turn
/// is renormalized; fewer than two active players finishes the game. A
/// player who already finished is simply dropped from the lobby.
pub fn forfeit(lobby: &mut Lobby, player_id: &PlayerId) -> Result<Vec<GameEvent>, DomainError> {
    require_in_game(lobby)?;
    if let Some(pos) = lobby
        .finished_players
        .iter()
        .position(|p| &p.id == player_id)
    {
        lobby.finished_players.remove(pos);
        return Ok(Vec::new());
    }
    let idx = lobby.player_index(player_id).ok_or_else(|| {
        DomainError::unauthorized(UnauthorizedKind::NotAMember, format!("Player {player_id}"))
    })?;

    let mut removed = remove_player_at(lobby, idx);
    let cards_returned = removed.hand.len();
    lobby.draw_pile.splice(0..0, removed.hand.drain(..));

    let mut events = vec![GameEvent::PlayerRemoved {
        player_id: player_id.clone(),
        cards_returned,
    }];
    events.extend(finish_if_last_standing(lobby));
    Ok(events)
}
