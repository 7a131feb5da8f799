//! Test-only lobby builders for domain unit tests.

use crate::domain::deck::build_standard_deck;
use crate::domain::rules::LobbyRules;
use crate::domain::state::{Lobby, LobbyId, LobbyKind, LobbyStatus, Player, PlayerId};
use crate::domain::Card;

pub fn pid(s: &str) -> PlayerId {
    PlayerId::from(s)
}

/// Waiting lobby with players `p0..p{n-1}`; `p0` hosts.
pub fn waiting_lobby(n: usize) -> Lobby {
    let mut lobby = Lobby::new(
        LobbyId::generate(),
        "test",
        LobbyKind::Public,
        pid("p0"),
        10,
        LobbyRules::default(),
    );
    for i in 0..n {
        let mut player = Player::new(
            PlayerId::new(format!("p{i}")),
            format!("P{i}"),
            uuid::Uuid::new_v4(),
        );
        player.is_host = i == 0;
        lobby.players.push(player);
    }
    lobby
}

fn take(deck: &mut Vec<Card>, token: &str) -> Card {
    let want: Card = token.parse().expect("valid card token");
    let pos = deck
        .iter()
        .position(|c| c.same_face(&want))
        .unwrap_or_else(|| panic!("deck has no more {token}"));
    deck.remove(pos)
}

/// In-game lobby with exact hands and starting card. Every other card of
/// the deck goes to the draw pile so card conservation holds. It is `p0`'s
/// turn, clockwise, active color = the top card's color.
pub fn rigged(hands: &[&[&str]], top: &str) -> Lobby {
    let mut lobby = waiting_lobby(hands.len());
    let mut deck = build_standard_deck();
    for (player, tokens) in lobby.players.iter_mut().zip(hands) {
        player.hand = tokens.iter().map(|t| take(&mut deck, t)).collect();
    }
    let top = take(&mut deck, top);
    lobby.discard_pile = vec![top];
    lobby.active_color = Some(top.color);
    lobby.draw_pile = deck;
    lobby.starting_players = hands.len();
    lobby.status = LobbyStatus::InGame;
    lobby
}

/// Put `tokens` on top of the draw pile; the last token is drawn first.
pub fn stack_draw_pile(lobby: &mut Lobby, tokens: &[&str]) {
    for t in tokens {
        let card = take(&mut lobby.draw_pile, t);
        lobby.draw_pile.push(card);
    }
}

pub fn hand_tokens(lobby: &Lobby, who: &str) -> Vec<String> {
    lobby
        .player(&pid(who))
        .map(|p| p.hand.iter().map(|c| c.to_string()).collect())
        .unwrap_or_default()
}

pub fn current(lobby: &Lobby) -> &str {
    lobby
        .current_player()
        .map(|p| p.id.as_str())
        .unwrap_or("<none>")
}
