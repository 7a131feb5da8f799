//! Deck construction, shuffling and drawing with discard recycling.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::domain::rules::DECK_SIZE;
use crate::domain::state::Lobby;
use crate::domain::{Card, Color, Value};
use crate::errors::domain::DomainError;

/// The 108-card deck in a fixed order: per color one 0, two each of 1-9,
/// Skip, Reverse and DrawTwo; then four Wild and four WildDrawFour.
pub fn build_standard_deck() -> Vec<Card> {
    let mut deck = Vec::with_capacity(DECK_SIZE);
    for color in Color::REAL {
        deck.push(Card::new(color, Value::Number(0)));
        for variant in 0..2u8 {
            for n in 1..=9u8 {
                deck.push(Card::with_variant(color, Value::Number(n), variant));
            }
            for value in [Value::Skip, Value::Reverse, Value::DrawTwo] {
                deck.push(Card::with_variant(color, value, variant));
            }
        }
    }
    for variant in 0..4u8 {
        deck.push(Card::with_variant(Color::Wild, Value::Wild, variant));
        deck.push(Card::with_variant(Color::Wild, Value::WildDrawFour, variant));
    }
    deck
}

/// Fisher-Yates shuffle with a caller-supplied RNG.
pub fn shuffle_with<R: Rng + ?Sized>(deck: &mut [Card], rng: &mut R) {
    for i in (1..deck.len()).rev() {
        let j = rng.random_range(0..=i);
        deck.swap(i, j);
    }
}

/// Shuffle with a fresh OS-seeded ChaCha8 generator. Not reproducible.
pub fn shuffle(deck: &mut [Card]) {
    let mut rng = ChaCha8Rng::from_os_rng();
    shuffle_with(deck, &mut rng);
}

/// Pop the top of the draw pile, recycling the discard pile (minus its top
/// card) when the draw pile is empty.
pub fn draw(lobby: &mut Lobby) -> Result<Card, DomainError> {
    let mut rng = ChaCha8Rng::from_os_rng();
    draw_with(lobby, &mut rng)
}

pub fn draw_with<R: Rng + ?Sized>(lobby: &mut Lobby, rng: &mut R) -> Result<Card, DomainError> {
    if lobby.draw_pile.is_empty() {
        recycle_discard(lobby, rng);
    }
    lobby.draw_pile.pop().ok_or(DomainError::DeckExhausted)
}

/// Number of cards that can still be drawn, counting the recyclable part
/// of the discard pile.
pub fn drawable(lobby: &Lobby) -> usize {
    lobby.draw_pile.len() + lobby.discard_pile.len().saturating_sub(1)
}

fn recycle_discard<R: Rng + ?Sized>(lobby: &mut Lobby, rng: &mut R) {
    let Some(top) = lobby.discard_pile.pop() else {
        return;
    };
    let mut recycled = std::mem::take(&mut lobby.discard_pile);
    shuffle_with(&mut recycled, rng);
    lobby.draw_pile = recycled;
    lobby.discard_pile.push(top);
}
