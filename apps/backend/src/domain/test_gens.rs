// Proptest generators for domain types and command sequences.

use proptest::prelude::*;

use crate::domain::{Card, Color, Value};

pub fn real_color() -> impl Strategy<Value = Color> {
    prop_oneof![
        Just(Color::Red),
        Just(Color::Blue),
        Just(Color::Green),
        Just(Color::Yellow),
    ]
}

/// Any color, including Wild (an invalid color choice).
pub fn color() -> impl Strategy<Value = Color> {
    prop_oneof![4 => real_color(), 1 => Just(Color::Wild)]
}

pub fn colored_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        (0u8..=9).prop_map(Value::Number),
        Just(Value::Skip),
        Just(Value::Reverse),
        Just(Value::DrawTwo),
    ]
}

/// Any card that exists in a standard deck.
pub fn card() -> impl Strategy<Value = Card> {
    prop_oneof![
        10 => (real_color(), colored_value(), 0u8..2)
            .prop_map(|(c, v, variant)| Card::with_variant(c, v, variant)),
        1 => (0u8..4).prop_map(|v| Card::with_variant(Color::Wild, Value::Wild, v)),
        1 => (0u8..4).prop_map(|v| Card::with_variant(Color::Wild, Value::WildDrawFour, v)),
    ]
}

pub fn hand(max: usize) -> impl Strategy<Value = Vec<Card>> {
    prop::collection::vec(card(), 0..=max)
}

/// One command issued by whoever holds the turn.
#[derive(Debug, Clone)]
pub enum Command {
    /// Play the card at `index % hand.len()`.
    Play(usize),
    /// Play the first legal card, if any.
    PlayFirstLegal,
    Draw,
    Pass,
    ChooseColor(Color),
    /// Forfeit the player at `index % players.len()`.
    Forfeit(usize),
}

pub fn command() -> impl Strategy<Value = Command> {
    prop_oneof![
        3 => (0usize..20).prop_map(Command::Play),
        6 => Just(Command::PlayFirstLegal),
        4 => Just(Command::Draw),
        3 => Just(Command::Pass),
        3 => color().prop_map(Command::ChooseColor),
        1 => (0usize..10).prop_map(Command::Forfeit),
    ]
}

pub fn commands(max: usize) -> impl Strategy<Value = Vec<Command>> {
    prop::collection::vec(command(), 1..=max)
}
