//! Play validation. Pure functions, no lobby state.

use super::cards_types::{Card, Color, Value};

/// Whether `candidate` may be played on `top`.
///
/// With a draw penalty pending only a card of the same penalty value may be
/// stacked (DrawTwo on DrawTwo, WildDrawFour on WildDrawFour). Otherwise a
/// Wild is always playable and any other card must match the active color
/// or the top card's value.
pub fn is_valid_play(
    candidate: &Card,
    top: &Card,
    active_color: Color,
    penalty_active: bool,
) -> bool {
    if penalty_active {
        return candidate.value == top.value
            && matches!(candidate.value, Value::DrawTwo | Value::WildDrawFour);
    }
    if candidate.is_wild() {
        return true;
    }
    candidate.color == active_color || candidate.value == top.value
}

/// Hand indices that `is_valid_play` accepts, in hand order.
pub fn playable_indices(
    hand: &[Card],
    top: &Card,
    active_color: Color,
    penalty_active: bool,
) -> Vec<usize> {
    hand.iter()
        .enumerate()
        .filter(|(_, c)| is_valid_play(c, top, active_color, penalty_active))
        .map(|(i, _)| i)
        .collect()
}
