//! Property-based tests for play validation.

use proptest::prelude::*;

use crate::domain::cards_logic::{is_valid_play, playable_indices};
use crate::domain::{test_gens, test_prelude, Value};

proptest! {
    #![proptest_config(test_prelude::proptest_config())]

    /// Property: same inputs, same answer.
    #[test]
    fn prop_validator_is_pure(
        candidate in test_gens::card(),
        top in test_gens::card(),
        color in test_gens::real_color(),
        penalty in any::<bool>(),
    ) {
        let first = is_valid_play(&candidate, &top, color, penalty);
        for _ in 0..3 {
            prop_assert_eq!(is_valid_play(&candidate, &top, color, penalty), first);
        }
    }

    /// Property: without a penalty, Wilds are always valid and other cards
    /// need a color or value match.
    #[test]
    fn prop_matching_rule(
        candidate in test_gens::card(),
        top in test_gens::card(),
        color in test_gens::real_color(),
    ) {
        let valid = is_valid_play(&candidate, &top, color, false);
        if candidate.is_wild() {
            prop_assert!(valid);
        } else {
            prop_assert_eq!(valid, candidate.color == color || candidate.value == top.value);
        }
    }

    /// Property: with a penalty, only the same draw value stacks.
    #[test]
    fn prop_penalty_only_stacks_same_value(
        candidate in test_gens::card(),
        top in test_gens::card(),
        color in test_gens::real_color(),
    ) {
        if is_valid_play(&candidate, &top, color, true) {
            prop_assert_eq!(candidate.value, top.value);
            prop_assert!(matches!(candidate.value, Value::DrawTwo | Value::WildDrawFour));
        }
    }

    /// Property: playable_indices is exactly the filter of is_valid_play.
    #[test]
    fn prop_playable_indices_agree(
        hand in test_gens::hand(12),
        top in test_gens::card(),
        color in test_gens::real_color(),
        penalty in any::<bool>(),
    ) {
        let playable = playable_indices(&hand, &top, color, penalty);
        for (i, card) in hand.iter().enumerate() {
            prop_assert_eq!(playable.contains(&i), is_valid_play(card, &top, color, penalty));
        }
    }
}
