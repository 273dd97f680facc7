use proptest::prelude::*;
use tablero_core::extras::ExtrasLookup;
use tablero_core::model::card::{BoardId, Card};
use tablero_core::view::derive;

#[path = "generators.rs"]
mod generators;
use generators::*;

proptest! {
    #![proptest_config(proptest::test_runner::Config::with_cases(2000))]

    #[test]
    fn derive_is_idempotent(
        cards in arb_cards(),
        extras in arb_extras(16),
        filters in arb_filters(),
    ) {
        let first = derive(&cards, BoardId(1), &extras, &filters);
        let second = derive(&cards, BoardId(1), &extras, &filters);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn filters_compose_by_and(
        cards in arb_cards(),
        extras in arb_extras(16),
        filters in arb_filters(),
    ) {
        let board = derive(&cards, BoardId(1), &extras, &filters);
        for card in cards.iter().filter(|c| c.board_id == BoardId(1)) {
            let record = extras.extras_for(card.id);
            let expected = filters.matches_search(card)
                && filters.matches_label(record)
                && filters.matches_assignee(record);
            let shown = board.cards_in(card.list_id).iter().any(|c| c.id == card.id);
            prop_assert_eq!(shown, expected, "card {:?}", card.id);
        }
    }

    #[test]
    fn groups_are_sorted_and_counted(
        cards in arb_cards(),
        extras in arb_extras(16),
        filters in arb_filters(),
    ) {
        let board = derive(&cards, BoardId(1), &extras, &filters);
        let mut shown = 0;
        for (list_id, group) in &board.lists {
            shown += group.len();
            let in_place = |c: &Card| c.list_id == *list_id && c.board_id == BoardId(1);
            prop_assert!(group.iter().all(in_place));
            let keys: Vec<_> = group.iter().map(|c| (c.position, c.id)).collect();
            prop_assert!(keys.windows(2).all(|w| w[0] < w[1]));
        }
        let on_board = cards.iter().filter(|c| c.board_id == BoardId(1)).count();
        prop_assert_eq!(shown, board.shown);
        prop_assert_eq!(board.total, on_board);
    }
}
