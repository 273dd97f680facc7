use proptest::prelude::*;
use std::collections::HashMap;
use tablero_core::model::card::{BoardId, Card, CardId, ListId};
use tablero_core::model::extras::{ExtrasRecord, PRESET_LABELS, TEAM_MEMBERS};
use tablero_core::model::filter::{AssigneeFilter, FilterState, LabelFilter};

const WORDS: &[&str] = &[
    "login", "Deploy", "docs", "API", "tablero", "Bug", "", "revisión",
];

pub fn arb_text() -> impl Strategy<Value = String> + Clone {
    prop::collection::vec(prop::sample::select(WORDS), 1..4).prop_map(|w| w.join(" "))
}

pub fn arb_card(id: u64) -> impl Strategy<Value = Card> {
    (
        prop_oneof![Just(1u64), Just(1u64), Just(2u64)],
        1u32..=3,
        arb_text(),
        prop::option::of(arb_text()),
        0i64..6,
    )
        .prop_map(move |(board, list, title, description, position)| {
            let title = Some(title).filter(|t| !t.trim().is_empty());
            Card {
                id: CardId(id),
                board_id: BoardId(board),
                list_id: ListId(list),
                title: title.unwrap_or_else(|| "x".into()),
                description,
                due_date: None,
                position,
            }
        })
}

/// Cards with unique ids `1..=n`.
pub fn arb_cards() -> impl Strategy<Value = Vec<Card>> {
    (0usize..16).prop_flat_map(|n| (1..=n as u64).map(arb_card).collect::<Vec<_>>())
}

pub fn arb_record() -> impl Strategy<Value = ExtrasRecord> {
    (
        prop::collection::vec(prop::sample::select(PRESET_LABELS.to_vec()), 0..3),
        prop::option::of(prop::sample::select(TEAM_MEMBERS.to_vec())),
    )
        .prop_map(|(labels, member)| {
            let mut rec = ExtrasRecord::default();
            for preset in labels {
                rec.add_label(preset.id).expect("preset label");
            }
            rec.assign(member.map(|m| m.id)).expect("team member");
            rec
        })
}

pub fn arb_extras(max_id: u64) -> impl Strategy<Value = HashMap<CardId, ExtrasRecord>> {
    let ids = (1..=max_id.max(1)).prop_map(CardId);
    prop::collection::hash_map(ids, arb_record(), 0..12)
}

pub fn arb_filters() -> impl Strategy<Value = FilterState> {
    let preset = prop::sample::select(PRESET_LABELS.to_vec());
    let member = prop::sample::select(TEAM_MEMBERS.to_vec());
    let label = prop_oneof![
        Just(LabelFilter::All),
        preset.prop_map(|p| LabelFilter::Only(p.id.into())),
    ];
    let assignee = prop_oneof![
        Just(AssigneeFilter::All),
        Just(AssigneeFilter::Unassigned),
        member.prop_map(|m| AssigneeFilter::Member(m.id.into())),
    ];
    let search = prop_oneof![
        Just(String::new()),
        prop::sample::select(WORDS).prop_map(str::to_uppercase),
    ];
    (search, label, assignee).prop_map(|(search_text, label, assignee)| FilterState {
        search_text,
        label,
        assignee,
    })
}
