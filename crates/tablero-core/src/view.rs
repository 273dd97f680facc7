//! Pure derivation of the rendered board from cards, overlay and filters.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

use crate::extras::ExtrasLookup;
use crate::model::card::{BoardId, Card, ListId};
use crate::model::extras::{ChecklistProgress, ExtrasRecord, Label, find_member};
use crate::model::filter::FilterState;
use crate::model::list::BoardList;

/// Cards grouped per list, each group ordered by `(position, id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DerivedBoard {
    pub board_id: BoardId,
    pub lists: BTreeMap<ListId, Vec<Card>>,
    /// Cards that passed the filters.
    pub shown: usize,
    /// Cards on the board before filtering.
    pub total: usize,
}

/// One rendered column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column<'a> {
    pub list: BoardList,
    pub cards: &'a [Card],
}

impl DerivedBoard {
    #[must_use]
    pub fn cards_in(&self, list_id: ListId) -> &[Card] {
        self.lists
            .get(&list_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Columns in layout order. Empty lists are included.
    #[must_use]
    pub fn columns<'a>(&'a self, layout: &[BoardList]) -> Vec<Column<'a>> {
        layout
            .iter()
            .map(|list| Column {
                list: *list,
                cards: self.cards_in(list.id),
            })
            .collect()
    }

    /// "N de M resultados" style counter text.
    #[must_use]
    pub fn result_count(&self) -> String {
        format!("{} de {} resultados", self.shown, self.total)
    }
}

/// Group `cards` of `board_id` that pass `filters` by list.
///
/// Deterministic and side-effect free.
pub fn derive<'a, L>(
    cards: impl IntoIterator<Item = &'a Card>,
    board_id: BoardId,
    extras: &L,
    filters: &FilterState,
) -> DerivedBoard
where
    L: ExtrasLookup + ?Sized,
{
    let mut lists: BTreeMap<ListId, Vec<Card>> = BTreeMap::new();
    let mut total = 0;
    let mut shown = 0;

    for card in cards.into_iter().filter(|c| c.board_id == board_id) {
        total += 1;
        if filters.matches(card, extras.extras_for(card.id)) {
            shown += 1;
            lists.entry(card.list_id).or_default().push(card.clone());
        }
    }

    for group in lists.values_mut() {
        group.sort_by_key(|c| (c.position, c.id));
    }

    DerivedBoard {
        board_id,
        lists,
        shown,
        total,
    }
}

/// Due-date badge relative to a given day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "days", rename_all = "lowercase")]
pub enum DueStatus {
    /// Past due by this many days.
    Overdue(i64),
    Today,
    /// Due within three days.
    Soon(i64),
    Later(i64),
}

impl DueStatus {
    #[must_use]
    pub fn from_dates(due: NaiveDate, today: NaiveDate) -> Self {
        match (due - today).num_days() {
            d if d < 0 => Self::Overdue(-d),
            0 => Self::Today,
            d @ 1..=3 => Self::Soon(d),
            d => Self::Later(d),
        }
    }
}

impl fmt::Display for DueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Overdue(days) => write!(f, "Vencido hace {days} días"),
            Self::Today => f.write_str("Hoy"),
            Self::Soon(days) | Self::Later(days) => write!(f, "{days} días"),
        }
    }
}

/// A card merged with its overlay, ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardSummary {
    #[serde(flatten)]
    pub card: Card,
    pub labels: Vec<Label>,
    pub assignee: Option<String>,
    pub assignee_name: Option<&'static str>,
    pub checklist: ChecklistProgress,
    pub due: Option<DueStatus>,
}

impl CardSummary {
    #[must_use]
    pub fn new(card: &Card, extras: &ExtrasRecord, today: NaiveDate) -> Self {
        let assignee_name = extras
            .assignee
            .as_deref()
            .and_then(find_member)
            .map(|m| m.name);
        Self {
            card: card.clone(),
            labels: extras.labels.clone(),
            assignee: extras.assignee.clone(),
            assignee_name,
            checklist: extras.progress(),
            due: card.due_date.map(|d| DueStatus::from_dates(d, today)),
        }
    }
}
