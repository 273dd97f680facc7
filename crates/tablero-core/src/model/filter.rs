use serde::Serialize;

use super::card::Card;
use super::extras::{ExtrasRecord, find_member, find_preset};
use crate::error::ValidationError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum LabelFilter {
    #[default]
    All,
    Only(String),
}

impl LabelFilter {
    /// `"all"` (or blank) clears the filter; anything else must be a catalogue label.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnknownLabel`].
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let raw = raw.trim();
        if raw.is_empty() || raw.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        find_preset(raw)
            .map(|p| Self::Only(p.id.to_string()))
            .ok_or_else(|| ValidationError::UnknownLabel(raw.into()))
    }

    #[must_use]
    pub fn matches(&self, extras: &ExtrasRecord) -> bool {
        match self {
            Self::All => true,
            Self::Only(id) => extras.has_label(id),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum AssigneeFilter {
    #[default]
    All,
    Unassigned,
    Member(String),
}

impl AssigneeFilter {
    /// Accepts `"all"`, `"unassigned"` or a team member id.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnknownMember`].
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let raw = raw.trim();
        if raw.is_empty() || raw.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        if raw.eq_ignore_ascii_case("unassigned") {
            return Ok(Self::Unassigned);
        }
        find_member(raw)
            .map(|m| Self::Member(m.id.to_string()))
            .ok_or_else(|| ValidationError::UnknownMember(raw.into()))
    }

    #[must_use]
    pub fn matches(&self, extras: &ExtrasRecord) -> bool {
        match self {
            Self::All => true,
            Self::Unassigned => extras.assignee.is_none(),
            Self::Member(id) => extras.assignee.as_deref() == Some(id.as_str()),
        }
    }
}

/// View criteria. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterState {
    pub search_text: String,
    pub label: LabelFilter,
    pub assignee: AssigneeFilter,
}

impl FilterState {
    #[must_use]
    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.search_text = text.into();
        self
    }

    #[must_use]
    pub fn label(mut self, filter: LabelFilter) -> Self {
        self.label = filter;
        self
    }

    #[must_use]
    pub fn assignee(mut self, filter: AssigneeFilter) -> Self {
        self.assignee = filter;
        self
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.search_text.trim().is_empty()
            || self.label != LabelFilter::All
            || self.assignee != AssigneeFilter::All
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    #[must_use]
    pub fn matches_search(&self, card: &Card) -> bool {
        let needle = self.search_text.trim().to_lowercase();
        needle.is_empty() || card.mentions(&needle)
    }

    #[must_use]
    pub fn matches_label(&self, extras: &ExtrasRecord) -> bool {
        self.label.matches(extras)
    }

    #[must_use]
    pub fn matches_assignee(&self, extras: &ExtrasRecord) -> bool {
        self.assignee.matches(extras)
    }

    /// All three predicates, AND-composed.
    #[must_use]
    pub fn matches(&self, card: &Card, extras: &ExtrasRecord) -> bool {
        self.matches_search(card) && self.matches_label(extras) && self.matches_assignee(extras)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::card::{BoardId, CardId, ListId};

    fn card(title: &str) -> Card {
        Card {
            id: CardId(1),
            board_id: BoardId(1),
            list_id: ListId(1),
            title: title.into(),
            description: None,
            due_date: None,
            position: 0,
        }
    }

    #[test]
    fn blank_search_matches_everything() {
        let f = FilterState::default().search("   ");
        assert!(f.matches_search(&card("x")));
        assert!(!f.is_active());
    }

    #[test]
    fn search_is_trimmed_and_case_insensitive() {
        let f = FilterState::default().search("  LOGIN ");
        assert!(f.matches_search(&card("Arreglar login")));
        assert!(!f.matches_search(&card("Arreglar logout")));
    }

    #[test]
    fn unassigned_filter_matches_records_without_assignee() {
        let f = FilterState::default().assignee(AssigneeFilter::Unassigned);
        let mut rec = ExtrasRecord::default();
        assert!(f.matches_assignee(&rec));
        rec.assign(Some("user1")).expect("member");
        assert!(!f.matches_assignee(&rec));
    }

    #[test]
    fn parse_filters() {
        assert_eq!(LabelFilter::parse("ALL"), Ok(LabelFilter::All));
        assert_eq!(
            LabelFilter::parse("bug"),
            Ok(LabelFilter::Only("bug".into()))
        );
        assert!(LabelFilter::parse("nope").is_err());
        assert_eq!(
            AssigneeFilter::parse("unassigned"),
            Ok(AssigneeFilter::Unassigned)
        );
        assert_eq!(
            AssigneeFilter::parse("user3"),
            Ok(AssigneeFilter::Member("user3".into()))
        );
    }

    #[test]
    fn clear_resets_every_criterion() {
        let mut f = FilterState::default()
            .search("x")
            .label(LabelFilter::Only("bug".into()))
            .assignee(AssigneeFilter::Unassigned);
        assert!(f.is_active());
        f.clear();
        assert_eq!(f, FilterState::default());
    }
}
