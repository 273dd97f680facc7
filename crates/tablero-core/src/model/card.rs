use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ValidationError;

/// Maximum title length accepted by the remote store (`VARCHAR(200)`).
pub const TITLE_MAX_CHARS: usize = 200;

/// Card identity, assigned by the remote store on create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(pub u64);

/// Identity of a list (the card's "status" column).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListId(pub u32);

/// Identity of the board that owns a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BoardId(pub u64);

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Display for ListId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for BoardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A card as last observed from (or optimistically assumed for) the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub board_id: BoardId,
    pub list_id: ListId,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
    /// Ordering key within the list. Not unique across concurrent writers.
    pub position: i64,
}

impl Card {
    /// Case-insensitive substring match against title and description.
    ///
    /// `needle` must already be lowercased.
    #[must_use]
    pub fn mentions(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle)
            || self
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(needle))
    }
}

/// Payload for creating a card. Identity is assigned by the remote side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardDraft {
    pub board_id: BoardId,
    pub list_id: ListId,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
}

impl CardDraft {
    #[must_use]
    pub fn new(board_id: BoardId, list_id: ListId, title: impl Into<String>) -> Self {
        Self {
            board_id,
            list_id,
            title: title.into(),
            description: None,
            due_date: None,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub const fn with_due_date(mut self, due: NaiveDate) -> Self {
        self.due_date = Some(due);
        self
    }

    /// Normalize and validate the draft: the title is trimmed and must be
    /// non-empty; a blank description becomes absent.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] for an empty or over-long title.
    pub fn validate(self) -> Result<Self, ValidationError> {
        Ok(Self {
            title: validate_title(&self.title)?,
            description: normalize_description(self.description),
            ..self
        })
    }
}

/// Partial update of a card's remote-owned fields.
///
/// `None` leaves a field untouched. For the nullable fields the inner
/// `Option` distinguishes "clear" (`Some(None)`) from "set".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CardPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Option<NaiveDate>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list_id: Option<ListId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<i64>,
}

impl CardPatch {
    /// A patch that relocates a card to `list_id` at `position`.
    #[must_use]
    pub const fn relocate(list_id: ListId, position: i64) -> Self {
        Self {
            title: None,
            description: None,
            due_date: None,
            list_id: Some(list_id),
            position: Some(position),
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.due_date.is_none()
            && self.list_id.is_none()
            && self.position.is_none()
    }

    /// Normalize and validate the fields that are present.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if a title is present but empty or too long.
    pub fn validate(self) -> Result<Self, ValidationError> {
        let title = match self.title {
            Some(raw) => Some(validate_title(&raw)?),
            None => None,
        };
        Ok(Self {
            title,
            description: self.description.map(normalize_description),
            ..self
        })
    }

    /// Apply the present fields to `card` in place.
    pub fn apply_to(&self, card: &mut Card) {
        if let Some(title) = &self.title {
            card.title.clone_from(title);
        }
        if let Some(description) = &self.description {
            card.description.clone_from(description);
        }
        if let Some(due) = self.due_date {
            card.due_date = due;
        }
        if let Some(list_id) = self.list_id {
            card.list_id = list_id;
        }
        if let Some(position) = self.position {
            card.position = position;
        }
    }
}

/// Trim a title and enforce the non-empty and length bounds.
///
/// # Errors
///
/// Returns [`ValidationError::EmptyTitle`] or [`ValidationError::TitleTooLong`].
pub fn validate_title(raw: &str) -> Result<String, ValidationError> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(ValidationError::EmptyTitle);
    }
    let len = title.chars().count();
    if len > TITLE_MAX_CHARS {
        return Err(ValidationError::TitleTooLong {
            len,
            max: TITLE_MAX_CHARS,
        });
    }
    Ok(title.to_string())
}

fn normalize_description(raw: Option<String>) -> Option<String> {
    raw.map(|d| d.trim().to_string()).filter(|d| !d.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card() -> Card {
        Card {
            id: CardId(7),
            board_id: BoardId(1),
            list_id: ListId(1),
            title: "Preparar demo".into(),
            description: Some("Revisar el Flujo de login".into()),
            due_date: None,
            position: 3,
        }
    }

    #[test]
    fn empty_title_is_rejected() {
        assert_eq!(validate_title("   "), Err(ValidationError::EmptyTitle));
        assert_eq!(validate_title(""), Err(ValidationError::EmptyTitle));
    }

    #[test]
    fn title_is_trimmed() {
        assert_eq!(validate_title("  Fix login  ").as_deref(), Ok("Fix login"));
    }

    #[test]
    fn title_length_counts_chars_not_bytes() {
        let accented = "é".repeat(TITLE_MAX_CHARS);
        assert!(validate_title(&accented).is_ok());

        let too_long = "a".repeat(TITLE_MAX_CHARS + 1);
        assert_eq!(
            validate_title(&too_long),
            Err(ValidationError::TitleTooLong {
                len: TITLE_MAX_CHARS + 1,
                max: TITLE_MAX_CHARS
            })
        );
    }

    #[test]
    fn draft_blank_description_becomes_none() {
        let draft = CardDraft::new(BoardId(1), ListId(1), " Nueva ")
            .with_description("   ")
            .validate()
            .expect("valid draft");
        assert_eq!(draft.title, "Nueva");
        assert_eq!(draft.description, None);
    }

    #[test]
    fn relocate_patch_only_touches_list_and_position() {
        let mut c = card();
        CardPatch::relocate(ListId(3), 0).apply_to(&mut c);
        assert_eq!(c.list_id, ListId(3));
        assert_eq!(c.position, 0);
        assert_eq!(c.title, "Preparar demo");
    }

    #[test]
    fn patch_can_clear_nullable_fields() {
        let mut c = card();
        let patch = CardPatch {
            description: Some(None),
            ..CardPatch::default()
        };
        patch.apply_to(&mut c);
        assert_eq!(c.description, None);
    }

    #[test]
    fn empty_patch_is_detected() {
        assert!(CardPatch::default().is_empty());
        assert!(!CardPatch::relocate(ListId(2), 1).is_empty());
    }

    #[test]
    fn mentions_is_case_insensitive_over_title_and_description() {
        let c = card();
        assert!(c.mentions("demo"));
        assert!(c.mentions("flujo"));
        assert!(!c.mentions("deploy"));
    }
}
