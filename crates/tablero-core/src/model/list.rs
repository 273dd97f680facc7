use serde::Serialize;

use super::card::ListId;
use crate::error::ValidationError;

/// A column of the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BoardList {
    pub id: ListId,
    pub name: &'static str,
}

/// Column layout every board is created with.
pub const DEFAULT_LISTS: [BoardList; 3] = [
    BoardList {
        id: ListId(1),
        name: "Por hacer",
    },
    BoardList {
        id: ListId(2),
        name: "En curso",
    },
    BoardList {
        id: ListId(3),
        name: "Hecho",
    },
];

#[must_use]
pub fn list_name(id: ListId) -> Option<&'static str> {
    DEFAULT_LISTS.iter().find(|l| l.id == id).map(|l| l.name)
}

/// Resolve a list from a numeric id or a case-insensitive column name.
///
/// # Errors
///
/// Returns [`ValidationError::UnknownList`] when nothing matches.
pub fn parse_list(raw: &str) -> Result<ListId, ValidationError> {
    let raw = raw.trim();
    if let Ok(n) = raw.parse::<u32>() {
        let id = ListId(n);
        return if list_name(id).is_some() {
            Ok(id)
        } else {
            Err(ValidationError::UnknownList(id))
        };
    }

    let wanted = raw.to_lowercase();
    DEFAULT_LISTS
        .iter()
        .find(|l| l.name.to_lowercase() == wanted)
        .map(|l| l.id)
        .ok_or(ValidationError::UnknownList(ListId(0)))
}

/// Fail unless `id` is one of the board's columns.
///
/// # Errors
///
/// Returns [`ValidationError::UnknownList`].
pub fn ensure_known(id: ListId) -> Result<ListId, ValidationError> {
    list_name(id)
        .map(|_| id)
        .ok_or(ValidationError::UnknownList(id))
}
