//! Client-owned overlay attached to a card: labels, an assignee and a
//! checklist. None of this is ever sent to the remote store.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ValidationError;

/// Fixed palette a label can be drawn with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelColor {
    Red,
    Yellow,
    Blue,
    Green,
    Purple,
    Pink,
    Indigo,
    Orange,
}

impl LabelColor {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Red => "red",
            Self::Yellow => "yellow",
            Self::Blue => "blue",
            Self::Green => "green",
            Self::Purple => "purple",
            Self::Pink => "pink",
            Self::Indigo => "indigo",
            Self::Orange => "orange",
        }
    }
}

impl fmt::Display for LabelColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A label as stored on a card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub id: String,
    pub name: String,
    pub color: LabelColor,
}

/// Entry of the built-in label catalogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelPreset {
    pub id: &'static str,
    pub name: &'static str,
    pub color: LabelColor,
}

impl LabelPreset {
    #[must_use]
    pub fn to_label(self) -> Label {
        Label {
            id: self.id.to_string(),
            name: self.name.to_string(),
            color: self.color,
        }
    }
}

const fn preset(id: &'static str, name: &'static str, color: LabelColor) -> LabelPreset {
    LabelPreset { id, name, color }
}

pub const PRESET_LABELS: [LabelPreset; 8] = [
    preset("urgent", "Urgente", LabelColor::Red),
    preset("blocked", "Bloqueado", LabelColor::Yellow),
    preset("improve", "Mejora", LabelColor::Blue),
    preset("ready", "Listo", LabelColor::Green),
    preset("feature", "Feature", LabelColor::Purple),
    preset("bug", "Bug", LabelColor::Pink),
    preset("doc", "Documentación", LabelColor::Indigo),
    preset("review", "Review", LabelColor::Orange),
];

#[must_use]
pub fn find_preset(id: &str) -> Option<LabelPreset> {
    PRESET_LABELS.iter().copied().find(|p| p.id == id)
}

/// Someone a card can be assigned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TeamMember {
    pub id: &'static str,
    pub name: &'static str,
}

const fn member(id: &'static str, name: &'static str) -> TeamMember {
    TeamMember { id, name }
}

pub const TEAM_MEMBERS: [TeamMember; 4] = [
    member("user1", "Juan Pérez"),
    member("user2", "María García"),
    member("user3", "Carlos López"),
    member("user4", "Ana Martínez"),
];

#[must_use]
pub fn find_member(id: &str) -> Option<TeamMember> {
    TEAM_MEMBERS.iter().copied().find(|m| m.id == id)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub done: bool,
}

/// Done/total counts and a whole-number percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChecklistProgress {
    pub done: usize,
    pub total: usize,
    pub percent: u8,
}

impl ChecklistProgress {
    /// Percent is rounded half up (1/8 is 13%). An empty checklist is 0%.
    #[must_use]
    pub fn of(items: &[ChecklistItem]) -> Self {
        let total = items.len();
        let done = items.iter().filter(|i| i.done).count();
        let percent = if total == 0 {
            0
        } else {
            u8::try_from((done * 200 + total) / (2 * total)).unwrap_or(100)
        };
        Self {
            done,
            total,
            percent,
        }
    }
}

/// Overlay metadata for one card.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtrasRecord {
    pub labels: Vec<Label>,
    pub assignee: Option<String>,
    pub checklist: Vec<ChecklistItem>,
}

/// The record every card without stored extras reads as.
pub static EMPTY_RECORD: ExtrasRecord = ExtrasRecord {
    labels: Vec::new(),
    assignee: None,
    checklist: Vec::new(),
};

impl ExtrasRecord {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.labels.is_empty() && self.assignee.is_none() && self.checklist.is_empty()
    }

    #[must_use]
    pub fn has_label(&self, id: &str) -> bool {
        self.labels.iter().any(|l| l.id == id)
    }

    /// Attach a catalogue label. Returns `false` if it was already attached.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnknownLabel`] for ids outside the catalogue.
    pub fn add_label(&mut self, id: &str) -> Result<bool, ValidationError> {
        let preset = find_preset(id).ok_or_else(|| ValidationError::UnknownLabel(id.into()))?;
        if self.has_label(id) {
            return Ok(false);
        }
        self.labels.push(preset.to_label());
        Ok(true)
    }

    /// Returns `true` if the label was attached.
    pub fn remove_label(&mut self, id: &str) -> bool {
        let before = self.labels.len();
        self.labels.retain(|l| l.id != id);
        self.labels.len() != before
    }

    /// Assign to a team member, or unassign with `None`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnknownMember`] for ids outside the team.
    pub fn assign(&mut self, member: Option<&str>) -> Result<(), ValidationError> {
        self.assignee = match member {
            None => None,
            Some(id) => {
                let member =
                    find_member(id).ok_or_else(|| ValidationError::UnknownMember(id.into()))?;
                Some(member.id.to_string())
            }
        };
        Ok(())
    }

    /// Append an unchecked item and return its id.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyChecklistText`] for blank text.
    pub fn add_checklist_item(&mut self, text: &str) -> Result<String, ValidationError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ValidationError::EmptyChecklistText);
        }
        let id = format!("item-{}", self.next_item_number());
        self.checklist.push(ChecklistItem {
            id: id.clone(),
            text: text.to_string(),
            done: false,
        });
        Ok(id)
    }

    /// Flip an item's `done` flag and return the new value.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::ChecklistItemNotFound`].
    pub fn toggle_checklist_item(&mut self, id: &str) -> Result<bool, ValidationError> {
        let item = self.item_mut(id)?;
        item.done = !item.done;
        Ok(item.done)
    }

    /// # Errors
    ///
    /// Returns [`ValidationError::ChecklistItemNotFound`] or
    /// [`ValidationError::EmptyChecklistText`].
    pub fn rename_checklist_item(&mut self, id: &str, text: &str) -> Result<(), ValidationError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ValidationError::EmptyChecklistText);
        }
        self.item_mut(id)?.text = text.to_string();
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`ValidationError::ChecklistItemNotFound`].
    pub fn remove_checklist_item(&mut self, id: &str) -> Result<ChecklistItem, ValidationError> {
        let idx = self
            .checklist
            .iter()
            .position(|i| i.id == id)
            .ok_or_else(|| ValidationError::ChecklistItemNotFound(id.into()))?;
        Ok(self.checklist.remove(idx))
    }

    #[must_use]
    pub fn progress(&self) -> ChecklistProgress {
        ChecklistProgress::of(&self.checklist)
    }

    /// Drop duplicate labels (first wins) and blank assignees.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        let mut seen = std::collections::HashSet::new();
        self.labels.retain(|l| seen.insert(l.id.clone()));
        if self.assignee.as_deref().is_some_and(|a| a.trim().is_empty()) {
            self.assignee = None;
        }
        self
    }

    fn item_mut(&mut self, id: &str) -> Result<&mut ChecklistItem, ValidationError> {
        self.checklist
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| ValidationError::ChecklistItemNotFound(id.into()))
    }

    fn next_item_number(&self) -> u64 {
        self.checklist
            .iter()
            .filter_map(|i| i.id.strip_prefix("item-")?.parse::<u64>().ok())
            .max()
            .map_or(1, |n| n + 1)
    }
}
