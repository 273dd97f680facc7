//! Closed data types for cards, board columns, the client-side overlay and
//! view filters.

pub mod card;
pub mod extras;
pub mod filter;
pub mod list;

pub use card::{BoardId, Card, CardDraft, CardId, CardPatch, ListId};
pub use extras::{ChecklistItem, ChecklistProgress, ExtrasRecord, Label, LabelColor, TeamMember};
pub use filter::{AssigneeFilter, FilterState, LabelFilter};
pub use list::BoardList;
