use std::fmt;

use crate::extras::StoreError;
use crate::gateway::GatewayError;
use crate::model::card::{BoardId, CardId, ListId};

/// Machine-readable error codes surfaced next to every user-facing failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    CardNotFound,
    ValidationFailed,
    UnknownLabel,
    UnknownMember,
    ChecklistItemNotFound,
    NoActiveDrag,
    InvalidDropTarget,
    FetchFailed,
    MoveRejected,
    RemoteRejected,
    PayloadInvalid,
    ExtrasStoreFailed,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1001",
            Self::CardNotFound => "E2001",
            Self::ValidationFailed => "E2002",
            Self::UnknownLabel => "E2003",
            Self::UnknownMember => "E2004",
            Self::ChecklistItemNotFound => "E2005",
            Self::NoActiveDrag => "E2006",
            Self::InvalidDropTarget => "E2007",
            Self::FetchFailed => "E3001",
            Self::MoveRejected => "E3002",
            Self::RemoteRejected => "E3003",
            Self::PayloadInvalid => "E3004",
            Self::ExtrasStoreFailed => "E4001",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigParseError => "Config file parse error",
            Self::CardNotFound => "Card not found on the active board",
            Self::ValidationFailed => "Invalid card data",
            Self::UnknownLabel => "Unknown label",
            Self::UnknownMember => "Unknown team member",
            Self::ChecklistItemNotFound => "Checklist item not found",
            Self::NoActiveDrag => "No drag in progress",
            Self::InvalidDropTarget => "Invalid drop target",
            Self::FetchFailed => "Could not load cards",
            Self::MoveRejected => "Move was rejected and rolled back",
            Self::RemoteRejected => "Remote store rejected the change",
            Self::PayloadInvalid => "Remote payload failed validation",
            Self::ExtrasStoreFailed => "Local overlay store failure",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to users.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => Some("Fix syntax in tablero/config.toml and retry."),
            Self::CardNotFound => Some("Reload the board; the card may have been deleted."),
            Self::ValidationFailed => Some("Titles must be non-empty and at most 200 characters."),
            Self::UnknownLabel => {
                Some("Use one of: urgent, blocked, improve, ready, feature, bug, doc, review.")
            }
            Self::UnknownMember => Some("Use one of: user1, user2, user3, user4, or none."),
            Self::ChecklistItemNotFound => Some("List the card to see checklist item ids."),
            Self::NoActiveDrag | Self::InvalidDropTarget | Self::MoveRejected => {
                Some("Retry the move.")
            }
            Self::FetchFailed => Some("Check the API URL and token, then reload."),
            Self::RemoteRejected => Some("Retry once. If persistent, reload the board."),
            Self::PayloadInvalid => Some("The server response did not match the card schema."),
            Self::ExtrasStoreFailed => Some("Check disk space and write permissions."),
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Local validation failure. Never reaches the gateway.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("title must not be empty")]
    EmptyTitle,
    #[error("title is {len} characters long; the limit is {max}")]
    TitleTooLong { len: usize, max: usize },
    #[error("list {0} does not exist on this board")]
    UnknownList(ListId),
    #[error("unknown label '{0}'")]
    UnknownLabel(String),
    #[error("unknown team member '{0}'")]
    UnknownMember(String),
    #[error("checklist item text must not be empty")]
    EmptyChecklistText,
    #[error("checklist item '{0}' not found")]
    ChecklistItemNotFound(String),
}

impl ValidationError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::EmptyTitle | Self::TitleTooLong { .. } | Self::UnknownList(_) => {
                ErrorCode::ValidationFailed
            }
            Self::UnknownLabel(_) => ErrorCode::UnknownLabel,
            Self::UnknownMember(_) => ErrorCode::UnknownMember,
            Self::EmptyChecklistText => ErrorCode::ValidationFailed,
            Self::ChecklistItemNotFound(_) => ErrorCode::ChecklistItemNotFound,
        }
    }
}

/// Failure taxonomy of the board synchronization core.
///
/// Every variant is recoverable: the collection is always left either at its
/// previous value or at a deterministic rolled-back value.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Initial or refresh load failed; the collection keeps its last value.
    #[error("failed to load cards for board {board_id}: {source}")]
    Fetch {
        board_id: BoardId,
        #[source]
        source: GatewayError,
    },

    /// A move's remote confirmation failed and the card snapped back.
    #[error("move of card {card_id} failed and was rolled back: {message}")]
    Move { card_id: CardId, message: String },

    /// An edit was undone because the remote store answered with a card
    /// that does not belong at this slot of the board.
    #[error("edit of card {card_id} was rolled back: {message}")]
    Edit { card_id: CardId, message: String },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A create, edit or delete call was rejected by the remote store.
    #[error("{operation} failed: {source}")]
    Remote {
        operation: &'static str,
        #[source]
        source: GatewayError,
    },

    #[error("card {0} is not on the active board")]
    CardNotFound(CardId),

    #[error("no drag in progress")]
    NoActiveDrag,

    #[error("cannot drop onto card {0}: it is not on the active board")]
    InvalidDropTarget(CardId),

    /// A mutation was tagged with a sequence number that is not newer than
    /// one already observed for the same card.
    #[error("sequence {seq} for card {card_id} is not newer than {latest}")]
    SequenceRegression {
        card_id: CardId,
        seq: u64,
        latest: u64,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SyncError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Fetch { source, .. } => match source {
                GatewayError::Decode(_) => ErrorCode::PayloadInvalid,
                _ => ErrorCode::FetchFailed,
            },
            Self::Move { .. } => ErrorCode::MoveRejected,
            Self::Edit { .. } => ErrorCode::RemoteRejected,
            Self::Validation(err) => err.code(),
            Self::Remote { source, .. } => match source {
                GatewayError::Decode(_) => ErrorCode::PayloadInvalid,
                _ => ErrorCode::RemoteRejected,
            },
            Self::CardNotFound(_) => ErrorCode::CardNotFound,
            Self::NoActiveDrag => ErrorCode::NoActiveDrag,
            Self::InvalidDropTarget(_) => ErrorCode::InvalidDropTarget,
            Self::SequenceRegression { .. } => ErrorCode::InternalUnexpected,
            Self::Store(_) => ErrorCode::ExtrasStoreFailed,
        }
    }

    /// Remediation hint for the user, if any.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }
}
