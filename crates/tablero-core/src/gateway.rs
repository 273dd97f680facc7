//! Contract with the remote card store, plus an in-process implementation.

use std::collections::{BTreeMap, VecDeque};

use serde::Serialize;

use crate::model::card::{BoardId, Card, CardDraft, CardId, CardPatch, ListId};
use crate::wire::DecodeError;

/// Destination of a move call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MoveTarget {
    pub list_id: ListId,
    pub position: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// The request never produced a response (DNS, refused, timeout, ...).
    #[error("network error: {0}")]
    Transport(String),
    /// The remote store answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },
    #[error("invalid response: {0}")]
    Decode(#[from] DecodeError),
}

impl GatewayError {
    /// Message suitable for showing next to a rolled-back card.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Status { message, .. } if !message.is_empty() => message.clone(),
            other => other.to_string(),
        }
    }

    #[must_use]
    pub fn not_found(id: CardId) -> Self {
        Self::Status {
            status: 404,
            message: format!("Card {} not found", id.0),
        }
    }
}

/// Remote store operations consumed by the synchronization core.
///
/// Every call either yields the canonical card as the remote side now holds
/// it or an error. No timeout or retry policy is imposed here.
pub trait CardGateway {
    /// # Errors
    ///
    /// Transport, status or decode failure.
    fn fetch_cards(&mut self, board_id: BoardId) -> Result<Vec<Card>, GatewayError>;

    /// # Errors
    ///
    /// Transport, status or decode failure.
    fn create_card(&mut self, draft: &CardDraft) -> Result<Card, GatewayError>;

    /// # Errors
    ///
    /// Transport, status or decode failure.
    fn update_card(&mut self, id: CardId, patch: &CardPatch) -> Result<Card, GatewayError>;

    /// # Errors
    ///
    /// Transport, status or decode failure.
    fn move_card(&mut self, id: CardId, target: MoveTarget) -> Result<Card, GatewayError>;

    /// # Errors
    ///
    /// Transport or status failure.
    fn delete_card(&mut self, id: CardId) -> Result<(), GatewayError>;
}

/// A call observed by [`MemoryGateway`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    Fetch(BoardId),
    Create(String),
    Update(CardId),
    Move(CardId, MoveTarget),
    Delete(CardId),
}

/// In-memory card store with scriptable failures.
///
/// Ids are assigned sequentially starting after the highest seeded id.
#[derive(Debug, Default)]
pub struct MemoryGateway {
    cards: BTreeMap<CardId, Card>,
    next_id: u64,
    failures: VecDeque<GatewayError>,
    calls: Vec<GatewayCall>,
}

impl MemoryGateway {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_cards(cards: impl IntoIterator<Item = Card>) -> Self {
        let mut gw = Self::new();
        for card in cards {
            gw.next_id = gw.next_id.max(card.id.0);
            gw.cards.insert(card.id, card);
        }
        gw
    }

    /// Make the next call fail with `err`. Queued failures are consumed in order.
    pub fn fail_next(&mut self, err: GatewayError) {
        self.failures.push_back(err);
    }

    /// Make the next `n` calls fail with a transport error.
    pub fn fail_next_calls(&mut self, n: usize, message: &str) {
        for _ in 0..n {
            self.fail_next(GatewayError::Transport(message.to_string()));
        }
    }

    #[must_use]
    pub fn calls(&self) -> &[GatewayCall] {
        &self.calls
    }

    #[must_use]
    pub fn card(&self, id: CardId) -> Option<&Card> {
        self.cards.get(&id)
    }

    fn record(&mut self, call: GatewayCall) -> Result<(), GatewayError> {
        self.calls.push(call);
        self.failures.pop_front().map_or(Ok(()), Err)
    }

    fn existing(&mut self, id: CardId) -> Result<&mut Card, GatewayError> {
        self.cards
            .get_mut(&id)
            .ok_or_else(|| GatewayError::not_found(id))
    }
}

impl CardGateway for MemoryGateway {
    fn fetch_cards(&mut self, board_id: BoardId) -> Result<Vec<Card>, GatewayError> {
        self.record(GatewayCall::Fetch(board_id))?;
        Ok(self
            .cards
            .values()
            .filter(|c| c.board_id == board_id)
            .cloned()
            .collect())
    }

    fn create_card(&mut self, draft: &CardDraft) -> Result<Card, GatewayError> {
        self.record(GatewayCall::Create(draft.title.clone()))?;
        self.next_id += 1;
        let position = self
            .cards
            .values()
            .filter(|c| c.board_id == draft.board_id && c.list_id == draft.list_id)
            .count();
        let card = Card {
            id: CardId(self.next_id),
            board_id: draft.board_id,
            list_id: draft.list_id,
            title: draft.title.clone(),
            description: draft.description.clone(),
            due_date: draft.due_date,
            position: i64::try_from(position).unwrap_or(i64::MAX),
        };
        self.cards.insert(card.id, card.clone());
        Ok(card)
    }

    fn update_card(&mut self, id: CardId, patch: &CardPatch) -> Result<Card, GatewayError> {
        self.record(GatewayCall::Update(id))?;
        let card = self.existing(id)?;
        patch.apply_to(card);
        Ok(card.clone())
    }

    fn move_card(&mut self, id: CardId, target: MoveTarget) -> Result<Card, GatewayError> {
        self.record(GatewayCall::Move(id, target))?;
        let card = self.existing(id)?;
        card.list_id = target.list_id;
        card.position = target.position;
        Ok(card.clone())
    }

    fn delete_card(&mut self, id: CardId) -> Result<(), GatewayError> {
        self.record(GatewayCall::Delete(id))?;
        self.cards
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| GatewayError::not_found(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> MemoryGateway {
        MemoryGateway::with_cards([Card {
            id: CardId(5),
            board_id: BoardId(1),
            list_id: ListId(1),
            title: "Existente".into(),
            description: None,
            due_date: None,
            position: 0,
        }])
    }

    #[test]
    fn create_assigns_ids_after_seeded_cards() {
        let mut gw = seeded();
        let card = gw
            .create_card(&CardDraft::new(BoardId(1), ListId(1), "Nueva"))
            .expect("create");
        assert_eq!(card.id, CardId(6));
        assert_eq!(card.position, 1);
    }

    #[test]
    fn queued_failures_are_consumed_in_order() {
        let mut gw = seeded();
        gw.fail_next_calls(1, "offline");
        assert!(matches!(
            gw.fetch_cards(BoardId(1)),
            Err(GatewayError::Transport(_))
        ));
        assert_eq!(gw.fetch_cards(BoardId(1)).expect("fetch").len(), 1);
        assert_eq!(gw.calls().len(), 2);
    }

    #[test]
    fn missing_card_is_a_404() {
        let mut gw = seeded();
        let err = gw.delete_card(CardId(99)).expect_err("missing");
        assert!(matches!(err, GatewayError::Status { status: 404, .. }));
        assert_eq!(err.user_message(), "Card 99 not found");
    }

    #[test]
    fn move_updates_list_and_position() {
        let mut gw = seeded();
        let target = MoveTarget {
            list_id: ListId(3),
            position: 2,
        };
        let card = gw.move_card(CardId(5), target).expect("move");
        assert_eq!((card.list_id, card.position), (ListId(3), 2));
        assert_eq!(
            gw.calls().last(),
            Some(&GatewayCall::Move(CardId(5), target))
        );
    }
}
