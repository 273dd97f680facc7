//! Drag-and-drop move protocol.
//!
//! ```text
//! Idle ──begin_drag──▶ Dragging ──drop_on──▶ OptimisticallyApplied ──resolve──▶ Committed | RolledBack
//!                         │                      (intent in flight)
//!                         └──cancel / no-op drop──▶ Idle
//! ```
//!
//! Dropping applies the change to the collection immediately and returns a
//! [`MoveIntent`]. The host performs the remote call however it likes and
//! hands the result back to [`MoveCoordinator::resolve`]; results may arrive
//! in any order.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::collection::{CardCollection, Mutation, Outcome, Reconciled};
use crate::error::SyncError;
use crate::gateway::{GatewayError, MoveTarget};
use crate::model::card::{Card, CardId, CardPatch, ListId};
use crate::model::list;

/// Where a dragged card was released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropTarget {
    /// On top of another card: take its slot. A card dragged down its own
    /// list lands after the target, otherwise before it.
    Card(CardId),
    /// On the empty area of a list: append at the end.
    List(ListId),
}

/// An in-flight move, tagged with the sequence number its outcome must carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MoveIntent {
    pub card_id: CardId,
    pub from_list: ListId,
    pub from_position: i64,
    pub to_list: ListId,
    pub to_position: i64,
    pub seq: u64,
}

impl MoveIntent {
    #[must_use]
    pub const fn target(&self) -> MoveTarget {
        MoveTarget {
            list_id: self.to_list,
            position: self.to_position,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropOutcome {
    /// The list would read the same afterwards: nothing changes and no call
    /// is needed.
    NoOp,
    Applied(MoveIntent),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragPhase {
    Idle,
    Dragging { card_id: CardId },
}

/// Observable state of the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveState {
    Idle,
    Dragging { card_id: CardId },
    OptimisticallyApplied { in_flight: usize },
}

/// Terminal result of one move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveResolution {
    Committed(Card),
    RolledBack { card: Card, error: String },
    /// A newer change owns the card; the visible state was left alone.
    Stale,
    /// No move with that sequence number is in flight.
    Unknown,
}

#[derive(Debug, Default)]
pub struct MoveCoordinator {
    phase: Option<CardId>,
    last_seq: u64,
    in_flight: BTreeMap<u64, MoveIntent>,
}

impl MoveCoordinator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a sequence number. Strictly increasing for the coordinator's
    /// lifetime, and shared with optimistic edits.
    pub const fn next_sequence(&mut self) -> u64 {
        self.last_seq += 1;
        self.last_seq
    }

    #[must_use]
    pub const fn phase(&self) -> DragPhase {
        match self.phase {
            Some(card_id) => DragPhase::Dragging { card_id },
            None => DragPhase::Idle,
        }
    }

    #[must_use]
    pub fn state(&self) -> MoveState {
        match (self.phase, self.in_flight.len()) {
            (Some(card_id), _) => MoveState::Dragging { card_id },
            (None, 0) => MoveState::Idle,
            (None, in_flight) => MoveState::OptimisticallyApplied { in_flight },
        }
    }

    pub fn in_flight(&self) -> impl Iterator<Item = &MoveIntent> {
        self.in_flight.values()
    }

    /// Start dragging `card_id`. A new gesture replaces an unfinished one.
    ///
    /// # Errors
    ///
    /// [`SyncError::CardNotFound`] if the card is not on the board.
    pub fn begin_drag(
        &mut self,
        collection: &CardCollection,
        card_id: CardId,
    ) -> Result<(), SyncError> {
        if collection.get(card_id).is_none() {
            return Err(SyncError::CardNotFound(card_id));
        }
        debug!(card = %card_id, "drag started");
        self.phase = Some(card_id);
        Ok(())
    }

    pub fn cancel_drag(&mut self) {
        if let Some(card_id) = self.phase.take() {
            debug!(card = %card_id, "drag cancelled");
        }
    }

    /// End the gesture over `target`.
    ///
    /// The gesture is over once this returns, whatever the result.
    ///
    /// # Errors
    ///
    /// [`SyncError::NoActiveDrag`], [`SyncError::InvalidDropTarget`] for a card
    /// that is not on the board, a validation error for an unknown list, or
    /// [`SyncError::CardNotFound`] if the dragged card vanished meanwhile.
    pub fn drop_on(
        &mut self,
        collection: &mut CardCollection,
        target: DropTarget,
    ) -> Result<DropOutcome, SyncError> {
        let card_id = self.phase.take().ok_or(SyncError::NoActiveDrag)?;
        let card = collection
            .get(card_id)
            .ok_or(SyncError::CardNotFound(card_id))?;
        let (from_list, from_position) = (card.list_id, card.position);

        let (to_list, to_position) = match target {
            DropTarget::Card(other) if other == card_id => return Ok(DropOutcome::NoOp),
            DropTarget::Card(other) => {
                let other = collection
                    .get(other)
                    .ok_or(SyncError::InvalidDropTarget(other))?;
                let moving_down = other.list_id == from_list
                    && (from_position, card_id) < (other.position, other.id);
                let position = if moving_down {
                    slot_after(card_id, other)
                } else {
                    slot_before(card_id, other)
                };
                (other.list_id, position)
            }
            DropTarget::List(list_id) => {
                let list_id = list::ensure_known(list_id)?;
                let count = collection.count_in_list(list_id, Some(card_id));
                (list_id, i64::try_from(count).unwrap_or(i64::MAX))
            }
        };

        if to_list == from_list
            && list_order(collection, from_list, card_id, to_position)
                == list_order(collection, from_list, card_id, from_position)
        {
            debug!(card = %card_id, "dropped without changing the order");
            return Ok(DropOutcome::NoOp);
        }

        let seq = self.next_sequence();
        collection.apply_optimistic(&Mutation {
            seq,
            card_id,
            patch: CardPatch::relocate(to_list, to_position),
        })?;

        let intent = MoveIntent {
            card_id,
            from_list,
            from_position,
            to_list,
            to_position,
            seq,
        };
        self.in_flight.insert(seq, intent);
        info!(
            card = %card_id,
            seq,
            from = %from_list,
            to = %to_list,
            position = to_position,
            "move applied optimistically"
        );
        Ok(DropOutcome::Applied(intent))
    }

    /// Feed back the remote answer for the move tagged `seq`.
    pub fn resolve(
        &mut self,
        collection: &mut CardCollection,
        seq: u64,
        result: Result<Card, GatewayError>,
    ) -> MoveResolution {
        let Some(intent) = self.in_flight.remove(&seq) else {
            warn!(seq, "resolution for unknown move");
            return MoveResolution::Unknown;
        };

        let outcome = match result {
            Ok(card) => Outcome::Confirmed(card),
            Err(err) => Outcome::Failed(err.user_message()),
        };

        match collection.reconcile(intent.card_id, seq, outcome) {
            Reconciled::Committed(card) => MoveResolution::Committed(card),
            Reconciled::RolledBack { card, error } => MoveResolution::RolledBack { card, error },
            Reconciled::Stale => MoveResolution::Stale,
            Reconciled::Untracked => MoveResolution::Unknown,
        }
    }

    /// Forget the gesture and every in-flight intent, e.g. on board switch.
    /// The sequence counter keeps counting.
    pub fn reset(&mut self) {
        self.phase = None;
        self.in_flight.clear();
    }
}

/// Position that sorts `card_id` directly after `target` under the
/// `(position, id)` order.
const fn slot_after(card_id: CardId, target: &Card) -> i64 {
    if card_id.0 > target.id.0 {
        target.position
    } else {
        target.position.saturating_add(1)
    }
}

const fn slot_before(card_id: CardId, target: &Card) -> i64 {
    if card_id.0 < target.id.0 {
        target.position
    } else {
        target.position.saturating_sub(1)
    }
}

/// Ids of `list_id` in display order, with `card_id` placed at `position`.
fn list_order(
    collection: &CardCollection,
    list_id: ListId,
    card_id: CardId,
    position: i64,
) -> Vec<CardId> {
    let mut keyed: Vec<(i64, CardId)> = collection
        .iter()
        .filter(|card| card.list_id == list_id)
        .map(|card| {
            let position = if card.id == card_id {
                position
            } else {
                card.position
            };
            (position, card.id)
        })
        .collect();
    keyed.sort_unstable();
    keyed.into_iter().map(|(_, id)| id).collect()
}
