//! User-level flows over one board.
//!
//! A [`BoardSession`] owns the gateway, the card collection, the overlay
//! store and the move coordinator, and is the only place they meet. Two
//! styles are offered for remote-backed changes:
//!
//! - two-phase: `drop_card` / `begin_edit` apply the change and return the
//!   tagged intent; the host performs the call and feeds the answer to
//!   `settle_move` / `settle_edit`, in any order;
//! - one-shot: `move_card` / `edit_card` do both around a blocking call.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::collection::{CardCollection, Mutation, Outcome, Reconciled};
use crate::error::SyncError;
use crate::extras::{ExtrasBackend, ExtrasStore};
use crate::gateway::{CardGateway, GatewayError};
use crate::model::card::{BoardId, Card, CardDraft, CardId, CardPatch};
use crate::model::extras::ExtrasRecord;
use crate::model::filter::FilterState;
use crate::model::list;
use crate::moves::{DropOutcome, DropTarget, MoveCoordinator, MoveResolution};
use crate::view::{self, CardSummary, DerivedBoard};

pub struct BoardSession<G, B> {
    gateway: G,
    board_id: BoardId,
    collection: CardCollection,
    extras: ExtrasStore<B>,
    moves: MoveCoordinator,
    edits: BTreeMap<u64, CardId>,
}

impl<G: CardGateway, B: ExtrasBackend> BoardSession<G, B> {
    /// Open a session on `board_id`. Cards are not fetched until [`Self::load`].
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Store`] if the overlay cannot be read.
    pub fn open(gateway: G, backend: B, board_id: BoardId) -> Result<Self, SyncError> {
        Ok(Self {
            gateway,
            board_id,
            collection: CardCollection::new(),
            extras: ExtrasStore::open(backend, board_id)?,
            moves: MoveCoordinator::new(),
            edits: BTreeMap::new(),
        })
    }

    #[must_use]
    pub const fn board_id(&self) -> BoardId {
        self.board_id
    }

    #[must_use]
    pub const fn collection(&self) -> &CardCollection {
        &self.collection
    }

    #[must_use]
    pub const fn extras(&self) -> &ExtrasStore<B> {
        &self.extras
    }

    #[must_use]
    pub const fn moves(&self) -> &MoveCoordinator {
        &self.moves
    }

    #[must_use]
    pub const fn gateway(&self) -> &G {
        &self.gateway
    }

    pub const fn gateway_mut(&mut self) -> &mut G {
        &mut self.gateway
    }

    /// Fetch the board. On failure the previous cards stay visible.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Fetch`].
    pub fn load(&mut self) -> Result<usize, SyncError> {
        self.collection.load(&mut self.gateway, self.board_id)
    }

    #[must_use]
    pub fn view(&self, filters: &FilterState) -> DerivedBoard {
        let cards = self.collection.iter();
        view::derive(cards, self.board_id, &self.extras, filters)
    }

    /// # Errors
    ///
    /// Returns [`SyncError::CardNotFound`].
    pub fn summary(&self, card_id: CardId, today: NaiveDate) -> Result<CardSummary, SyncError> {
        let card = self.card(card_id)?;
        Ok(CardSummary::new(card, self.extras.get(card_id), today))
    }

    fn card(&self, card_id: CardId) -> Result<&Card, SyncError> {
        self.collection
            .get(card_id)
            .ok_or(SyncError::CardNotFound(card_id))
    }

    /// Validate and create a card, then attach `extras` to the new identity.
    ///
    /// The card is only added once the remote store has assigned its id.
    ///
    /// # Errors
    ///
    /// Validation errors never reach the gateway. Remote failures are
    /// [`SyncError::Remote`]. If the overlay cannot be saved the card still
    /// exists and [`SyncError::Store`] is returned.
    pub fn create_card(
        &mut self,
        draft: CardDraft,
        extras: Option<ExtrasRecord>,
    ) -> Result<Card, SyncError> {
        let draft = CardDraft {
            board_id: self.board_id,
            ..draft.validate()?
        };
        list::ensure_known(draft.list_id)?;

        let card = self
            .gateway
            .create_card(&draft)
            .map_err(|source| SyncError::Remote {
                operation: "create",
                source,
            })?;
        self.collection.upsert_created(card.clone());
        info!(card = %card.id, list = %card.list_id, "card created");

        if let Some(record) = extras.filter(|r| !r.is_empty()) {
            self.extras.set(card.id, record)?;
        }
        Ok(card)
    }

    /// Validate `patch` and apply it optimistically. The returned mutation
    /// carries the sequence number to settle with.
    ///
    /// # Errors
    ///
    /// Validation errors, or [`SyncError::CardNotFound`].
    pub fn begin_edit(&mut self, card_id: CardId, patch: CardPatch) -> Result<Mutation, SyncError> {
        let patch = patch.validate()?;
        if let Some(list_id) = patch.list_id {
            list::ensure_known(list_id)?;
        }
        self.card(card_id)?;

        let mutation = Mutation {
            seq: self.moves.next_sequence(),
            card_id,
            patch,
        };
        self.collection.apply_optimistic(&mutation)?;
        self.edits.insert(mutation.seq, card_id);
        Ok(mutation)
    }

    /// Feed back the remote answer for the edit tagged `seq`.
    pub fn settle_edit(&mut self, seq: u64, result: Result<Card, GatewayError>) -> Reconciled {
        let Some(card_id) = self.edits.remove(&seq) else {
            return Reconciled::Untracked;
        };
        let outcome = match result {
            Ok(card) => Outcome::Confirmed(card),
            Err(err) => Outcome::Failed(err.user_message()),
        };
        self.collection.reconcile(card_id, seq, outcome)
    }

    /// Optimistic edit around a blocking gateway call.
    ///
    /// # Errors
    ///
    /// Validation errors before any call. After a rollback,
    /// [`SyncError::Remote`] when the call failed or [`SyncError::Edit`] when
    /// the answer was for another card or board.
    pub fn edit_card(&mut self, card_id: CardId, patch: CardPatch) -> Result<Card, SyncError> {
        let mutation = self.begin_edit(card_id, patch)?;
        let result = self.gateway.update_card(card_id, &mutation.patch);
        let failure = result.as_ref().err().cloned();

        match self.settle_edit(mutation.seq, result) {
            Reconciled::Committed(card) => Ok(card),
            Reconciled::RolledBack { error, .. } => Err(match failure {
                Some(source) => SyncError::Remote {
                    operation: "edit",
                    source,
                },
                None => SyncError::Edit {
                    card_id,
                    message: error,
                },
            }),
            Reconciled::Stale | Reconciled::Untracked => self.card(card_id).cloned(),
        }
    }

    /// # Errors
    ///
    /// Returns [`SyncError::CardNotFound`].
    pub fn begin_drag(&mut self, card_id: CardId) -> Result<(), SyncError> {
        self.moves.begin_drag(&self.collection, card_id)
    }

    pub fn cancel_drag(&mut self) {
        self.moves.cancel_drag();
    }

    /// End the drag over `target`, applying the move optimistically.
    ///
    /// # Errors
    ///
    /// See [`MoveCoordinator::drop_on`].
    pub fn drop_card(&mut self, target: DropTarget) -> Result<DropOutcome, SyncError> {
        self.moves.drop_on(&mut self.collection, target)
    }

    /// Feed back the remote answer for the move tagged `seq`.
    pub fn settle_move(&mut self, seq: u64, result: Result<Card, GatewayError>) -> MoveResolution {
        self.moves.resolve(&mut self.collection, seq, result)
    }

    /// Drag `card_id` to `target` and wait for the remote answer.
    ///
    /// Returns `None` when the drop was a no-op and no call was made.
    ///
    /// # Errors
    ///
    /// Drop errors, or [`SyncError::Move`] once the card has snapped back.
    pub fn move_card(
        &mut self,
        card_id: CardId,
        target: DropTarget,
    ) -> Result<Option<Card>, SyncError> {
        self.begin_drag(card_id)?;
        let DropOutcome::Applied(intent) = self.drop_card(target)? else {
            return Ok(None);
        };

        let result = self.gateway.move_card(card_id, intent.target());
        match self.settle_move(intent.seq, result) {
            MoveResolution::Committed(card) => Ok(Some(card)),
            MoveResolution::RolledBack { error, .. } => Err(SyncError::Move {
                card_id,
                message: error,
            }),
            MoveResolution::Stale | MoveResolution::Unknown => {
                self.card(card_id).cloned().map(Some)
            }
        }
    }

    /// Delete remotely, then drop the card and garbage-collect its overlay.
    ///
    /// # Errors
    ///
    /// [`SyncError::CardNotFound`], or [`SyncError::Remote`] with the card
    /// and its overlay untouched.
    pub fn delete_card(&mut self, card_id: CardId) -> Result<Card, SyncError> {
        self.card(card_id)?;
        self.gateway
            .delete_card(card_id)
            .map_err(|source| SyncError::Remote {
                operation: "delete",
                source,
            })?;

        let removed = self.collection.remove(card_id);
        if let Err(err) = self.extras.delete(card_id) {
            warn!(card = %card_id, error = %err, "card deleted but overlay cleanup failed");
            return Err(err.into());
        }
        info!(card = %card_id, "card deleted");
        removed.ok_or(SyncError::CardNotFound(card_id))
    }

    fn edit_extras<T>(
        &mut self,
        card_id: CardId,
        edit: impl FnOnce(&mut ExtrasRecord) -> Result<T, SyncError>,
    ) -> Result<T, SyncError> {
        self.card(card_id)?;
        self.extras.update(card_id, edit)
    }

    /// Replace a card's whole overlay record.
    ///
    /// # Errors
    ///
    /// [`SyncError::CardNotFound`] or [`SyncError::Store`].
    pub fn set_extras(&mut self, card_id: CardId, record: ExtrasRecord) -> Result<(), SyncError> {
        self.card(card_id)?;
        Ok(self.extras.set(card_id, record)?)
    }

    /// Returns `false` if the label was already attached.
    ///
    /// # Errors
    ///
    /// Unknown card or label, or a store failure.
    pub fn add_label(&mut self, card_id: CardId, label: &str) -> Result<bool, SyncError> {
        self.edit_extras(card_id, |rec| Ok(rec.add_label(label)?))
    }

    /// Returns `false` if the label was not attached.
    ///
    /// # Errors
    ///
    /// Unknown card, or a store failure.
    pub fn remove_label(&mut self, card_id: CardId, label: &str) -> Result<bool, SyncError> {
        self.edit_extras(card_id, |rec| Ok(rec.remove_label(label)))
    }

    /// Assign to a team member, or unassign with `None`.
    ///
    /// # Errors
    ///
    /// Unknown card or member, or a store failure.
    pub fn assign(&mut self, card_id: CardId, member: Option<&str>) -> Result<(), SyncError> {
        self.edit_extras(card_id, |rec| Ok(rec.assign(member)?))
    }

    /// Returns the new item's id.
    ///
    /// # Errors
    ///
    /// Unknown card, blank text, or a store failure.
    pub fn add_checklist_item(&mut self, card_id: CardId, text: &str) -> Result<String, SyncError> {
        self.edit_extras(card_id, |rec| Ok(rec.add_checklist_item(text)?))
    }

    /// Returns the item's new `done` value.
    ///
    /// # Errors
    ///
    /// Unknown card or item, or a store failure.
    pub fn toggle_checklist_item(&mut self, card_id: CardId, item: &str) -> Result<bool, SyncError> {
        self.edit_extras(card_id, |rec| Ok(rec.toggle_checklist_item(item)?))
    }

    /// # Errors
    ///
    /// Unknown card or item, blank text, or a store failure.
    pub fn rename_checklist_item(
        &mut self,
        card_id: CardId,
        item: &str,
        text: &str,
    ) -> Result<(), SyncError> {
        self.edit_extras(card_id, |rec| Ok(rec.rename_checklist_item(item, text)?))
    }

    /// # Errors
    ///
    /// Unknown card or item, or a store failure.
    pub fn remove_checklist_item(&mut self, card_id: CardId, item: &str) -> Result<(), SyncError> {
        self.edit_extras(card_id, |rec| {
            rec.remove_checklist_item(item)?;
            Ok(())
        })
    }
}
