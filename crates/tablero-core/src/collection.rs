//! In-memory card set for the active board.
//!
//! Every optimistic mutation is recorded per card as a pending entry
//! `{seq, snapshot}`, where `snapshot` is the card as it was immediately
//! before the mutation. Outcomes are matched back by sequence number:
//!
//! - An outcome is **authoritative** when its entry is the newest pending
//!   entry for the card and no newer outcome has been committed. A success
//!   overwrites the card with the canonical value; a failure restores the
//!   entry's snapshot.
//! - Any other outcome is **stale**. It never touches the visible card, but it
//!   corrects the rollback base of the next newer pending entry so that a
//!   later failure restores what the remote store actually holds.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, info, warn};

use crate::error::SyncError;
use crate::gateway::CardGateway;
use crate::model::card::{BoardId, Card, CardId, CardPatch, ListId};

/// An optimistic change to one card, tagged with its sequence number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mutation {
    pub seq: u64,
    pub card_id: CardId,
    pub patch: CardPatch,
}

/// What the remote store answered for a mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Confirmed(Card),
    Failed(String),
}

/// Effect of reconciling one outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciled {
    /// The canonical card is now visible.
    Committed(Card),
    /// The card was restored to its pre-mutation value.
    RolledBack { card: Card, error: String },
    /// A newer mutation owns the card; nothing visible changed.
    Stale,
    /// No pending mutation carries this sequence number.
    Untracked,
}

#[derive(Debug, Clone)]
struct Pending {
    seq: u64,
    snapshot: Card,
}

#[derive(Debug, Clone, Default)]
struct Track {
    /// Ascending by `seq`.
    pending: Vec<Pending>,
    /// Highest sequence number confirmed by the remote store.
    settled: u64,
    /// Highest sequence number ever applied.
    high_water: u64,
}

#[derive(Debug, Clone, Default)]
pub struct CardCollection {
    board_id: Option<BoardId>,
    cards: BTreeMap<CardId, Card>,
    tracks: HashMap<CardId, Track>,
}

impl CardCollection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn board_id(&self) -> Option<BoardId> {
        self.board_id
    }

    #[must_use]
    pub fn get(&self, id: CardId) -> Option<&Card> {
        self.cards.get(&id)
    }

    /// Cards in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Card> {
        self.cards.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Number of cards currently in `list_id`, not counting `excluding`.
    #[must_use]
    pub fn count_in_list(&self, list_id: ListId, excluding: Option<CardId>) -> usize {
        self.cards
            .values()
            .filter(|c| c.list_id == list_id && Some(c.id) != excluding)
            .count()
    }

    #[must_use]
    pub fn has_pending(&self, id: CardId) -> bool {
        self.tracks.get(&id).is_some_and(|t| !t.pending.is_empty())
    }

    /// Total number of unresolved mutations across all cards.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.tracks.values().map(|t| t.pending.len()).sum()
    }

    /// Fetch every card of `board_id` and replace the collection with it.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Fetch`]; the collection keeps its previous value.
    pub fn load<G: CardGateway + ?Sized>(
        &mut self,
        gateway: &mut G,
        board_id: BoardId,
    ) -> Result<usize, SyncError> {
        let fetched = gateway
            .fetch_cards(board_id)
            .map_err(|source| SyncError::Fetch { board_id, source })?;
        self.replace_all(board_id, fetched);
        info!(board = %board_id, cards = self.cards.len(), "board loaded");
        Ok(self.cards.len())
    }

    /// Replace the collection with a fresh fetch.
    ///
    /// Cards with unresolved mutations keep their optimistic value; the fetched
    /// value becomes the rollback base of their oldest pending entry. Switching
    /// boards discards all pending bookkeeping.
    pub fn replace_all(&mut self, board_id: BoardId, fetched: Vec<Card>) {
        if self.board_id != Some(board_id) {
            self.tracks.clear();
        }
        self.board_id = Some(board_id);

        let mut next = BTreeMap::new();
        for card in fetched {
            if card.board_id != board_id {
                warn!(card = %card.id, board = %card.board_id, "dropping card from another board");
                continue;
            }
            let id = card.id;
            let visible = match self.tracks.get_mut(&id) {
                Some(track) if !track.pending.is_empty() => {
                    let optimistic = self.cards.get(&id).cloned().unwrap_or_else(|| card.clone());
                    track.pending[0].snapshot = card;
                    optimistic
                }
                _ => card,
            };
            next.insert(id, visible);
        }

        self.tracks.retain(|id, _| next.contains_key(id));
        self.cards = next;
    }

    /// Apply a mutation locally before the remote store has answered.
    ///
    /// # Errors
    ///
    /// [`SyncError::CardNotFound`] if the card is not in the collection, or
    /// [`SyncError::SequenceRegression`] if `seq` is not newer than every
    /// sequence number already applied to the card.
    pub fn apply_optimistic(&mut self, mutation: &Mutation) -> Result<Card, SyncError> {
        let id = mutation.card_id;
        let card = self.cards.get_mut(&id).ok_or(SyncError::CardNotFound(id))?;
        let track = self.tracks.entry(id).or_default();
        if mutation.seq <= track.high_water {
            return Err(SyncError::SequenceRegression {
                card_id: id,
                seq: mutation.seq,
                latest: track.high_water,
            });
        }

        track.pending.push(Pending {
            seq: mutation.seq,
            snapshot: card.clone(),
        });
        track.high_water = mutation.seq;
        mutation.patch.apply_to(card);
        debug!(
            card = %id,
            seq = mutation.seq,
            list = %card.list_id,
            position = card.position,
            "optimistic apply"
        );
        Ok(card.clone())
    }

    /// Resolve the mutation tagged `seq` for `card_id`.
    pub fn reconcile(&mut self, card_id: CardId, seq: u64, outcome: Outcome) -> Reconciled {
        let Some(track) = self.tracks.get_mut(&card_id) else {
            debug!(card = %card_id, seq, "reconcile for untracked card");
            return Reconciled::Untracked;
        };
        let Some(idx) = track.pending.iter().position(|p| p.seq == seq) else {
            debug!(card = %card_id, seq, "reconcile for unknown sequence");
            return Reconciled::Untracked;
        };

        let entry = track.pending.remove(idx);
        let newest = idx == track.pending.len();
        let authoritative = newest && seq > track.settled;

        let outcome = match outcome {
            Outcome::Confirmed(canonical)
                if canonical.id != card_id || Some(canonical.board_id) != self.board_id =>
            {
                Outcome::Failed(format!(
                    "remote returned card {} on board {} for card {card_id}",
                    canonical.id, canonical.board_id
                ))
            }
            other => other,
        };

        if !authoritative {
            if seq > track.settled
                && let Some(next) = track.pending.get_mut(idx)
            {
                next.snapshot = match &outcome {
                    Outcome::Confirmed(canonical) => canonical.clone(),
                    Outcome::Failed(_) => entry.snapshot,
                };
            }
            if matches!(outcome, Outcome::Confirmed(_)) {
                track.settled = track.settled.max(seq);
            }
            warn!(card = %card_id, seq, "discarding stale outcome");
            return Reconciled::Stale;
        }

        match outcome {
            Outcome::Confirmed(canonical) => {
                track.settled = seq;
                self.cards.insert(card_id, canonical.clone());
                info!(card = %card_id, seq, list = %canonical.list_id, "mutation committed");
                Reconciled::Committed(canonical)
            }
            Outcome::Failed(error) => {
                let card = entry.snapshot;
                self.cards.insert(card_id, card.clone());
                warn!(card = %card_id, seq, error = %error, "mutation rolled back");
                Reconciled::RolledBack { card, error }
            }
        }
    }

    /// Drop a card whose delete the remote store has confirmed.
    pub fn remove(&mut self, id: CardId) -> Option<Card> {
        self.tracks.remove(&id);
        self.cards.remove(&id)
    }

    /// Insert a card the remote store has just created.
    ///
    /// Returns `false` (and ignores the card) if it belongs to another board.
    pub fn upsert_created(&mut self, card: Card) -> bool {
        if self.board_id.is_some_and(|b| b != card.board_id) {
            warn!(
                card = %card.id,
                board = %card.board_id,
                "ignoring card created on another board"
            );
            return false;
        }
        self.board_id.get_or_insert(card.board_id);
        self.cards.insert(card.id, card);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{GatewayError, MemoryGateway};

    fn card(id: u64, list: u32, position: i64) -> Card {
        Card {
            id: CardId(id),
            board_id: BoardId(1),
            list_id: ListId(list),
            title: format!("card {id}"),
            description: None,
            due_date: None,
            position,
        }
    }

    fn loaded(cards: Vec<Card>) -> CardCollection {
        let mut c = CardCollection::new();
        c.replace_all(BoardId(1), cards);
        c
    }

    fn relocate(seq: u64, id: u64, list: u32, position: i64) -> Mutation {
        Mutation {
            seq,
            card_id: CardId(id),
            patch: CardPatch::relocate(ListId(list), position),
        }
    }

    #[test]
    fn failed_load_keeps_previous_value() {
        let mut c = loaded(vec![card(1, 1, 0)]);
        let mut gw = MemoryGateway::new();
        gw.fail_next(GatewayError::Transport("down".into()));
        let err = c.load(&mut gw, BoardId(1)).expect_err("load fails");
        assert!(matches!(err, SyncError::Fetch { .. }));
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn load_replaces_collection() {
        let mut c = loaded(vec![card(1, 1, 0)]);
        let mut gw = MemoryGateway::with_cards([card(2, 2, 0), card(3, 1, 0)]);
        assert_eq!(c.load(&mut gw, BoardId(1)).expect("load"), 2);
        assert!(c.get(CardId(1)).is_none());
    }

    #[test]
    fn replace_all_drops_foreign_cards() {
        let mut foreign = card(9, 1, 0);
        foreign.board_id = BoardId(2);
        let c = loaded(vec![card(1, 1, 0), foreign]);
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn optimistic_apply_then_commit() {
        let mut c = loaded(vec![card(1, 1, 0)]);
        c.apply_optimistic(&relocate(1, 1, 2, 0)).expect("apply");
        assert_eq!(c.get(CardId(1)).map(|x| x.list_id), Some(ListId(2)));

        let canonical = card(1, 2, 0);
        assert_eq!(
            c.reconcile(CardId(1), 1, Outcome::Confirmed(canonical.clone())),
            Reconciled::Committed(canonical)
        );
        assert!(!c.has_pending(CardId(1)));
    }

    #[test]
    fn failure_restores_snapshot() {
        let original = card(1, 1, 4);
        let mut c = loaded(vec![original.clone()]);
        c.apply_optimistic(&relocate(1, 1, 3, 0)).expect("apply");
        let result = c.reconcile(CardId(1), 1, Outcome::Failed("HTTP 500".into()));
        assert_eq!(
            result,
            Reconciled::RolledBack {
                card: original.clone(),
                error: "HTTP 500".into()
            }
        );
        assert_eq!(c.get(CardId(1)), Some(&original));
    }

    #[test]
    fn unknown_card_cannot_be_mutated() {
        let mut c = loaded(vec![]);
        assert!(matches!(
            c.apply_optimistic(&relocate(1, 7, 2, 0)),
            Err(SyncError::CardNotFound(CardId(7)))
        ));
    }

    #[test]
    fn sequence_numbers_must_increase() {
        let mut c = loaded(vec![card(1, 1, 0)]);
        c.apply_optimistic(&relocate(5, 1, 2, 0)).expect("apply");
        assert!(matches!(
            c.apply_optimistic(&relocate(5, 1, 3, 0)),
            Err(SyncError::SequenceRegression {
                seq: 5,
                latest: 5,
                ..
            })
        ));
    }

    #[test]
    fn unknown_sequence_is_untracked() {
        let mut c = loaded(vec![card(1, 1, 0)]);
        assert_eq!(
            c.reconcile(CardId(1), 3, Outcome::Failed("x".into())),
            Reconciled::Untracked
        );
    }

    #[test]
    fn stale_success_does_not_clobber_newer_move() {
        let mut c = loaded(vec![card(1, 1, 0)]);
        c.apply_optimistic(&relocate(1, 1, 2, 0)).expect("apply");
        c.apply_optimistic(&relocate(2, 1, 3, 0)).expect("apply");

        assert_eq!(
            c.reconcile(CardId(1), 1, Outcome::Confirmed(card(1, 2, 0))),
            Reconciled::Stale
        );
        assert_eq!(c.get(CardId(1)).map(|x| x.list_id), Some(ListId(3)));
    }

    #[test]
    fn newer_failure_after_stale_success_restores_confirmed_value() {
        let mut c = loaded(vec![card(1, 1, 0)]);
        c.apply_optimistic(&relocate(1, 1, 2, 0)).expect("apply");
        c.apply_optimistic(&relocate(2, 1, 3, 0)).expect("apply");
        c.reconcile(CardId(1), 1, Outcome::Confirmed(card(1, 2, 0)));
        c.reconcile(CardId(1), 2, Outcome::Failed("409".into()));
        assert_eq!(c.get(CardId(1)), Some(&card(1, 2, 0)));
    }

    #[test]
    fn two_failures_in_any_order_restore_the_original() {
        for order in [[1, 2], [2, 1]] {
            let mut c = loaded(vec![card(1, 1, 0)]);
            c.apply_optimistic(&relocate(1, 1, 2, 0)).expect("apply");
            c.apply_optimistic(&relocate(2, 1, 3, 0)).expect("apply");
            for seq in order {
                c.reconcile(CardId(1), seq, Outcome::Failed("down".into()));
            }
            assert_eq!(c.get(CardId(1)), Some(&card(1, 1, 0)), "order {order:?}");
            assert!(!c.has_pending(CardId(1)));
        }
    }

    #[test]
    fn late_response_after_newer_commit_is_stale() {
        let mut c = loaded(vec![card(1, 1, 0)]);
        c.apply_optimistic(&relocate(1, 1, 2, 0)).expect("apply");
        c.apply_optimistic(&relocate(2, 1, 3, 0)).expect("apply");
        c.reconcile(CardId(1), 2, Outcome::Confirmed(card(1, 3, 0)));
        assert_eq!(
            c.reconcile(CardId(1), 1, Outcome::Failed("timeout".into())),
            Reconciled::Stale
        );
        assert_eq!(c.get(CardId(1)), Some(&card(1, 3, 0)));
    }

    #[test]
    fn mismatched_canonical_card_rolls_back() {
        let mut c = loaded(vec![card(1, 1, 0)]);
        c.apply_optimistic(&relocate(1, 1, 2, 0)).expect("apply");
        let result = c.reconcile(CardId(1), 1, Outcome::Confirmed(card(2, 2, 0)));
        assert!(matches!(result, Reconciled::RolledBack { .. }));
        assert_eq!(c.get(CardId(1)), Some(&card(1, 1, 0)));
    }

    #[test]
    fn refresh_keeps_optimistic_value_and_rebases_snapshot() {
        let mut c = loaded(vec![card(1, 1, 0)]);
        c.apply_optimistic(&relocate(1, 1, 3, 0)).expect("apply");

        let mut refreshed = card(1, 1, 0);
        refreshed.title = "renamed elsewhere".into();
        c.replace_all(BoardId(1), vec![refreshed.clone()]);
        assert_eq!(c.get(CardId(1)).map(|x| x.list_id), Some(ListId(3)));

        c.reconcile(CardId(1), 1, Outcome::Failed("down".into()));
        assert_eq!(c.get(CardId(1)), Some(&refreshed));
    }

    #[test]
    fn board_switch_discards_pending_state() {
        let mut c = loaded(vec![card(1, 1, 0)]);
        c.apply_optimistic(&relocate(1, 1, 3, 0)).expect("apply");
        let mut other = card(1, 1, 0);
        other.board_id = BoardId(2);
        c.replace_all(BoardId(2), vec![other]);
        assert_eq!(c.pending_count(), 0);
        assert_eq!(
            c.reconcile(CardId(1), 1, Outcome::Failed("x".into())),
            Reconciled::Untracked
        );
    }

    #[test]
    fn count_in_list_can_exclude_a_card() {
        let c = loaded(vec![card(1, 1, 0), card(2, 1, 1), card(3, 2, 0)]);
        assert_eq!(c.count_in_list(ListId(1), None), 2);
        assert_eq!(c.count_in_list(ListId(1), Some(CardId(2))), 1);
    }

    #[test]
    fn created_cards_from_other_boards_are_ignored() {
        let mut c = loaded(vec![]);
        let mut foreign = card(4, 1, 0);
        foreign.board_id = BoardId(9);
        assert!(!c.upsert_created(foreign));
        assert!(c.upsert_created(card(5, 1, 0)));
        assert!(c.remove(CardId(5)).is_some());
    }
}
