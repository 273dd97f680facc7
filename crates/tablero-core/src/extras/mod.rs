//! Durable client-side overlay store.
//!
//! The store keeps every record of the active board in memory and persists
//! the whole board through an [`ExtrasBackend`] on each change. A failed write
//! leaves memory exactly as it was before the call.

pub mod sqlite;

use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

use tracing::{debug, warn};

use crate::model::card::{BoardId, CardId};
use crate::model::extras::{EMPTY_RECORD, ExtrasRecord};

pub use sqlite::SqliteBackend;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("extras database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("extras store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("stored extras for card {card_id} are corrupt: {reason}")]
    Corrupt { card_id: CardId, reason: String },
    #[error("failed to encode extras: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("extras store unavailable: {0}")]
    Unavailable(String),
}

/// One persisted overlay row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredExtras {
    pub board_id: BoardId,
    pub card_id: CardId,
    pub record: ExtrasRecord,
}

/// Persistence surface for overlay records, keyed by board-scoped card id.
pub trait ExtrasBackend {
    /// Every stored row of `board_id`. Rows of other boards are not decoded.
    ///
    /// # Errors
    ///
    /// Backend-specific read failure.
    fn read_board(&self, board_id: BoardId) -> Result<Vec<StoredExtras>, StoreError>;

    /// Replace every stored row of `board_id` with `rows`.
    ///
    /// # Errors
    ///
    /// Backend-specific write failure. The previous rows must survive.
    fn write_all(&mut self, board_id: BoardId, rows: &[StoredExtras]) -> Result<(), StoreError>;
}

/// Read access to overlay records, for view derivation.
pub trait ExtrasLookup {
    /// The card's record, or the empty record.
    fn extras_for(&self, card_id: CardId) -> &ExtrasRecord;
}

impl<S: BuildHasher> ExtrasLookup for HashMap<CardId, ExtrasRecord, S> {
    fn extras_for(&self, card_id: CardId) -> &ExtrasRecord {
        self.get(&card_id).unwrap_or(&EMPTY_RECORD)
    }
}

impl ExtrasLookup for BTreeMap<CardId, ExtrasRecord> {
    fn extras_for(&self, card_id: CardId) -> &ExtrasRecord {
        self.get(&card_id).unwrap_or(&EMPTY_RECORD)
    }
}

/// Overlay records of one board over a durable backend.
#[derive(Debug)]
pub struct ExtrasStore<B> {
    backend: B,
    board_id: BoardId,
    records: BTreeMap<CardId, ExtrasRecord>,
}

impl<B: ExtrasBackend> ExtrasStore<B> {
    /// Load the records of `board_id` from `backend`.
    ///
    /// # Errors
    ///
    /// Propagates the backend's read failure.
    pub fn open(backend: B, board_id: BoardId) -> Result<Self, StoreError> {
        let records: BTreeMap<_, _> = backend
            .read_board(board_id)?
            .into_iter()
            .map(|row| (row.card_id, row.record.normalized()))
            .filter(|(_, record)| !record.is_empty())
            .collect();
        debug!(board = %board_id, records = records.len(), "extras loaded");
        Ok(Self {
            backend,
            board_id,
            records,
        })
    }

    #[must_use]
    pub const fn board_id(&self) -> BoardId {
        self.board_id
    }

    /// The card's record, or the normalized empty record.
    #[must_use]
    pub fn get(&self, card_id: CardId) -> &ExtrasRecord {
        self.records.get(&card_id).unwrap_or(&EMPTY_RECORD)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Replace and persist the card's record. Setting an empty record removes
    /// the row.
    ///
    /// # Errors
    ///
    /// Propagates the backend's write failure; memory is left unchanged.
    pub fn set(&mut self, card_id: CardId, record: ExtrasRecord) -> Result<(), StoreError> {
        let record = record.normalized();
        let previous = if record.is_empty() {
            self.records.remove(&card_id)
        } else {
            self.records.insert(card_id, record)
        };
        self.persist_or_restore(card_id, previous)
    }

    /// Read-modify-write helper for overlay edits.
    ///
    /// # Errors
    ///
    /// Returns `E` from `edit` (nothing persisted) or the backend's write failure.
    pub fn update<T, E>(
        &mut self,
        card_id: CardId,
        edit: impl FnOnce(&mut ExtrasRecord) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        let mut record = self.get(card_id).clone();
        let out = edit(&mut record)?;
        self.set(card_id, record)?;
        Ok(out)
    }

    /// Remove the card's record. Only call once a delete is confirmed.
    ///
    /// # Errors
    ///
    /// Propagates the backend's write failure; memory is left unchanged.
    pub fn delete(&mut self, card_id: CardId) -> Result<(), StoreError> {
        let previous = self.records.remove(&card_id);
        if previous.is_none() {
            return Ok(());
        }
        self.persist_or_restore(card_id, previous)
    }

    fn persist_or_restore(
        &mut self,
        card_id: CardId,
        previous: Option<ExtrasRecord>,
    ) -> Result<(), StoreError> {
        let rows: Vec<StoredExtras> = self
            .records
            .iter()
            .map(|(id, record)| StoredExtras {
                board_id: self.board_id,
                card_id: *id,
                record: record.clone(),
            })
            .collect();

        if let Err(err) = self.backend.write_all(self.board_id, &rows) {
            warn!(card = %card_id, error = %err, "extras write failed; restoring previous record");
            match previous {
                Some(record) => self.records.insert(card_id, record),
                None => self.records.remove(&card_id),
            };
            return Err(err);
        }
        Ok(())
    }
}

impl<B: ExtrasBackend> ExtrasLookup for ExtrasStore<B> {
    fn extras_for(&self, card_id: CardId) -> &ExtrasRecord {
        self.get(card_id)
    }
}

/// Non-durable backend for tests and offline runs.
#[derive(Debug, Default, Clone)]
pub struct MemoryBackend {
    rows: Vec<StoredExtras>,
    fail_writes: bool,
    writes: usize,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn with_rows(rows: Vec<StoredExtras>) -> Self {
        Self {
            rows,
            fail_writes: false,
            writes: 0,
        }
    }

    /// Make every subsequent write fail.
    pub const fn fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    #[must_use]
    pub fn rows(&self) -> &[StoredExtras] {
        &self.rows
    }

    /// Number of successful writes.
    #[must_use]
    pub const fn writes(&self) -> usize {
        self.writes
    }
}

impl ExtrasBackend for MemoryBackend {
    fn read_board(&self, board_id: BoardId) -> Result<Vec<StoredExtras>, StoreError> {
        Ok(self
            .rows
            .iter()
            .filter(|r| r.board_id == board_id)
            .cloned()
            .collect())
    }

    fn write_all(&mut self, board_id: BoardId, rows: &[StoredExtras]) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(StoreError::Unavailable("writes disabled".into()));
        }
        self.rows.retain(|r| r.board_id != board_id);
        self.rows.extend_from_slice(rows);
        self.writes += 1;
        Ok(())
    }
}
