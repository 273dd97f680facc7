//! `SQLite` persistence for overlay records.
//!
//! Runtime defaults follow the usual local-database setup:
//! - `journal_mode = WAL` so a second client can read while one writes
//! - `busy_timeout = 5s` to ride out short lock contention
//!
//! Schema versions are tracked in `PRAGMA user_version`.

use std::path::Path;
use std::time::Duration;

use rusqlite::{Connection, params, types::Type};
use tracing::debug;

use super::{ExtrasBackend, StoreError, StoredExtras};
use crate::model::card::{BoardId, CardId};
use crate::model::extras::ExtrasRecord;

pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Latest schema version understood by this binary.
pub const LATEST_SCHEMA_VERSION: u32 = 2;

const MIGRATION_V1_SQL: &str = "
CREATE TABLE IF NOT EXISTS card_extras (
    board_id      INTEGER NOT NULL,
    card_id       INTEGER NOT NULL,
    record_json   TEXT    NOT NULL,
    updated_at_us INTEGER NOT NULL,
    PRIMARY KEY (board_id, card_id)
);
";

const MIGRATION_V2_SQL: &str = "
CREATE INDEX IF NOT EXISTS idx_card_extras_updated
    ON card_extras (board_id, updated_at_us DESC);
";

const MIGRATIONS: &[(u32, &str)] = &[(1, MIGRATION_V1_SQL), (2, MIGRATION_V2_SQL)];

#[derive(Debug)]
pub struct SqliteBackend {
    conn: Connection,
}

impl SqliteBackend {
    /// Open (or create) the database at `path`, apply pragmas and migrate.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory cannot be created or `SQLite`
    /// fails to open, configure or migrate the file.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut conn = Connection::open(path)?;
        configure_connection(&conn)?;
        let version = migrate(&mut conn)?;
        debug!(path = %path.display(), version, "extras database ready");
        Ok(Self { conn })
    }

    /// # Errors
    ///
    /// Returns an error if `SQLite` fails to migrate the in-memory database.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let mut conn = Connection::open_in_memory()?;
        migrate(&mut conn)?;
        Ok(Self { conn })
    }

    /// # Errors
    ///
    /// Returns an error if the pragma query fails.
    pub fn schema_version(&self) -> Result<u32, StoreError> {
        Ok(current_schema_version(&self.conn)?)
    }
}

fn configure_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    let _journal_mode: String =
        conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
    conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)?;
    Ok(())
}

fn current_schema_version(conn: &Connection) -> rusqlite::Result<u32> {
    let version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    u32::try_from(version).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(0, Type::Integer, Box::new(error))
    })
}

fn migrate(conn: &mut Connection) -> rusqlite::Result<u32> {
    let mut current = current_schema_version(conn)?;
    for (version, sql) in MIGRATIONS {
        if *version <= current {
            continue;
        }
        let tx = conn.transaction()?;
        tx.execute_batch(sql)?;
        tx.pragma_update(None, "user_version", i64::from(*version))?;
        tx.commit()?;
        current = *version;
    }
    Ok(current)
}

fn to_sql_id(raw: u64) -> Result<i64, StoreError> {
    i64::try_from(raw).map_err(|_| StoreError::Unavailable(format!("id {raw} out of range")))
}

impl ExtrasBackend for SqliteBackend {
    fn read_board(&self, board_id: BoardId) -> Result<Vec<StoredExtras>, StoreError> {
        let board = to_sql_id(board_id.0)?;
        let mut stmt = self.conn.prepare(
            "SELECT card_id, record_json FROM card_extras WHERE board_id = ?1 ORDER BY card_id",
        )?;
        let raw_rows = stmt
            .query_map([board], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        raw_rows
            .into_iter()
            .map(|(card, json)| {
                let card_id = CardId(u64::try_from(card).map_err(|_| StoreError::Corrupt {
                    card_id: CardId(0),
                    reason: format!("negative card id {card}"),
                })?);
                let record: ExtrasRecord =
                    serde_json::from_str(&json).map_err(|e| StoreError::Corrupt {
                        card_id,
                        reason: e.to_string(),
                    })?;
                Ok(StoredExtras {
                    board_id,
                    card_id,
                    record,
                })
            })
            .collect()
    }

    fn write_all(&mut self, board_id: BoardId, rows: &[StoredExtras]) -> Result<(), StoreError> {
        let board = to_sql_id(board_id.0)?;
        let now = chrono::Utc::now().timestamp_micros();

        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM card_extras WHERE board_id = ?1", [board])?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO card_extras (board_id, card_id, record_json, updated_at_us)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for row in rows.iter().filter(|r| r.board_id == board_id) {
                let json = serde_json::to_string(&row.record)?;
                insert.execute(params![board, to_sql_id(row.card_id.0)?, json, now])?;
            }
        }
        tx.commit()?;
        debug!(board = %board_id, rows = rows.len(), "extras persisted");
        Ok(())
    }
}
