//! Durable storage for the timer state document.
//!
//! Persistence is a port: the state machine and the display refresher talk
//! to a [`StateStore`] rather than a global storage slot. The shipped
//! implementation keeps the document in a `SQLite` slot table under a single
//! well-known key; an in-memory store backs the tests.

pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::segment::TimerState;

/// The well-known slot key holding the feeding timer document.
pub const STATE_KEY: &str = "feeding-timer";

/// Durable slot for the timer state document.
///
/// Implementations must make `save` durable before returning, so a caller
/// can render the new state knowing storage already reflects it. `load`
/// applies the legacy-format upgrade transparently and treats unreadable
/// documents as "no active timer" rather than failing.
pub trait StateStore: Send {
    /// Read the current timer state, if a readable document exists.
    ///
    /// # Errors
    ///
    /// Returns an error only for storage-level failures; a corrupt or
    /// missing document yields `Ok(None)`.
    fn load(&mut self) -> Result<Option<TimerState>>;

    /// Persist the given state, replacing any existing document.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn save(&mut self, state: &TimerState) -> Result<()>;

    /// Remove the stored document entirely.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    fn clear(&mut self) -> Result<()>;
}

/// `SQLite`-backed state store.
#[derive(Debug)]
pub struct SqliteStore {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
}

impl SqliteStore {
    /// Open or create a state store at the given path.
    ///
    /// Creates the parent directories and database file if they don't
    /// exist, and initializes the slot schema.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or the schema
    /// cannot be created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening state store at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::StateOpen {
            path: path.clone(),
            source,
        })?;

        // Enable WAL mode for better concurrent read performance
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        for statement in schema::SCHEMA_STATEMENTS {
            conn.execute(statement, [])?;
        }

        info!("State store opened at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Create an in-memory state store for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::StateOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        for statement in schema::SCHEMA_STATEMENTS {
            conn.execute(statement, [])?;
        }

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_raw(&self) -> Result<Option<String>> {
        let raw = self
            .conn
            .query_row(
                "SELECT document FROM slots WHERE key = ?1",
                [STATE_KEY],
                |row| row.get(0),
            )
            .optional()?;
        Ok(raw)
    }

    fn write_raw(&self, document: &str) -> Result<()> {
        self.conn.execute(
            r"
            INSERT OR REPLACE INTO slots (key, document, updated_at)
            VALUES (?1, ?2, datetime('now'))
            ",
            params![STATE_KEY, document],
        )?;
        Ok(())
    }
}

impl StateStore for SqliteStore {
    fn load(&mut self) -> Result<Option<TimerState>> {
        let Some(raw) = self.read_raw()? else {
            return Ok(None);
        };

        match migrations::read_document(&raw) {
            Some((state, true)) => {
                self.write_raw(&serde_json::to_string(&state)?)?;
                info!("Upgraded legacy timer document in place");
                Ok(Some(state))
            }
            Some((state, false)) => Ok(Some(state)),
            None => {
                warn!("Stored timer document is unreadable; treating as no active timer");
                Ok(None)
            }
        }
    }

    fn save(&mut self, state: &TimerState) -> Result<()> {
        let document = serde_json::to_string(state)?;
        self.write_raw(&document)?;
        debug!("Persisted timer document ({} segments)", state.segments.len());
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.conn
            .execute("DELETE FROM slots WHERE key = ?1", [STATE_KEY])?;
        debug!("Cleared timer document");
        Ok(())
    }
}

/// In-memory state store for tests.
///
/// Holds the raw document text so legacy-format and corruption behavior can
/// be exercised without a database.
#[derive(Debug, Default)]
pub struct MemoryStore {
    document: Option<String>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-seeded with a raw document.
    #[must_use]
    pub fn with_document(raw: impl Into<String>) -> Self {
        Self {
            document: Some(raw.into()),
        }
    }

    /// The raw stored document, if any.
    #[must_use]
    pub fn document(&self) -> Option<&str> {
        self.document.as_deref()
    }
}

impl StateStore for MemoryStore {
    fn load(&mut self) -> Result<Option<TimerState>> {
        let Some(raw) = self.document.clone() else {
            return Ok(None);
        };

        match migrations::read_document(&raw) {
            Some((state, true)) => {
                self.document = Some(serde_json::to_string(&state)?);
                Ok(Some(state))
            }
            Some((state, false)) => Ok(Some(state)),
            None => Ok(None),
        }
    }

    fn save(&mut self, state: &TimerState) -> Result<()> {
        self.document = Some(serde_json::to_string(state)?);
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.document = None;
        Ok(())
    }
}
