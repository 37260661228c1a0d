//! `SQLite` schema definitions for the timer state store.
//!
//! The store is a key-value slot table: one well-known key holds the timer
//! document as JSON text.

/// SQL statement to create the slot table.
pub const CREATE_SLOTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS slots (
    key TEXT PRIMARY KEY,
    document TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[CREATE_SLOTS_TABLE];
