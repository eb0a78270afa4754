//! Entry model
//!
//! Writers submit [`Entry`] values; readers get back [`JournalEntry`] values,
//! which are the persisted representation with tags decoded.
//!
//! ## Kinds
//!
//! | Kind | Sequence | Storage key | Repeated id |
//! |------|----------|-------------|-------------|
//! | `Appended` | next journal sequence | sequence | allowed |
//! | `Consistent { version: 0 }` | `-1` | entry id | insert fails if present |
//! | `Consistent { version > 0 }` | `-1` | entry id | updates the existing row |
//! | `Immutable` | `-1` | entry id (own key space) | never, whole batch fails |
//!
//! Immutable rows are keyed apart from consistent rows, so a later
//! `Consistent { version > 0 }` write with the same id finds no row to
//! update and fails instead of replacing the immutable one.

use crate::types::{EntryId, JournalId};
use serde::{Deserialize, Serialize};

/// Sequence recorded for consistent and immutable rows
pub const CONSISTENT_SEQUENCE: i64 = -1;

/// Write semantics of an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryKind {
    /// Append-only, ordered by an engine-assigned sequence
    Appended,
    /// Keyed by entry id; version 0 inserts, any other version updates
    Consistent {
        /// Caller-tracked version of the entry
        version: u64,
    },
    /// Keyed by entry id and written exactly once
    Immutable,
}

impl EntryKind {
    /// True for kinds keyed by entry id rather than sequence
    pub fn is_keyed_by_id(&self) -> bool {
        !matches!(self, EntryKind::Appended)
    }
}

/// An entry submitted for writing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Logical identity
    pub entry_id: EntryId,
    /// Write semantics
    pub kind: EntryKind,
    /// Opaque payload bytes
    pub payload: Vec<u8>,
    /// Opaque metadata bytes
    pub meta: Vec<u8>,
    /// Free-text tags
    pub tags: Vec<String>,
}

impl Entry {
    fn new(
        entry_id: impl Into<EntryId>,
        kind: EntryKind,
        payload: impl Into<Vec<u8>>,
        meta: impl Into<Vec<u8>>,
    ) -> Self {
        Entry {
            entry_id: entry_id.into(),
            kind,
            payload: payload.into(),
            meta: meta.into(),
            tags: Vec::new(),
        }
    }

    /// Create an append-only entry
    pub fn appended(
        entry_id: impl Into<EntryId>,
        payload: impl Into<Vec<u8>>,
        meta: impl Into<Vec<u8>>,
    ) -> Self {
        Self::new(entry_id, EntryKind::Appended, payload, meta)
    }

    /// Create a versioned, mutable entry
    pub fn consistent(
        entry_id: impl Into<EntryId>,
        version: u64,
        payload: impl Into<Vec<u8>>,
        meta: impl Into<Vec<u8>>,
    ) -> Self {
        Self::new(entry_id, EntryKind::Consistent { version }, payload, meta)
    }

    /// Create a write-once entry
    pub fn immutable(
        entry_id: impl Into<EntryId>,
        payload: impl Into<Vec<u8>>,
        meta: impl Into<Vec<u8>>,
    ) -> Self {
        Self::new(entry_id, EntryKind::Immutable, payload, meta)
    }

    /// Attach tags
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

/// Persisted representation of an entry, as returned by reads and writes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Owning journal
    pub journal_id: JournalId,
    /// Logical identity
    pub entry_id: EntryId,
    /// Journal sequence, `-1` for consistent and immutable rows
    pub sequence: i64,
    /// Write time in ticks
    pub utc_ticks: i64,
    /// Metadata bytes
    pub meta: Vec<u8>,
    /// Payload bytes
    pub payload: Vec<u8>,
    /// Decoded, lower-cased tags
    pub tags: Vec<String>,
}

impl JournalEntry {
    /// True if the row is keyed by entry id
    pub fn is_consistent(&self) -> bool {
        self.sequence == CONSISTENT_SEQUENCE
    }
}
