//! Reader and writer roles
//!
//! Consumers that only read (projections, subscribers) or only write
//! (command handlers) can hold the narrower trait object handed out by the
//! provider instead of the full [`Journal`].

use journal_core::{
    CancellationToken, Entry, EntryId, JournalEntry, JournalId, JournalResult, LocationKind,
};

use crate::journal::Journal;

/// Read access to a journal
pub trait JournalReader: Send + Sync {
    /// Journal identity
    fn journal_id(&self) -> &JournalId;

    /// Current sequence high-water mark
    fn highest_sequence_number(&self) -> i64;

    /// Entries with `from < axis <= to`
    fn read(
        &self,
        kind: LocationKind,
        from: i64,
        to: Option<i64>,
        cancel: &CancellationToken,
    ) -> JournalResult<Vec<JournalEntry>>;

    /// Entries with `from < axis <= to` carrying at least one of `tags`
    fn read_with_tags(
        &self,
        kind: LocationKind,
        from: i64,
        to: Option<i64>,
        tags: &[String],
        cancel: &CancellationToken,
    ) -> JournalResult<Vec<JournalEntry>>;

    /// Point lookup by entry id
    fn read_by_entry_id(
        &self,
        entry_id: &EntryId,
        cancel: &CancellationToken,
    ) -> JournalResult<Option<JournalEntry>>;
}

/// Write access to a journal
pub trait JournalWriter: Send + Sync {
    /// Journal identity
    fn journal_id(&self) -> &JournalId;

    /// Persist a batch, all-or-nothing
    fn write(
        &self,
        entries: &[Entry],
        cancel: &CancellationToken,
    ) -> JournalResult<Vec<JournalEntry>>;

    /// Reload props from the store after a failed write
    fn reset_props(&self, cancel: &CancellationToken) -> JournalResult<()>;
}

impl JournalReader for Journal {
    fn journal_id(&self) -> &JournalId {
        Journal::journal_id(self)
    }

    fn highest_sequence_number(&self) -> i64 {
        Journal::highest_sequence_number(self)
    }

    fn read(
        &self,
        kind: LocationKind,
        from: i64,
        to: Option<i64>,
        cancel: &CancellationToken,
    ) -> JournalResult<Vec<JournalEntry>> {
        Journal::read(self, kind, from, to, cancel)
    }

    fn read_with_tags(
        &self,
        kind: LocationKind,
        from: i64,
        to: Option<i64>,
        tags: &[String],
        cancel: &CancellationToken,
    ) -> JournalResult<Vec<JournalEntry>> {
        Journal::read_with_tags(self, kind, from, to, tags, cancel)
    }

    fn read_by_entry_id(
        &self,
        entry_id: &EntryId,
        cancel: &CancellationToken,
    ) -> JournalResult<Option<JournalEntry>> {
        Journal::read_by_entry_id(self, entry_id, cancel)
    }
}

impl JournalWriter for Journal {
    fn journal_id(&self) -> &JournalId {
        Journal::journal_id(self)
    }

    fn write(
        &self,
        entries: &[Entry],
        cancel: &CancellationToken,
    ) -> JournalResult<Vec<JournalEntry>> {
        Journal::write(self, entries, cancel)
    }

    fn reset_props(&self, cancel: &CancellationToken) -> JournalResult<()> {
        Journal::reset_props(self, cancel)
    }
}
