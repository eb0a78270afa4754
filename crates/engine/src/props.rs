//! In-memory journal props
//!
//! `JournalProps` mirrors the persisted props row. The sequence counter is an
//! `AtomicI64` so concurrent writers of the same journal draw distinct
//! sequences without taking a lock; the creation timestamp never changes.
//!
//! The counter only ever moves forward in memory. A failed write leaves it
//! ahead of the store until the journal reloads it (see `Journal::reset_props`).

use std::sync::atomic::{AtomicI64, Ordering};

use journal_core::PropsRow;

/// Sequence high-water mark and creation epoch of one journal
#[derive(Debug)]
pub struct JournalProps {
    highest_sequence_number: AtomicI64,
    initial_utc_ticks: i64,
}

impl JournalProps {
    /// Create props from explicit values
    pub fn new(highest_sequence_number: i64, initial_utc_ticks: i64) -> Self {
        JournalProps {
            highest_sequence_number: AtomicI64::new(highest_sequence_number),
            initial_utc_ticks,
        }
    }

    /// Current sequence high-water mark
    pub fn highest_sequence_number(&self) -> i64 {
        self.highest_sequence_number.load(Ordering::SeqCst)
    }

    /// Journal creation time in ticks
    pub fn initial_utc_ticks(&self) -> i64 {
        self.initial_utc_ticks
    }

    /// Allocate the next sequence number
    pub fn increment_and_get(&self) -> i64 {
        self.highest_sequence_number.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Snapshot as a persistable row
    pub fn to_row(&self) -> PropsRow {
        PropsRow {
            highest_sequence_number: self.highest_sequence_number(),
            initial_utc_ticks: self.initial_utc_ticks,
        }
    }
}

impl From<PropsRow> for JournalProps {
    fn from(row: PropsRow) -> Self {
        JournalProps::new(row.highest_sequence_number, row.initial_utc_ticks)
    }
}
