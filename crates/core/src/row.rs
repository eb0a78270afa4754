//! Persisted row layout
//!
//! ## Entries table `"<journal>"`
//!
//! Primary key `(journal_id, row_key)`; indexes on journal_id, entry_id,
//! sequence, utc_ticks and tags.
//!
//! Row keys keep the kinds from ever colliding:
//!
//! ```text
//! appended:   e:0000000000000000042
//! consistent: c:<entry id>
//! immutable:  u:<entry id>
//! ```
//!
//! Updates only ever target `c:` keys, so an immutable row cannot be
//! replaced once written.
//!
//! ## Props table `"<journal>-props"`
//!
//! One row keyed by journal_id holding the sequence high-water mark and the
//! creation timestamp.

use crate::entry::{JournalEntry, CONSISTENT_SEQUENCE};
use crate::tags::TagCodec;
use crate::types::{EntryId, JournalId, LocationKind};
use serde::{Deserialize, Serialize};

/// Row key prefix for appended rows
pub const APPENDED_ROW_PREFIX: &str = "e";

/// Row key prefix for consistent rows
pub const CONSISTENT_ROW_PREFIX: &str = "c";

/// Row key prefix for immutable rows
pub const IMMUTABLE_ROW_PREFIX: &str = "u";

/// Separator between prefix and discriminator
pub const ROW_KEY_SEPARATOR: char = ':';

/// Row key for an appended row
pub fn appended_row_key(sequence: i64) -> String {
    format!("{}{}{:019}", APPENDED_ROW_PREFIX, ROW_KEY_SEPARATOR, sequence)
}

/// Row key for a consistent row
pub fn consistent_row_key(entry_id: &EntryId) -> String {
    format!(
        "{}{}{}",
        CONSISTENT_ROW_PREFIX,
        ROW_KEY_SEPARATOR,
        entry_id.as_str()
    )
}

/// Row key for an immutable row
pub fn immutable_row_key(entry_id: &EntryId) -> String {
    format!(
        "{}{}{}",
        IMMUTABLE_ROW_PREFIX,
        ROW_KEY_SEPARATOR,
        entry_id.as_str()
    )
}

/// One row of the entries table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRow {
    /// Owning journal
    pub journal_id: JournalId,
    /// Primary key within the journal
    pub row_key: String,
    /// Logical identity
    pub entry_id: EntryId,
    /// Sequence, `-1` for consistent and immutable rows
    pub sequence: i64,
    /// Write time in ticks
    pub utc_ticks: i64,
    /// Metadata bytes
    pub meta: Vec<u8>,
    /// Payload bytes
    pub payload: Vec<u8>,
    /// Encoded tag column
    pub tags: String,
}

impl StoredRow {
    /// Build an appended row
    pub fn appended(
        journal_id: JournalId,
        entry_id: EntryId,
        sequence: i64,
        utc_ticks: i64,
        payload: Vec<u8>,
        meta: Vec<u8>,
        tags: String,
    ) -> Self {
        StoredRow {
            journal_id,
            row_key: appended_row_key(sequence),
            entry_id,
            sequence,
            utc_ticks,
            meta,
            payload,
            tags,
        }
    }

    /// Build a consistent row
    pub fn consistent(
        journal_id: JournalId,
        entry_id: EntryId,
        utc_ticks: i64,
        payload: Vec<u8>,
        meta: Vec<u8>,
        tags: String,
    ) -> Self {
        StoredRow {
            journal_id,
            row_key: consistent_row_key(&entry_id),
            entry_id,
            sequence: CONSISTENT_SEQUENCE,
            utc_ticks,
            meta,
            payload,
            tags,
        }
    }

    /// Build an immutable row
    pub fn immutable(
        journal_id: JournalId,
        entry_id: EntryId,
        utc_ticks: i64,
        payload: Vec<u8>,
        meta: Vec<u8>,
        tags: String,
    ) -> Self {
        StoredRow {
            journal_id,
            row_key: immutable_row_key(&entry_id),
            entry_id,
            sequence: CONSISTENT_SEQUENCE,
            utc_ticks,
            meta,
            payload,
            tags,
        }
    }

    /// Value of the row on the given ordering axis
    pub fn axis_value(&self, kind: LocationKind) -> i64 {
        match kind {
            LocationKind::Sequence => self.sequence,
            LocationKind::UtcTicks => self.utc_ticks,
        }
    }

    /// Convert into the caller-facing representation
    pub fn into_entry(self, codec: &TagCodec) -> JournalEntry {
        JournalEntry {
            tags: codec.decode(&self.tags),
            journal_id: self.journal_id,
            entry_id: self.entry_id,
            sequence: self.sequence,
            utc_ticks: self.utc_ticks,
            meta: self.meta,
            payload: self.payload,
        }
    }
}

/// The single row of the props table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropsRow {
    /// Highest sequence number persisted
    pub highest_sequence_number: i64,
    /// Creation time of the journal in ticks
    pub initial_utc_ticks: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_appended_row_key_is_zero_padded() {
        assert_eq!(appended_row_key(42), "e:0000000000000000042");
        assert_eq!(appended_row_key(i64::MAX), "e:9223372036854775807");
    }

    #[test]
    fn test_consistent_row_key() {
        assert_eq!(consistent_row_key(&EntryId::new("order-1")), "c:order-1");
    }

    #[test]
    fn test_immutable_row_key_distinct_from_consistent() {
        let id = EntryId::new("receipt");
        assert_eq!(immutable_row_key(&id), "u:receipt");
        assert_ne!(immutable_row_key(&id), consistent_row_key(&id));
        // Among keyed rows of one id the immutable one sorts last
        assert!(consistent_row_key(&id) < immutable_row_key(&id));
    }

    #[test]
    fn test_row_keys_sort_by_sequence() {
        assert!(appended_row_key(9) < appended_row_key(10));
        assert!(appended_row_key(99) < appended_row_key(100));
    }

    #[test]
    fn test_consistent_row_has_sentinel_sequence() {
        let row = StoredRow::consistent(
            JournalId::new("j").unwrap(),
            EntryId::new("a"),
            7,
            vec![],
            vec![],
            String::new(),
        );
        assert_eq!(row.sequence, CONSISTENT_SEQUENCE);
        assert_eq!(row.axis_value(LocationKind::UtcTicks), 7);
    }

    #[test]
    fn test_into_entry_decodes_tags() {
        let codec = TagCodec::default();
        let row = StoredRow::appended(
            JournalId::new("j").unwrap(),
            EntryId::new("a"),
            3,
            11,
            b"p".to_vec(),
            b"m".to_vec(),
            codec.encode(&["odd", "x"]),
        );
        let entry = row.into_entry(&codec);
        assert_eq!(entry.sequence, 3);
        assert_eq!(entry.tags, vec!["odd", "x"]);
        assert!(!entry.is_consistent());
    }
}
