//! Write path
//!
//! A batch is all-or-nothing: inserts, then updates, then the props row are
//! written in one store transaction. Entries are validated before any
//! sequence is drawn, so invalid input never advances the counter.

use tracing::{debug, warn};

use journal_core::limits::{check_encoded_tags, check_entry_id};
use journal_core::{
    CancellationToken, Entry, EntryKind, JournalEntry, JournalResult, PropsRow, StoreTransaction,
    StoredRow,
};

use super::Journal;

/// Rows of one batch, split by how they reach the store
#[derive(Debug, Default)]
struct Batch {
    inserts: Vec<StoredRow>,
    updates: Vec<StoredRow>,
}

impl Journal {
    /// Persist a batch of entries
    ///
    /// Appended entries get the next sequence numbers in submission order.
    /// Consistent entries with version 0 and immutable entries are inserted
    /// keyed by entry id; consistent entries with any other version replace
    /// the existing row.
    ///
    /// Returns the persisted rows, inserts first, then updates.
    ///
    /// # Errors
    ///
    /// - `JournalError::InvalidInput` if an entry id or tag set exceeds its
    ///   limit (nothing is written, no sequence is consumed)
    /// - `JournalError::WriteConflict` if an id is already present, repeats
    ///   within the batch, or an update targets a missing row; the whole
    ///   batch is rolled back
    /// - `JournalError::Cancelled` if `cancel` fired before the write started
    ///
    /// After a failed write the in-memory counter may be ahead of the store;
    /// see [`Journal::reset_props`].
    pub fn write(
        &self,
        entries: &[Entry],
        cancel: &CancellationToken,
    ) -> JournalResult<Vec<JournalEntry>> {
        cancel.check()?;
        if entries.is_empty() {
            return Ok(Vec::new());
        }

        let encoded_tags = self.validate(entries)?;
        let batch = self.classify(entries, encoded_tags);
        let props = self.props().to_row();

        match self.persist(&batch, props) {
            Ok(()) => {
                debug!(
                    target: "journal::engine",
                    journal = %self.id,
                    inserted = batch.inserts.len(),
                    updated = batch.updates.len(),
                    highest_sequence_number = props.highest_sequence_number,
                    "Batch committed"
                );
                let codec = &self.settings.tag_codec;
                Ok(batch
                    .inserts
                    .into_iter()
                    .chain(batch.updates)
                    .map(|row| row.into_entry(codec))
                    .collect())
            }
            Err(err) => {
                warn!(
                    target: "journal::engine",
                    journal = %self.id,
                    entries = entries.len(),
                    writer_retry_limit = self.settings.writer_retry_limit,
                    error = %err,
                    "Batch write failed, rolled back"
                );
                if self.settings.reset_props_on_write_failure {
                    if let Err(reset_err) = self.reload_props() {
                        warn!(target: "journal::engine", journal = %self.id, error = %reset_err, "Props reset after failed write also failed");
                    }
                }
                Err(err)
            }
        }
    }

    /// Check limits and encode tags, one string per entry
    fn validate(&self, entries: &[Entry]) -> JournalResult<Vec<String>> {
        entries
            .iter()
            .map(|entry| {
                check_entry_id(entry.entry_id.as_str())?;
                let encoded = self.settings.tag_codec.encode(&entry.tags);
                check_encoded_tags(&encoded)?;
                Ok(encoded)
            })
            .collect()
    }

    fn classify(&self, entries: &[Entry], encoded_tags: Vec<String>) -> Batch {
        let props = self.props();
        let now = self.clock.utc_ticks();
        let mut batch = Batch::default();

        for (entry, tags) in entries.iter().zip(encoded_tags) {
            let payload = entry.payload.clone();
            let meta = entry.meta.clone();
            let entry_id = entry.entry_id.clone();

            match entry.kind {
                EntryKind::Appended => batch.inserts.push(StoredRow::appended(
                    self.id.clone(),
                    entry_id,
                    props.increment_and_get(),
                    now,
                    payload,
                    meta,
                    tags,
                )),
                EntryKind::Consistent { version: 0 } => batch.inserts.push(StoredRow::consistent(
                    self.id.clone(),
                    entry_id,
                    now,
                    payload,
                    meta,
                    tags,
                )),
                EntryKind::Immutable => batch.inserts.push(StoredRow::immutable(
                    self.id.clone(),
                    entry_id,
                    now,
                    payload,
                    meta,
                    tags,
                )),
                EntryKind::Consistent { .. } => batch.updates.push(StoredRow::consistent(
                    self.id.clone(),
                    entry_id,
                    now,
                    payload,
                    meta,
                    tags,
                )),
            }
        }
        batch
    }

    fn persist(&self, batch: &Batch, props: PropsRow) -> JournalResult<()> {
        let mut tx = self.store.begin(&self.id)?;
        match stage(tx.as_mut(), batch, props) {
            Ok(()) => tx.commit(),
            Err(err) => {
                if let Err(rollback_err) = tx.rollback() {
                    warn!(target: "journal::engine", journal = %self.id, error = %rollback_err, "Rollback after failed batch also failed");
                }
                Err(err)
            }
        }
    }
}

/// Write the batch and props into an open transaction
fn stage(
    tx: &mut (dyn StoreTransaction + '_),
    batch: &Batch,
    props: PropsRow,
) -> JournalResult<()> {
    if !batch.inserts.is_empty() {
        tx.insert(&batch.inserts)?;
    }
    if !batch.updates.is_empty() {
        tx.update(&batch.updates)?;
    }
    tx.save_props(props)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::tests::open;
    use crate::journal::JournalSettings;
    use journal_core::limits::MAX_ENTRY_ID_LENGTH;
    use journal_core::{
        JournalError, JournalId, LocationKind, ManualClock, RelationalStore, CONSISTENT_SEQUENCE,
    };
    use journal_storage::testing::{FaultPoint, FaultyStore};
    use journal_storage::MemoryStore;
    use std::sync::Arc;

    fn none() -> CancellationToken {
        CancellationToken::new()
    }

    #[test]
    fn test_appended_sequences_follow_submission_order() {
        let journal = open(Arc::new(MemoryStore::new()));
        let written = journal
            .write(
                &[
                    Entry::appended("a", vec![1], vec![]),
                    Entry::appended("b", vec![2], vec![]),
                    Entry::appended("c", vec![3], vec![]),
                ],
                &none(),
            )
            .unwrap();
        let seqs: Vec<i64> = written.iter().map(|e| e.sequence).collect();
        assert_eq!(seqs, vec![1, 2, 3]);
        assert_eq!(journal.highest_sequence_number(), 3);
    }

    #[test]
    fn test_empty_batch_is_noop() {
        let store = Arc::new(FaultyStore::new(Arc::new(MemoryStore::new())));
        let journal = open(store.clone());
        assert!(journal.write(&[], &none()).unwrap().is_empty());
        assert_eq!(store.calls(FaultPoint::Begin), 0);
    }

    #[test]
    fn test_returns_inserts_before_updates() {
        let journal = open(Arc::new(MemoryStore::new()));
        journal
            .write(&[Entry::consistent("doc", 0, b"v0".to_vec(), vec![])], &none())
            .unwrap();

        let written = journal
            .write(
                &[
                    Entry::consistent("doc", 1, b"v1".to_vec(), vec![]),
                    Entry::appended("evt", vec![], vec![]),
                ],
                &none(),
            )
            .unwrap();
        assert_eq!(written[0].entry_id.as_str(), "evt");
        assert_eq!(written[1].entry_id.as_str(), "doc");
        assert_eq!(written[1].payload, b"v1");
        assert_eq!(written[1].sequence, CONSISTENT_SEQUENCE);
    }

    #[test]
    fn test_written_at_clock_time() {
        let clock = Arc::new(ManualClock::new(1_000));
        let journal = Journal::open(
            JournalId::new("timed").unwrap(),
            JournalSettings::default(),
            Arc::new(MemoryStore::new()),
            clock.clone(),
            &none(),
        )
        .unwrap();
        clock.advance(std::time::Duration::from_micros(5));
        let written = journal
            .write(&[Entry::appended("a", vec![], vec![])], &none())
            .unwrap();
        assert_eq!(written[0].utc_ticks, 1_050);
    }

    #[test]
    fn test_tags_are_lowercased() {
        let journal = open(Arc::new(MemoryStore::new()));
        let written = journal
            .write(
                &[Entry::appended("a", vec![], vec![]).with_tags(["Odd", "BLUE"])],
                &none(),
            )
            .unwrap();
        assert_eq!(written[0].tags, vec!["odd", "blue"]);
    }

    #[test]
    fn test_oversized_entry_id_consumes_no_sequence() {
        let store = Arc::new(FaultyStore::new(Arc::new(MemoryStore::new())));
        let journal = open(store.clone());
        let long_id = "x".repeat(MAX_ENTRY_ID_LENGTH + 1);
        let err = journal
            .write(
                &[
                    Entry::appended("ok", vec![], vec![]),
                    Entry::appended(long_id, vec![], vec![]),
                ],
                &none(),
            )
            .unwrap_err();
        assert!(matches!(err, JournalError::InvalidInput { .. }));
        assert_eq!(journal.highest_sequence_number(), 0);
        assert_eq!(store.calls(FaultPoint::Begin), 0);
    }

    #[test]
    fn test_oversized_tags_rejected() {
        let journal = open(Arc::new(MemoryStore::new()));
        let tags: Vec<String> = (0..200).map(|i| format!("tag-{}", i)).collect();
        let err = journal
            .write(&[Entry::appended("a", vec![], vec![]).with_tags(tags)], &none())
            .unwrap_err();
        assert!(matches!(err, JournalError::InvalidInput { .. }));
    }

    #[test]
    fn test_cancelled_write_touches_nothing() {
        let store = Arc::new(FaultyStore::new(Arc::new(MemoryStore::new())));
        let journal = open(store.clone());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = journal
            .write(&[Entry::appended("a", vec![], vec![])], &cancel)
            .unwrap_err();
        assert!(matches!(err, JournalError::Cancelled));
        assert_eq!(journal.highest_sequence_number(), 0);
        assert_eq!(store.calls(FaultPoint::Begin), 0);
    }

    #[test]
    fn test_failed_commit_leaves_counter_ahead() {
        let memory = Arc::new(MemoryStore::new());
        let store = Arc::new(FaultyStore::new(memory.clone()));
        let journal = open(store.clone());
        store.fail_next(FaultPoint::Commit, 1);

        let err = journal
            .write(&[Entry::appended("a", vec![], vec![])], &none())
            .unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(journal.highest_sequence_number(), 1);
        assert_eq!(memory.row_count(journal.journal_id()), 0);

        journal.reset_props(&none()).unwrap();
        assert_eq!(journal.highest_sequence_number(), 0);
    }

    #[test]
    fn test_failed_insert_rolls_back_transaction() {
        let memory = Arc::new(MemoryStore::new());
        let store = Arc::new(FaultyStore::new(memory.clone()));
        let journal = open(store.clone());
        store.fail_next(FaultPoint::Insert, 1);

        assert!(journal
            .write(&[Entry::appended("a", vec![], vec![])], &none())
            .is_err());
        assert_eq!(store.calls(FaultPoint::Rollback), 1);
        assert_eq!(store.calls(FaultPoint::Commit), 0);
        assert_eq!(memory.row_count(journal.journal_id()), 0);

        journal
            .write(&[Entry::appended("b", vec![], vec![])], &none())
            .unwrap();
        assert_eq!(store.calls(FaultPoint::Rollback), 1);
        assert_eq!(store.calls(FaultPoint::Commit), 1);
    }

    #[test]
    fn test_immutable_entry_cannot_be_updated() {
        let journal = open(Arc::new(MemoryStore::new()));
        journal
            .write(&[Entry::immutable("receipt", b"original".to_vec(), vec![])], &none())
            .unwrap();
        let err = journal
            .write(&[Entry::consistent("receipt", 1, b"tampered".to_vec(), vec![])], &none())
            .unwrap_err();
        assert!(err.is_conflict());

        let stored = journal
            .read_by_entry_id(&journal_core::EntryId::new("receipt"), &none())
            .unwrap()
            .unwrap();
        assert_eq!(stored.payload, b"original");
    }

    #[test]
    fn test_reset_on_failure_setting_rewinds_counter() {
        let memory = Arc::new(MemoryStore::new());
        let journal = Journal::open(
            JournalId::new("auto").unwrap(),
            JournalSettings::default().with_reset_props_on_write_failure(true),
            memory.clone(),
            Arc::new(ManualClock::default()),
            &none(),
        )
        .unwrap();

        let err = journal
            .write(
                &[
                    Entry::appended("a", vec![], vec![]),
                    Entry::immutable("once", vec![], vec![]),
                    Entry::immutable("once", vec![], vec![]),
                ],
                &none(),
            )
            .unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(journal.highest_sequence_number(), 0);
        assert_eq!(memory.row_count(journal.journal_id()), 0);
    }

    #[test]
    fn test_consistent_insert_of_existing_id_conflicts() {
        let journal = open(Arc::new(MemoryStore::new()));
        journal
            .write(&[Entry::consistent("doc", 0, vec![], vec![])], &none())
            .unwrap();
        let err = journal
            .write(&[Entry::consistent("doc", 0, vec![], vec![])], &none())
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[test]
    fn test_update_of_missing_id_conflicts() {
        let journal = open(Arc::new(MemoryStore::new()));
        let err = journal
            .write(&[Entry::consistent("missing", 3, vec![], vec![])], &none())
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[test]
    fn test_props_persisted_with_batch() {
        let store = Arc::new(MemoryStore::new());
        let journal = open(store.clone());
        journal
            .write(
                &[
                    Entry::appended("a", vec![], vec![]),
                    Entry::appended("b", vec![], vec![]),
                ],
                &none(),
            )
            .unwrap();
        let row = store.load_props(journal.journal_id()).unwrap().unwrap();
        assert_eq!(row.highest_sequence_number, 2);

        let rows = store
            .scan(
                journal.journal_id(),
                &journal_core::RangeQuery::new(LocationKind::Sequence, 0, 2),
            )
            .unwrap();
        assert_eq!(rows.len(), 2);
    }
}
