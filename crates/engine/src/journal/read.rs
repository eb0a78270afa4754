//! Read path

use journal_core::{
    CancellationToken, EntryId, JournalEntry, JournalResult, LocationKind, RangeQuery,
};

use super::Journal;

impl Journal {
    /// Entries with `from < axis <= to`, ordered by the axis
    ///
    /// When `to` is `None` the upper bound is the current in-memory sequence
    /// high-water mark for [`LocationKind::Sequence`], or the current clock
    /// time for [`LocationKind::UtcTicks`].
    pub fn read(
        &self,
        kind: LocationKind,
        from: i64,
        to: Option<i64>,
        cancel: &CancellationToken,
    ) -> JournalResult<Vec<JournalEntry>> {
        self.read_with_tags::<&str>(kind, from, to, &[], cancel)
    }

    /// Like [`Journal::read`], keeping only entries carrying at least one of
    /// `tags`
    ///
    /// Tags match case-insensitively and as whole tags. An empty tag list
    /// reads the whole range.
    pub fn read_with_tags<S: AsRef<str>>(
        &self,
        kind: LocationKind,
        from: i64,
        to: Option<i64>,
        tags: &[S],
        cancel: &CancellationToken,
    ) -> JournalResult<Vec<JournalEntry>> {
        cancel.check()?;
        let to = to.unwrap_or_else(|| self.upper_bound(kind));
        let codec = &self.settings.tag_codec;
        let query = RangeQuery::new(kind, from, to).with_tags(codec.any_of(tags));

        let rows = self.store.scan(&self.id, &query)?;
        Ok(rows.into_iter().map(|row| row.into_entry(codec)).collect())
    }

    /// Point lookup by entry id
    ///
    /// Appended entries may share an id; the one with the highest sequence
    /// is returned. Consistent rows carry sequence `-1`, so an appended row
    /// with the same id takes precedence over them.
    pub fn read_by_entry_id(
        &self,
        entry_id: &EntryId,
        cancel: &CancellationToken,
    ) -> JournalResult<Option<JournalEntry>> {
        cancel.check()?;
        let row = self.store.find_by_entry_id(&self.id, entry_id)?;
        Ok(row.map(|row| row.into_entry(&self.settings.tag_codec)))
    }

    fn upper_bound(&self, kind: LocationKind) -> i64 {
        match kind {
            LocationKind::Sequence => self.highest_sequence_number(),
            LocationKind::UtcTicks => self.clock.utc_ticks(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::tests::open;
    use journal_core::{Entry, JournalError};
    use journal_storage::testing::{FaultPoint, FaultyStore};
    use journal_storage::MemoryStore;
    use std::sync::Arc;

    fn none() -> CancellationToken {
        CancellationToken::new()
    }

    fn sequences(entries: &[JournalEntry]) -> Vec<i64> {
        entries.iter().map(|e| e.sequence).collect()
    }

    fn ten_appended(journal: &Journal) {
        let entries: Vec<Entry> = (1..=10)
            .map(|i| {
                let tag = if i % 2 == 0 { "even" } else { "odd" };
                Entry::appended(format!("e{}", i), vec![i as u8], vec![]).with_tags([tag])
            })
            .collect();
        journal.write(&entries, &none()).unwrap();
    }

    #[test]
    fn test_sequence_range_bounds() {
        let journal = open(Arc::new(MemoryStore::new()));
        ten_appended(&journal);

        let bounded = journal
            .read(LocationKind::Sequence, 4, Some(6), &none())
            .unwrap();
        assert_eq!(sequences(&bounded), vec![5, 6]);

        let open_ended = journal.read(LocationKind::Sequence, 4, None, &none()).unwrap();
        assert_eq!(sequences(&open_ended), vec![5, 6, 7, 8, 9, 10]);
    }

    #[test]
    fn test_unbounded_sequence_read_excludes_consistent_rows() {
        let journal = open(Arc::new(MemoryStore::new()));
        journal
            .write(&[Entry::consistent("doc", 0, vec![], vec![])], &none())
            .unwrap();
        ten_appended(&journal);
        let all = journal.read(LocationKind::Sequence, 0, None, &none()).unwrap();
        assert_eq!(all.len(), 10);
        assert!(all.iter().all(|e| !e.is_consistent()));
    }

    #[test]
    fn test_ticks_read_defaults_to_now() {
        let journal = open(Arc::new(MemoryStore::new()));
        ten_appended(&journal);
        let all = journal
            .read(LocationKind::UtcTicks, i64::MIN, None, &none())
            .unwrap();
        assert_eq!(all.len(), 10);

        let none_before = journal
            .read(LocationKind::UtcTicks, i64::MIN, Some(journal.initial_utc_ticks() - 1), &none())
            .unwrap();
        assert!(none_before.is_empty());
    }

    #[test]
    fn test_tag_filter() {
        let journal = open(Arc::new(MemoryStore::new()));
        ten_appended(&journal);

        let odd = journal
            .read_with_tags(LocationKind::Sequence, 0, None, &["odd"], &none())
            .unwrap();
        assert_eq!(sequences(&odd), vec![1, 3, 5, 7, 9]);

        let both = journal
            .read_with_tags(LocationKind::Sequence, 0, None, &["ODD", "even"], &none())
            .unwrap();
        assert_eq!(sequences(&both), (1..=10).collect::<Vec<_>>());

        let no_tags = journal
            .read_with_tags::<&str>(LocationKind::Sequence, 0, None, &[], &none())
            .unwrap();
        assert_eq!(no_tags.len(), 10);
    }

    #[test]
    fn test_read_by_entry_id() {
        let journal = open(Arc::new(MemoryStore::new()));
        journal
            .write(
                &[
                    Entry::appended("dup", b"first".to_vec(), vec![]),
                    Entry::appended("dup", b"second".to_vec(), vec![]),
                    Entry::immutable("fixed", b"once".to_vec(), vec![]),
                ],
                &none(),
            )
            .unwrap();

        let dup = journal
            .read_by_entry_id(&EntryId::new("dup"), &none())
            .unwrap()
            .unwrap();
        assert_eq!(dup.payload, b"second");
        assert_eq!(dup.sequence, 2);

        let fixed = journal
            .read_by_entry_id(&EntryId::new("fixed"), &none())
            .unwrap()
            .unwrap();
        assert!(fixed.is_consistent());
        assert!(journal
            .read_by_entry_id(&EntryId::new("absent"), &none())
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_read_failure_returns_no_partial_results() {
        let store = Arc::new(FaultyStore::new(Arc::new(MemoryStore::new())));
        let journal = open(store.clone());
        ten_appended(&journal);
        store.fail_next(FaultPoint::Scan, 1);
        let err = journal
            .read(LocationKind::Sequence, 0, None, &none())
            .unwrap_err();
        assert!(matches!(err, JournalError::Storage { .. }));
    }

    #[test]
    fn test_cancelled_read() {
        let store = Arc::new(FaultyStore::new(Arc::new(MemoryStore::new())));
        let journal = open(store.clone());
        let cancel = none();
        cancel.cancel();
        assert!(matches!(
            journal.read(LocationKind::Sequence, 0, None, &cancel),
            Err(JournalError::Cancelled)
        ));
        assert!(matches!(
            journal.read_by_entry_id(&EntryId::new("a"), &cancel),
            Err(JournalError::Cancelled)
        ));
        assert_eq!(store.calls(FaultPoint::Scan), 0);
    }
}
