//! Journal engine
//!
//! A [`Journal`] owns one journal's in-memory props and talks to the
//! relational store for everything else:
//!
//! - `open` (init.rs): create schema objects and load or create props,
//!   retrying with doubling delays until a deadline
//! - `write` (write.rs): classify entries, assign sequences, persist the
//!   batch in one transaction
//! - `read`, `read_with_tags`, `read_by_entry_id` (read.rs): range scans by
//!   sequence or time and point lookups
//! - `reset_props`: reload props from the store
//!
//! # Props and failed writes
//!
//! Sequences are drawn from the in-memory counter before the batch commits.
//! When a batch fails the counter is not rewound, so the journal stays ahead
//! of the store. Call [`Journal::reset_props`] after a failed write, or
//! enable `JournalSettings::reset_props_on_write_failure`.

mod init;
mod read;
pub mod settings;
mod write;

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use journal_core::{
    CancellationToken, Clock, JournalError, JournalId, JournalResult, RelationalStore,
};

use crate::props::JournalProps;

pub use settings::JournalSettings;

/// Engine for a single journal
///
/// Thread-safe: share it behind an `Arc` and call from any thread.
#[derive(Debug)]
pub struct Journal {
    id: JournalId,
    store: Arc<dyn RelationalStore>,
    clock: Arc<dyn Clock>,
    settings: JournalSettings,
    /// Replaced wholesale by `reset_props`; writers clone the Arc and
    /// increment through it without holding the lock
    props: RwLock<Arc<JournalProps>>,
}

impl Journal {
    /// Journal identity
    pub fn journal_id(&self) -> &JournalId {
        &self.id
    }

    /// Settings the journal was opened with
    pub fn settings(&self) -> &JournalSettings {
        &self.settings
    }

    /// Current in-memory props
    pub fn props(&self) -> Arc<JournalProps> {
        Arc::clone(&*self.props.read())
    }

    /// In-memory sequence high-water mark
    pub fn highest_sequence_number(&self) -> i64 {
        self.props.read().highest_sequence_number()
    }

    /// Creation time of the journal in ticks
    pub fn initial_utc_ticks(&self) -> i64 {
        self.props.read().initial_utc_ticks()
    }

    /// Reload props from the store
    ///
    /// # Errors
    ///
    /// Returns `JournalError::InconsistentState` if the props row is missing,
    /// or the store error if it cannot be read.
    pub fn reset_props(&self, cancel: &CancellationToken) -> JournalResult<()> {
        cancel.check()?;
        self.reload_props()
    }

    fn reload_props(&self) -> JournalResult<()> {
        let row = self.store.load_props(&self.id)?.ok_or_else(|| {
            JournalError::inconsistent_state(self.id.as_str(), "props row is missing")
        })?;

        let mut props = self.props.write();
        let previous = props.highest_sequence_number();
        *props = Arc::new(JournalProps::from(row));
        drop(props);

        if previous != row.highest_sequence_number {
            info!(target: "journal::engine", journal = %self.id, previous, reloaded = row.highest_sequence_number, "Props reset");
        } else {
            debug!(target: "journal::engine", journal = %self.id, highest_sequence_number = previous, "Props reset, unchanged");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use journal_core::{Entry, ManualClock, PropsRow};
    use journal_storage::testing::{FaultPoint, FaultyStore};
    use journal_storage::MemoryStore;

    pub(crate) fn open(store: Arc<dyn RelationalStore>) -> Journal {
        Journal::open(
            JournalId::new("unit").unwrap(),
            JournalSettings::default(),
            store,
            Arc::new(ManualClock::default()),
            &CancellationToken::new(),
        )
        .unwrap()
    }

    #[test]
    fn test_reset_props_reloads_store_value() {
        let store = Arc::new(MemoryStore::new());
        let journal = open(store.clone());
        journal.props().increment_and_get();
        journal.props().increment_and_get();
        assert_eq!(journal.highest_sequence_number(), 2);

        journal.reset_props(&CancellationToken::new()).unwrap();
        assert_eq!(journal.highest_sequence_number(), 0);
    }

    #[test]
    fn test_reset_props_keeps_initial_ticks() {
        let store = Arc::new(MemoryStore::new());
        let journal = open(store);
        let initial = journal.initial_utc_ticks();
        journal.reset_props(&CancellationToken::new()).unwrap();
        assert_eq!(journal.initial_utc_ticks(), initial);
    }

    #[test]
    fn test_reset_props_cancelled() {
        let journal = open(Arc::new(MemoryStore::new()));
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(matches!(
            journal.reset_props(&cancel),
            Err(JournalError::Cancelled)
        ));
    }

    #[test]
    fn test_reset_props_surfaces_store_failure() {
        let store = Arc::new(FaultyStore::new(Arc::new(MemoryStore::new())));
        let journal = open(store.clone());
        store.fail_next(FaultPoint::LoadProps, 1);
        let err = journal.reset_props(&CancellationToken::new()).unwrap_err();
        assert!(matches!(err, JournalError::Storage { .. }));
    }

    #[test]
    fn test_props_snapshot_survives_reset() {
        let store = Arc::new(MemoryStore::new());
        let journal = open(store.clone());
        let before = journal.props();
        journal
            .write(&[Entry::appended("a", vec![], vec![])], &CancellationToken::new())
            .unwrap();
        journal.reset_props(&CancellationToken::new()).unwrap();
        assert!(!Arc::ptr_eq(&before, &journal.props()));
        assert_eq!(
            store.load_props(journal.journal_id()).unwrap(),
            Some(PropsRow {
                highest_sequence_number: 1,
                initial_utc_ticks: journal.initial_utc_ticks(),
            })
        );
    }
}
