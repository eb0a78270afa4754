//! Journal construction and initialization retry

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, error, info, warn};

use journal_core::clock::duration_to_ticks;
use journal_core::{
    CancellationToken, Clock, JournalError, JournalId, JournalResult, PropsRow, RelationalStore,
    SchemaObject,
};

use super::{Journal, JournalSettings};
use crate::props::JournalProps;

impl Journal {
    /// Open a journal, creating its tables and props row if needed
    ///
    /// Blocks until initialization succeeds or the initialization timeout,
    /// measured from the start of this call on `clock`, has passed. Between
    /// attempts the thread sleeps on `clock`, starting at
    /// `settings.initial_retry_delay` and doubling each time.
    ///
    /// # Errors
    ///
    /// - `JournalError::Cancelled` if `cancel` fires before an attempt starts
    /// - `JournalError::InitializationFailed` wrapping the last failure once
    ///   the deadline has passed
    pub fn open(
        id: JournalId,
        settings: JournalSettings,
        store: Arc<dyn RelationalStore>,
        clock: Arc<dyn Clock>,
        cancel: &CancellationToken,
    ) -> JournalResult<Journal> {
        let started = clock.utc_ticks();
        let deadline = started.saturating_add(duration_to_ticks(settings.initialization_timeout));
        let mut attempts: u32 = 0;

        loop {
            cancel.check()?;
            attempts += 1;

            match initialize(&id, store.as_ref(), clock.as_ref()) {
                Ok(props) => {
                    info!(
                        target: "journal::engine",
                        journal = %id,
                        attempts,
                        highest_sequence_number = props.highest_sequence_number(),
                        "Journal initialized"
                    );
                    return Ok(Journal {
                        id,
                        store,
                        clock,
                        settings,
                        props: RwLock::new(Arc::new(props)),
                    });
                }
                Err(err) => {
                    if clock.utc_ticks() >= deadline {
                        error!(target: "journal::engine", journal = %id, attempts, error = %err, "Journal initialization failed");
                        return Err(JournalError::InitializationFailed {
                            journal: id.to_string(),
                            attempts,
                            source: Box::new(err),
                        });
                    }
                    let delay = settings.retry_delay(attempts);
                    warn!(
                        target: "journal::engine",
                        journal = %id,
                        attempt = attempts,
                        retry_in_ms = delay.as_millis() as u64,
                        error = %err,
                        "Journal initialization attempt failed, retrying"
                    );
                    clock.sleep(delay);
                }
            }
        }
    }
}

/// One initialization attempt
fn initialize(
    id: &JournalId,
    store: &dyn RelationalStore,
    clock: &dyn Clock,
) -> JournalResult<JournalProps> {
    for object in SchemaObject::all() {
        match store.create_object(id, object) {
            Ok(()) => {}
            Err(err) if err.is_already_exists() => {
                debug!(target: "journal::engine", journal = %id, object = %object.name(id), "Schema object already exists");
            }
            Err(err) => return Err(err),
        }
    }

    if let Some(row) = store.load_props(id)? {
        return Ok(JournalProps::from(row));
    }

    let row = PropsRow {
        highest_sequence_number: 0,
        initial_utc_ticks: clock.utc_ticks(),
    };
    match store.insert_props(id, row) {
        Ok(()) => {
            info!(target: "journal::engine", journal = %id, initial_utc_ticks = row.initial_utc_ticks, "Journal created");
            Ok(JournalProps::from(row))
        }
        // Another process created the row between our load and insert
        Err(err) if err.is_conflict() => store
            .load_props(id)?
            .map(JournalProps::from)
            .ok_or(err),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use journal_core::ManualClock;
    use journal_storage::testing::{FaultPoint, FaultyStore};
    use journal_storage::MemoryStore;
    use std::time::Duration;

    fn settings() -> JournalSettings {
        JournalSettings::default()
            .with_initialization_timeout(Duration::from_secs(2))
            .with_initial_retry_delay(Duration::from_millis(250))
    }

    fn journal_id() -> JournalId {
        JournalId::new("init").unwrap()
    }

    #[test]
    fn test_open_creates_props_at_zero() {
        let clock = Arc::new(ManualClock::new(12_345));
        let store = Arc::new(MemoryStore::new());
        let journal = Journal::open(
            journal_id(),
            settings(),
            store.clone(),
            clock,
            &CancellationToken::new(),
        )
        .unwrap();

        assert_eq!(journal.highest_sequence_number(), 0);
        assert_eq!(journal.initial_utc_ticks(), 12_345);
        assert_eq!(
            store.load_props(&journal_id()).unwrap(),
            Some(PropsRow {
                highest_sequence_number: 0,
                initial_utc_ticks: 12_345
            })
        );
    }

    #[test]
    fn test_reopen_loads_existing_props() {
        let store = Arc::new(MemoryStore::new());
        let first = Journal::open(
            journal_id(),
            settings(),
            store.clone(),
            Arc::new(ManualClock::new(1)),
            &CancellationToken::new(),
        )
        .unwrap();
        first.props().increment_and_get();
        let mut tx = store.begin(&journal_id()).unwrap();
        tx.save_props(first.props().to_row()).unwrap();
        tx.commit().unwrap();

        let second = Journal::open(
            journal_id(),
            settings(),
            store,
            Arc::new(ManualClock::new(999)),
            &CancellationToken::new(),
        )
        .unwrap();
        assert_eq!(second.highest_sequence_number(), 1);
        assert_eq!(second.initial_utc_ticks(), 1);
    }

    #[test]
    fn test_transient_failures_are_retried_with_doubling_delay() {
        let clock = Arc::new(ManualClock::default());
        let store = Arc::new(FaultyStore::new(Arc::new(MemoryStore::new())));
        store.fail_next(FaultPoint::CreateObject, 3);

        let journal = Journal::open(
            journal_id(),
            settings(),
            store.clone(),
            clock.clone(),
            &CancellationToken::new(),
        );
        assert!(journal.is_ok());
        assert_eq!(clock.sleep_count(), 3);
        // 250 + 500 + 1000
        assert_eq!(clock.total_slept(), Duration::from_millis(1750));
    }

    #[test]
    fn test_gives_up_after_deadline() {
        let clock = Arc::new(ManualClock::default());
        let store = Arc::new(FaultyStore::new(Arc::new(MemoryStore::new())));
        store.fail_always(FaultPoint::LoadProps);

        let err = Journal::open(
            journal_id(),
            settings(),
            store,
            clock.clone(),
            &CancellationToken::new(),
        )
        .unwrap_err();

        match err {
            JournalError::InitializationFailed {
                attempts, source, ..
            } => {
                // Attempts at 0, 250, 750 and 1750ms retry; the fifth, at
                // 3750ms, is past the 2s deadline
                assert_eq!(attempts, 5);
                assert!(matches!(*source, JournalError::Storage { .. }));
            }
            other => panic!("unexpected error: {}", other),
        }
        assert_eq!(clock.total_slept(), Duration::from_millis(3750));
    }

    #[test]
    fn test_already_exists_is_swallowed() {
        let store = Arc::new(MemoryStore::new());
        for object in SchemaObject::all() {
            store.create_object(&journal_id(), object).unwrap();
        }
        let clock = Arc::new(ManualClock::default());
        Journal::open(
            journal_id(),
            settings(),
            store,
            clock.clone(),
            &CancellationToken::new(),
        )
        .unwrap();
        assert_eq!(clock.sleep_count(), 0);
    }

    #[test]
    fn test_cancelled_before_start() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let store = Arc::new(FaultyStore::new(Arc::new(MemoryStore::new())));
        let err = Journal::open(
            journal_id(),
            settings(),
            store.clone(),
            Arc::new(ManualClock::default()),
            &cancel,
        )
        .unwrap_err();
        assert!(matches!(err, JournalError::Cancelled));
        assert_eq!(store.calls(FaultPoint::CreateObject), 0);
    }

    #[test]
    fn test_failed_props_insert_is_retried() {
        let store = Arc::new(FaultyStore::new(Arc::new(MemoryStore::new())));
        let clock = Arc::new(ManualClock::new(5));
        // First attempt fails after tables exist but before props are written
        store.fail_next(FaultPoint::InsertProps, 1);
        let journal = Journal::open(
            journal_id(),
            settings(),
            store.clone(),
            clock.clone(),
            &CancellationToken::new(),
        )
        .unwrap();
        assert_eq!(journal.highest_sequence_number(), 0);
        assert_eq!(store.calls(FaultPoint::InsertProps), 2);
        assert_eq!(clock.sleep_count(), 1);
    }
}
