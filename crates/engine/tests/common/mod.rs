//! Shared helpers for engine integration tests

#![allow(dead_code)]

use std::sync::Arc;

use journal_core::{CancellationToken, JournalId, ManualClock, RelationalStore};
use journal_engine::{Journal, JournalSettings};

/// Route engine logs to the test harness output
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Unique journal id so tests sharing a store never collide
pub fn unique_id(prefix: &str) -> JournalId {
    JournalId::new(format!("{}-{}", prefix, uuid::Uuid::new_v4().simple())).unwrap()
}

pub fn none() -> CancellationToken {
    CancellationToken::new()
}

pub fn open(store: Arc<dyn RelationalStore>, id: JournalId) -> Journal {
    open_with(store, id, JournalSettings::default())
}

pub fn open_with(
    store: Arc<dyn RelationalStore>,
    id: JournalId,
    settings: JournalSettings,
) -> Journal {
    Journal::open(id, settings, store, Arc::new(ManualClock::default()), &none()).unwrap()
}

pub fn sequences(entries: &[journal_core::JournalEntry]) -> Vec<i64> {
    entries.iter().map(|e| e.sequence).collect()
}
