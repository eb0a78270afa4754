//! journaldb - Append-only journals over a relational store
//!
//! A journal is an ordered, append-only log of entries identified by a
//! journal id. Each appended entry gets the next sequence number, a UTC
//! tick timestamp and optional tags. Entries can also be written as
//! consistent (versioned, updatable in place) or immutable (write-once).
//!
//! # Quick Start
//!
//! ```ignore
//! use journaldb::prelude::*;
//!
//! let provider = JournalProvider::new(ProviderSettings::new("orders"), Arc::new(MemoryStore::new()));
//! let id = JournalId::new("orders")?;
//! let journal = provider.try_get_or_create(&id, &[], &CancellationToken::new())?.unwrap();
//!
//! journal.write(&[Entry::appended("o-1", payload, meta).with_tags(["eu"])], &CancellationToken::new())?;
//! let eu = journal.read_with_tags(LocationKind::Sequence, 0, None, &["eu"], &CancellationToken::new())?;
//! ```
//!
//! # Architecture
//!
//! - `journal-core`: identity, entries, tags, traits and the store contract
//! - `journal-storage`: in-memory and SQLite stores
//! - `journal-engine`: the journal itself and the provider that hands it out

pub mod prelude;

pub use journal_core::{
    CancellationToken, Clock, Entry, EntryId, EntryKind, JournalEntry, JournalError, JournalId,
    JournalResult, JournalTrait, JournalTraits, LocationKind, ManualClock, RelationalStore,
    StoreTransaction, SystemClock, TagCodec, TraitKind, TriState,
};
pub use journal_engine::{
    owns_connection, ExistenceCheck, Journal, JournalConfig, JournalProps, JournalProvider,
    JournalReader, JournalSettings, JournalWriter, ProviderId, ProviderSettings, CONFIG_FILE_NAME,
    PROVIDER_NAME,
};
pub use journal_storage::MemoryStore;
#[cfg(feature = "sqlite")]
pub use journal_storage::SqliteStore;
