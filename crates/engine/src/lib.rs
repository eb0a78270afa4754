//! Journal engine for journaldb
//!
//! This crate builds on the store contract in `journal-core`:
//! - Journal: sequence assignment, consistency rules, batch writes, range reads
//! - JournalProps: atomic sequence counter and creation epoch
//! - JournalReader / JournalWriter: narrow roles over a journal
//! - JournalProvider: one journal per id, built lazily, filtered by traits
//! - JournalConfig: `journal.toml` loading
//!
//! The engine is the only component that knows about:
//! - How entry kinds map to inserts and updates
//! - When the in-memory counter and the persisted props diverge

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod journal;
pub mod props;
pub mod provider;
pub mod roles;

pub use config::{JournalConfig, CONFIG_FILE_NAME};
pub use journal::{Journal, JournalSettings};
pub use props::JournalProps;
pub use provider::{
    owns_connection, ExistenceCheck, JournalProvider, ProviderId, ProviderSettings, PROVIDER_NAME,
};
pub use roles::{JournalReader, JournalWriter};
