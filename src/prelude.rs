//! Common imports
//!
//! ```ignore
//! use journaldb::prelude::*;
//! ```

pub use std::sync::Arc;

pub use crate::{
    CancellationToken, Entry, EntryId, JournalConfig, JournalEntry, JournalError, JournalId,
    JournalProvider, JournalReader, JournalResult, JournalTrait, JournalWriter, LocationKind,
    MemoryStore, ProviderSettings, TriState,
};
#[cfg(feature = "sqlite")]
pub use crate::SqliteStore;
