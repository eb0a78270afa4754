//! Core types and traits for journaldb
//!
//! This crate defines the foundational types used throughout the system:
//! - JournalId / EntryId: journal and entry identity
//! - Entry / EntryKind / JournalEntry: write input and persisted output
//! - TagCodec: delimiter-framed tag column and containment predicates
//! - StoredRow / PropsRow: persisted row layout and row keys
//! - JournalTraits / TriState: capability negotiation
//! - Clock: tick time source (system and manual)
//! - CancellationToken: cooperative cancellation
//! - Error: error type hierarchy
//! - Traits: the RelationalStore contract implemented by storage backends

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cancel;
pub mod clock;
pub mod entry;
pub mod error;
pub mod journal_traits;
pub mod limits;
pub mod row;
pub mod tags;
pub mod traits;
pub mod types;

pub use cancel::CancellationToken;
pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::{Entry, EntryKind, JournalEntry, CONSISTENT_SEQUENCE};
pub use error::{JournalError, JournalResult};
pub use journal_traits::{JournalTrait, JournalTraits, TraitKind, TriState};
pub use row::{PropsRow, StoredRow};
pub use tags::{TagCodec, TagPredicate, DEFAULT_TAG_DELIMITER};
pub use traits::{IndexedColumn, RangeQuery, RelationalStore, SchemaObject, StoreTransaction};
pub use types::{EntryId, JournalId, JournalIdError, LocationKind};
