//! Relational store backends for journaldb
//!
//! This crate implements the `RelationalStore` contract from `journal-core`:
//! - MemoryStore: per-table-name BTreeMap partitions behind `parking_lot::RwLock`
//! - SqliteStore: SQLite via rusqlite (feature `sqlite`, on by default)
//! - testing::FaultyStore: fault injection over any store
//!
//! # Choosing a backend
//!
//! `MemoryStore` keeps nothing across restarts and suits tests and
//! ephemeral journals. `SqliteStore` persists to a file and is the durable
//! backend.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod testing;

pub use memory::MemoryStore;
#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteStore, DEFAULT_BUSY_TIMEOUT};
