//! Testing utilities for code built on a relational store
//!
//! - **FaultyStore**: wraps any store and fails chosen operations on demand,
//!   while counting calls per operation
//!
//! # Example
//!
//! ```ignore
//! use journal_storage::testing::{FaultPoint, FaultyStore};
//! use journal_storage::MemoryStore;
//!
//! let store = FaultyStore::new(Arc::new(MemoryStore::new()));
//! store.fail_next(FaultPoint::CreateObject, 3);
//! // the first three schema operations now fail with JournalError::Storage
//! ```

mod faulty;

pub use faulty::{FaultPoint, FaultyStore};
