//! MemoryStore: in-process relational store
//!
//! Implements [`RelationalStore`] with one table set per table name. A table
//! set holds what a relational store would keep in the entries table, the
//! props table and their indexes:
//! - rows partitioned by the full `JournalId`, each partition a
//!   `BTreeMap<row_key, StoredRow>`
//! - props rows keyed by the full `JournalId`
//! - the set of schema objects created so far
//!
//! Discriminated journals (`orders.eu`, `orders.us`) map to the same table
//! set and stay apart through their partitions, as they would through the
//! `JournalId` column of a relational table.
//!
//! # Design Notes
//!
//! - **Per-table locking**: each table set sits behind its own
//!   `parking_lot::RwLock`; the DashMap only maps table names to table sets,
//!   so unrelated journals never contend with each other.
//! - **Staged transactions**: a transaction buffers inserts, updates and
//!   props, then validates and applies all of them under one write lock at
//!   commit. Readers observe either none or all of a batch.
//! - **Missing tables are errors**: operations against a journal whose tables
//!   were never created fail with `JournalError::Storage`, as a relational
//!   store would.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::debug;

use journal_core::{
    EntryId, JournalError, JournalId, JournalResult, PropsRow, RangeQuery, RelationalStore,
    SchemaObject, StoreTransaction, StoredRow,
};

/// Tables sharing one table name
#[derive(Debug, Default)]
struct TableSet {
    objects: HashSet<SchemaObject>,
    props: HashMap<JournalId, PropsRow>,
    partitions: HashMap<JournalId, BTreeMap<String, StoredRow>>,
}

impl TableSet {
    fn require(&self, journal: &JournalId, object: SchemaObject) -> JournalResult<()> {
        if self.objects.contains(&object) {
            Ok(())
        } else {
            Err(JournalError::storage(format!(
                "no such table: {}",
                object.name(journal)
            )))
        }
    }

    fn has_row(&self, journal: &JournalId, row_key: &str) -> bool {
        self.partitions
            .get(journal)
            .map(|rows| rows.contains_key(row_key))
            .unwrap_or(false)
    }

    fn rows<'a>(&'a self, journal: &JournalId) -> impl Iterator<Item = &'a StoredRow> + 'a {
        self.partitions
            .get(journal)
            .into_iter()
            .flat_map(|rows| rows.values())
    }
}

/// In-memory relational store
///
/// Thread-safe; cheap to share behind an `Arc`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: DashMap<String, Arc<RwLock<TableSet>>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entry rows stored for a journal
    pub fn row_count(&self, journal: &JournalId) -> usize {
        self.table_set(journal)
            .map(|tables| tables.read().rows(journal).count())
            .unwrap_or(0)
    }

    /// Number of distinct table names with at least one schema object
    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    fn table_set(&self, journal: &JournalId) -> Option<Arc<RwLock<TableSet>>> {
        // Clone the Arc so the shard guard is released before locking the tables
        self.tables
            .get(journal.table_name())
            .map(|entry| Arc::clone(entry.value()))
    }

    fn existing_table_set(&self, journal: &JournalId) -> JournalResult<Arc<RwLock<TableSet>>> {
        self.table_set(journal).ok_or_else(|| {
            JournalError::storage(format!("no such table: {}", journal.props_table_name()))
        })
    }
}

impl RelationalStore for MemoryStore {
    fn create_object(&self, journal: &JournalId, object: SchemaObject) -> JournalResult<()> {
        let tables = Arc::clone(
            self.tables
                .entry(journal.table_name().to_string())
                .or_insert_with(Default::default)
                .value(),
        );
        let mut tables = tables.write();

        if let SchemaObject::Index(_) = object {
            tables.require(journal, SchemaObject::EntriesTable)?;
        }
        if !tables.objects.insert(object) {
            return Err(JournalError::already_exists(object.name(journal)));
        }

        debug!(target: "journal::store", journal = %journal, object = %object.name(journal), "Created schema object");
        Ok(())
    }

    fn journal_exists(&self, journal: &JournalId) -> JournalResult<bool> {
        Ok(self
            .table_set(journal)
            .map(|tables| tables.read().props.contains_key(journal))
            .unwrap_or(false))
    }

    fn load_props(&self, journal: &JournalId) -> JournalResult<Option<PropsRow>> {
        let tables = self.existing_table_set(journal)?;
        let tables = tables.read();
        tables.require(journal, SchemaObject::PropsTable)?;
        Ok(tables.props.get(journal).copied())
    }

    fn insert_props(&self, journal: &JournalId, props: PropsRow) -> JournalResult<()> {
        let tables = self.existing_table_set(journal)?;
        let mut tables = tables.write();
        tables.require(journal, SchemaObject::PropsTable)?;
        if tables.props.contains_key(journal) {
            return Err(JournalError::write_conflict(
                journal.as_str(),
                "props row already exists",
            ));
        }
        tables.props.insert(journal.clone(), props);
        Ok(())
    }

    fn begin(&self, journal: &JournalId) -> JournalResult<Box<dyn StoreTransaction + '_>> {
        let tables = self.existing_table_set(journal)?;
        {
            let guard = tables.read();
            guard.require(journal, SchemaObject::EntriesTable)?;
            guard.require(journal, SchemaObject::PropsTable)?;
        }
        Ok(Box::new(MemoryTransaction {
            journal: journal.clone(),
            tables,
            inserts: Vec::new(),
            staged_keys: HashSet::new(),
            updates: Vec::new(),
            props: None,
        }))
    }

    fn scan(&self, journal: &JournalId, query: &RangeQuery) -> JournalResult<Vec<StoredRow>> {
        let tables = self.existing_table_set(journal)?;
        let tables = tables.read();
        tables.require(journal, SchemaObject::EntriesTable)?;

        let mut rows: Vec<StoredRow> = tables
            .rows(journal)
            .filter(|row| query.matches(row))
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            a.axis_value(query.kind)
                .cmp(&b.axis_value(query.kind))
                .then_with(|| a.row_key.cmp(&b.row_key))
        });
        Ok(rows)
    }

    fn find_by_entry_id(
        &self,
        journal: &JournalId,
        entry_id: &EntryId,
    ) -> JournalResult<Option<StoredRow>> {
        let tables = self.existing_table_set(journal)?;
        let tables = tables.read();
        tables.require(journal, SchemaObject::EntriesTable)?;

        Ok(tables
            .rows(journal)
            .filter(|row| &row.entry_id == entry_id)
            .max_by(|a, b| {
                a.sequence
                    .cmp(&b.sequence)
                    .then_with(|| a.row_key.cmp(&b.row_key))
            })
            .cloned())
    }
}

/// Staged transaction over one journal's partition
struct MemoryTransaction {
    journal: JournalId,
    tables: Arc<RwLock<TableSet>>,
    inserts: Vec<StoredRow>,
    staged_keys: HashSet<String>,
    updates: Vec<StoredRow>,
    props: Option<PropsRow>,
}

impl MemoryTransaction {
    fn duplicate_key(&self, row_key: &str) -> JournalError {
        JournalError::write_conflict(
            self.journal.as_str(),
            format!("duplicate primary key ({}, {})", self.journal, row_key),
        )
    }

    fn missing_row(&self, row_key: &str) -> JournalError {
        JournalError::write_conflict(
            self.journal.as_str(),
            format!("row ({}, {}) does not exist", self.journal, row_key),
        )
    }
}

impl StoreTransaction for MemoryTransaction {
    fn insert(&mut self, rows: &[StoredRow]) -> JournalResult<()> {
        let tables = self.tables.read();
        for row in rows {
            if tables.has_row(&self.journal, &row.row_key) || self.staged_keys.contains(&row.row_key)
            {
                return Err(self.duplicate_key(&row.row_key));
            }
            self.staged_keys.insert(row.row_key.clone());
            self.inserts.push(row.clone());
        }
        Ok(())
    }

    fn update(&mut self, rows: &[StoredRow]) -> JournalResult<()> {
        let tables = self.tables.read();
        for row in rows {
            if !tables.has_row(&self.journal, &row.row_key)
                && !self.staged_keys.contains(&row.row_key)
            {
                return Err(self.missing_row(&row.row_key));
            }
            self.updates.push(row.clone());
        }
        Ok(())
    }

    fn save_props(&mut self, props: PropsRow) -> JournalResult<()> {
        self.props = Some(match self.props {
            Some(staged) if staged.highest_sequence_number > props.highest_sequence_number => {
                staged
            }
            _ => props,
        });
        Ok(())
    }

    fn commit(self: Box<Self>) -> JournalResult<()> {
        let tables = Arc::clone(&self.tables);
        let mut tables = tables.write();

        // Another transaction may have committed since staging
        for row in &self.inserts {
            if tables.has_row(&self.journal, &row.row_key) {
                return Err(self.duplicate_key(&row.row_key));
            }
        }
        for row in &self.updates {
            if !tables.has_row(&self.journal, &row.row_key)
                && !self.staged_keys.contains(&row.row_key)
            {
                return Err(self.missing_row(&row.row_key));
            }
        }

        let MemoryTransaction {
            journal,
            inserts,
            updates,
            props,
            ..
        } = *self;
        let partition = tables.partitions.entry(journal.clone()).or_default();
        for row in inserts.into_iter().chain(updates) {
            partition.insert(row.row_key.clone(), row);
        }
        if let Some(props) = props {
            let merged = match tables.props.get(&journal) {
                Some(stored) => PropsRow {
                    highest_sequence_number: stored
                        .highest_sequence_number
                        .max(props.highest_sequence_number),
                    initial_utc_ticks: stored.initial_utc_ticks,
                },
                None => props,
            };
            tables.props.insert(journal, merged);
        }
        Ok(())
    }

    fn rollback(self: Box<Self>) -> JournalResult<()> {
        Ok(())
    }
}
