//! Relational store contract
//!
//! The engine never speaks SQL. It issues logical operations (create a schema
//! object, load props, insert/update rows inside a transaction, range scan)
//! against a [`RelationalStore`], and relies on the store for the atomicity
//! of a single transaction.
//!
//! Thread safety: all methods must be safe to call concurrently from
//! multiple threads (requires Send + Sync).

use crate::error::JournalResult;
use crate::row::{PropsRow, StoredRow};
use crate::tags::TagPredicate;
use crate::types::{EntryId, JournalId, LocationKind};
use std::fmt;

/// Column carrying a secondary index on the entries table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexedColumn {
    /// `JournalId`
    JournalId,
    /// `EntryId`
    EntryId,
    /// `Sequence`
    Sequence,
    /// `UtcTicks`
    UtcTicks,
    /// `Tags`
    Tags,
}

impl IndexedColumn {
    /// Every indexed column, in creation order
    pub const ALL: [IndexedColumn; 5] = [
        IndexedColumn::JournalId,
        IndexedColumn::EntryId,
        IndexedColumn::Sequence,
        IndexedColumn::UtcTicks,
        IndexedColumn::Tags,
    ];

    /// Column name in the persisted layout
    pub fn column_name(&self) -> &'static str {
        match self {
            IndexedColumn::JournalId => "JournalId",
            IndexedColumn::EntryId => "EntryId",
            IndexedColumn::Sequence => "Sequence",
            IndexedColumn::UtcTicks => "UtcTicks",
            IndexedColumn::Tags => "Tags",
        }
    }
}

/// A table or index making up a journal's schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaObject {
    /// `"<journal>-props"`
    PropsTable,
    /// `"<journal>"`
    EntriesTable,
    /// Secondary index on the entries table
    Index(IndexedColumn),
}

impl SchemaObject {
    /// Every object of a journal schema, in creation order
    pub fn all() -> Vec<SchemaObject> {
        let mut objects = vec![SchemaObject::PropsTable, SchemaObject::EntriesTable];
        objects.extend(IndexedColumn::ALL.iter().copied().map(SchemaObject::Index));
        objects
    }

    /// Physical name of the object for a journal
    pub fn name(&self, journal: &JournalId) -> String {
        match self {
            SchemaObject::PropsTable => journal.props_table_name(),
            SchemaObject::EntriesTable => journal.table_name().to_string(),
            SchemaObject::Index(column) => {
                format!("IX_{}_{}", journal.table_name(), column.column_name())
            }
        }
    }
}

/// Range scan over one ordering axis: `from < axis <= to`
///
/// When `any_tags` is non-empty a row must also satisfy at least one of the
/// predicates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeQuery {
    /// Ordering axis
    pub kind: LocationKind,
    /// Exclusive lower bound
    pub from: i64,
    /// Inclusive upper bound
    pub to: i64,
    /// Tag predicates combined with OR
    pub any_tags: Vec<TagPredicate>,
}

impl RangeQuery {
    /// Unfiltered range
    pub fn new(kind: LocationKind, from: i64, to: i64) -> Self {
        RangeQuery {
            kind,
            from,
            to,
            any_tags: Vec::new(),
        }
    }

    /// Restrict to rows carrying at least one of the tags
    pub fn with_tags(mut self, any_tags: Vec<TagPredicate>) -> Self {
        self.any_tags = any_tags;
        self
    }

    /// Evaluate the query against a row
    pub fn matches(&self, row: &StoredRow) -> bool {
        let value = row.axis_value(self.kind);
        if value <= self.from || value > self.to {
            return false;
        }
        self.any_tags.is_empty() || self.any_tags.iter().any(|p| p.matches(&row.tags))
    }
}

/// Relational storage backing one or more journals
pub trait RelationalStore: Send + Sync + fmt::Debug {
    /// Create one schema object for a journal
    ///
    /// # Errors
    ///
    /// Returns `JournalError::AlreadyExists` if the object is already present;
    /// any other error means the store could not create it.
    fn create_object(&self, journal: &JournalId, object: SchemaObject) -> JournalResult<()>;

    /// True if the journal's props row exists
    ///
    /// The props table is shared by every discriminator of a name, so its
    /// presence alone does not mean this journal was initialized.
    fn journal_exists(&self, journal: &JournalId) -> JournalResult<bool>;

    /// Load the props row
    ///
    /// Returns `None` if the table exists but holds no row for the journal.
    fn load_props(&self, journal: &JournalId) -> JournalResult<Option<PropsRow>>;

    /// Insert the props row for a newly created journal
    ///
    /// # Errors
    ///
    /// Returns `JournalError::WriteConflict` if a row already exists.
    fn insert_props(&self, journal: &JournalId, props: PropsRow) -> JournalResult<()>;

    /// Open a transaction scoped to one journal
    ///
    /// Dropping the transaction without committing rolls it back.
    fn begin(&self, journal: &JournalId) -> JournalResult<Box<dyn StoreTransaction + '_>>;

    /// Range scan, ordered by the query axis then row key
    fn scan(&self, journal: &JournalId, query: &RangeQuery) -> JournalResult<Vec<StoredRow>>;

    /// Point lookup by entry id
    ///
    /// When several rows share the id the one with the highest sequence wins.
    fn find_by_entry_id(
        &self,
        journal: &JournalId,
        entry_id: &EntryId,
    ) -> JournalResult<Option<StoredRow>>;
}

/// A store transaction covering one write batch
pub trait StoreTransaction {
    /// Insert rows
    ///
    /// # Errors
    ///
    /// Returns `JournalError::WriteConflict` if a primary key already exists,
    /// either in the store or earlier in the same transaction.
    fn insert(&mut self, rows: &[StoredRow]) -> JournalResult<()>;

    /// Replace existing rows, matched by primary key
    ///
    /// # Errors
    ///
    /// Returns `JournalError::WriteConflict` if a row does not exist.
    fn update(&mut self, rows: &[StoredRow]) -> JournalResult<()>;

    /// Persist props, never lowering the stored high-water mark
    fn save_props(&mut self, props: PropsRow) -> JournalResult<()>;

    /// Make every staged change durable atomically
    fn commit(self: Box<Self>) -> JournalResult<()>;

    /// Discard every staged change
    fn rollback(self: Box<Self>) -> JournalResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tags::TagCodec;

    fn row(sequence: i64, tags: &[&str]) -> StoredRow {
        StoredRow::appended(
            JournalId::new("j").unwrap(),
            EntryId::new(format!("e{}", sequence)),
            sequence,
            sequence * 10,
            vec![],
            vec![],
            TagCodec::default().encode(tags),
        )
    }

    #[test]
    fn test_schema_objects_in_order() {
        let objects = SchemaObject::all();
        assert_eq!(objects.len(), 7);
        assert_eq!(objects[0], SchemaObject::PropsTable);
        assert_eq!(objects[1], SchemaObject::EntriesTable);
    }

    #[test]
    fn test_schema_object_names() {
        let id = JournalId::new("Orders").unwrap();
        assert_eq!(SchemaObject::PropsTable.name(&id), "orders-props");
        assert_eq!(SchemaObject::EntriesTable.name(&id), "orders");
        assert_eq!(
            SchemaObject::Index(IndexedColumn::UtcTicks).name(&id),
            "IX_orders_UtcTicks"
        );
    }

    #[test]
    fn test_range_is_exclusive_lower_inclusive_upper() {
        let query = RangeQuery::new(LocationKind::Sequence, 4, 6);
        assert!(!query.matches(&row(4, &[])));
        assert!(query.matches(&row(5, &[])));
        assert!(query.matches(&row(6, &[])));
        assert!(!query.matches(&row(7, &[])));
    }

    #[test]
    fn test_range_on_ticks_axis() {
        let query = RangeQuery::new(LocationKind::UtcTicks, 40, 60);
        assert!(query.matches(&row(5, &[])));
        assert!(!query.matches(&row(4, &[])));
    }

    #[test]
    fn test_tags_are_ored() {
        let codec = TagCodec::default();
        let query =
            RangeQuery::new(LocationKind::Sequence, 0, 10).with_tags(codec.any_of(&["odd", "even"]));
        assert!(query.matches(&row(1, &["odd"])));
        assert!(query.matches(&row(2, &["even"])));
        assert!(!query.matches(&row(3, &["prime"])));
        assert!(!query.matches(&row(4, &[])));
    }
}
