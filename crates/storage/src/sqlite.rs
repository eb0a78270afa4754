//! SqliteStore: relational store backed by SQLite
//!
//! One database file holds every journal. Each journal name gets an entries
//! table, a `"<name>-props"` table and five secondary indexes. Discriminators
//! of one name share those tables and are told apart by the `JournalId`
//! column. Identifiers are always double-quoted; `JournalId` rejects `"` so
//! table names cannot escape their quotes.
//!
//! A single connection is shared behind a mutex. A transaction holds the
//! mutex guard from `BEGIN IMMEDIATE` until commit or rollback, so batches
//! from different threads serialize instead of failing with `SQLITE_BUSY`.

use std::path::Path;
use std::time::Duration;

use parking_lot::{Mutex, MutexGuard};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, ErrorCode, OptionalExtension, Row};
use tracing::{debug, warn};

use journal_core::{
    EntryId, IndexedColumn, JournalError, JournalId, JournalResult, LocationKind, PropsRow,
    RangeQuery, RelationalStore, SchemaObject, StoreTransaction, StoredRow,
};

/// Busy timeout applied when none is given
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(3000);

const ROW_COLUMNS: &str =
    r#""RowKey", "EntryId", "Sequence", "UtcTicks", "Meta", "Payload", "Tags""#;

/// SQLite-backed relational store
pub struct SqliteStore {
    conn: Mutex<Connection>,
    location: String,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("location", &self.location)
            .finish()
    }
}

impl SqliteStore {
    /// Open (or create) a database file
    pub fn open(path: impl AsRef<Path>, busy_timeout: Duration) -> JournalResult<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(storage_error)?;
        Self::with_connection(conn, path.display().to_string(), busy_timeout)
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> JournalResult<Self> {
        let conn = Connection::open_in_memory().map_err(storage_error)?;
        Self::with_connection(conn, ":memory:".to_string(), DEFAULT_BUSY_TIMEOUT)
    }

    fn with_connection(
        conn: Connection,
        location: String,
        busy_timeout: Duration,
    ) -> JournalResult<Self> {
        conn.busy_timeout(busy_timeout).map_err(storage_error)?;
        debug!(target: "journal::store", location = %location, busy_timeout_ms = busy_timeout.as_millis() as u64, "Opened SQLite store");
        Ok(SqliteStore {
            conn: Mutex::new(conn),
            location,
        })
    }

    /// Database location (file path or `:memory:`)
    pub fn location(&self) -> &str {
        &self.location
    }
}

/// Quote an identifier
fn quoted(name: &str) -> String {
    format!("\"{}\"", name)
}

fn storage_error(err: rusqlite::Error) -> JournalError {
    JournalError::storage(err.to_string())
}

/// Map a driver error raised while writing a journal's rows
fn write_error(journal: &JournalId, err: rusqlite::Error) -> JournalError {
    match err {
        rusqlite::Error::SqliteFailure(ref failure, _)
            if failure.code == ErrorCode::ConstraintViolation =>
        {
            JournalError::write_conflict(journal.as_str(), err.to_string())
        }
        other => storage_error(other),
    }
}

fn create_statement(journal: &JournalId, object: SchemaObject) -> String {
    let name = quoted(&object.name(journal));
    match object {
        SchemaObject::PropsTable => format!(
            r#"CREATE TABLE {} (
                "JournalId" TEXT NOT NULL PRIMARY KEY,
                "HighestSequenceNumber" INTEGER NOT NULL,
                "InitialUtcTicks" INTEGER NOT NULL
            )"#,
            name
        ),
        SchemaObject::EntriesTable => format!(
            r#"CREATE TABLE {} (
                "JournalId" TEXT NOT NULL,
                "RowKey" TEXT NOT NULL,
                "EntryId" TEXT NOT NULL,
                "Sequence" INTEGER NOT NULL,
                "UtcTicks" INTEGER NOT NULL,
                "Meta" BLOB NOT NULL,
                "Payload" BLOB NOT NULL,
                "Tags" TEXT NOT NULL,
                PRIMARY KEY ("JournalId", "RowKey")
            )"#,
            name
        ),
        SchemaObject::Index(column) => format!(
            "CREATE INDEX {} ON {} ({})",
            name,
            quoted(journal.table_name()),
            quoted(column.column_name())
        ),
    }
}

fn axis_column(kind: LocationKind) -> &'static str {
    match kind {
        LocationKind::Sequence => IndexedColumn::Sequence.column_name(),
        LocationKind::UtcTicks => IndexedColumn::UtcTicks.column_name(),
    }
}

fn read_row(journal: &JournalId, row: &Row<'_>) -> rusqlite::Result<StoredRow> {
    let entry_id: String = row.get(1)?;
    Ok(StoredRow {
        journal_id: journal.clone(),
        row_key: row.get(0)?,
        entry_id: EntryId::new(entry_id),
        sequence: row.get(2)?,
        utc_ticks: row.get(3)?,
        meta: row.get(4)?,
        payload: row.get(5)?,
        tags: row.get(6)?,
    })
}

impl RelationalStore for SqliteStore {
    fn create_object(&self, journal: &JournalId, object: SchemaObject) -> JournalResult<()> {
        let sql = create_statement(journal, object);
        let conn = self.conn.lock();
        match conn.execute_batch(&sql) {
            Ok(()) => {
                debug!(target: "journal::store", journal = %journal, object = %object.name(journal), "Created schema object");
                Ok(())
            }
            Err(err) if err.to_string().contains("already exists") => {
                Err(JournalError::already_exists(object.name(journal)))
            }
            Err(err) => Err(storage_error(err)),
        }
    }

    fn journal_exists(&self, journal: &JournalId) -> JournalResult<bool> {
        let props_table = journal.props_table_name();
        let conn = self.conn.lock();
        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                params![props_table],
                |row| row.get(0),
            )
            .map_err(storage_error)?;
        if tables == 0 {
            return Ok(false);
        }

        // The props table is shared by every discriminator of the name
        let sql = format!(
            r#"SELECT COUNT(*) FROM {} WHERE "JournalId" = ?1"#,
            quoted(&props_table)
        );
        let rows: i64 = conn
            .query_row(&sql, params![journal.as_str()], |row| row.get(0))
            .map_err(storage_error)?;
        Ok(rows > 0)
    }

    fn load_props(&self, journal: &JournalId) -> JournalResult<Option<PropsRow>> {
        let sql = format!(
            r#"SELECT "HighestSequenceNumber", "InitialUtcTicks" FROM {} WHERE "JournalId" = ?1"#,
            quoted(&journal.props_table_name())
        );
        let conn = self.conn.lock();
        conn.query_row(&sql, params![journal.as_str()], |row| {
            Ok(PropsRow {
                highest_sequence_number: row.get(0)?,
                initial_utc_ticks: row.get(1)?,
            })
        })
        .optional()
        .map_err(storage_error)
    }

    fn insert_props(&self, journal: &JournalId, props: PropsRow) -> JournalResult<()> {
        let sql = format!(
            r#"INSERT INTO {} ("JournalId", "HighestSequenceNumber", "InitialUtcTicks") VALUES (?1, ?2, ?3)"#,
            quoted(&journal.props_table_name())
        );
        let conn = self.conn.lock();
        conn.execute(
            &sql,
            params![
                journal.as_str(),
                props.highest_sequence_number,
                props.initial_utc_ticks
            ],
        )
        .map_err(|err| write_error(journal, err))?;
        Ok(())
    }

    fn begin(&self, journal: &JournalId) -> JournalResult<Box<dyn StoreTransaction + '_>> {
        let conn = self.conn.lock();
        conn.execute_batch("BEGIN IMMEDIATE")
            .map_err(storage_error)?;
        Ok(Box::new(SqliteTransaction {
            conn,
            journal: journal.clone(),
            finished: false,
        }))
    }

    fn scan(&self, journal: &JournalId, query: &RangeQuery) -> JournalResult<Vec<StoredRow>> {
        let axis = quoted(axis_column(query.kind));
        let mut sql = format!(
            r#"SELECT {} FROM {} WHERE "JournalId" = ?1 AND {} > ?2 AND {} <= ?3"#,
            ROW_COLUMNS,
            quoted(journal.table_name()),
            axis,
            axis
        );
        let mut values = vec![
            Value::Text(journal.as_str().to_string()),
            Value::Integer(query.from),
            Value::Integer(query.to),
        ];
        if !query.any_tags.is_empty() {
            let clauses: Vec<String> = query
                .any_tags
                .iter()
                .map(|predicate| {
                    values.push(Value::Text(predicate.needle().to_string()));
                    format!(r#"instr("Tags", ?{}) > 0"#, values.len())
                })
                .collect();
            sql.push_str(&format!(" AND ({})", clauses.join(" OR ")));
        }
        sql.push_str(&format!(r#" ORDER BY {}, "RowKey""#, axis));

        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&sql).map_err(storage_error)?;
        let rows = stmt
            .query_map(params_from_iter(values.iter()), |row| read_row(journal, row))
            .map_err(storage_error)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(storage_error)?;
        Ok(rows)
    }

    fn find_by_entry_id(
        &self,
        journal: &JournalId,
        entry_id: &EntryId,
    ) -> JournalResult<Option<StoredRow>> {
        let sql = format!(
            r#"SELECT {} FROM {} WHERE "JournalId" = ?1 AND "EntryId" = ?2 ORDER BY "Sequence" DESC, "RowKey" DESC LIMIT 1"#,
            ROW_COLUMNS,
            quoted(journal.table_name())
        );
        let conn = self.conn.lock();
        conn.query_row(&sql, params![journal.as_str(), entry_id.as_str()], |row| {
            read_row(journal, row)
        })
        .optional()
        .map_err(storage_error)
    }
}

/// Transaction holding the connection until it finishes
struct SqliteTransaction<'a> {
    conn: MutexGuard<'a, Connection>,
    journal: JournalId,
    finished: bool,
}

impl SqliteTransaction<'_> {
    fn finish(&mut self, statement: &str) -> JournalResult<()> {
        // A failed COMMIT leaves the transaction open; Drop rolls it back
        self.conn.execute_batch(statement).map_err(storage_error)?;
        self.finished = true;
        Ok(())
    }
}

impl StoreTransaction for SqliteTransaction<'_> {
    fn insert(&mut self, rows: &[StoredRow]) -> JournalResult<()> {
        let sql = format!(
            r#"INSERT INTO {} ("JournalId", {}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"#,
            quoted(self.journal.table_name()),
            ROW_COLUMNS
        );
        let mut stmt = self.conn.prepare_cached(&sql).map_err(storage_error)?;
        for row in rows {
            stmt.execute(params![
                self.journal.as_str(),
                row.row_key,
                row.entry_id.as_str(),
                row.sequence,
                row.utc_ticks,
                row.meta,
                row.payload,
                row.tags,
            ])
            .map_err(|err| write_error(&self.journal, err))?;
        }
        Ok(())
    }

    fn update(&mut self, rows: &[StoredRow]) -> JournalResult<()> {
        let sql = format!(
            r#"UPDATE {} SET "EntryId" = ?3, "Sequence" = ?4, "UtcTicks" = ?5, "Meta" = ?6, "Payload" = ?7, "Tags" = ?8
               WHERE "JournalId" = ?1 AND "RowKey" = ?2"#,
            quoted(self.journal.table_name())
        );
        let mut stmt = self.conn.prepare_cached(&sql).map_err(storage_error)?;
        for row in rows {
            let changed = stmt
                .execute(params![
                    self.journal.as_str(),
                    row.row_key,
                    row.entry_id.as_str(),
                    row.sequence,
                    row.utc_ticks,
                    row.meta,
                    row.payload,
                    row.tags,
                ])
                .map_err(|err| write_error(&self.journal, err))?;
            if changed == 0 {
                return Err(JournalError::write_conflict(
                    self.journal.as_str(),
                    format!("row ({}, {}) does not exist", self.journal, row.row_key),
                ));
            }
        }
        Ok(())
    }

    fn save_props(&mut self, props: PropsRow) -> JournalResult<()> {
        let sql = format!(
            r#"INSERT INTO {} ("JournalId", "HighestSequenceNumber", "InitialUtcTicks") VALUES (?1, ?2, ?3)
               ON CONFLICT("JournalId") DO UPDATE SET
               "HighestSequenceNumber" = MAX("HighestSequenceNumber", excluded."HighestSequenceNumber")"#,
            quoted(&self.journal.props_table_name())
        );
        self.conn
            .execute(
                &sql,
                params![
                    self.journal.as_str(),
                    props.highest_sequence_number,
                    props.initial_utc_ticks
                ],
            )
            .map_err(|err| write_error(&self.journal, err))?;
        Ok(())
    }

    fn commit(mut self: Box<Self>) -> JournalResult<()> {
        self.finish("COMMIT")
    }

    fn rollback(mut self: Box<Self>) -> JournalResult<()> {
        self.finish("ROLLBACK")
    }
}

impl Drop for SqliteTransaction<'_> {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(err) = self.conn.execute_batch("ROLLBACK") {
                warn!(target: "journal::store", journal = %self.journal, error = %err, "Rollback on drop failed");
            }
        }
    }
}
