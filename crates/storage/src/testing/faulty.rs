//! Fault injection wrapper for any relational store
//!
//! `FaultyStore` forwards every call to an inner store, failing the next `n`
//! calls at a chosen [`FaultPoint`] with `JournalError::Storage`. It also
//! counts calls per point, which lets tests assert how often a journal
//! touched the store (for example that initialization ran once).

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use journal_core::{
    EntryId, JournalError, JournalId, JournalResult, PropsRow, RangeQuery, RelationalStore,
    SchemaObject, StoreTransaction, StoredRow,
};

/// Store operations that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultPoint {
    /// `RelationalStore::create_object`
    CreateObject,
    /// `RelationalStore::journal_exists`
    JournalExists,
    /// `RelationalStore::load_props`
    LoadProps,
    /// `RelationalStore::insert_props`
    InsertProps,
    /// `RelationalStore::begin`
    Begin,
    /// `StoreTransaction::insert`
    Insert,
    /// `StoreTransaction::update`
    Update,
    /// `StoreTransaction::save_props`
    SaveProps,
    /// `StoreTransaction::commit`
    Commit,
    /// `StoreTransaction::rollback`
    Rollback,
    /// `RelationalStore::scan`
    Scan,
    /// `RelationalStore::find_by_entry_id`
    FindByEntryId,
}

#[derive(Debug, Default)]
struct FaultPlan {
    pending: HashMap<FaultPoint, u32>,
    calls: HashMap<FaultPoint, u64>,
}

impl FaultPlan {
    fn hit(&mut self, point: FaultPoint) -> JournalResult<()> {
        *self.calls.entry(point).or_insert(0) += 1;
        match self.pending.get_mut(&point) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                Err(JournalError::storage(format!("injected fault at {:?}", point)))
            }
            _ => Ok(()),
        }
    }
}

/// Store wrapper with injectable failures
pub struct FaultyStore {
    inner: Arc<dyn RelationalStore>,
    plan: Arc<Mutex<FaultPlan>>,
}

impl fmt::Debug for FaultyStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FaultyStore")
            .field("inner", &self.inner)
            .finish()
    }
}

impl FaultyStore {
    /// Wrap a store with no faults armed
    pub fn new(inner: Arc<dyn RelationalStore>) -> Self {
        FaultyStore {
            inner,
            plan: Arc::new(Mutex::new(FaultPlan::default())),
        }
    }

    /// Fail the next `times` calls at `point`
    pub fn fail_next(&self, point: FaultPoint, times: u32) {
        let mut plan = self.plan.lock();
        let remaining = plan.pending.entry(point).or_insert(0);
        *remaining = remaining.saturating_add(times);
    }

    /// Fail every call at `point` until cleared
    pub fn fail_always(&self, point: FaultPoint) {
        self.plan.lock().pending.insert(point, u32::MAX);
    }

    /// Disarm all faults
    pub fn clear(&self) {
        self.plan.lock().pending.clear();
    }

    /// Calls observed at `point`, failed ones included
    pub fn calls(&self, point: FaultPoint) -> u64 {
        self.plan.lock().calls.get(&point).copied().unwrap_or(0)
    }

    fn hit(&self, point: FaultPoint) -> JournalResult<()> {
        self.plan.lock().hit(point)
    }
}

impl RelationalStore for FaultyStore {
    fn create_object(&self, journal: &JournalId, object: SchemaObject) -> JournalResult<()> {
        self.hit(FaultPoint::CreateObject)?;
        self.inner.create_object(journal, object)
    }

    fn journal_exists(&self, journal: &JournalId) -> JournalResult<bool> {
        self.hit(FaultPoint::JournalExists)?;
        self.inner.journal_exists(journal)
    }

    fn load_props(&self, journal: &JournalId) -> JournalResult<Option<PropsRow>> {
        self.hit(FaultPoint::LoadProps)?;
        self.inner.load_props(journal)
    }

    fn insert_props(&self, journal: &JournalId, props: PropsRow) -> JournalResult<()> {
        self.hit(FaultPoint::InsertProps)?;
        self.inner.insert_props(journal, props)
    }

    fn begin(&self, journal: &JournalId) -> JournalResult<Box<dyn StoreTransaction + '_>> {
        self.hit(FaultPoint::Begin)?;
        let inner = self.inner.begin(journal)?;
        Ok(Box::new(FaultyTransaction {
            inner,
            plan: Arc::clone(&self.plan),
        }))
    }

    fn scan(&self, journal: &JournalId, query: &RangeQuery) -> JournalResult<Vec<StoredRow>> {
        self.hit(FaultPoint::Scan)?;
        self.inner.scan(journal, query)
    }

    fn find_by_entry_id(
        &self,
        journal: &JournalId,
        entry_id: &EntryId,
    ) -> JournalResult<Option<StoredRow>> {
        self.hit(FaultPoint::FindByEntryId)?;
        self.inner.find_by_entry_id(journal, entry_id)
    }
}

struct FaultyTransaction<'a> {
    inner: Box<dyn StoreTransaction + 'a>,
    plan: Arc<Mutex<FaultPlan>>,
}

impl FaultyTransaction<'_> {
    fn hit(&self, point: FaultPoint) -> JournalResult<()> {
        self.plan.lock().hit(point)
    }
}

impl StoreTransaction for FaultyTransaction<'_> {
    fn insert(&mut self, rows: &[StoredRow]) -> JournalResult<()> {
        self.hit(FaultPoint::Insert)?;
        self.inner.insert(rows)
    }

    fn update(&mut self, rows: &[StoredRow]) -> JournalResult<()> {
        self.hit(FaultPoint::Update)?;
        self.inner.update(rows)
    }

    fn save_props(&mut self, props: PropsRow) -> JournalResult<()> {
        self.hit(FaultPoint::SaveProps)?;
        self.inner.save_props(props)
    }

    fn commit(self: Box<Self>) -> JournalResult<()> {
        let this = *self;
        if let Err(err) = this.hit(FaultPoint::Commit) {
            this.inner.rollback()?;
            return Err(err);
        }
        this.inner.commit()
    }

    fn rollback(self: Box<Self>) -> JournalResult<()> {
        let this = *self;
        let injected = this.hit(FaultPoint::Rollback);
        this.inner.rollback()?;
        injected
    }
}
