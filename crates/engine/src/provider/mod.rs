//! Journal provider
//!
//! A [`JournalProvider`] hands out one [`Journal`] per [`JournalId`], built
//! lazily on first request and shared afterwards. Requests carry the traits
//! the caller needs; a request the provider cannot satisfy gets `None`
//! without any journal being constructed.
//!
//! # Caching
//!
//! The cache maps each id to a once-cell. The first caller for an id runs
//! initialization inside the cell while concurrent callers for the same id
//! block on it and then share the result. Callers for other ids are not
//! blocked. If initialization fails the cell stays empty and the next
//! request tries again.

pub mod connection;
pub mod settings;

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::OnceCell;
use tracing::{debug, info};

use journal_core::{
    CancellationToken, Clock, JournalId, JournalResult, JournalTrait, JournalTraits,
    RelationalStore, SystemClock,
};

use crate::journal::Journal;
use crate::roles::{JournalReader, JournalWriter};

pub use connection::{owns_connection, PROVIDER_NAME};
pub use settings::{default_traits, ExistenceCheck, ProviderSettings};

/// Identity of a provider instance, taken from its settings name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProviderId(String);

impl ProviderId {
    /// Create a provider id
    pub fn new(name: impl Into<String>) -> Self {
        ProviderId(name.into())
    }

    /// Get as string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

type JournalCell = Arc<OnceCell<Arc<Journal>>>;

/// Creates and caches journals over one relational store
pub struct JournalProvider {
    id: ProviderId,
    settings: ProviderSettings,
    store: Arc<dyn RelationalStore>,
    clock: Arc<dyn Clock>,
    journals: DashMap<JournalId, JournalCell>,
}

impl fmt::Debug for JournalProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JournalProvider")
            .field("id", &self.id)
            .field("store", &self.store)
            .field("cached", &self.journals.len())
            .finish()
    }
}

impl JournalProvider {
    /// Create a provider over a store, using the system clock
    pub fn new(settings: ProviderSettings, store: Arc<dyn RelationalStore>) -> Self {
        Self::with_clock(settings, store, Arc::new(SystemClock))
    }

    /// Create a provider with an explicit clock
    pub fn with_clock(
        settings: ProviderSettings,
        store: Arc<dyn RelationalStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let id = ProviderId::new(settings.name.clone());
        info!(target: "journal::provider", provider = %id, traits = settings.traits.len(), "Provider created");
        JournalProvider {
            id,
            settings,
            store,
            clock,
            journals: DashMap::new(),
        }
    }

    /// Create a provider that opens its own SQLite store
    ///
    /// The location comes from the settings' connection string and the
    /// connection timeout becomes the SQLite busy timeout.
    #[cfg(feature = "sqlite")]
    pub fn with_sqlite(settings: ProviderSettings) -> JournalResult<Self> {
        use journal_storage::SqliteStore;

        let location = connection::sqlite_location(&settings.connection_string);
        let store = if location.is_empty() || location == ":memory:" {
            SqliteStore::open_in_memory()?
        } else {
            SqliteStore::open(&location, settings.connection_timeout)?
        };
        Ok(Self::new(settings, Arc::new(store)))
    }

    /// Provider identity
    pub fn id(&self) -> &ProviderId {
        &self.id
    }

    /// Provider settings
    pub fn settings(&self) -> &ProviderSettings {
        &self.settings
    }

    /// Declared traits
    pub fn traits(&self) -> &JournalTraits {
        &self.settings.traits
    }

    /// Check requested traits against the declared ones
    pub fn has_traits(&self, requested: &[JournalTrait]) -> bool {
        self.settings.traits.has_traits(requested)
    }

    /// Store connection string prefixed with the routing token
    pub fn connection_string(&self) -> String {
        connection::with_routing_token(&self.settings.connection_string)
    }

    /// True if `connection_string` routes to this kind of provider
    pub fn owns_connection(&self, connection_string: &str) -> bool {
        owns_connection(connection_string)
    }

    /// Ids of journals constructed so far
    pub fn cached_journals(&self) -> Vec<JournalId> {
        let mut ids: Vec<JournalId> = self
            .journals
            .iter()
            .filter(|entry| entry.value().get().is_some())
            .map(|entry| entry.key().clone())
            .collect();
        ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        ids
    }

    /// Get the journal for `id`, constructing it on first use
    ///
    /// Returns `Ok(None)` when the provider cannot satisfy `required`; in
    /// that case nothing is constructed.
    ///
    /// # Errors
    ///
    /// Construction errors (`InitializationFailed`, `Cancelled`) are returned
    /// to every caller waiting on this id; the next call retries.
    pub fn try_get_or_create(
        &self,
        id: &JournalId,
        required: &[JournalTrait],
        cancel: &CancellationToken,
    ) -> JournalResult<Option<Arc<Journal>>> {
        if !self.has_traits(required) {
            debug!(target: "journal::provider", provider = %self.id, journal = %id, "Requested traits not satisfied");
            return Ok(None);
        }

        // Clone the cell so the map shard is not locked during construction
        let cell: JournalCell = Arc::clone(
            self.journals
                .entry(id.clone())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .value(),
        );

        if let Some(journal) = cell.get() {
            debug!(target: "journal::provider", provider = %self.id, journal = %id, "Returning cached journal");
            return Ok(Some(Arc::clone(journal)));
        }

        let journal = cell.get_or_try_init(|| {
            info!(target: "journal::provider", provider = %self.id, journal = %id, "Constructing journal");
            Journal::open(
                id.clone(),
                self.settings.journal.clone(),
                Arc::clone(&self.store),
                Arc::clone(&self.clock),
                cancel,
            )
            .map(Arc::new)
        })?;
        Ok(Some(Arc::clone(journal)))
    }

    /// Like [`JournalProvider::try_get_or_create`], as a reader
    pub fn try_get_or_create_reader(
        &self,
        id: &JournalId,
        required: &[JournalTrait],
        cancel: &CancellationToken,
    ) -> JournalResult<Option<Arc<dyn JournalReader>>> {
        Ok(self
            .try_get_or_create(id, required, cancel)?
            .map(|journal| journal as Arc<dyn JournalReader>))
    }

    /// Like [`JournalProvider::try_get_or_create`], as a writer
    pub fn try_get_or_create_writer(
        &self,
        id: &JournalId,
        required: &[JournalTrait],
        cancel: &CancellationToken,
    ) -> JournalResult<Option<Arc<dyn JournalWriter>>> {
        Ok(self
            .try_get_or_create(id, required, cancel)?
            .map(|journal| journal as Arc<dyn JournalWriter>))
    }

    /// True if the journal is cached or the existence check finds it
    ///
    /// Without a configured check the store is asked whether the journal's
    /// props row exists.
    pub fn has_journal(&self, id: &JournalId) -> JournalResult<bool> {
        let cached = self
            .journals
            .get(id)
            .map(|entry| entry.value().get().is_some())
            .unwrap_or(false);
        if cached {
            return Ok(true);
        }
        match &self.settings.existence_check {
            Some(check) => check(id),
            None => self.store.journal_exists(id),
        }
    }
}
