//! Provider settings

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use journal_core::{JournalId, JournalResult, JournalTrait, JournalTraits, TriState};

use crate::config::{JournalConfig, DEFAULT_CONNECTION_TIMEOUT, DEFAULT_PROVIDER_NAME};
use crate::journal::JournalSettings;

/// External journal existence check used when a journal is not cached
pub type ExistenceCheck = Arc<dyn Fn(&JournalId) -> JournalResult<bool> + Send + Sync>;

/// Traits every provider declares before any configured ones
pub fn default_traits() -> JournalTraits {
    [
        JournalTrait::atomic(TriState::True),
        JournalTrait::durable(TriState::True),
        JournalTrait::relational(TriState::True),
    ]
    .into_iter()
    .collect()
}

/// Settings for a [`JournalProvider`](super::JournalProvider)
#[derive(Clone)]
pub struct ProviderSettings {
    /// Provider name, exposed as the provider id
    pub name: String,
    /// Store connection string, without the routing token
    pub connection_string: String,
    /// Store connection (busy) timeout
    pub connection_timeout: Duration,
    /// Settings handed to every journal
    pub journal: JournalSettings,
    /// Declared traits
    pub traits: JournalTraits,
    /// Overrides the store-based existence check
    pub existence_check: Option<ExistenceCheck>,
}

impl fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("name", &self.name)
            .field("connection_string", &self.connection_string)
            .field("connection_timeout", &self.connection_timeout)
            .field("journal", &self.journal)
            .field("traits", &self.traits)
            .field("existence_check", &self.existence_check.is_some())
            .finish()
    }
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            name: DEFAULT_PROVIDER_NAME.to_string(),
            connection_string: String::new(),
            connection_timeout: DEFAULT_CONNECTION_TIMEOUT,
            journal: JournalSettings::default(),
            traits: default_traits(),
            existence_check: None,
        }
    }
}

impl ProviderSettings {
    /// Default settings under a name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Build settings from a parsed config
    ///
    /// Configured traits whose kind is already declared are ignored.
    pub fn from_config(config: &JournalConfig) -> JournalResult<Self> {
        let mut settings = Self {
            name: config.name.trim().to_string(),
            connection_string: config.connection_string.clone(),
            connection_timeout: config.connection_timeout(),
            journal: config.journal_settings()?,
            ..Self::default()
        };
        for journal_trait in &config.traits {
            settings.traits.declare(journal_trait.clone());
        }
        Ok(settings)
    }

    /// Set the store connection string
    pub fn with_connection_string(mut self, connection_string: impl Into<String>) -> Self {
        self.connection_string = connection_string.into();
        self
    }

    /// Set the store connection timeout
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Set journal settings
    pub fn with_journal_settings(mut self, journal: JournalSettings) -> Self {
        self.journal = journal;
        self
    }

    /// Declare an additional trait; ignored if its kind is already declared
    pub fn with_trait(mut self, journal_trait: JournalTrait) -> Self {
        self.traits.declare(journal_trait);
        self
    }

    /// Replace the existence check
    pub fn with_existence_check<F>(mut self, check: F) -> Self
    where
        F: Fn(&JournalId) -> JournalResult<bool> + Send + Sync + 'static,
    {
        self.existence_check = Some(Arc::new(check));
        self
    }
}
