//! Provider configuration via `journal.toml`
//!
//! A default `journal.toml` can be written next to the database on first
//! start; edit it and restart to change settings.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use journal_core::{JournalError, JournalResult, JournalTrait, TagCodec, DEFAULT_TAG_DELIMITER};

use crate::journal::settings::{
    DEFAULT_INITIALIZATION_TIMEOUT, DEFAULT_INITIAL_RETRY_DELAY, DEFAULT_WRITER_RETRY_LIMIT,
};
use crate::journal::JournalSettings;

/// Config file name placed in the database directory.
pub const CONFIG_FILE_NAME: &str = "journal.toml";

/// Default provider name
pub const DEFAULT_PROVIDER_NAME: &str = "default";

/// Default store connection timeout
pub const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_millis(3000);

/// Provider configuration loaded from `journal.toml`.
///
/// # Example
///
/// ```toml
/// name = "orders"
/// connection_string = "Data Source=/var/lib/orders/journal.db"
/// initialization_timeout_ms = 30000
///
/// [[traits]]
/// kind = { custom = "encrypted" }
/// value = "true"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JournalConfig {
    /// Provider name, exposed as its `ProviderId`
    #[serde(default = "default_name")]
    pub name: String,
    /// Store connection string, without the `ProviderId` routing token
    #[serde(default = "default_connection_string")]
    pub connection_string: String,
    /// Store connection (busy) timeout in milliseconds
    #[serde(default = "default_connection_timeout_ms")]
    pub connection_timeout_ms: u64,
    /// How long journal initialization keeps retrying, in milliseconds
    #[serde(default = "default_initialization_timeout_ms")]
    pub initialization_timeout_ms: u64,
    /// First initialization retry delay in milliseconds
    #[serde(default = "default_initial_retry_delay_ms")]
    pub initial_retry_delay_ms: u64,
    /// Writer retry limit (reported with write failures; writes are not retried)
    #[serde(default = "default_writer_retry_limit")]
    pub writer_retry_limit: u32,
    /// Reload props after a failed write
    #[serde(default)]
    pub reset_props_on_write_failure: bool,
    /// Tag delimiter, a single character
    #[serde(default = "default_tag_delimiter")]
    pub tag_delimiter: String,
    /// Traits declared on top of the defaults
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub traits: Vec<JournalTrait>,
}

fn default_name() -> String {
    DEFAULT_PROVIDER_NAME.to_string()
}

fn default_connection_string() -> String {
    ":memory:".to_string()
}

fn default_connection_timeout_ms() -> u64 {
    DEFAULT_CONNECTION_TIMEOUT.as_millis() as u64
}

fn default_initialization_timeout_ms() -> u64 {
    DEFAULT_INITIALIZATION_TIMEOUT.as_millis() as u64
}

fn default_initial_retry_delay_ms() -> u64 {
    DEFAULT_INITIAL_RETRY_DELAY.as_millis() as u64
}

fn default_writer_retry_limit() -> u32 {
    DEFAULT_WRITER_RETRY_LIMIT
}

fn default_tag_delimiter() -> String {
    DEFAULT_TAG_DELIMITER.to_string()
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            connection_string: default_connection_string(),
            connection_timeout_ms: default_connection_timeout_ms(),
            initialization_timeout_ms: default_initialization_timeout_ms(),
            initial_retry_delay_ms: default_initial_retry_delay_ms(),
            writer_retry_limit: default_writer_retry_limit(),
            reset_props_on_write_failure: false,
            tag_delimiter: default_tag_delimiter(),
            traits: Vec::new(),
        }
    }
}

impl JournalConfig {
    /// Store connection timeout
    pub fn connection_timeout(&self) -> Duration {
        Duration::from_millis(self.connection_timeout_ms)
    }

    /// Parse the tag delimiter into a codec.
    ///
    /// # Errors
    ///
    /// Returns an error unless the delimiter is exactly one case-stable,
    /// non-alphanumeric character.
    pub fn tag_codec(&self) -> JournalResult<TagCodec> {
        let mut chars = self.tag_delimiter.chars();
        match (chars.next(), chars.next()) {
            (Some(delimiter), None) => TagCodec::new(delimiter).map_err(|e| {
                JournalError::config(format!("invalid tag_delimiter in {}: {}", CONFIG_FILE_NAME, e))
            }),
            _ => Err(JournalError::config(format!(
                "tag_delimiter in {} must be a single character, got {:?}",
                CONFIG_FILE_NAME, self.tag_delimiter
            ))),
        }
    }

    /// Engine settings described by this config.
    ///
    /// # Errors
    ///
    /// Returns an error if the config does not validate.
    pub fn journal_settings(&self) -> JournalResult<JournalSettings> {
        self.validate()?;
        Ok(JournalSettings::default()
            .with_initialization_timeout(Duration::from_millis(self.initialization_timeout_ms))
            .with_initial_retry_delay(Duration::from_millis(self.initial_retry_delay_ms))
            .with_writer_retry_limit(self.writer_retry_limit)
            .with_reset_props_on_write_failure(self.reset_props_on_write_failure)
            .with_tag_codec(self.tag_codec()?))
    }

    /// Check every field that can be invalid.
    pub fn validate(&self) -> JournalResult<()> {
        if self.name.trim().is_empty() {
            return Err(JournalError::config(format!(
                "name in {} must not be empty",
                CONFIG_FILE_NAME
            )));
        }
        if self.initial_retry_delay_ms == 0 {
            return Err(JournalError::config(format!(
                "initial_retry_delay_ms in {} must be positive",
                CONFIG_FILE_NAME
            )));
        }
        self.tag_codec()?;
        Ok(())
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# journaldb provider configuration
#
# Provider name, reported as the provider id
name = "default"

# Store connection string. For SQLite either a file path, ":memory:",
# or "Data Source=<path>". A leading "ProviderId=...;" token is ignored.
connection_string = ":memory:"

# Store busy timeout in milliseconds (default: 3000)
connection_timeout_ms = 3000

# How long opening a journal keeps retrying, in milliseconds (default: 30000)
initialization_timeout_ms = 30000

# First retry delay in milliseconds; doubles after every failure (default: 250)
initial_retry_delay_ms = 250

# Reported with write failures. Writes are never retried. (default: 5)
writer_retry_limit = 5

# Reload the sequence counter from the store after a failed write
# (default: false; callers reset explicitly)
reset_props_on_write_failure = false

# Tag delimiter, one non-alphanumeric character (default: tab)
tag_delimiter = "\t"

# Additional traits. Atomic, Durable and Relational are always declared as
# true; entries for an already-declared kind are ignored.
# [[traits]]
# kind = { custom = "encrypted" }
# value = "true"
"#
    }

    /// Parse config from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string cannot be parsed or does not validate.
    pub fn from_toml_str(content: &str) -> JournalResult<Self> {
        let config: JournalConfig = toml::from_str(content)
            .map_err(|e| JournalError::config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> JournalResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            JournalError::config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config: JournalConfig = toml::from_str(&content).map_err(|e| {
            JournalError::config(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Write the default config file if it does not already exist.
    ///
    /// Returns `Ok(())` whether the file was created or already existed.
    pub fn write_default_if_missing(path: &Path) -> JournalResult<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                JournalError::config(format!(
                    "Failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> JournalResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| JournalError::config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            JournalError::config(format!(
                "Failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }
}
