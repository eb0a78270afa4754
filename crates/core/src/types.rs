//! Identity types: JournalId, EntryId, LocationKind
//!
//! The journal name (without discriminator) is the storage namespace: it
//! names the entries table, and `<name>-props` names the props table.
//! Discriminated journals such as `orders.eu` and `orders.us` share those
//! tables; rows are kept apart by the full id stored in each row.
//!
//! ## JournalId validation
//!
//! - Non-empty after trimming
//! - At most [`MAX_JOURNAL_ID_LENGTH`] characters including the discriminator
//! - No double quotes, control characters, or the discriminator separator `.`
//!   inside the name or discriminator
//! - The name must not end in `-props`, which would collide with another
//!   journal's props table
//! - Always lower-cased

use crate::limits::MAX_JOURNAL_ID_LENGTH;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Separator between a journal name and its discriminator
pub const DISCRIMINATOR_SEPARATOR: char = '.';

/// Suffix appended to the journal name to name its props table
pub const PROPS_TABLE_SUFFIX: &str = "-props";

/// Error when validating a journal id
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JournalIdError {
    /// Name (or discriminator) is empty
    Empty,
    /// Id exceeds maximum length
    TooLong {
        /// Actual length of the id
        length: usize,
        /// Maximum allowed length
        max: usize,
    },
    /// Id contains a character that cannot be used in a table name
    InvalidChar {
        /// The invalid character
        char: char,
        /// Position of the invalid character
        position: usize,
    },
    /// Name ends with a suffix reserved for table naming
    ReservedSuffix {
        /// The reserved suffix
        suffix: &'static str,
    },
}

impl fmt::Display for JournalIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JournalIdError::Empty => write!(f, "journal id cannot be empty"),
            JournalIdError::TooLong { length, max } => {
                write!(f, "journal id too long: {} chars (max {})", length, max)
            }
            JournalIdError::InvalidChar { char, position } => {
                write!(
                    f,
                    "invalid character {:?} at position {} in journal id",
                    char, position
                )
            }
            JournalIdError::ReservedSuffix { suffix } => {
                write!(f, "journal name cannot end with {:?}", suffix)
            }
        }
    }
}

impl std::error::Error for JournalIdError {}

/// Logical journal identity
///
/// Case-insensitive: `JournalId::new("Orders")` and `JournalId::new("orders")`
/// are the same journal. A discriminator partitions one logical name into
/// several physical journals (`orders.eu`, `orders.us`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct JournalId {
    full: String,
    name_len: usize,
}

impl JournalId {
    /// Create a journal id from a name
    ///
    /// # Errors
    ///
    /// Returns `JournalIdError` if the name is invalid.
    pub fn new(name: impl AsRef<str>) -> Result<Self, JournalIdError> {
        let name = normalize_name(name.as_ref())?;
        Self::check_length(&name)?;
        Ok(JournalId {
            name_len: name.len(),
            full: name,
        })
    }

    /// Create a journal id carrying a discriminator suffix
    pub fn with_discriminator(
        name: impl AsRef<str>,
        discriminator: impl AsRef<str>,
    ) -> Result<Self, JournalIdError> {
        let name = normalize_name(name.as_ref())?;
        let discriminator = normalize_part(discriminator.as_ref())?;
        let full = format!("{}{}{}", name, DISCRIMINATOR_SEPARATOR, discriminator);
        Self::check_length(&full)?;
        Ok(JournalId {
            name_len: name.len(),
            full,
        })
    }

    fn check_length(full: &str) -> Result<(), JournalIdError> {
        let length = full.chars().count();
        if length > MAX_JOURNAL_ID_LENGTH {
            return Err(JournalIdError::TooLong {
                length,
                max: MAX_JOURNAL_ID_LENGTH,
            });
        }
        Ok(())
    }

    /// Logical name without the discriminator
    pub fn name(&self) -> &str {
        &self.full[..self.name_len]
    }

    /// Discriminator suffix, if any
    pub fn discriminator(&self) -> Option<&str> {
        if self.full.len() > self.name_len {
            Some(&self.full[self.name_len + DISCRIMINATOR_SEPARATOR.len_utf8()..])
        } else {
            None
        }
    }

    /// Full normalized id; the value of the row-level `JournalId` column
    pub fn as_str(&self) -> &str {
        &self.full
    }

    /// Name of the table holding this journal's rows, shared by every
    /// discriminator of the same name
    pub fn table_name(&self) -> &str {
        self.name()
    }

    /// Name of the table holding this journal's props row
    pub fn props_table_name(&self) -> String {
        format!("{}{}", self.name(), PROPS_TABLE_SUFFIX)
    }
}

fn normalize_name(raw: &str) -> Result<String, JournalIdError> {
    let name = normalize_part(raw)?;
    if name.ends_with(PROPS_TABLE_SUFFIX) {
        return Err(JournalIdError::ReservedSuffix {
            suffix: PROPS_TABLE_SUFFIX,
        });
    }
    Ok(name)
}

fn normalize_part(raw: &str) -> Result<String, JournalIdError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(JournalIdError::Empty);
    }
    for (position, c) in trimmed.chars().enumerate() {
        if c == '"' || c == DISCRIMINATOR_SEPARATOR || c.is_control() {
            return Err(JournalIdError::InvalidChar { char: c, position });
        }
    }
    Ok(trimmed.to_lowercase())
}

impl fmt::Display for JournalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full)
    }
}

impl FromStr for JournalId {
    type Err = JournalIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().split_once(DISCRIMINATOR_SEPARATOR) {
            Some((name, discriminator)) => JournalId::with_discriminator(name, discriminator),
            None => JournalId::new(s),
        }
    }
}

impl TryFrom<String> for JournalId {
    type Error = JournalIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<JournalId> for String {
    fn from(id: JournalId) -> Self {
        id.full
    }
}

/// Identity of a logical entry
///
/// Opaque to the engine. Uniqueness is only enforced for consistent and
/// immutable entries; appended entries may repeat an id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(String);

impl EntryId {
    /// Wrap a string as an entry id
    pub fn new(id: impl Into<String>) -> Self {
        EntryId(id.into())
    }

    /// Borrow the id
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntryId {
    fn from(s: &str) -> Self {
        EntryId(s.to_string())
    }
}

impl From<String> for EntryId {
    fn from(s: String) -> Self {
        EntryId(s)
    }
}

/// Ordering axis for range reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LocationKind {
    /// Journal sequence number
    Sequence,
    /// Write time in 100ns ticks
    UtcTicks,
}

impl fmt::Display for LocationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocationKind::Sequence => write!(f, "sequence"),
            LocationKind::UtcTicks => write!(f, "utc_ticks"),
        }
    }
}
