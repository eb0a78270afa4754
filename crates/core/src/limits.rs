//! Size limits for journal identities and entry columns
//!
//! These mirror the column widths of the persisted layout. The engine enforces
//! them before any I/O so an oversized entry fails the batch up front instead of
//! surfacing as a driver-specific truncation error.

use crate::error::{JournalError, JournalResult};

/// Maximum length of a journal id (characters)
pub const MAX_JOURNAL_ID_LENGTH: usize = 384;

/// Maximum length of an entry id (characters)
pub const MAX_ENTRY_ID_LENGTH: usize = 512;

/// Maximum length of the encoded tag column (characters)
pub const MAX_ENCODED_TAGS_LENGTH: usize = 768;

/// Validate an entry id against the column limits
pub fn check_entry_id(entry_id: &str) -> JournalResult<()> {
    if entry_id.is_empty() {
        return Err(JournalError::invalid_input("entry id cannot be empty"));
    }
    let length = entry_id.chars().count();
    if length > MAX_ENTRY_ID_LENGTH {
        return Err(JournalError::invalid_input(format!(
            "entry id too long: {} chars (max {})",
            length, MAX_ENTRY_ID_LENGTH
        )));
    }
    Ok(())
}

/// Validate an encoded tag string against the column limits
pub fn check_encoded_tags(encoded: &str) -> JournalResult<()> {
    let length = encoded.chars().count();
    if length > MAX_ENCODED_TAGS_LENGTH {
        return Err(JournalError::invalid_input(format!(
            "encoded tags too long: {} chars (max {})",
            length, MAX_ENCODED_TAGS_LENGTH
        )));
    }
    Ok(())
}
