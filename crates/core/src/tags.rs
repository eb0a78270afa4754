//! Tag codec
//!
//! Tags are stored in a single column as a delimiter-framed, lower-cased string:
//!
//! ```text
//! []               -> ""
//! ["Odd"]          -> "\todd\t"
//! ["odd", "Blue"]  -> "\todd\tblue\t"
//! ```
//!
//! Framing on both ends lets a containment query search for `<d><tag><d>` and
//! only ever match whole tags: `tag` never matches a row tagged `tagged`.
//!
//! The delimiter is not escaped. A tag that itself contains the delimiter is
//! stored as several tags; callers must not embed it.

use crate::error::{JournalError, JournalResult};
use serde::{Deserialize, Serialize};

/// Default tag delimiter
pub const DEFAULT_TAG_DELIMITER: char = '\t';

/// Encodes tag sets and builds containment predicates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagCodec {
    delimiter: char,
}

impl Default for TagCodec {
    fn default() -> Self {
        TagCodec {
            delimiter: DEFAULT_TAG_DELIMITER,
        }
    }
}

impl TagCodec {
    /// Create a codec with a custom delimiter
    ///
    /// # Errors
    ///
    /// The delimiter must be a non-alphanumeric character that is unchanged by
    /// lower-casing, otherwise encoded tags could collide with it.
    pub fn new(delimiter: char) -> JournalResult<Self> {
        let case_stable = delimiter.to_lowercase().eq(std::iter::once(delimiter))
            && delimiter.to_uppercase().eq(std::iter::once(delimiter));
        if delimiter.is_alphanumeric() || !case_stable {
            return Err(JournalError::invalid_input(format!(
                "tag delimiter {:?} must be a case-stable, non-alphanumeric character",
                delimiter
            )));
        }
        Ok(TagCodec { delimiter })
    }

    /// The framing delimiter
    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    /// Encode tags into the stored column value
    pub fn encode<S: AsRef<str>>(&self, tags: &[S]) -> String {
        if tags.is_empty() {
            return String::new();
        }
        let mut encoded = String::new();
        encoded.push(self.delimiter);
        for tag in tags {
            encoded.push_str(&tag.as_ref().to_lowercase());
            encoded.push(self.delimiter);
        }
        encoded
    }

    /// Decode a stored column value back into tags
    pub fn decode(&self, encoded: &str) -> Vec<String> {
        encoded
            .split(self.delimiter)
            .filter(|segment| !segment.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Build the whole-tag containment predicate for one tag
    pub fn contains_predicate(&self, tag: &str) -> TagPredicate {
        let mut needle = String::new();
        needle.push(self.delimiter);
        needle.push_str(&tag.to_lowercase());
        needle.push(self.delimiter);
        TagPredicate { needle }
    }

    /// Build one predicate per tag; a row matches if any predicate matches
    pub fn any_of<S: AsRef<str>>(&self, tags: &[S]) -> Vec<TagPredicate> {
        tags.iter()
            .map(|tag| self.contains_predicate(tag.as_ref()))
            .collect()
    }
}

/// Whole-tag containment predicate
///
/// Holds the framed needle so stores can push it down as a substring search
/// (`instr(tags, ?) > 0`) or evaluate it in memory with [`TagPredicate::matches`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TagPredicate {
    needle: String,
}

impl TagPredicate {
    /// Framed search string `<d><tag><d>`
    pub fn needle(&self) -> &str {
        &self.needle
    }

    /// Evaluate against an encoded tag column
    pub fn matches(&self, encoded: &str) -> bool {
        encoded.contains(&self.needle)
    }
}
