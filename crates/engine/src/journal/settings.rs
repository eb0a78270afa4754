//! Per-journal engine settings

use std::time::Duration;

use journal_core::TagCodec;

/// Default window during which initialization keeps retrying
pub const DEFAULT_INITIALIZATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Default delay before the first initialization retry
pub const DEFAULT_INITIAL_RETRY_DELAY: Duration = Duration::from_millis(250);

/// Default writer retry limit
pub const DEFAULT_WRITER_RETRY_LIMIT: u32 = 5;

/// Settings shared by every journal a provider creates
///
/// # Example
/// ```ignore
/// let settings = JournalSettings::default()
///     .with_initialization_timeout(Duration::from_secs(5))
///     .with_reset_props_on_write_failure(true);
/// ```
#[derive(Debug, Clone)]
pub struct JournalSettings {
    /// How long construction keeps retrying initialization
    pub initialization_timeout: Duration,
    /// Delay before the first retry; doubles after every failed attempt
    pub initial_retry_delay: Duration,
    /// Writer retry limit
    ///
    /// Writes are never retried; the value is reported alongside write
    /// failures so operators can see what the deployment was configured with.
    pub writer_retry_limit: u32,
    /// Reload props from the store after a failed write
    pub reset_props_on_write_failure: bool,
    /// Tag encoding used for the `Tags` column
    pub tag_codec: TagCodec,
}

impl Default for JournalSettings {
    fn default() -> Self {
        Self {
            initialization_timeout: DEFAULT_INITIALIZATION_TIMEOUT,
            initial_retry_delay: DEFAULT_INITIAL_RETRY_DELAY,
            writer_retry_limit: DEFAULT_WRITER_RETRY_LIMIT,
            reset_props_on_write_failure: false,
            tag_codec: TagCodec::default(),
        }
    }
}

impl JournalSettings {
    /// Create settings with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the initialization deadline
    pub fn with_initialization_timeout(mut self, timeout: Duration) -> Self {
        self.initialization_timeout = timeout;
        self
    }

    /// Set the first retry delay
    pub fn with_initial_retry_delay(mut self, delay: Duration) -> Self {
        self.initial_retry_delay = delay;
        self
    }

    /// Set the writer retry limit
    pub fn with_writer_retry_limit(mut self, limit: u32) -> Self {
        self.writer_retry_limit = limit;
        self
    }

    /// Enable or disable the automatic props reload after a failed write
    pub fn with_reset_props_on_write_failure(mut self, enabled: bool) -> Self {
        self.reset_props_on_write_failure = enabled;
        self
    }

    /// Set the tag codec
    pub fn with_tag_codec(mut self, codec: TagCodec) -> Self {
        self.tag_codec = codec;
        self
    }

    /// Delay before retry number `attempt` (1-based), doubling each time
    pub(crate) fn retry_delay(&self, attempt: u32) -> Duration {
        // Cap the shift so the multiplier fits in u32
        let shift = attempt.saturating_sub(1).min(31);
        self.initial_retry_delay.saturating_mul(1u32 << shift)
    }
}
