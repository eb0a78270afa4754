//! Cooperative cancellation
//!
//! Every blocking engine operation takes a `&CancellationToken`. The token is
//! checked before the operation touches the store; once a commit has started it
//! is left to finish or fail on its own.

use crate::error::{JournalError, JournalResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared cancellation flag
///
/// Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a token that has not been cancelled
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Non-blocking cancellation check
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Return `Err(Cancelled)` if cancellation was requested
    pub fn check(&self) -> JournalResult<()> {
        if self.is_cancelled() {
            Err(JournalError::Cancelled)
        } else {
            Ok(())
        }
    }
}
