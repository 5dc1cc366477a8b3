//! Cooperative cancellation.
//!
//! A [`CancellationToken`] is a shared flag that long-running analysis and
//! rendering loops poll at frame, bin and FFT-stage boundaries. Cancellation
//! has no partial-result contract: a caller that sees [`Error::Cancelled`]
//! must discard whatever model was being built.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::{Error, Result};

/// Shared cancellation flag.
///
/// Clones observe the same flag, so the orchestrating thread keeps one clone
/// and hands another to the worker.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a token that has not been cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Whether cancellation has been requested.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Return `Err(Error::Cancelled)` once cancellation has been requested.
    #[inline]
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}
