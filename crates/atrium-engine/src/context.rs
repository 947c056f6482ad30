//! Operation context: deadline and cancellation
//!
//! Administrative operations over large datasets must not hang a request
//! indefinitely. Every engine operation threads an [`OpContext`] through
//! its store calls and checks it before each one; expiry or cancellation
//! aborts the operation between calls, rolling back any open
//! transaction. A store call already in flight runs to completion.

use crate::error::EngineError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared flag for cancelling an in-flight operation
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    /// Create a fresh, uncancelled handle
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation was requested
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Deadline and cancellation context for one engine operation
#[derive(Debug, Clone, Default)]
pub struct OpContext {
    deadline: Option<Instant>,
    cancel: Option<CancelHandle>,
}

impl OpContext {
    /// Context with no deadline and no cancellation
    #[must_use]
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Context that expires after `timeout` from now
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Some(Instant::now() + timeout),
            cancel: None,
        }
    }

    /// Attach a cancellation handle
    #[must_use]
    pub fn with_cancel(mut self, handle: CancelHandle) -> Self {
        self.cancel = Some(handle);
        self
    }

    /// Fail if the operation should stop
    ///
    /// Called before every store suspension point.
    ///
    /// # Errors
    /// [`EngineError::Cancelled`] when cancellation was requested,
    /// [`EngineError::DeadlineExceeded`] when the deadline passed.
    pub fn checkpoint(&self) -> Result<(), EngineError> {
        if self.cancel.as_ref().is_some_and(CancelHandle::is_cancelled) {
            return Err(EngineError::Cancelled);
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(EngineError::DeadlineExceeded);
        }
        Ok(())
    }
}
