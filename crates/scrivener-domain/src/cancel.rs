//! Cooperative cancellation for blocking collaborator calls

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared flag telling a blocking call to stop at its next checkpoint
///
/// Clones observe the same flag. Cancelling is one-way.
///
/// # Examples
///
/// ```
/// use scrivener_domain::CancelFlag;
///
/// let flag = CancelFlag::new();
/// let seen_by_worker = flag.clone();
/// {
///     let _guard = flag.guard();
/// }
/// assert!(seen_by_worker.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    cancelled: Arc<AtomicBool>,
}

impl CancelFlag {
    /// A flag that is not cancelled
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask every holder to stop
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether [`cancel`](Self::cancel) has been called
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Guard that cancels the flag when dropped
    pub fn guard(&self) -> CancelGuard {
        CancelGuard { flag: self.clone() }
    }
}

/// Cancels its flag on drop
#[derive(Debug)]
pub struct CancelGuard {
    flag: CancelFlag,
}

impl Drop for CancelGuard {
    fn drop(&mut self) {
        self.flag.cancel();
    }
}
