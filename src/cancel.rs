// ⏱️ Cancellation - bounded store access
// A run carries one Cancellation; the store checks it before writing and
// again before committing, so a cancelled upsert always rolls back.

use crate::error::{ImportError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
#[cfg(test)]
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Cancellation signal: manual flag plus optional deadline.
/// Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    flag: Arc<AtomicBool>,
    deadline: Option<Instant>,
    #[cfg(test)]
    checks_left: Option<Arc<AtomicUsize>>,
}

impl Cancellation {
    /// Signal that never fires unless `cancel()` is called
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal that fires once `timeout` has elapsed from now
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Cancellation {
            deadline: Some(deadline),
            ..Self::default()
        }
    }

    /// Fires on the check after `passes` successful ones
    #[cfg(test)]
    pub(crate) fn after_checks(passes: usize) -> Self {
        Cancellation {
            checks_left: Some(Arc::new(AtomicUsize::new(passes))),
            ..Self::default()
        }
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        if self.flag.load(Ordering::SeqCst) {
            return true;
        }
        matches!(self.deadline, Some(deadline) if Instant::now() >= deadline)
    }

    /// `Err(Cancelled)` once the signal has fired
    pub fn check(&self) -> Result<()> {
        #[cfg(test)]
        if let Some(left) = &self.checks_left {
            if left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_err()
            {
                self.cancel();
            }
        }

        if self.is_cancelled() {
            Err(ImportError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Time left before the deadline (None = unbounded)
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }
}
