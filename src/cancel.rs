//! Cooperative cancellation for long-running analyses.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Notify;

use crate::error::AnalysisError;

/// Shared cancellation flag with an optional deadline.
///
/// Clones share the same flag, so a caller can hand one clone to the
/// recommendation generator and cancel through another. Work wrapped in
/// [`CancellationToken::run_until_cancelled`] is dropped as soon as the
/// token is cancelled or the deadline passes, even mid store call.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
    notify: Arc<Notify>,
    deadline: Option<Instant>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            ..Self::default()
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
        self.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Explicit cancellation wins over an expired deadline.
    pub fn check(&self) -> Result<(), AnalysisError> {
        if self.is_cancelled() {
            return Err(AnalysisError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(AnalysisError::DeadlineExceeded),
            _ => Ok(()),
        }
    }

    /// Resolves once the token is cancelled or its deadline has passed.
    pub async fn stopped(&self) -> AnalysisError {
        loop {
            // registered before the check so a concurrent cancel() is not missed
            let notified = self.notify.notified();
            if let Err(err) = self.check() {
                return err;
            }
            match self.deadline {
                Some(deadline) => {
                    let expiry = tokio::time::Instant::from_std(deadline);
                    tokio::select! {
                        _ = notified => {}
                        _ = tokio::time::sleep_until(expiry) => {}
                    }
                }
                None => notified.await,
            }
        }
    }

    /// Drives `work` until it finishes or the token stops, whichever is first.
    pub async fn run_until_cancelled<F>(&self, work: F) -> Result<F::Output, AnalysisError>
    where
        F: Future,
    {
        self.check()?;
        tokio::select! {
            biased;
            err = self.stopped() => Err(err),
            output = work => Ok(output),
        }
    }
}
