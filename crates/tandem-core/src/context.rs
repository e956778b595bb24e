use crate::error::{Result, TandemError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Cancellation and deadline for a long-running operation.
///
/// Clones share the cancel flag, so a handle kept by another thread can stop
/// an export between backup steps.
#[derive(Debug, Clone, Default)]
pub struct BackupContext {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl BackupContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Fail with `Cancelled` or `DeadlineExceeded` if the operation should stop.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(TandemError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(TandemError::DeadlineExceeded),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_is_shared_between_clones() {
        let ctx = BackupContext::new();
        let handle = ctx.clone();
        assert!(ctx.check().is_ok());

        handle.cancel();
        assert!(matches!(ctx.check(), Err(TandemError::Cancelled)));
    }

    #[test]
    fn test_expired_deadline() {
        let ctx = BackupContext::new().with_deadline(Instant::now() - Duration::from_millis(1));
        assert!(matches!(ctx.check(), Err(TandemError::DeadlineExceeded)));

        let ctx = BackupContext::new().with_timeout(Duration::from_secs(60));
        assert!(ctx.deadline().is_some_and(|d| d > Instant::now()));
        assert!(ctx.check().is_ok());

        assert!(BackupContext::new().deadline().is_none());
    }
}
