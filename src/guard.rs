//! Deadline and cancellation checks for a single export call.
//!
//! Pagination and every serializer call [`ExportGuard::check`] once per
//! element. A tripped guard aborts the export with the index of the last
//! element that was fully processed.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::error::{Error, Result};

/// Shared flag a caller flips to abandon an in-flight export.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug)]
pub struct ExportGuard {
    deadline: Option<Instant>,
    cancel: Option<CancelToken>,
    last_index: Option<usize>,
}

impl ExportGuard {
    pub fn new(timeout: Option<Duration>, cancel: Option<CancelToken>) -> Self {
        Self {
            deadline: timeout.map(|t| Instant::now() + t),
            cancel,
            last_index: None,
        }
    }

    /// A guard that never trips.
    pub fn unbounded() -> Self {
        Self::new(None, None)
    }

    /// Fail if cancelled or past the deadline; otherwise record `index` as
    /// the element about to be processed.
    pub fn check(&mut self, index: usize) -> Result<()> {
        self.check_now()?;
        self.last_index = Some(index);
        Ok(())
    }

    /// Check without advancing the position.
    pub fn check_now(&self) -> Result<()> {
        if self.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
            return Err(Error::Cancelled);
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(Error::Timeout {
                last_index: self.last_index,
            });
        }
        Ok(())
    }

    /// Index of the last element handed to [`check`](Self::check).
    pub fn last_index(&self) -> Option<usize> {
        self.last_index
    }

    /// Start a new pass (e.g. serialization after pagination).
    pub fn restart(&mut self) {
        self.last_index = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unbounded_guard_tracks_position() {
        let mut guard = ExportGuard::unbounded();
        for i in 0..5 {
            guard.check(i).unwrap();
        }
        assert_eq!(guard.last_index(), Some(4));
        guard.restart();
        assert_eq!(guard.last_index(), None);
    }

    #[test]
    fn test_cancel_trips_guard() {
        let token = CancelToken::new();
        let mut guard = ExportGuard::new(None, Some(token.clone()));
        guard.check(0).unwrap();
        token.cancel();
        assert!(matches!(guard.check(1), Err(Error::Cancelled)));
    }

    #[test]
    fn test_expired_deadline_reports_last_index() {
        let mut guard = ExportGuard::new(Some(Duration::from_secs(3600)), None);
        guard.check(0).unwrap();
        guard.check(1).unwrap();
        guard.deadline = Some(Instant::now() - Duration::from_millis(1));
        match guard.check(2) {
            Err(Error::Timeout { last_index }) => assert_eq!(last_index, Some(1)),
            other => panic!("expected timeout, got {other:?}"),
        }
    }
}
