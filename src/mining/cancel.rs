//! Cooperative cancellation
//!
//! A cloneable token checked by every long-running mining loop on each
//! iteration. Children observe their parent's cancellation; cancelling a
//! child never propagates upward. A child may also carry a deadline, which
//! reads as cancellation once it passes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    parent: Option<Box<CancelToken>>,
    deadline: Option<Instant>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal cancellation to this token and all of its children.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_canceled(&self) -> bool {
        if self.flag.load(Ordering::SeqCst) {
            return true;
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return true;
            }
        }
        match &self.parent {
            Some(parent) => parent.is_canceled(),
            None => false,
        }
    }

    /// Has this token's own deadline passed? (Parent cancellation does not
    /// count; used to tell a timeout apart from an abort.)
    pub fn deadline_passed(&self) -> bool {
        matches!(self.deadline, Some(d) if Instant::now() >= d)
    }

    /// A child that observes this token but can be cancelled independently.
    pub fn child(&self) -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            parent: Some(Box::new(self.clone())),
            deadline: None,
        }
    }

    /// A child that additionally cancels itself once `limit` elapses.
    pub fn child_with_timeout(&self, limit: Duration) -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            parent: Some(Box::new(self.clone())),
            deadline: Some(Instant::now() + limit),
        }
    }
}
