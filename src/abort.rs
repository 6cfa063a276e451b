use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};

use crate::predict::PredictError;

/// Abort signal shared between a running search and whoever started it.
/// Can be raised explicitly (`abort`) or armed with a wall-clock deadline.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle {
    flag: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl AbortHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn abort(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
            || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// `at` is the search instant reported back in the error.
    pub fn check(&self, at: DateTime<Utc>) -> Result<(), PredictError> {
        if self.is_aborted() {
            Err(PredictError::Cancelled { at })
        } else {
            Ok(())
        }
    }
}
