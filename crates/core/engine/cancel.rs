use crate::error::{GridError, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cooperative cancellation flag shared between a running job and its owner.
///
/// The engine checks it before every provider and store call, so a cancelled
/// run stops at the next batch boundary with everything persisted so far
/// still valid.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// `Err(GridError::Cancelled)` once cancelled.
    #[inline]
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(GridError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_state() {
        let token = CancelToken::new();
        let handle = token.clone();
        assert!(token.check().is_ok());

        handle.cancel();
        assert!(token.is_cancelled());
        assert!(matches!(token.check(), Err(GridError::Cancelled)));
    }
}
