//! Cancellation for work the engine spawns off its loop.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cancelled at stage={stage}")]
pub struct Cancelled {
    pub stage: &'static str,
}

/// Shared flag; every clone observes the same cancellation.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if this call performed the cancellation.
    pub fn cancel(&self) -> bool {
        !self.cancelled.swap(true, Ordering::AcqRel)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    pub fn check(&self, stage: &'static str) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            return Err(Cancelled { stage });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_observe_a_single_cancellation() {
        let token = CancellationToken::new();
        let timer_side = token.clone();
        assert_eq!(timer_side.check("advance"), Ok(()));
        assert!(token.cancel());
        assert!(!timer_side.cancel());
        let err = timer_side.check("advance").unwrap_err();
        assert_eq!(err.to_string(), "cancelled at stage=advance");
    }
}
