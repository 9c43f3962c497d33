//! Batch Rewind Strategies
//!
//! When a handler fails with [`DisruptorError::Rewindable`] the processor asks
//! its [`BatchRewindStrategy`] whether to replay the whole batch from its first
//! sequence or to give up and hand the error to the exception handler.

use crate::disruptor::DisruptorError;
use std::thread;
use std::time::Duration;
use tracing::warn;

/// Outcome of a rewind decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewindAction {
    /// Replay the batch from its first sequence
    Rewind,
    /// Stop retrying and report the error
    Throw,
}

/// Decides what to do with a rewindable handler failure
pub trait BatchRewindStrategy: Send + Sync {
    /// Handle a rewindable failure
    ///
    /// # Arguments
    /// * `error` - The failure raised by the handler
    /// * `attempts` - Consecutive rewinds of this batch, including this one
    fn handle_rewind_error(&self, error: &DisruptorError, attempts: u32) -> RewindAction;
}

impl<R: BatchRewindStrategy + ?Sized> BatchRewindStrategy for Box<R> {
    fn handle_rewind_error(&self, error: &DisruptorError, attempts: u32) -> RewindAction {
        (**self).handle_rewind_error(error, attempts)
    }
}

/// Always rewinds
#[derive(Debug, Default, Clone, Copy)]
pub struct SimpleBatchRewindStrategy;

impl SimpleBatchRewindStrategy {
    /// Create a new simple rewind strategy
    pub fn new() -> Self {
        Self
    }
}

impl BatchRewindStrategy for SimpleBatchRewindStrategy {
    fn handle_rewind_error(&self, _error: &DisruptorError, _attempts: u32) -> RewindAction {
        RewindAction::Rewind
    }
}

/// Rewinds until `max_attempts` consecutive attempts have failed
#[derive(Debug, Clone, Copy)]
pub struct EventuallyGiveUpBatchRewindStrategy {
    max_attempts: u32,
}

impl EventuallyGiveUpBatchRewindStrategy {
    /// Create a strategy that gives up on the `max_attempts`-th failure
    pub fn new(max_attempts: u32) -> Self {
        Self { max_attempts }
    }
}

impl BatchRewindStrategy for EventuallyGiveUpBatchRewindStrategy {
    fn handle_rewind_error(&self, error: &DisruptorError, attempts: u32) -> RewindAction {
        if attempts >= self.max_attempts {
            warn!(attempts, %error, "giving up on rewindable batch");
            return RewindAction::Throw;
        }
        RewindAction::Rewind
    }
}

/// Pauses for a fixed number of nanoseconds, then rewinds
#[derive(Debug, Clone, Copy)]
pub struct NanosecondPauseBatchRewindStrategy {
    pause: Duration,
}

impl NanosecondPauseBatchRewindStrategy {
    /// Create a strategy that sleeps `nanos` before each rewind
    pub fn new(nanos: u64) -> Self {
        Self {
            pause: Duration::from_nanos(nanos),
        }
    }
}

impl BatchRewindStrategy for NanosecondPauseBatchRewindStrategy {
    fn handle_rewind_error(&self, _error: &DisruptorError, _attempts: u32) -> RewindAction {
        thread::sleep(self.pause);
        RewindAction::Rewind
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transient() -> DisruptorError {
        DisruptorError::rewindable("transient")
    }

    #[test]
    fn test_simple_always_rewinds() {
        let strategy = SimpleBatchRewindStrategy::new();
        for attempts in [1, 10, u32::MAX] {
            assert_eq!(
                strategy.handle_rewind_error(&transient(), attempts),
                RewindAction::Rewind
            );
        }
    }

    #[test]
    fn test_eventually_give_up() {
        let strategy = EventuallyGiveUpBatchRewindStrategy::new(3);
        assert_eq!(strategy.handle_rewind_error(&transient(), 1), RewindAction::Rewind);
        assert_eq!(strategy.handle_rewind_error(&transient(), 2), RewindAction::Rewind);
        assert_eq!(strategy.handle_rewind_error(&transient(), 3), RewindAction::Throw);
    }

    #[test]
    fn test_nanosecond_pause_rewinds() {
        let strategy = NanosecondPauseBatchRewindStrategy::new(1_000);
        assert_eq!(strategy.handle_rewind_error(&transient(), 1), RewindAction::Rewind);
    }
}
