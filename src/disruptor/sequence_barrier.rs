//! Sequence Barrier Implementation
//!
//! A sequence barrier is the consumer's view of the ring: it waits, through a
//! [`WaitStrategy`], until a sequence is both published and processed by every
//! upstream consumer, and it carries the alert flag used to cancel that wait.

use crate::disruptor::{
    DependentSequence, DisruptorError, Result, Sequence, Sequencer, WaitStrategy,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Coordination barrier for tracking the cursor and upstream consumers
pub trait SequenceBarrier: Send + Sync {
    /// Wait for the given sequence to become available for consumption
    ///
    /// # Returns
    /// The highest sequence that can be safely read, which may be greater than
    /// requested, or lower when the wait strategy returned early
    ///
    /// # Errors
    /// `Alert` if the barrier is alerted, `Timeout` from timed strategies
    fn wait_for(&self, sequence: i64) -> Result<i64>;

    /// Current value of the sequence this barrier's consumer must not overtake
    fn get_cursor(&self) -> i64;

    /// Check if this barrier has been alerted
    fn is_alerted(&self) -> bool;

    /// Alert this barrier and wake any thread waiting on it
    fn alert(&self);

    /// Clear the alert flag so the barrier can be waited on again
    fn clear_alert(&self);

    /// Fail with `Alert` if the barrier has been alerted
    fn check_alert(&self) -> Result<()> {
        if self.is_alerted() {
            return Err(DisruptorError::Alert);
        }
        Ok(())
    }
}

/// Standard sequence barrier over a sequencer and optional upstream consumers
///
/// With no dependencies the consumer follows the producer cursor; otherwise it
/// follows the minimum of the given consumer sequences.
#[derive(Debug)]
pub struct ProcessingSequenceBarrier {
    sequencer: Arc<dyn Sequencer>,
    wait_strategy: Arc<dyn WaitStrategy>,
    cursor: Arc<Sequence>,
    dependent_sequence: DependentSequence,
    alerted: AtomicBool,
}

impl ProcessingSequenceBarrier {
    /// Create a barrier over `sequencer` that also trails `dependencies`
    pub fn new(sequencer: Arc<dyn Sequencer>, dependencies: &[Arc<Sequence>]) -> Self {
        let cursor = sequencer.cursor_sequence();
        let dependent_sequence = DependentSequence::new(&cursor, dependencies);

        Self {
            wait_strategy: sequencer.wait_strategy(),
            sequencer,
            cursor,
            dependent_sequence,
            alerted: AtomicBool::new(false),
        }
    }
}

impl SequenceBarrier for ProcessingSequenceBarrier {
    fn wait_for(&self, sequence: i64) -> Result<i64> {
        self.check_alert()?;

        let available_sequence =
            self.wait_strategy
                .wait_for(sequence, &self.cursor, &self.dependent_sequence, self)?;

        if available_sequence < sequence {
            return Ok(available_sequence);
        }

        Ok(self
            .sequencer
            .get_highest_published_sequence(sequence, available_sequence))
    }

    fn get_cursor(&self) -> i64 {
        self.dependent_sequence.get()
    }

    fn is_alerted(&self) -> bool {
        self.alerted.load(Ordering::Acquire)
    }

    fn alert(&self) {
        self.alerted.store(true, Ordering::SeqCst);
        self.wait_strategy.signal_all_when_blocking();
    }

    fn clear_alert(&self) {
        self.alerted.store(false, Ordering::SeqCst);
    }
}
