//! Event Handler Implementation
//!
//! The [`EventHandler`] trait is the consumer callback driven by a
//! [`BatchEventProcessor`](crate::disruptor::BatchEventProcessor). Besides
//! `on_event` it carries the lifecycle, batch-start, timeout and early-release
//! hooks, all of which default to no-ops.

use crate::disruptor::{Result, Sequence};
use std::sync::Arc;

/// Handler for processing events published to a ring buffer
///
/// Events are handed out by shared reference: other consumers may be reading
/// the same slot concurrently.
///
/// # Errors
/// Returning [`DisruptorError::Rewindable`](crate::disruptor::DisruptorError::Rewindable)
/// asks the processor to replay the current batch; any other error is passed
/// to the processor's exception handler and the event is skipped.
///
/// # Examples
/// ```
/// use ringlane::disruptor::{EventHandler, Result};
///
/// #[derive(Default)]
/// struct Trade {
///     price: i64,
/// }
///
/// #[derive(Default)]
/// struct Totaliser {
///     total: i64,
/// }
///
/// impl EventHandler<Trade> for Totaliser {
///     fn on_event(&mut self, event: &Trade, _sequence: i64, _end_of_batch: bool) -> Result<()> {
///         self.total += event.price;
///         Ok(())
///     }
/// }
/// ```
pub trait EventHandler<T>: Send {
    /// Process one event
    ///
    /// # Arguments
    /// * `event` - The event in the ring buffer slot
    /// * `sequence` - The sequence of the event
    /// * `end_of_batch` - True for the last event of the batch being delivered
    fn on_event(&mut self, event: &T, sequence: i64, end_of_batch: bool) -> Result<()>;

    /// Called once on the processor thread before the first event
    fn on_start(&mut self) -> Result<()> {
        Ok(())
    }

    /// Called once on the processor thread after the last event
    fn on_shutdown(&mut self) -> Result<()> {
        Ok(())
    }

    /// Called before a batch of `batch_size` events is delivered
    fn on_batch_start(&mut self, _batch_size: i64) {}

    /// Called when a timed wait strategy gave up waiting
    ///
    /// `sequence` is the last sequence this handler completed.
    fn on_timeout(&mut self, _sequence: i64) -> Result<()> {
        Ok(())
    }

    /// Receive the processor's own sequence for early release
    ///
    /// A handler that finishes with an event before the end of its batch may
    /// `set` this sequence so downstream consumers can start sooner.
    fn set_sequence_callback(&mut self, _sequence_callback: Arc<Sequence>) {}
}

/// An event handler built from a closure
///
/// # Type Parameters
/// * `T` - The event type
/// * `F` - The closure type
pub struct ClosureEventHandler<T, F>
where
    F: FnMut(&T, i64, bool) -> Result<()> + Send,
{
    handler: F,
    _phantom: std::marker::PhantomData<fn(&T)>,
}

impl<T, F> ClosureEventHandler<T, F>
where
    F: FnMut(&T, i64, bool) -> Result<()> + Send,
{
    /// Create a new closure-based event handler
    pub fn new(handler: F) -> Self {
        Self {
            handler,
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<T, F> EventHandler<T> for ClosureEventHandler<T, F>
where
    F: FnMut(&T, i64, bool) -> Result<()> + Send,
{
    fn on_event(&mut self, event: &T, sequence: i64, end_of_batch: bool) -> Result<()> {
        (self.handler)(event, sequence, end_of_batch)
    }
}

/// An event handler that does nothing, for measuring processor overhead
pub struct NoOpEventHandler<T> {
    _phantom: std::marker::PhantomData<fn(&T)>,
}

impl<T> NoOpEventHandler<T> {
    /// Create a new no-op event handler
    pub fn new() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<T> Default for NoOpEventHandler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> EventHandler<T> for NoOpEventHandler<T> {
    fn on_event(&mut self, _event: &T, _sequence: i64, _end_of_batch: bool) -> Result<()> {
        Ok(())
    }
}
