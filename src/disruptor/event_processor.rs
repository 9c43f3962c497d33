//! Event Processor implementation for the Disruptor
//!
//! [`BatchEventProcessor`] drives an [`EventHandler`] from a sequence barrier:
//! it waits for the next available range, delivers every event in it, and
//! then advances its own sequence once for the whole batch.

use crate::disruptor::{
    BatchRewindStrategy, DataProvider, DefaultExceptionHandler, DisruptorError, EventHandler,
    ExceptionHandler, Result, RewindAction, Sequence, SequenceBarrier, SimpleBatchRewindStrategy,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tracing::debug;

const IDLE: u8 = 0;
const HALTED: u8 = 1;
const RUNNING: u8 = 2;

/// A consumer loop that can be run on a dedicated thread and halted from another
pub trait EventProcessor: Send + Sync {
    /// The sequence this processor has completed, used for gating
    fn get_sequence(&self) -> Arc<Sequence>;

    /// Signal the processor to stop after the current batch
    fn halt(&self);

    /// Check if the processor loop is currently running
    fn is_running(&self) -> bool;

    /// Run the processing loop on the calling thread until halted
    ///
    /// # Errors
    /// `AlreadyRunning` if another thread is running this processor
    fn run(&self) -> Result<()>;
}

/// Stores `IDLE` when `run` leaves, including by unwinding
struct IdleOnExit<'a>(&'a AtomicU8);

impl Drop for IdleOnExit<'_> {
    fn drop(&mut self) {
        self.0.store(IDLE, Ordering::Release);
    }
}

/// Batch event processor
///
/// State moves `IDLE -> RUNNING` by compare-and-swap when `run` starts and
/// back to `IDLE` when it returns. `halt` stores `HALTED` and alerts the
/// barrier; a processor halted before it ever ran exits immediately and stays
/// halted.
pub struct BatchEventProcessor<T, H> {
    data_provider: Arc<dyn DataProvider<T>>,
    sequence_barrier: Arc<dyn SequenceBarrier>,
    event_handler: Mutex<H>,
    sequence: Arc<Sequence>,
    running: AtomicU8,
    exception_handler: Box<dyn ExceptionHandler<T>>,
    rewind_strategy: Box<dyn BatchRewindStrategy>,
}

impl<T, H> BatchEventProcessor<T, H>
where
    T: Send + Sync + 'static,
    H: EventHandler<T>,
{
    /// Create a new batch event processor
    ///
    /// The handler receives the processor's sequence through
    /// [`EventHandler::set_sequence_callback`].
    pub fn new(
        data_provider: Arc<dyn DataProvider<T>>,
        sequence_barrier: Arc<dyn SequenceBarrier>,
        mut event_handler: H,
    ) -> Self {
        let sequence = Arc::new(Sequence::default());
        event_handler.set_sequence_callback(Arc::clone(&sequence));

        Self {
            data_provider,
            sequence_barrier,
            event_handler: Mutex::new(event_handler),
            sequence,
            running: AtomicU8::new(IDLE),
            exception_handler: Box::new(DefaultExceptionHandler::new()),
            rewind_strategy: Box::new(SimpleBatchRewindStrategy::new()),
        }
    }

    /// Replace the exception handler (default: log and continue)
    pub fn with_exception_handler<E>(mut self, exception_handler: E) -> Self
    where
        E: ExceptionHandler<T> + 'static,
    {
        self.exception_handler = Box::new(exception_handler);
        self
    }

    /// Replace the rewind strategy (default: always rewind)
    pub fn with_rewind_strategy<R>(mut self, rewind_strategy: R) -> Self
    where
        R: BatchRewindStrategy + 'static,
    {
        self.rewind_strategy = Box::new(rewind_strategy);
        self
    }

    fn process_events(&self, handler: &mut H) {
        let mut next_sequence = self.sequence.get() + 1;
        let mut retries_attempted: u32 = 0;

        loop {
            let start_of_batch = next_sequence;

            let available_sequence = match self.sequence_barrier.wait_for(next_sequence) {
                Ok(available_sequence) => available_sequence,
                Err(DisruptorError::Timeout) => {
                    self.notify_timeout(handler, self.sequence.get());
                    continue;
                }
                Err(DisruptorError::Alert) => {
                    if self.running.load(Ordering::Acquire) != RUNNING {
                        break;
                    }
                    continue;
                }
                Err(error) => {
                    self.exception_handler
                        .handle_event_exception(error, next_sequence, None);
                    self.sequence.set(next_sequence);
                    next_sequence += 1;
                    continue;
                }
            };

            match self.deliver(handler, &mut next_sequence, available_sequence) {
                Ok(()) => {
                    retries_attempted = 0;
                    self.sequence.set(available_sequence);
                }
                Err(error @ DisruptorError::Rewindable(_)) => {
                    retries_attempted = retries_attempted.saturating_add(1);
                    match self
                        .rewind_strategy
                        .handle_rewind_error(&error, retries_attempted)
                    {
                        RewindAction::Rewind => {
                            debug!(start_of_batch, retries_attempted, "rewinding batch");
                            next_sequence = start_of_batch;
                        }
                        RewindAction::Throw => {
                            retries_attempted = 0;
                            self.skip_failed_event(error, &mut next_sequence);
                        }
                    }
                }
                Err(error) => self.skip_failed_event(error, &mut next_sequence),
            }
        }
    }

    fn deliver(
        &self,
        handler: &mut H,
        next_sequence: &mut i64,
        available_sequence: i64,
    ) -> Result<()> {
        if available_sequence >= *next_sequence {
            handler.on_batch_start(available_sequence - *next_sequence + 1);
        }

        while *next_sequence <= available_sequence {
            // SAFETY: the barrier only returns published sequences, and the
            // ring cannot wrap them while our sequence gates the producers.
            let event = unsafe { self.data_provider.get(*next_sequence) };
            handler.on_event(event, *next_sequence, *next_sequence == available_sequence)?;
            *next_sequence += 1;
        }

        Ok(())
    }

    /// Report a failure raised by the handler for `next_sequence` and move past it
    fn skip_failed_event(&self, error: DisruptorError, next_sequence: &mut i64) {
        // SAFETY: the handler was just given this published event.
        let event = unsafe { self.data_provider.get(*next_sequence) };
        self.exception_handler
            .handle_event_exception(error, *next_sequence, Some(event));
        self.sequence.set(*next_sequence);
        *next_sequence += 1;
    }

    fn notify_timeout(&self, handler: &mut H, sequence: i64) {
        if let Err(error) = handler.on_timeout(sequence) {
            self.exception_handler
                .handle_event_exception(error, sequence, None);
        }
    }

    fn notify_start(&self, handler: &mut H) {
        if let Err(error) = handler.on_start() {
            self.exception_handler.handle_on_start_exception(error);
        }
    }

    fn notify_shutdown(&self, handler: &mut H) {
        if let Err(error) = handler.on_shutdown() {
            self.exception_handler.handle_on_shutdown_exception(error);
        }
    }
}

impl<T, H> EventProcessor for BatchEventProcessor<T, H>
where
    T: Send + Sync + 'static,
    H: EventHandler<T>,
{
    fn get_sequence(&self) -> Arc<Sequence> {
        Arc::clone(&self.sequence)
    }

    fn halt(&self) {
        self.running.store(HALTED, Ordering::Release);
        self.sequence_barrier.alert();
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire) == RUNNING
    }

    fn run(&self) -> Result<()> {
        match self
            .running
            .compare_exchange(IDLE, RUNNING, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => {
                let _idle = IdleOnExit(&self.running);
                self.sequence_barrier.clear_alert();

                let mut handler = self.event_handler.lock();
                debug!(sequence = self.sequence.get(), "event processor started");
                self.notify_start(&mut handler);

                if self.running.load(Ordering::Acquire) == RUNNING {
                    self.process_events(&mut handler);
                }

                self.notify_shutdown(&mut handler);
                debug!(sequence = self.sequence.get(), "event processor stopped");
                Ok(())
            }
            Err(RUNNING) => Err(DisruptorError::AlreadyRunning),
            Err(_) => {
                debug!("event processor halted before start");
                let mut handler = self.event_handler.lock();
                self.notify_start(&mut handler);
                self.notify_shutdown(&mut handler);
                Ok(())
            }
        }
    }
}
