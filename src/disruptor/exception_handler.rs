//! Exception Handler Implementation
//!
//! Exception handlers receive the failures an event processor cannot deal
//! with itself: handler errors, rewinds that gave up, and errors from the
//! lifecycle hooks. After `handle_event_exception` returns the processor
//! moves past the failed event.

use crate::disruptor::DisruptorError;
use tracing::{error, info};

/// Handler for errors raised while processing events
///
/// # Type Parameters
/// * `T` - The event type being processed
pub trait ExceptionHandler<T>: Send + Sync {
    /// Handle an error raised for the event at `sequence`
    ///
    /// `event` is `None` when the failure is not tied to a slot, such as an
    /// error from the handler's timeout hook.
    fn handle_event_exception(&self, error: DisruptorError, sequence: i64, event: Option<&T>);

    /// Handle an error raised by the handler's start hook
    fn handle_on_start_exception(&self, error: DisruptorError);

    /// Handle an error raised by the handler's shutdown hook
    fn handle_on_shutdown_exception(&self, error: DisruptorError);
}

/// Exception handler that logs every failure at error level
#[derive(Debug, Default)]
pub struct DefaultExceptionHandler<T> {
    _phantom: std::marker::PhantomData<fn(&T)>,
}

impl<T> DefaultExceptionHandler<T> {
    /// Create a new default exception handler
    pub fn new() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<T> ExceptionHandler<T> for DefaultExceptionHandler<T> {
    fn handle_event_exception(&self, error: DisruptorError, sequence: i64, _event: Option<&T>) {
        error!(sequence, %error, "exception processing event");
    }

    fn handle_on_start_exception(&self, error: DisruptorError) {
        error!(%error, "exception during event processor start");
    }

    fn handle_on_shutdown_exception(&self, error: DisruptorError) {
        error!(%error, "exception during event processor shutdown");
    }
}

/// Exception handler that logs failures at info level and carries on
#[derive(Debug, Default)]
pub struct IgnoreExceptionHandler<T> {
    _phantom: std::marker::PhantomData<fn(&T)>,
}

impl<T> IgnoreExceptionHandler<T> {
    /// Create a new ignore exception handler
    pub fn new() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<T> ExceptionHandler<T> for IgnoreExceptionHandler<T> {
    fn handle_event_exception(&self, error: DisruptorError, sequence: i64, _event: Option<&T>) {
        info!(sequence, %error, "ignoring exception processing event");
    }

    fn handle_on_start_exception(&self, error: DisruptorError) {
        info!(%error, "ignoring exception during event processor start");
    }

    fn handle_on_shutdown_exception(&self, error: DisruptorError) {
        info!(%error, "ignoring exception during event processor shutdown");
    }
}

/// Exception handler that logs and then panics the processor thread
///
/// Use when any handler failure must stop processing.
#[derive(Debug, Default)]
pub struct PanicExceptionHandler<T> {
    _phantom: std::marker::PhantomData<fn(&T)>,
}

impl<T> PanicExceptionHandler<T> {
    /// Create a new panic exception handler
    pub fn new() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<T> ExceptionHandler<T> for PanicExceptionHandler<T> {
    fn handle_event_exception(&self, error: DisruptorError, sequence: i64, _event: Option<&T>) {
        error!(sequence, %error, "fatal exception processing event");
        panic!("Exception processing event at sequence {sequence}: {error}");
    }

    fn handle_on_start_exception(&self, error: DisruptorError) {
        error!(%error, "fatal exception during event processor start");
        panic!("Exception during event processor start: {error}");
    }

    fn handle_on_shutdown_exception(&self, error: DisruptorError) {
        error!(%error, "fatal exception during event processor shutdown");
        panic!("Exception during event processor shutdown: {error}");
    }
}

/// Closure-based exception handler
///
/// # Type Parameters
/// * `T` - The event type
/// * `F` - The closure type for event exceptions
/// * `S` - The closure type for start exceptions
/// * `H` - The closure type for shutdown exceptions
pub struct ClosureExceptionHandler<T, F, S, H>
where
    F: Fn(DisruptorError, i64, Option<&T>) + Send + Sync,
    S: Fn(DisruptorError) + Send + Sync,
    H: Fn(DisruptorError) + Send + Sync,
{
    event_handler: F,
    start_handler: S,
    shutdown_handler: H,
    _phantom: std::marker::PhantomData<fn(&T)>,
}

impl<T, F, S, H> ClosureExceptionHandler<T, F, S, H>
where
    F: Fn(DisruptorError, i64, Option<&T>) + Send + Sync,
    S: Fn(DisruptorError) + Send + Sync,
    H: Fn(DisruptorError) + Send + Sync,
{
    /// Create a new closure-based exception handler
    pub fn new(event_handler: F, start_handler: S, shutdown_handler: H) -> Self {
        Self {
            event_handler,
            start_handler,
            shutdown_handler,
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<T, F, S, H> ExceptionHandler<T> for ClosureExceptionHandler<T, F, S, H>
where
    F: Fn(DisruptorError, i64, Option<&T>) + Send + Sync,
    S: Fn(DisruptorError) + Send + Sync,
    H: Fn(DisruptorError) + Send + Sync,
{
    fn handle_event_exception(&self, error: DisruptorError, sequence: i64, event: Option<&T>) {
        (self.event_handler)(error, sequence, event);
    }

    fn handle_on_start_exception(&self, error: DisruptorError) {
        (self.start_handler)(error);
    }

    fn handle_on_shutdown_exception(&self, error: DisruptorError) {
        (self.shutdown_handler)(error);
    }
}
