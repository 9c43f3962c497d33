//! Ringlane sequencing core
//!
//! The Disruptor-style building blocks: padded sequences, the ring of
//! pre-allocated slots, single/multi producer sequencers, sequence barriers
//! with pluggable wait strategies, and the batching event processor.

pub mod core_interfaces;
pub mod event_factory;
pub mod event_handler;
pub mod event_processor;
pub mod exception_handler;
pub mod producer_type;
pub mod rewind;
pub mod ring_buffer;
pub mod sequence;
pub mod sequence_barrier;
pub mod sequencer;
pub mod wait_strategy;


pub use core_interfaces::{Cursored, DataProvider, EventSink, Sequenced};
pub use event_factory::{ClosureEventFactory, DefaultEventFactory, EventFactory};
pub use event_handler::{ClosureEventHandler, EventHandler, NoOpEventHandler};
pub use event_processor::{BatchEventProcessor, EventProcessor};
pub use exception_handler::{
    ClosureExceptionHandler, DefaultExceptionHandler, ExceptionHandler, IgnoreExceptionHandler,
    PanicExceptionHandler,
};
pub use producer_type::ProducerType;
pub use rewind::{
    BatchRewindStrategy, EventuallyGiveUpBatchRewindStrategy, NanosecondPauseBatchRewindStrategy,
    RewindAction, SimpleBatchRewindStrategy,
};
pub use ring_buffer::RingBuffer;
pub use sequence::{DependentSequence, FixedSequenceGroup, Sequence};
pub use sequence_barrier::{ProcessingSequenceBarrier, SequenceBarrier};
pub use sequencer::{MultiProducerSequencer, Sequencer, SingleProducerSequencer};
pub use wait_strategy::{
    BlockingWaitStrategy, BusySpinWaitStrategy, SleepingWaitStrategy, TimeoutBlockingWaitStrategy,
    WaitStrategy, YieldingWaitStrategy,
};

/// The initial cursor value for sequences
pub const INITIAL_CURSOR_VALUE: i64 = -1;

/// Boxed error type carried by handler failures
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur in the Disruptor
#[derive(Debug, thiserror::Error)]
pub enum DisruptorError {
    #[error("Buffer size must be a power of 2 and at least 1, got: {0}")]
    InvalidBufferSize(usize),

    #[error("Claim size must be between 1 and {buffer_size}, got: {requested}")]
    InvalidClaimSize { requested: i64, buffer_size: usize },

    #[error("Insufficient capacity in the ring buffer")]
    InsufficientCapacity,

    #[error("Event processor is already running")]
    AlreadyRunning,

    #[error("Sequence barrier alerted")]
    Alert,

    #[error("Timeout waiting for sequence")]
    Timeout,

    #[error("Rewindable failure while processing batch: {0}")]
    Rewindable(#[source] BoxError),

    #[error("Event handler failed: {0}")]
    Handler(#[source] BoxError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),
}

impl DisruptorError {
    /// Wrap a handler failure that should trigger a batch rewind
    pub fn rewindable<E>(error: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::Rewindable(error.into())
    }

    /// Wrap a handler failure that should be reported and skipped
    pub fn handler<E>(error: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::Handler(error.into())
    }
}

pub type Result<T> = std::result::Result<T, DisruptorError>;

/// Utility function to check if a number is a power of 2
pub fn is_power_of_two(n: usize) -> bool {
    n != 0 && (n & (n - 1)) == 0
}
