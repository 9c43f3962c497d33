//! `Ringlane` - lock-free inter-thread sequencing
//!
//! A single-process messaging core in the style of the LMAX Disruptor: one or
//! more producer threads publish into a fixed-size ring of pre-allocated
//! slots, and consumer threads process them in order, in batches, without
//! locks on the hot path.
//!
//! ## Quick Start
//!
//! ```rust
//! use ringlane::disruptor::{
//!     BatchEventProcessor, BlockingWaitStrategy, DataProvider, DefaultEventFactory,
//!     EventHandler, EventProcessor, EventSink, ProducerType, Result, RingBuffer,
//! };
//! use std::sync::atomic::{AtomicI64, Ordering};
//! use std::sync::Arc;
//! use std::thread;
//!
//! #[derive(Default)]
//! struct Tick {
//!     price: i64,
//! }
//!
//! struct Sum(Arc<AtomicI64>);
//!
//! impl EventHandler<Tick> for Sum {
//!     fn on_event(&mut self, event: &Tick, _sequence: i64, _end_of_batch: bool) -> Result<()> {
//!         self.0.fetch_add(event.price, Ordering::Relaxed);
//!         Ok(())
//!     }
//! }
//!
//! let ring = Arc::new(RingBuffer::create(
//!     ProducerType::Single,
//!     DefaultEventFactory::<Tick>::new(),
//!     64,
//!     Arc::new(BlockingWaitStrategy::new()),
//! ).unwrap());
//!
//! let total = Arc::new(AtomicI64::new(0));
//! let processor = Arc::new(BatchEventProcessor::new(
//!     Arc::clone(&ring) as Arc<dyn DataProvider<Tick>>,
//!     Arc::new(ring.new_barrier(&[])),
//!     Sum(Arc::clone(&total)),
//! ));
//! ring.add_gating_sequences(&[processor.get_sequence()]);
//!
//! let worker = {
//!     let processor = Arc::clone(&processor);
//!     thread::spawn(move || processor.run())
//! };
//!
//! for price in 1..=100 {
//!     ring.publish_event(|tick, _| tick.price = price);
//! }
//!
//! while processor.get_sequence().get() < 99 {
//!     thread::yield_now();
//! }
//! processor.halt();
//! worker.join().unwrap().unwrap();
//!
//! assert_eq!(total.load(Ordering::Relaxed), 5050);
//! ```
//!
//! ## Architecture
//!
//! - **`Sequence`**: cache-padded atomic progress counter
//! - **`RingBuffer`**: pre-allocated slots plus the producer API
//! - **`Sequencer`**: claim/publish protocol, single or multi producer
//! - **`SequenceBarrier`**: consumer-side wait on cursor and upstream consumers
//! - **`WaitStrategy`**: how a consumer waits (block, spin, yield, sleep)
//! - **`BatchEventProcessor`**: the batching consumer loop
//! - **`RingConfig`**: serde-backed configuration for the above

pub mod config;
pub mod disruptor;

pub use config::{RewindPolicy, RingConfig, WaitStrategyKind};
pub use disruptor::{
    is_power_of_two, BatchEventProcessor, BatchRewindStrategy, BlockingWaitStrategy,
    BusySpinWaitStrategy, DefaultEventFactory, DisruptorError, EventFactory, EventHandler,
    EventProcessor, EventSink, ExceptionHandler, MultiProducerSequencer, ProducerType, Result,
    RingBuffer, Sequence, SequenceBarrier, Sequencer, SingleProducerSequencer,
    SleepingWaitStrategy, TimeoutBlockingWaitStrategy, WaitStrategy, YieldingWaitStrategy,
    INITIAL_CURSOR_VALUE,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get the version of the `Ringlane` library
#[must_use]
pub fn version() -> &'static str {
    VERSION
}
