//! Ring Buffer Implementation
//!
//! The ring buffer is a pre-allocated circular array of slots. Every slot is
//! filled once by an [`EventFactory`] and then reused for the lifetime of the
//! buffer. Claiming, publishing and gating are delegated to a [`Sequencer`].

use crate::disruptor::core_interfaces::{Cursored, DataProvider, EventSink, Sequenced};
use crate::disruptor::{
    EventFactory, MultiProducerSequencer, ProcessingSequenceBarrier, ProducerType, Result,
    Sequence, Sequencer, SingleProducerSequencer, WaitStrategy,
};
use parking_lot::{Mutex, MutexGuard};
use std::cell::UnsafeCell;
use std::sync::Arc;

/// Bytes of padding kept on each side of the live slots
const PAD_BYTES: usize = 128;

/// The core ring buffer for storing events
///
/// Slot storage is a single `Box<[UnsafeCell<T>]>` with padding slots before
/// and after the live region, so the first and last live slots never share a
/// cache line with unrelated data. Padding slots are filled by the same
/// factory and never handed out.
///
/// Over a single producer sequencer the [`EventSink`] methods hold a producer
/// lock from claim to publish, so sharing the buffer between threads can
/// serialize them but never hands one slot to two translators. The lock is
/// uncontended when only one thread publishes.
///
/// # Type Parameters
/// * `T` - The event type stored in the buffer
pub struct RingBuffer<T> {
    slots: Box<[UnsafeCell<T>]>,
    index_mask: i64,
    pad: usize,
    buffer_size: usize,
    sequencer: Arc<dyn Sequencer>,
    producer_lock: Option<Mutex<()>>,
}

// SAFETY: slot access is coordinated by the sequencer protocol: a slot is
// written only by the producer that claimed it and read only after its
// sequence is published.
unsafe impl<T: Send> Send for RingBuffer<T> {}
unsafe impl<T: Send + Sync> Sync for RingBuffer<T> {}

impl<T> RingBuffer<T> {
    /// Create a ring buffer for the given producer type
    ///
    /// # Errors
    /// `InvalidBufferSize` if `buffer_size` is not a power of two
    pub fn create<F>(
        producer_type: ProducerType,
        event_factory: F,
        buffer_size: usize,
        wait_strategy: Arc<dyn WaitStrategy>,
    ) -> Result<Self>
    where
        F: EventFactory<T>,
    {
        match producer_type {
            ProducerType::Single => {
                Self::create_single_producer(event_factory, buffer_size, wait_strategy)
            }
            ProducerType::Multi => {
                Self::create_multi_producer(event_factory, buffer_size, wait_strategy)
            }
        }
    }

    /// Create a ring buffer for exactly one publishing thread
    ///
    /// Claims through [`Sequenced`] are not synchronized: two threads calling
    /// `next` concurrently can receive the same sequence. The closure
    /// publishing of [`EventSink`] is safe from any thread; code that claims
    /// by hand and writes through [`RingBuffer::get_mut`] must keep to one
    /// producer thread at a time.
    ///
    /// # Errors
    /// `InvalidBufferSize` if `buffer_size` is not a power of two
    pub fn create_single_producer<F>(
        event_factory: F,
        buffer_size: usize,
        wait_strategy: Arc<dyn WaitStrategy>,
    ) -> Result<Self>
    where
        F: EventFactory<T>,
    {
        let sequencer = SingleProducerSequencer::new(buffer_size, wait_strategy)?;
        Ok(Self::new(Arc::new(sequencer), event_factory))
    }

    /// Create a ring buffer that any number of threads may publish to
    ///
    /// # Errors
    /// `InvalidBufferSize` if `buffer_size` is not a power of two
    pub fn create_multi_producer<F>(
        event_factory: F,
        buffer_size: usize,
        wait_strategy: Arc<dyn WaitStrategy>,
    ) -> Result<Self>
    where
        F: EventFactory<T>,
    {
        let sequencer = MultiProducerSequencer::new(buffer_size, wait_strategy)?;
        Ok(Self::new(Arc::new(sequencer), event_factory))
    }

    /// Create a ring buffer over an existing sequencer
    ///
    /// The sequencer's buffer size has already been validated.
    pub fn new<F>(sequencer: Arc<dyn Sequencer>, event_factory: F) -> Self
    where
        F: EventFactory<T>,
    {
        let buffer_size = sequencer.get_buffer_size();
        let producer_lock = sequencer.producer_type().is_single().then(|| Mutex::new(()));
        let pad = (PAD_BYTES / std::mem::size_of::<T>().max(1)).max(1);

        let slots: Box<[UnsafeCell<T>]> = (0..buffer_size + 2 * pad)
            .map(|_| UnsafeCell::new(event_factory.new_instance()))
            .collect();

        Self {
            slots,
            index_mask: buffer_size as i64 - 1,
            pad,
            buffer_size,
            sequencer,
            producer_lock,
        }
    }

    #[inline]
    fn slot(&self, sequence: i64) -> *mut T {
        let index = self.pad + (sequence & self.index_mask) as usize;
        // SAFETY: index is below pad + buffer_size, inside the allocation.
        unsafe { self.slots.get_unchecked(index).get() }
    }

    /// Get a reference to the event at `sequence`
    ///
    /// # Safety
    /// `sequence` must be published (or otherwise owned by the caller) and
    /// must not be claimed again by a producer while the reference lives.
    #[inline]
    pub unsafe fn get(&self, sequence: i64) -> &T {
        &*self.slot(sequence)
    }

    /// Get a mutable reference to the event at `sequence`
    ///
    /// # Safety
    /// The caller must hold the claim on `sequence` and it must not be
    /// published yet; no other reference to the slot may exist. On a single
    /// producer buffer the claim is only exclusive if no other thread claims
    /// or publishes concurrently.
    #[allow(clippy::mut_from_ref)]
    #[inline]
    pub unsafe fn get_mut(&self, sequence: i64) -> &mut T {
        &mut *self.slot(sequence)
    }

    /// Move the claim position to `sequence` and return its slot
    ///
    /// # Safety
    /// Only for initialising a buffer before any producer or consumer runs.
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn claim_and_get_preallocated(&self, sequence: i64) -> &mut T {
        self.sequencer.claim(sequence);
        self.get_mut(sequence)
    }

    /// Number of live slots
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// The sequencer coordinating this buffer
    pub fn sequencer(&self) -> &Arc<dyn Sequencer> {
        &self.sequencer
    }

    /// Check whether `sequence` has been published and not yet wrapped
    pub fn is_available(&self, sequence: i64) -> bool {
        self.sequencer.is_available(sequence)
    }

    /// Register consumer sequences that producers must not overtake
    pub fn add_gating_sequences(&self, gating_sequences: &[Arc<Sequence>]) {
        self.sequencer.add_gating_sequences(gating_sequences);
    }

    /// Stop gating producers on `sequence`
    ///
    /// # Returns
    /// True if the sequence was registered
    pub fn remove_gating_sequence(&self, sequence: &Arc<Sequence>) -> bool {
        self.sequencer.remove_gating_sequence(sequence)
    }

    /// Minimum of the gating sequences, or the cursor if there are none
    pub fn get_minimum_gating_sequence(&self) -> i64 {
        self.sequencer.get_minimum_sequence()
    }

    /// Create a barrier for a consumer that trails `sequences_to_track`
    ///
    /// An empty slice makes the consumer follow the producer cursor directly.
    pub fn new_barrier(&self, sequences_to_track: &[Arc<Sequence>]) -> ProcessingSequenceBarrier {
        ProcessingSequenceBarrier::new(Arc::clone(&self.sequencer), sequences_to_track)
    }
}

impl<T> std::fmt::Debug for RingBuffer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RingBuffer")
            .field("buffer_size", &self.buffer_size)
            .field("pad", &self.pad)
            .field("sequencer", &self.sequencer)
            .finish()
    }
}

impl<T> Cursored for RingBuffer<T> {
    fn get_cursor(&self) -> i64 {
        self.sequencer.get_cursor()
    }
}

impl<T> Sequenced for RingBuffer<T> {
    fn get_buffer_size(&self) -> usize {
        self.buffer_size
    }

    fn has_available_capacity(&self, required_capacity: usize) -> bool {
        self.sequencer.has_available_capacity(required_capacity)
    }

    fn remaining_capacity(&self) -> i64 {
        self.sequencer.remaining_capacity()
    }

    fn next(&self) -> i64 {
        self.sequencer.next()
    }

    fn next_n(&self, n: i64) -> Result<i64> {
        self.sequencer.next_n(n)
    }

    fn try_next(&self) -> Result<i64> {
        self.sequencer.try_next()
    }

    fn try_next_n(&self, n: i64) -> Result<i64> {
        self.sequencer.try_next_n(n)
    }

    fn publish(&self, sequence: i64) {
        self.sequencer.publish(sequence);
    }

    fn publish_range(&self, lo: i64, hi: i64) {
        self.sequencer.publish_range(lo, hi);
    }
}

impl<T: Send + Sync> DataProvider<T> for RingBuffer<T> {
    unsafe fn get(&self, sequence: i64) -> &T {
        RingBuffer::get(self, sequence)
    }
}

/// Publishes a claimed range when dropped, so a panicking translator cannot
/// leave a hole that stalls every consumer
struct PublishOnDrop<'a> {
    sequencer: &'a dyn Sequencer,
    lo: i64,
    hi: i64,
}

impl Drop for PublishOnDrop<'_> {
    fn drop(&mut self) {
        if self.lo == self.hi {
            self.sequencer.publish(self.hi);
        } else {
            self.sequencer.publish_range(self.lo, self.hi);
        }
    }
}

impl<T> RingBuffer<T> {
    /// Serializes closure publishers over a single producer sequencer
    #[inline]
    fn lock_producer(&self) -> Option<MutexGuard<'_, ()>> {
        self.producer_lock.as_ref().map(Mutex::lock)
    }

    fn translate_and_publish<F>(&self, sequence: i64, translator: F)
    where
        F: FnOnce(&mut T, i64),
    {
        let _publish = PublishOnDrop {
            sequencer: self.sequencer.as_ref(),
            lo: sequence,
            hi: sequence,
        };
        // SAFETY: the sequence was just claimed by this call.
        translator(unsafe { self.get_mut(sequence) }, sequence);
    }

    fn translate_and_publish_range<F>(&self, lo: i64, hi: i64, mut translator: F)
    where
        F: FnMut(&mut T, i64),
    {
        let _publish = PublishOnDrop {
            sequencer: self.sequencer.as_ref(),
            lo,
            hi,
        };
        for sequence in lo..=hi {
            // SAFETY: the whole range was just claimed by this call.
            translator(unsafe { self.get_mut(sequence) }, sequence);
        }
    }
}

fn claim_count(count: usize) -> i64 {
    i64::try_from(count).unwrap_or(i64::MAX)
}

impl<T> EventSink<T> for RingBuffer<T> {
    fn publish_event<F>(&self, translator: F)
    where
        F: FnOnce(&mut T, i64),
    {
        let _producer = self.lock_producer();
        let sequence = self.sequencer.next();
        self.translate_and_publish(sequence, translator);
    }

    fn try_publish_event<F>(&self, translator: F) -> bool
    where
        F: FnOnce(&mut T, i64),
    {
        let _producer = self.lock_producer();
        match self.sequencer.try_next() {
            Ok(sequence) => {
                self.translate_and_publish(sequence, translator);
                true
            }
            Err(_) => false,
        }
    }

    fn publish_events<F>(&self, count: usize, translator: F) -> Result<()>
    where
        F: FnMut(&mut T, i64),
    {
        let _producer = self.lock_producer();
        let n = claim_count(count);
        let hi = self.sequencer.next_n(n)?;
        self.translate_and_publish_range(hi - (n - 1), hi, translator);
        Ok(())
    }

    fn try_publish_events<F>(&self, count: usize, translator: F) -> Result<()>
    where
        F: FnMut(&mut T, i64),
    {
        let _producer = self.lock_producer();
        let n = claim_count(count);
        let hi = self.sequencer.try_next_n(n)?;
        self.translate_and_publish_range(hi - (n - 1), hi, translator);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disruptor::{
        BlockingWaitStrategy, ClosureEventFactory, DefaultEventFactory, DisruptorError,
        SequenceBarrier,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Default, Clone, PartialEq)]
    struct TestEvent {
        value: i64,
    }

    fn wait_strategy() -> Arc<dyn WaitStrategy> {
        Arc::new(BlockingWaitStrategy::new())
    }

    fn ring(producer_type: ProducerType, size: usize) -> RingBuffer<TestEvent> {
        RingBuffer::create(
            producer_type,
            DefaultEventFactory::<TestEvent>::new(),
            size,
            wait_strategy(),
        )
        .unwrap()
    }

    #[test]
    fn test_create_rejects_invalid_sizes() {
        for size in [0, 3, 7, 100] {
            let result = RingBuffer::create(
                ProducerType::Single,
                DefaultEventFactory::<TestEvent>::new(),
                size,
                wait_strategy(),
            );
            assert!(matches!(result, Err(DisruptorError::InvalidBufferSize(s)) if s == size));
        }
    }

    #[test]
    fn test_factory_fills_live_and_padding_slots() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let factory = ClosureEventFactory::new(move || {
            counter.fetch_add(1, Ordering::Relaxed);
            TestEvent { value: 7 }
        });

        let buffer =
            RingBuffer::create_single_producer(factory, 8, wait_strategy()).unwrap();
        let pad = PAD_BYTES / std::mem::size_of::<TestEvent>();

        assert_eq!(buffer.buffer_size(), 8);
        assert_eq!(calls.load(Ordering::Relaxed), 8 + 2 * pad);
        for sequence in 0..8 {
            assert_eq!(unsafe { buffer.get(sequence) }.value, 7);
        }
    }

    #[test]
    fn test_sequences_wrap_onto_same_slot() {
        let buffer = ring(ProducerType::Single, 4);
        unsafe {
            buffer.get_mut(1).value = 42;
            assert_eq!(buffer.get(5).value, 42);
            assert!(std::ptr::eq(buffer.get(2), buffer.get(6)));
        }
    }

    #[test]
    fn test_claim_write_publish() {
        for producer_type in [ProducerType::Single, ProducerType::Multi] {
            let buffer = ring(producer_type, 8);
            let sequence = buffer.next();
            unsafe { buffer.get_mut(sequence).value = 11 };
            assert!(!buffer.is_available(sequence));

            buffer.publish(sequence);
            assert!(buffer.is_available(sequence));
            assert_eq!(buffer.get_cursor(), 0);
            assert_eq!(unsafe { buffer.get(sequence) }.value, 11);
        }
    }

    #[test]
    fn test_publish_event_with_closure() {
        let buffer = ring(ProducerType::Multi, 8);
        buffer.publish_event(|event, sequence| event.value = sequence * 10);
        buffer.publish_event(|event, sequence| event.value = sequence * 10);

        assert_eq!(buffer.get_cursor(), 1);
        assert!(buffer.is_available(1));
        assert_eq!(unsafe { buffer.get(1) }.value, 10);
    }

    #[test]
    fn test_publish_events_batch() {
        let buffer = ring(ProducerType::Single, 8);
        buffer
            .publish_events(3, |event, sequence| event.value = sequence + 100)
            .unwrap();

        assert_eq!(buffer.get_cursor(), 2);
        for sequence in 0..3 {
            assert_eq!(unsafe { buffer.get(sequence) }.value, sequence + 100);
        }

        assert!(matches!(
            buffer.publish_events(0, |_, _| {}),
            Err(DisruptorError::InvalidClaimSize { requested: 0, .. })
        ));
        assert!(matches!(
            buffer.publish_events(9, |_, _| {}),
            Err(DisruptorError::InvalidClaimSize { requested: 9, .. })
        ));
    }

    #[test]
    fn test_try_publish_respects_gating() {
        let buffer = ring(ProducerType::Multi, 4);
        let consumer = Arc::new(Sequence::default());
        buffer.add_gating_sequences(&[Arc::clone(&consumer)]);

        buffer.try_publish_events(4, |event, seq| event.value = seq).unwrap();
        assert!(!buffer.try_publish_event(|event, _| event.value = -1));
        assert!(matches!(
            buffer.try_publish_events(1, |_, _| {}),
            Err(DisruptorError::InsufficientCapacity)
        ));
        assert_eq!(buffer.get_minimum_gating_sequence(), -1);

        consumer.set(0);
        assert!(buffer.try_publish_event(|event, _| event.value = -1));
        assert_eq!(unsafe { buffer.get(4) }.value, -1);

        assert!(buffer.remove_gating_sequence(&consumer));
        assert!(buffer.has_available_capacity(4));
    }

    #[test]
    fn test_panicking_translator_still_publishes() {
        let buffer = ring(ProducerType::Multi, 4);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            buffer.publish_event(|_, _| panic!("translator failed"));
        }));

        assert!(result.is_err());
        assert!(buffer.is_available(0));
    }

    #[test]
    fn test_shared_single_producer_sink_claims_unique_slots() {
        const THREADS: usize = 4;
        const PER_THREAD: usize = 2_000;
        let buffer = Arc::new(ring(ProducerType::Single, 1 << 14));

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let buffer = Arc::clone(&buffer);
                std::thread::spawn(move || {
                    let mut claimed = Vec::with_capacity(PER_THREAD);
                    for _ in 0..PER_THREAD {
                        buffer.publish_event(|event, seq| {
                            event.value = seq;
                            claimed.push(seq);
                        });
                    }
                    claimed
                })
            })
            .collect();

        let mut claimed: Vec<i64> = handles
            .into_iter()
            .flat_map(|handle| handle.join().unwrap())
            .collect();
        claimed.sort_unstable();

        let total = (THREADS * PER_THREAD) as i64;
        assert_eq!(claimed, (0..total).collect::<Vec<_>>());
        assert_eq!(buffer.get_cursor(), total - 1);
        for seq in 0..total {
            assert_eq!(unsafe { buffer.get(seq) }.value, seq);
        }
    }

    #[test]
    fn test_single_producer_sink_survives_panicking_translator() {
        let buffer = ring(ProducerType::Single, 4);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            buffer.publish_event(|_, _| panic!("translator failed"));
        }));

        assert!(result.is_err());
        buffer.publish_event(|event, _| event.value = 7);
        assert_eq!(buffer.get_cursor(), 1);
        assert_eq!(unsafe { buffer.get(1) }.value, 7);
    }

    #[test]
    fn test_oversized_publish_requests_fail_cleanly() {
        let buffer = ring(ProducerType::Single, 8);
        buffer.publish_events(2, |event, seq| event.value = seq).unwrap();

        assert!(matches!(
            buffer.try_publish_events(usize::MAX, |_, _| {}),
            Err(DisruptorError::InsufficientCapacity)
        ));
        assert!(matches!(
            buffer.try_publish_events(9, |_, _| {}),
            Err(DisruptorError::InsufficientCapacity)
        ));
        assert!(matches!(
            buffer.publish_events(usize::MAX, |_, _| {}),
            Err(DisruptorError::InvalidClaimSize { .. })
        ));
        assert_eq!(buffer.get_cursor(), 1);

        let multi = ring(ProducerType::Multi, 8);
        multi.add_gating_sequences(&[Arc::new(Sequence::default())]);
        assert!(!multi.has_available_capacity(usize::MAX));
        assert!(multi.has_available_capacity(8));
    }

    #[test]
    fn test_claim_and_get_preallocated() {
        let buffer = ring(ProducerType::Single, 8);
        unsafe {
            buffer.claim_and_get_preallocated(3).value = 5;
        }
        assert_eq!(buffer.next(), 4);
        assert_eq!(unsafe { buffer.get(3) }.value, 5);
    }

    #[test]
    fn test_new_barrier_tracks_cursor() {
        let buffer = ring(ProducerType::Single, 8);
        let barrier = buffer.new_barrier(&[]);

        buffer.publish_event(|event, _| event.value = 1);
        buffer.publish_event(|event, _| event.value = 2);

        assert_eq!(barrier.wait_for(0).unwrap(), 1);
        assert_eq!(barrier.get_cursor(), 1);
    }

    #[test]
    fn test_data_provider_view() {
        let buffer = Arc::new(ring(ProducerType::Single, 4));
        buffer.publish_event(|event, _| event.value = 99);

        let provider: Arc<dyn DataProvider<TestEvent>> = buffer;
        assert_eq!(unsafe { provider.get(0) }.value, 99);
    }
}
