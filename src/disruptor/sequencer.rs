//! Sequencer Implementation
//!
//! Sequencers hand out sequence numbers to producers and make sure a producer
//! never wraps onto a slot that a gating consumer has not finished with.
//! [`SingleProducerSequencer`] keeps its claim state in plain single-writer
//! counters; [`MultiProducerSequencer`] claims with fetch-add/CAS on the
//! shared cursor and tracks publication with a per-slot lap marker.

use crate::disruptor::{
    is_power_of_two, Cursored, DisruptorError, ProducerType, Result, Sequence, Sequenced,
    WaitStrategy, INITIAL_CURSOR_VALUE,
};
use crossbeam_utils::CachePadded;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicI32, AtomicI64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::debug;

/// Pause between gating polls while a producer waits for free slots
const CLAIM_PARK: Duration = Duration::from_nanos(1);

/// Coordinates claiming and publishing of sequences in a ring buffer
///
/// Extends [`Cursored`] and [`Sequenced`] with the operations consumers and
/// barriers need: gating registration and publication queries.
pub trait Sequencer: Cursored + Sequenced + Send + Sync + std::fmt::Debug {
    /// Move the claim position to `sequence`
    ///
    /// Only for initialisation and tests; racing producers makes this unsound.
    fn claim(&self, sequence: i64);

    /// Check whether `sequence` has been published and not yet wrapped
    fn is_available(&self, sequence: i64) -> bool;

    /// Add sequences that this sequencer must not overtake
    ///
    /// Each sequence is first moved to the current cursor value.
    fn add_gating_sequences(&self, gating_sequences: &[Arc<Sequence>]);

    /// Remove a gating sequence
    ///
    /// # Returns
    /// True if the sequence was registered
    fn remove_gating_sequence(&self, sequence: &Arc<Sequence>) -> bool;

    /// Minimum of the gating sequences and the cursor
    fn get_minimum_sequence(&self) -> i64;

    /// Highest sequence in `lower_bound..=available_sequence` that can be read
    /// without crossing an unpublished slot
    ///
    /// # Returns
    /// `lower_bound - 1` if `lower_bound` itself is unpublished
    fn get_highest_published_sequence(&self, lower_bound: i64, available_sequence: i64) -> i64;

    /// The shared cursor sequence
    fn cursor_sequence(&self) -> Arc<Sequence>;

    /// The wait strategy signalled on publish
    fn wait_strategy(&self) -> Arc<dyn WaitStrategy>;

    /// Whether one or many threads may claim through this sequencer
    fn producer_type(&self) -> ProducerType;
}

/// State shared by both sequencer flavours
#[derive(Debug)]
struct SequencerCore {
    buffer_size: usize,
    wait_strategy: Arc<dyn WaitStrategy>,
    cursor: Arc<Sequence>,
    // Writers swap in a fresh slice; readers clone the Arc and scan unlocked.
    gating_sequences: RwLock<Arc<[Arc<Sequence>]>>,
}

impl SequencerCore {
    fn new(buffer_size: usize, wait_strategy: Arc<dyn WaitStrategy>) -> Result<Self> {
        if !is_power_of_two(buffer_size) {
            return Err(DisruptorError::InvalidBufferSize(buffer_size));
        }

        Ok(Self {
            buffer_size,
            wait_strategy,
            cursor: Arc::new(Sequence::new(INITIAL_CURSOR_VALUE)),
            gating_sequences: RwLock::new(Arc::from(Vec::new())),
        })
    }

    #[inline]
    fn buffer_size_i64(&self) -> i64 {
        self.buffer_size as i64
    }

    fn validate_claim(&self, n: i64) -> Result<()> {
        if n < 1 || n > self.buffer_size_i64() {
            return Err(DisruptorError::InvalidClaimSize {
                requested: n,
                buffer_size: self.buffer_size,
            });
        }
        Ok(())
    }

    /// `n > buffer_size` can never fit, so it is reported as a full ring
    /// before any wrap-point arithmetic
    fn validate_try_claim(&self, n: i64) -> Result<()> {
        if n < 1 {
            return Err(DisruptorError::InvalidClaimSize {
                requested: n,
                buffer_size: self.buffer_size,
            });
        }
        if n > self.buffer_size_i64() {
            return Err(DisruptorError::InsufficientCapacity);
        }
        Ok(())
    }

    #[inline]
    fn gating_snapshot(&self) -> Arc<[Arc<Sequence>]> {
        Arc::clone(&self.gating_sequences.read())
    }

    #[inline]
    fn minimum_gating_sequence(&self, default: i64) -> i64 {
        Sequence::get_minimum_sequence(&self.gating_snapshot(), default)
    }

    fn add_gating_sequences(&self, gating_sequences: &[Arc<Sequence>]) {
        {
            let mut current = self.gating_sequences.write();
            let cursor_value = self.cursor.get();
            for sequence in gating_sequences {
                sequence.set(cursor_value);
            }

            let mut updated = current.to_vec();
            updated.extend(gating_sequences.iter().cloned());
            *current = Arc::from(updated);
        }

        // The cursor may have moved while the snapshot was swapped.
        let cursor_value = self.cursor.get();
        for sequence in gating_sequences {
            sequence.set(cursor_value);
        }
    }

    fn remove_gating_sequence(&self, sequence: &Arc<Sequence>) -> bool {
        let mut current = self.gating_sequences.write();
        let before = current.len();
        let updated: Vec<Arc<Sequence>> = current
            .iter()
            .filter(|s| !Arc::ptr_eq(s, sequence))
            .cloned()
            .collect();

        if updated.len() == before {
            return false;
        }
        *current = Arc::from(updated);
        true
    }
}

/// Single producer sequencer
///
/// Only one thread may claim and publish through this sequencer. The claim
/// position and the cached gating minimum are written by that thread alone,
/// so they are plain relaxed counters kept on their own cache lines.
#[derive(Debug)]
pub struct SingleProducerSequencer {
    core: SequencerCore,
    next_value: CachePadded<AtomicI64>,
    cached_value: CachePadded<AtomicI64>,
}

impl SingleProducerSequencer {
    /// Create a new single producer sequencer
    ///
    /// # Errors
    /// `InvalidBufferSize` if `buffer_size` is not a power of two
    pub fn new(buffer_size: usize, wait_strategy: Arc<dyn WaitStrategy>) -> Result<Self> {
        let core = SequencerCore::new(buffer_size, wait_strategy)?;
        debug!(buffer_size, "created single producer sequencer");

        Ok(Self {
            core,
            next_value: CachePadded::new(AtomicI64::new(INITIAL_CURSOR_VALUE)),
            cached_value: CachePadded::new(AtomicI64::new(INITIAL_CURSOR_VALUE)),
        })
    }

    fn has_capacity(&self, required_capacity: i64, do_store: bool) -> bool {
        let next_value = self.next_value.load(Ordering::Relaxed);
        let wrap_point = (next_value + required_capacity) - self.core.buffer_size_i64();
        let cached_gating_sequence = self.cached_value.load(Ordering::Relaxed);

        if wrap_point > cached_gating_sequence || cached_gating_sequence > next_value {
            if do_store {
                self.core.cursor.set_volatile(next_value);
            }

            let min_sequence = self.core.minimum_gating_sequence(next_value);
            self.cached_value.store(min_sequence, Ordering::Relaxed);

            if wrap_point > min_sequence {
                return false;
            }
        }

        true
    }

    /// Claim `n` slots, waiting for consumers if the ring is full
    ///
    /// `n` must already be validated against the buffer size.
    fn claim_next(&self, n: i64) -> i64 {
        let next_value = self.next_value.load(Ordering::Relaxed);
        let next_sequence = next_value + n;
        let wrap_point = next_sequence - self.core.buffer_size_i64();
        let cached_gating_sequence = self.cached_value.load(Ordering::Relaxed);

        if wrap_point > cached_gating_sequence || cached_gating_sequence > next_value {
            self.core.cursor.set_volatile(next_value);

            let mut min_sequence = self.core.minimum_gating_sequence(next_value);
            while wrap_point > min_sequence {
                thread::park_timeout(CLAIM_PARK);
                min_sequence = self.core.minimum_gating_sequence(next_value);
            }

            self.cached_value.store(min_sequence, Ordering::Relaxed);
        }

        self.next_value.store(next_sequence, Ordering::Relaxed);
        next_sequence
    }
}

impl Cursored for SingleProducerSequencer {
    fn get_cursor(&self) -> i64 {
        self.core.cursor.get()
    }
}

impl Sequenced for SingleProducerSequencer {
    fn get_buffer_size(&self) -> usize {
        self.core.buffer_size
    }

    fn has_available_capacity(&self, required_capacity: usize) -> bool {
        required_capacity <= self.core.buffer_size
            && self.has_capacity(required_capacity as i64, false)
    }

    fn remaining_capacity(&self) -> i64 {
        let next_value = self.next_value.load(Ordering::Relaxed);
        let consumed = self.core.minimum_gating_sequence(next_value);
        self.core.buffer_size_i64() - (next_value - consumed)
    }

    fn next(&self) -> i64 {
        self.claim_next(1)
    }

    fn next_n(&self, n: i64) -> Result<i64> {
        self.core.validate_claim(n)?;
        Ok(self.claim_next(n))
    }

    fn try_next(&self) -> Result<i64> {
        self.try_next_n(1)
    }

    fn try_next_n(&self, n: i64) -> Result<i64> {
        self.core.validate_try_claim(n)?;

        if !self.has_capacity(n, true) {
            return Err(DisruptorError::InsufficientCapacity);
        }

        let next_sequence = self.next_value.load(Ordering::Relaxed) + n;
        self.next_value.store(next_sequence, Ordering::Relaxed);
        Ok(next_sequence)
    }

    fn publish(&self, sequence: i64) {
        self.core.cursor.set(sequence);
        self.core.wait_strategy.signal_all_when_blocking();
    }

    fn publish_range(&self, _lo: i64, hi: i64) {
        self.publish(hi);
    }
}

impl Sequencer for SingleProducerSequencer {
    fn claim(&self, sequence: i64) {
        self.next_value.store(sequence, Ordering::Relaxed);
    }

    fn is_available(&self, sequence: i64) -> bool {
        let current_sequence = self.core.cursor.get();
        sequence <= current_sequence && sequence > current_sequence - self.core.buffer_size_i64()
    }

    fn add_gating_sequences(&self, gating_sequences: &[Arc<Sequence>]) {
        self.core.add_gating_sequences(gating_sequences);
    }

    fn remove_gating_sequence(&self, sequence: &Arc<Sequence>) -> bool {
        self.core.remove_gating_sequence(sequence)
    }

    fn get_minimum_sequence(&self) -> i64 {
        self.core.minimum_gating_sequence(self.core.cursor.get())
    }

    fn get_highest_published_sequence(&self, _lower_bound: i64, available_sequence: i64) -> i64 {
        available_sequence
    }

    fn cursor_sequence(&self) -> Arc<Sequence> {
        Arc::clone(&self.core.cursor)
    }

    fn wait_strategy(&self) -> Arc<dyn WaitStrategy> {
        Arc::clone(&self.core.wait_strategy)
    }

    fn producer_type(&self) -> ProducerType {
        ProducerType::Single
    }
}

/// Multi producer sequencer
///
/// Any number of threads may claim and publish concurrently. The cursor is
/// the highest *claimed* sequence, so consumers rely on the availability
/// markers to find out what has actually been published:
///
/// - `available_buffer[seq & mask]` holds the lap `seq >> log2(buffer_size)`
///   of the last publish into that slot, starting at -1
/// - a marker store is a release, a marker load an acquire
/// - [`Sequencer::get_highest_published_sequence`] stops at the first gap
#[derive(Debug)]
pub struct MultiProducerSequencer {
    core: SequencerCore,
    gating_sequence_cache: Sequence,
    available_buffer: Box<[AtomicI32]>,
    index_mask: i64,
    index_shift: u32,
}

impl MultiProducerSequencer {
    /// Create a new multi producer sequencer
    ///
    /// # Errors
    /// `InvalidBufferSize` if `buffer_size` is not a power of two
    pub fn new(buffer_size: usize, wait_strategy: Arc<dyn WaitStrategy>) -> Result<Self> {
        let core = SequencerCore::new(buffer_size, wait_strategy)?;
        let available_buffer = (0..buffer_size).map(|_| AtomicI32::new(-1)).collect();
        debug!(buffer_size, "created multi producer sequencer");

        Ok(Self {
            core,
            gating_sequence_cache: Sequence::new(INITIAL_CURSOR_VALUE),
            available_buffer,
            index_mask: buffer_size as i64 - 1,
            index_shift: buffer_size.trailing_zeros(),
        })
    }

    fn has_capacity(&self, required_capacity: i64, cursor_value: i64) -> bool {
        let wrap_point = (cursor_value + required_capacity) - self.core.buffer_size_i64();
        let cached_gating_sequence = self.gating_sequence_cache.get();

        if wrap_point > cached_gating_sequence || cached_gating_sequence > cursor_value {
            let min_sequence = self.core.minimum_gating_sequence(cursor_value);
            self.gating_sequence_cache.set(min_sequence);

            if wrap_point > min_sequence {
                return false;
            }
        }

        true
    }

    fn claim_next(&self, n: i64) -> i64 {
        let current = self.core.cursor.get_and_add(n);
        let next_sequence = current + n;
        let wrap_point = next_sequence - self.core.buffer_size_i64();
        let cached_gating_sequence = self.gating_sequence_cache.get();

        if wrap_point > cached_gating_sequence || cached_gating_sequence > current {
            let mut gating_sequence = self.core.minimum_gating_sequence(current);
            while wrap_point > gating_sequence {
                thread::park_timeout(CLAIM_PARK);
                gating_sequence = self.core.minimum_gating_sequence(current);
            }

            self.gating_sequence_cache.set(gating_sequence);
        }

        next_sequence
    }

    #[inline]
    fn calculate_index(&self, sequence: i64) -> usize {
        (sequence & self.index_mask) as usize
    }

    #[inline]
    fn calculate_availability_flag(&self, sequence: i64) -> i32 {
        (sequence >> self.index_shift) as i32
    }

    #[inline]
    fn set_available(&self, sequence: i64) {
        self.available_buffer[self.calculate_index(sequence)]
            .store(self.calculate_availability_flag(sequence), Ordering::Release);
    }
}

impl Cursored for MultiProducerSequencer {
    fn get_cursor(&self) -> i64 {
        self.core.cursor.get()
    }
}

impl Sequenced for MultiProducerSequencer {
    fn get_buffer_size(&self) -> usize {
        self.core.buffer_size
    }

    fn has_available_capacity(&self, required_capacity: usize) -> bool {
        required_capacity <= self.core.buffer_size
            && self.has_capacity(required_capacity as i64, self.core.cursor.get())
    }

    fn remaining_capacity(&self) -> i64 {
        let produced = self.core.cursor.get();
        let consumed = self.core.minimum_gating_sequence(produced);
        self.core.buffer_size_i64() - (produced - consumed)
    }

    fn next(&self) -> i64 {
        self.claim_next(1)
    }

    fn next_n(&self, n: i64) -> Result<i64> {
        self.core.validate_claim(n)?;
        Ok(self.claim_next(n))
    }

    fn try_next(&self) -> Result<i64> {
        self.try_next_n(1)
    }

    fn try_next_n(&self, n: i64) -> Result<i64> {
        self.core.validate_try_claim(n)?;

        loop {
            let current = self.core.cursor.get();
            let next = current + n;

            if !self.has_capacity(n, current) {
                return Err(DisruptorError::InsufficientCapacity);
            }

            if self.core.cursor.compare_and_set(current, next) {
                return Ok(next);
            }
        }
    }

    fn publish(&self, sequence: i64) {
        self.set_available(sequence);
        self.core.wait_strategy.signal_all_when_blocking();
    }

    fn publish_range(&self, lo: i64, hi: i64) {
        for sequence in lo..=hi {
            self.set_available(sequence);
        }
        self.core.wait_strategy.signal_all_when_blocking();
    }
}

impl Sequencer for MultiProducerSequencer {
    fn claim(&self, sequence: i64) {
        self.core.cursor.set(sequence);
    }

    fn is_available(&self, sequence: i64) -> bool {
        let flag = self.available_buffer[self.calculate_index(sequence)].load(Ordering::Acquire);
        flag == self.calculate_availability_flag(sequence)
    }

    fn add_gating_sequences(&self, gating_sequences: &[Arc<Sequence>]) {
        self.core.add_gating_sequences(gating_sequences);
    }

    fn remove_gating_sequence(&self, sequence: &Arc<Sequence>) -> bool {
        self.core.remove_gating_sequence(sequence)
    }

    fn get_minimum_sequence(&self) -> i64 {
        self.core.minimum_gating_sequence(self.core.cursor.get())
    }

    fn get_highest_published_sequence(&self, lower_bound: i64, available_sequence: i64) -> i64 {
        for sequence in lower_bound..=available_sequence {
            if !self.is_available(sequence) {
                return sequence - 1;
            }
        }
        available_sequence
    }

    fn cursor_sequence(&self) -> Arc<Sequence> {
        Arc::clone(&self.core.cursor)
    }

    fn wait_strategy(&self) -> Arc<dyn WaitStrategy> {
        Arc::clone(&self.core.wait_strategy)
    }

    fn producer_type(&self) -> ProducerType {
        ProducerType::Multi
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disruptor::BlockingWaitStrategy;
    use std::collections::HashSet;

    fn wait_strategy() -> Arc<dyn WaitStrategy> {
        Arc::new(BlockingWaitStrategy::new())
    }

    fn single(buffer_size: usize) -> SingleProducerSequencer {
        SingleProducerSequencer::new(buffer_size, wait_strategy()).unwrap()
    }

    fn multi(buffer_size: usize) -> MultiProducerSequencer {
        MultiProducerSequencer::new(buffer_size, wait_strategy()).unwrap()
    }

    #[test]
    fn test_rejects_invalid_buffer_sizes() {
        for size in [0, 3, 6, 1000] {
            assert!(matches!(
                SingleProducerSequencer::new(size, wait_strategy()),
                Err(DisruptorError::InvalidBufferSize(s)) if s == size
            ));
            assert!(matches!(
                MultiProducerSequencer::new(size, wait_strategy()),
                Err(DisruptorError::InvalidBufferSize(s)) if s == size
            ));
        }

        assert!(SingleProducerSequencer::new(1, wait_strategy()).is_ok());
        assert!(MultiProducerSequencer::new(1, wait_strategy()).is_ok());
    }

    #[test]
    fn test_single_producer_claim_and_publish() {
        let sequencer = single(8);
        assert_eq!(sequencer.get_cursor(), INITIAL_CURSOR_VALUE);

        assert_eq!(sequencer.next(), 0);
        assert!(!sequencer.is_available(0));
        sequencer.publish(0);
        assert!(sequencer.is_available(0));
        assert_eq!(sequencer.get_cursor(), 0);

        let hi = sequencer.next_n(3).unwrap();
        assert_eq!(hi, 3);
        sequencer.publish_range(1, hi);
        assert_eq!(sequencer.get_cursor(), 3);
        assert_eq!(sequencer.get_highest_published_sequence(1, 3), 3);
    }

    #[test]
    fn test_invalid_claim_size() {
        let sp = single(4);
        let mp = multi(4);

        for n in [0, -1, 5] {
            assert!(matches!(
                sp.next_n(n),
                Err(DisruptorError::InvalidClaimSize { requested, buffer_size: 4 }) if requested == n
            ));
            assert!(matches!(
                mp.next_n(n),
                Err(DisruptorError::InvalidClaimSize { requested, buffer_size: 4 }) if requested == n
            ));
        }

        assert!(matches!(
            sp.try_next_n(0),
            Err(DisruptorError::InvalidClaimSize { .. })
        ));
        assert!(matches!(
            mp.try_next_n(0),
            Err(DisruptorError::InvalidClaimSize { .. })
        ));
    }

    #[test]
    fn test_single_producer_try_next_respects_gating() {
        let sequencer = single(4);
        let consumer = Arc::new(Sequence::default());
        sequencer.add_gating_sequences(&[Arc::clone(&consumer)]);

        for expected in 0..4 {
            assert_eq!(sequencer.try_next().unwrap(), expected);
            sequencer.publish(expected);
        }

        assert!(matches!(
            sequencer.try_next(),
            Err(DisruptorError::InsufficientCapacity)
        ));
        assert_eq!(sequencer.remaining_capacity(), 0);

        consumer.set(1);
        assert_eq!(sequencer.remaining_capacity(), 2);
        assert_eq!(sequencer.try_next_n(2).unwrap(), 5);
    }

    #[test]
    fn test_has_available_capacity_is_idempotent() {
        let sequencer = single(4);
        let consumer = Arc::new(Sequence::default());
        sequencer.add_gating_sequences(&[Arc::clone(&consumer)]);

        let hi = sequencer.next_n(3).unwrap();
        sequencer.publish(hi);

        for _ in 0..5 {
            assert!(sequencer.has_available_capacity(1));
            assert!(!sequencer.has_available_capacity(2));
        }

        let mp = multi(4);
        mp.add_gating_sequences(&[Arc::new(Sequence::default())]);
        let hi = mp.next_n(4).unwrap();
        mp.publish_range(0, hi);
        for _ in 0..5 {
            assert!(!mp.has_available_capacity(1));
        }
    }

    #[test]
    fn test_oversized_requests_report_no_capacity() {
        let sp = single(8);
        let hi = sp.next_n(2).unwrap();
        sp.publish(hi);

        let mp = multi(8);
        mp.add_gating_sequences(&[Arc::new(Sequence::default())]);

        for n in [9, i64::MAX / 2, i64::MAX] {
            assert!(matches!(
                sp.try_next_n(n),
                Err(DisruptorError::InsufficientCapacity)
            ));
            assert!(matches!(
                mp.try_next_n(n),
                Err(DisruptorError::InsufficientCapacity)
            ));
        }
        assert_eq!(sp.get_cursor(), 1);
        assert_eq!(mp.get_cursor(), INITIAL_CURSOR_VALUE);

        for required in [9, usize::MAX / 2, usize::MAX] {
            assert!(!sp.has_available_capacity(required));
            assert!(!mp.has_available_capacity(required));
        }
        assert!(mp.has_available_capacity(8));
        assert!(sp.has_available_capacity(6));
        assert!(!sp.has_available_capacity(7));
    }

    #[test]
    fn test_empty_gating_set_does_not_constrain() {
        let sequencer = single(2);
        for expected in 0..10 {
            assert_eq!(sequencer.next(), expected);
            sequencer.publish(expected);
        }
        assert_eq!(sequencer.remaining_capacity(), 2);

        let mp = multi(2);
        for expected in 0..10 {
            assert_eq!(mp.try_next().unwrap(), expected);
        }
    }

    #[test]
    fn test_add_gating_sequences_moves_to_cursor() {
        let sequencer = single(8);
        let hi = sequencer.next_n(5).unwrap();
        sequencer.publish(hi);

        let late = Arc::new(Sequence::default());
        sequencer.add_gating_sequences(&[Arc::clone(&late)]);
        assert_eq!(late.get(), 4);
        assert_eq!(sequencer.get_minimum_sequence(), 4);

        assert!(sequencer.remove_gating_sequence(&late));
        assert!(!sequencer.remove_gating_sequence(&late));
    }

    #[test]
    fn test_minimum_sequence_uses_gating_set() {
        let sequencer = multi(8);
        let first = Arc::new(Sequence::default());
        let second = Arc::new(Sequence::default());
        sequencer.add_gating_sequences(&[Arc::clone(&first), Arc::clone(&second)]);

        let hi = sequencer.next_n(6).unwrap();
        sequencer.publish_range(0, hi);
        first.set(4);
        second.set(2);

        assert_eq!(sequencer.get_minimum_sequence(), 2);
        assert_eq!(sequencer.remaining_capacity(), 8 - (5 - 2));
    }

    #[test]
    fn test_multi_producer_gap_safety() {
        let sequencer = multi(16);
        let hi = sequencer.next_n(12).unwrap();
        assert_eq!(hi, 11);

        sequencer.publish_range(0, 9);
        sequencer.publish(11);

        assert!(!sequencer.is_available(10));
        assert!(sequencer.is_available(11));
        assert_eq!(sequencer.get_highest_published_sequence(0, 11), 9);
        assert_eq!(sequencer.get_highest_published_sequence(10, 11), 9);

        sequencer.publish(10);
        assert_eq!(sequencer.get_highest_published_sequence(0, 11), 11);
    }

    #[test]
    fn test_multi_producer_availability_tracks_laps() {
        let sequencer = multi(4);
        for sequence in 0..4 {
            assert_eq!(sequencer.next(), sequence);
            sequencer.publish(sequence);
        }
        assert!(sequencer.is_available(0));

        assert_eq!(sequencer.next(), 4);
        assert!(!sequencer.is_available(4));
        sequencer.publish(4);
        assert!(sequencer.is_available(4));
        assert!(!sequencer.is_available(0));
    }

    #[test]
    fn test_multi_producer_try_next_insufficient_capacity() {
        let sequencer = multi(4);
        let consumer = Arc::new(Sequence::default());
        sequencer.add_gating_sequences(&[Arc::clone(&consumer)]);

        assert_eq!(sequencer.try_next_n(4).unwrap(), 3);
        assert!(matches!(
            sequencer.try_next(),
            Err(DisruptorError::InsufficientCapacity)
        ));

        consumer.set(0);
        assert_eq!(sequencer.try_next().unwrap(), 4);
    }

    #[test]
    fn test_claim_moves_position() {
        let sp = single(8);
        sp.claim(9);
        assert_eq!(sp.next(), 10);

        let mp = multi(8);
        mp.claim(9);
        assert_eq!(mp.get_cursor(), 9);
        assert_eq!(mp.next(), 10);
    }

    #[test]
    fn test_multi_producer_concurrent_claims_are_unique() {
        let sequencer = Arc::new(multi(1024));
        let mut handles = vec![];

        for _ in 0..4 {
            let sequencer = Arc::clone(&sequencer);
            handles.push(thread::spawn(move || {
                let mut claimed = Vec::with_capacity(200);
                for _ in 0..100 {
                    let sequence = sequencer.next();
                    sequencer.publish(sequence);
                    claimed.push(sequence);
                }
                for _ in 0..100 {
                    if let Ok(sequence) = sequencer.try_next() {
                        sequencer.publish(sequence);
                        claimed.push(sequence);
                    }
                }
                claimed
            }));
        }

        let mut all = HashSet::new();
        let mut total = 0;
        for handle in handles {
            for sequence in handle.join().unwrap() {
                assert!(all.insert(sequence), "duplicate claim {sequence}");
                total += 1;
            }
        }

        assert_eq!(total, 800);
        assert_eq!(sequencer.get_cursor(), 799);
        assert_eq!(sequencer.get_highest_published_sequence(0, 799), 799);
    }
}
