//! Sequence implementation for the Disruptor
//!
//! The Sequence is used to track progress through the ring buffer and coordinate
//! between producers and consumers. Every cross-thread hand-off in the crate is
//! an acquire read of a value some other thread wrote with release semantics
//! through one of these counters.

use crossbeam_utils::CachePadded;
use std::sync::atomic::{fence, AtomicI64, Ordering};
use std::sync::Arc;

/// A sequence number that prevents false sharing
///
/// The atomic value is wrapped in [`CachePadded`], which aligns and pads it to
/// the cache-line (pair) size of the target, so a hot counter never shares a
/// line with neighbouring fields or with another `Sequence`.
pub struct Sequence {
    value: CachePadded<AtomicI64>,
}

impl Sequence {
    /// Create a new sequence with the given initial value
    pub fn new(initial_value: i64) -> Self {
        Self {
            value: CachePadded::new(AtomicI64::new(initial_value)),
        }
    }

    /// Get the current sequence value (acquire)
    #[inline]
    pub fn get(&self) -> i64 {
        self.value.load(Ordering::Acquire)
    }

    /// Set the sequence value (release)
    #[inline]
    pub fn set(&self, value: i64) {
        self.value.store(value, Ordering::Release);
    }

    /// Set the sequence value followed by a full fence
    ///
    /// Used where a later load must not be reordered before this store
    /// (StoreLoad), e.g. the single producer exposing its position before
    /// reading the gating sequences.
    #[inline]
    pub fn set_volatile(&self, value: i64) {
        self.value.store(value, Ordering::SeqCst);
        fence(Ordering::SeqCst);
    }

    /// Atomically set the value to `new` if it currently holds `expected`
    #[inline]
    pub fn compare_and_set(&self, expected: i64, new: i64) -> bool {
        self.value
            .compare_exchange(expected, new, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Increment and get the new value
    #[inline]
    pub fn increment_and_get(&self) -> i64 {
        self.add_and_get(1)
    }

    /// Add a value and get the new result
    #[inline]
    pub fn add_and_get(&self, increment: i64) -> i64 {
        self.value.fetch_add(increment, Ordering::AcqRel) + increment
    }

    /// Get the current value and then add
    #[inline]
    pub fn get_and_add(&self, increment: i64) -> i64 {
        self.value.fetch_add(increment, Ordering::AcqRel)
    }

    /// Minimum value across `sequences`, or `default` when the slice is empty
    pub fn get_minimum_sequence(sequences: &[Arc<Sequence>], default: i64) -> i64 {
        sequences
            .iter()
            .map(|seq| seq.get())
            .fold(default, i64::min)
    }
}

impl Default for Sequence {
    fn default() -> Self {
        Self::new(crate::disruptor::INITIAL_CURSOR_VALUE)
    }
}

impl std::fmt::Debug for Sequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sequence")
            .field("value", &self.get())
            .finish()
    }
}

impl std::fmt::Display for Sequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.get())
    }
}

/// A read-only group of sequences that reports the minimum of its members
///
/// Used as the dependency of a barrier whose consumer must trail other
/// consumers. Membership is fixed at construction.
#[derive(Debug, Clone)]
pub struct FixedSequenceGroup {
    sequences: Box<[Arc<Sequence>]>,
}

impl FixedSequenceGroup {
    /// Create a group over the given sequences
    pub fn new(sequences: &[Arc<Sequence>]) -> Self {
        Self {
            sequences: sequences.to_vec().into_boxed_slice(),
        }
    }

    /// Minimum value of the group, `i64::MAX` when empty
    #[inline]
    pub fn get(&self) -> i64 {
        Sequence::get_minimum_sequence(&self.sequences, i64::MAX)
    }

    /// Get the number of sequences in the group
    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    /// Check if the group is empty
    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }
}

/// The sequence a consumer must not overtake
///
/// Either the producer cursor itself, or the minimum of the consumers it
/// depends on.
#[derive(Debug, Clone)]
pub enum DependentSequence {
    /// No upstream consumers: track the producer cursor
    Cursor(Arc<Sequence>),
    /// Trail a fixed set of upstream consumers
    Group(FixedSequenceGroup),
}

impl DependentSequence {
    /// Build the dependency for a barrier over `cursor` and `dependencies`
    pub fn new(cursor: &Arc<Sequence>, dependencies: &[Arc<Sequence>]) -> Self {
        if dependencies.is_empty() {
            Self::Cursor(Arc::clone(cursor))
        } else {
            Self::Group(FixedSequenceGroup::new(dependencies))
        }
    }

    /// Current value of the dependency
    #[inline]
    pub fn get(&self) -> i64 {
        match self {
            Self::Cursor(cursor) => cursor.get(),
            Self::Group(group) => group.get(),
        }
    }
}
