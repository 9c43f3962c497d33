//! Core Interfaces for the Disruptor Pattern
//!
//! This module defines the fundamental interfaces shared by sequencers and the
//! ring buffer: cursor access, claim/publish sequencing, data access and the
//! closure-based publishing sink.

use crate::disruptor::Result;

/// Provides access to a cursor value
pub trait Cursored {
    /// Get the current cursor value
    fn get_cursor(&self) -> i64;
}

/// Operations related to sequencing items in a ring buffer
pub trait Sequenced {
    /// Get the capacity of the data structure
    fn get_buffer_size(&self) -> usize;

    /// Check if the buffer has capacity for `required_capacity` more sequences
    ///
    /// This is a concurrent method, so the response should only be taken
    /// as an indication of available capacity.
    fn has_available_capacity(&self, required_capacity: usize) -> bool;

    /// Get the remaining capacity for this sequencer
    fn remaining_capacity(&self) -> i64;

    /// Claim the next sequence for publishing, spinning while the ring is full
    fn next(&self) -> i64;

    /// Claim the next `n` sequences for publishing
    ///
    /// Batch producing requires careful coordination:
    ///
    /// ```ignore
    /// let n = 10;
    /// let hi = sequencer.next_n(n)?;
    /// let lo = hi - (n - 1);
    /// for sequence in lo..=hi {
    ///     // Do work
    /// }
    /// sequencer.publish_range(lo, hi);
    /// ```
    ///
    /// # Returns
    /// The highest claimed sequence value
    ///
    /// # Errors
    /// `InvalidClaimSize` if `n` is not in `1..=buffer_size`
    fn next_n(&self, n: i64) -> Result<i64>;

    /// Attempt to claim the next sequence without blocking
    ///
    /// # Errors
    /// `InsufficientCapacity` if the ring is full
    fn try_next(&self) -> Result<i64>;

    /// Attempt to claim the next `n` sequences without blocking
    ///
    /// # Errors
    /// `InvalidClaimSize` if `n < 1`, `InsufficientCapacity` if fewer than
    /// `n` slots are free
    fn try_next_n(&self, n: i64) -> Result<i64>;

    /// Publish a sequence once its slot has been filled
    fn publish(&self, sequence: i64);

    /// Publish the inclusive range `lo..=hi`
    fn publish_range(&self, lo: i64, hi: i64);
}

/// Provides data access abstraction
///
/// Decouples event processors from the concrete ring buffer.
pub trait DataProvider<T>: Send + Sync {
    /// Get the data item at the specified sequence
    ///
    /// # Safety
    /// `sequence` must have been published and must not have been wrapped by
    /// a producer yet; no thread may hold a mutable reference to the slot.
    unsafe fn get(&self, sequence: i64) -> &T;
}

/// Event sink for publishing events through closures
pub trait EventSink<T> {
    /// Claim one slot, fill it with `translator`, and publish it
    fn publish_event<F>(&self, translator: F)
    where
        F: FnOnce(&mut T, i64);

    /// Like [`EventSink::publish_event`] but fails instead of waiting
    ///
    /// # Returns
    /// True if the event was published, false if there was insufficient capacity
    fn try_publish_event<F>(&self, translator: F) -> bool
    where
        F: FnOnce(&mut T, i64);

    /// Claim `count` slots, fill each with `translator`, and publish them together
    ///
    /// # Errors
    /// `InvalidClaimSize` if `count` is not in `1..=buffer_size`
    fn publish_events<F>(&self, count: usize, translator: F) -> Result<()>
    where
        F: FnMut(&mut T, i64);

    /// Like [`EventSink::publish_events`] but fails instead of waiting
    ///
    /// # Errors
    /// `InvalidClaimSize` or `InsufficientCapacity`
    fn try_publish_events<F>(&self, count: usize, translator: F) -> Result<()>
    where
        F: FnMut(&mut T, i64);
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestCursored {
        cursor: i64,
    }

    impl Cursored for TestCursored {
        fn get_cursor(&self) -> i64 {
            self.cursor
        }
    }

    struct TestDataProvider {
        data: Vec<i32>,
    }

    impl DataProvider<i32> for TestDataProvider {
        unsafe fn get(&self, sequence: i64) -> &i32 {
            &self.data[sequence as usize % self.data.len()]
        }
    }

    #[test]
    fn test_cursored_trait() {
        let cursored = TestCursored { cursor: 42 };
        assert_eq!(cursored.get_cursor(), 42);
    }

    #[test]
    fn test_data_provider_trait() {
        let provider = TestDataProvider {
            data: vec![1, 2, 3, 4, 5],
        };

        unsafe {
            assert_eq!(*provider.get(0), 1);
            assert_eq!(*provider.get(2), 3);
            assert_eq!(*provider.get(7), 3);
        }
    }
}
