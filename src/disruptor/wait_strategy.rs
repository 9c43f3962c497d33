//! Wait Strategy Implementation
//!
//! Wait strategies decide how a consumer waits for a sequence to become
//! available and how producers wake waiting consumers. Every strategy checks
//! the barrier's alert flag on each iteration, so `alert()` always releases a
//! waiting consumer.

use crate::disruptor::{DependentSequence, DisruptorError, Result, Sequence, SequenceBarrier};
use parking_lot::{Condvar, Mutex};
use std::hint;
use std::thread;
use std::time::{Duration, Instant};

/// Strategy for waiting for events to become available
///
/// Different strategies trade CPU usage against latency and throughput.
pub trait WaitStrategy: Send + Sync + std::fmt::Debug {
    /// Wait for the given sequence to become available
    ///
    /// # Arguments
    /// * `sequence` - The sequence to wait for
    /// * `cursor` - The producer cursor
    /// * `dependent_sequence` - The sequence this consumer must not overtake
    /// * `barrier` - The barrier the wait is performed on, checked for alerts
    ///
    /// # Returns
    /// The highest available sequence, which may be greater than requested
    ///
    /// # Errors
    /// `Alert` if the barrier is alerted, `Timeout` for strategies with a deadline
    fn wait_for(
        &self,
        sequence: i64,
        cursor: &Sequence,
        dependent_sequence: &DependentSequence,
        barrier: &dyn SequenceBarrier,
    ) -> Result<i64>;

    /// Wake every thread blocked in [`WaitStrategy::wait_for`]
    fn signal_all_when_blocking(&self);
}

/// Spin on the dependency until it reaches `sequence`
#[inline]
fn spin_on_dependent(
    sequence: i64,
    dependent_sequence: &DependentSequence,
    barrier: &dyn SequenceBarrier,
) -> Result<i64> {
    loop {
        let available_sequence = dependent_sequence.get();
        if available_sequence >= sequence {
            return Ok(available_sequence);
        }
        barrier.check_alert()?;
        hint::spin_loop();
    }
}

/// Blocking wait strategy using a mutex and condition variable
///
/// Consumers block on the condition variable until the producer cursor
/// passes the requested sequence, then spin on the dependency, which moves
/// far more often and should not pay for a condvar round trip. This is the
/// most CPU-friendly strategy and the default.
#[derive(Debug, Default)]
pub struct BlockingWaitStrategy {
    mutex: Mutex<()>,
    condvar: Condvar,
}

impl BlockingWaitStrategy {
    /// Create a new blocking wait strategy
    pub fn new() -> Self {
        Self::default()
    }
}

impl WaitStrategy for BlockingWaitStrategy {
    fn wait_for(
        &self,
        sequence: i64,
        cursor: &Sequence,
        dependent_sequence: &DependentSequence,
        barrier: &dyn SequenceBarrier,
    ) -> Result<i64> {
        if cursor.get() < sequence {
            let mut guard = self.mutex.lock();
            while cursor.get() < sequence {
                barrier.check_alert()?;
                self.condvar.wait(&mut guard);
            }
        }

        spin_on_dependent(sequence, dependent_sequence, barrier)
    }

    fn signal_all_when_blocking(&self) {
        let _guard = self.mutex.lock();
        self.condvar.notify_all();
    }
}

/// Blocking wait strategy that gives up after a fixed timeout
///
/// Returns [`DisruptorError::Timeout`] when the cursor has not reached the
/// requested sequence in time, which lets an event processor run its
/// timeout callback.
#[derive(Debug)]
pub struct TimeoutBlockingWaitStrategy {
    mutex: Mutex<()>,
    condvar: Condvar,
    timeout: Duration,
}

impl TimeoutBlockingWaitStrategy {
    /// Create a new timeout blocking wait strategy
    pub fn new(timeout: Duration) -> Self {
        Self {
            mutex: Mutex::new(()),
            condvar: Condvar::new(),
            timeout,
        }
    }

    /// The configured timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl WaitStrategy for TimeoutBlockingWaitStrategy {
    fn wait_for(
        &self,
        sequence: i64,
        cursor: &Sequence,
        dependent_sequence: &DependentSequence,
        barrier: &dyn SequenceBarrier,
    ) -> Result<i64> {
        if cursor.get() < sequence {
            let deadline = Instant::now() + self.timeout;
            let mut guard = self.mutex.lock();
            while cursor.get() < sequence {
                barrier.check_alert()?;
                if self.condvar.wait_until(&mut guard, deadline).timed_out()
                    && cursor.get() < sequence
                {
                    return Err(DisruptorError::Timeout);
                }
            }
        }

        spin_on_dependent(sequence, dependent_sequence, barrier)
    }

    fn signal_all_when_blocking(&self) {
        let _guard = self.mutex.lock();
        self.condvar.notify_all();
    }
}

/// Yielding wait strategy
///
/// Spins for a fixed number of tries, then yields the thread on every
/// further iteration. A good compromise when there are spare cores.
#[derive(Debug)]
pub struct YieldingWaitStrategy {
    spin_tries: u32,
}

impl YieldingWaitStrategy {
    /// Create a new yielding wait strategy with 100 spin tries
    pub fn new() -> Self {
        Self::with_spin_tries(100)
    }

    /// Create a yielding wait strategy that spins `spin_tries` times before yielding
    pub fn with_spin_tries(spin_tries: u32) -> Self {
        Self { spin_tries }
    }
}

impl Default for YieldingWaitStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl WaitStrategy for YieldingWaitStrategy {
    fn wait_for(
        &self,
        sequence: i64,
        _cursor: &Sequence,
        dependent_sequence: &DependentSequence,
        barrier: &dyn SequenceBarrier,
    ) -> Result<i64> {
        let mut counter = self.spin_tries;

        loop {
            let available_sequence = dependent_sequence.get();
            if available_sequence >= sequence {
                return Ok(available_sequence);
            }

            barrier.check_alert()?;
            if counter == 0 {
                thread::yield_now();
            } else {
                counter -= 1;
                hint::spin_loop();
            }
        }
    }

    fn signal_all_when_blocking(&self) {}
}

/// Busy-spin wait strategy
///
/// Continuously polls without yielding the CPU. Lowest latency, but burns a
/// full core per waiting consumer; only use it with pinned, dedicated cores.
#[derive(Debug, Default)]
pub struct BusySpinWaitStrategy;

impl BusySpinWaitStrategy {
    /// Create a new busy-spin wait strategy
    pub fn new() -> Self {
        Self
    }
}

impl WaitStrategy for BusySpinWaitStrategy {
    fn wait_for(
        &self,
        sequence: i64,
        _cursor: &Sequence,
        dependent_sequence: &DependentSequence,
        barrier: &dyn SequenceBarrier,
    ) -> Result<i64> {
        spin_on_dependent(sequence, dependent_sequence, barrier)
    }

    fn signal_all_when_blocking(&self) {}
}

/// Sleeping wait strategy
///
/// Spins, then yields, then sleeps for `sleep_duration` between polls once
/// the retry budget is spent. Lowest CPU usage of the polling strategies at
/// the cost of latency spikes.
#[derive(Debug)]
pub struct SleepingWaitStrategy {
    retries: u32,
    sleep_duration: Duration,
}

impl SleepingWaitStrategy {
    const DEFAULT_RETRIES: u32 = 200;
    const SPIN_THRESHOLD: u32 = 100;

    /// Create a new sleeping wait strategy with default retries and a 100ns sleep
    pub fn new() -> Self {
        Self::new_with_duration(Duration::from_nanos(100))
    }

    /// Create a new sleeping wait strategy with custom sleep duration
    pub fn new_with_duration(sleep_duration: Duration) -> Self {
        Self {
            retries: Self::DEFAULT_RETRIES,
            sleep_duration,
        }
    }

    /// Override the number of spin/yield retries before sleeping
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }
}

impl Default for SleepingWaitStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl WaitStrategy for SleepingWaitStrategy {
    fn wait_for(
        &self,
        sequence: i64,
        _cursor: &Sequence,
        dependent_sequence: &DependentSequence,
        barrier: &dyn SequenceBarrier,
    ) -> Result<i64> {
        let mut counter = self.retries;

        loop {
            let available_sequence = dependent_sequence.get();
            if available_sequence >= sequence {
                return Ok(available_sequence);
            }

            barrier.check_alert()?;
            if counter > Self::SPIN_THRESHOLD {
                counter -= 1;
                hint::spin_loop();
            } else if counter > 0 {
                counter -= 1;
                thread::yield_now();
            } else {
                thread::sleep(self.sleep_duration);
            }
        }
    }

    fn signal_all_when_blocking(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    /// Barrier stand-in that only carries the alert flag
    #[derive(Default)]
    struct AlertOnly {
        alerted: AtomicBool,
    }

    impl SequenceBarrier for AlertOnly {
        fn wait_for(&self, _sequence: i64) -> Result<i64> {
            unreachable!("strategies never call back into wait_for")
        }

        fn get_cursor(&self) -> i64 {
            0
        }

        fn is_alerted(&self) -> bool {
            self.alerted.load(Ordering::Acquire)
        }

        fn alert(&self) {
            self.alerted.store(true, Ordering::Release);
        }

        fn clear_alert(&self) {
            self.alerted.store(false, Ordering::Release);
        }

        fn check_alert(&self) -> Result<()> {
            if self.is_alerted() {
                Err(DisruptorError::Alert)
            } else {
                Ok(())
            }
        }
    }

    fn assert_returns_available(strategy: &dyn WaitStrategy) {
        let cursor = Arc::new(Sequence::new(10));
        let dependent = DependentSequence::new(&cursor, &[]);
        let barrier = AlertOnly::default();

        let result = strategy.wait_for(5, &cursor, &dependent, &barrier);
        assert_eq!(result.unwrap(), 10);
    }

    fn assert_alert_releases(strategy: &dyn WaitStrategy) {
        let cursor = Arc::new(Sequence::new(10));
        let dependent = DependentSequence::new(&cursor, &[]);
        let barrier = AlertOnly::default();
        barrier.alert();

        let result = strategy.wait_for(11, &cursor, &dependent, &barrier);
        assert!(matches!(result, Err(DisruptorError::Alert)));
    }

    #[test]
    fn test_blocking_wait_strategy() {
        assert_returns_available(&BlockingWaitStrategy::new());
        assert_alert_releases(&BlockingWaitStrategy::new());
    }

    #[test]
    fn test_yielding_wait_strategy() {
        assert_returns_available(&YieldingWaitStrategy::new());
        assert_alert_releases(&YieldingWaitStrategy::with_spin_tries(2));
    }

    #[test]
    fn test_busy_spin_wait_strategy() {
        assert_returns_available(&BusySpinWaitStrategy::new());
        assert_alert_releases(&BusySpinWaitStrategy::new());
    }

    #[test]
    fn test_sleeping_wait_strategy() {
        assert_returns_available(&SleepingWaitStrategy::new());
        assert_alert_releases(&SleepingWaitStrategy::new().with_retries(0));

        let custom = SleepingWaitStrategy::new_with_duration(Duration::from_micros(100));
        assert_returns_available(&custom);
    }

    #[test]
    fn test_timeout_blocking_wait_strategy_times_out() {
        let strategy = TimeoutBlockingWaitStrategy::new(Duration::from_millis(5));
        let cursor = Arc::new(Sequence::new(3));
        let dependent = DependentSequence::new(&cursor, &[]);
        let barrier = AlertOnly::default();

        assert_eq!(strategy.timeout(), Duration::from_millis(5));
        let result = strategy.wait_for(4, &cursor, &dependent, &barrier);
        assert!(matches!(result, Err(DisruptorError::Timeout)));

        assert_returns_available(&strategy);
    }

    #[test]
    fn test_blocking_wait_strategy_wakes_on_publish() {
        let strategy = Arc::new(BlockingWaitStrategy::new());
        let cursor = Arc::new(Sequence::new(-1));

        let waiter = {
            let strategy = Arc::clone(&strategy);
            let cursor = Arc::clone(&cursor);
            std::thread::spawn(move || {
                let dependent = DependentSequence::new(&cursor, &[]);
                let barrier = AlertOnly::default();
                strategy.wait_for(0, &cursor, &dependent, &barrier)
            })
        };

        std::thread::sleep(Duration::from_millis(10));
        cursor.set(0);
        strategy.signal_all_when_blocking();

        assert_eq!(waiter.join().unwrap().unwrap(), 0);
    }

    #[test]
    fn test_spin_waits_on_dependency_not_cursor() {
        let strategy = BusySpinWaitStrategy::new();
        let cursor = Arc::new(Sequence::new(10));
        let upstream = Arc::new(Sequence::new(4));
        let dependent = DependentSequence::new(&cursor, &[Arc::clone(&upstream)]);
        let barrier = AlertOnly::default();

        let result = strategy.wait_for(3, &cursor, &dependent, &barrier);
        assert_eq!(result.unwrap(), 4);
    }
}
