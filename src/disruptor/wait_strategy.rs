//! Wait Strategy Implementation
//!
//! Wait strategies determine how consumers wait for new events to become available.
//! Every strategy first waits for the producer cursor to reach the requested
//! sequence, then spins on the dependent (upstream) sequence, checking the
//! barrier's alert status throughout so a halt always unwinds a waiting thread.

use crate::disruptor::{DependentSequence, DisruptorError, Result, Sequence, SequenceBarrier};
use parking_lot::{Condvar, Mutex};
use std::hint;
use std::sync::atomic::{fence, AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Strategy for waiting for events to become available
///
/// Different strategies provide different trade-offs between CPU usage,
/// latency, and throughput.
pub trait WaitStrategy: Send + Sync + std::fmt::Debug {
    /// Wait for the given sequence to become available
    ///
    /// # Arguments
    /// * `sequence` - The sequence to wait for
    /// * `cursor` - The producer cursor
    /// * `dependent` - The sequence of upstream consumers (or the cursor itself)
    /// * `barrier` - The barrier the wait belongs to, polled for alerts
    ///
    /// # Returns
    /// The available sequence, which may be higher than requested
    ///
    /// # Errors
    /// `Alert` if the barrier is alerted during the wait; `Timeout` for
    /// strategies with a bounded wait
    fn wait_for(
        &self,
        sequence: i64,
        cursor: &Sequence,
        dependent: &DependentSequence,
        barrier: &dyn SequenceBarrier,
    ) -> Result<i64>;

    /// Wake every thread currently parked in this strategy
    fn signal_all_when_blocking(&self);
}

/// Spin on the dependent sequence until it reaches `sequence`
///
/// Upstream consumers are expected to finish quickly, so blocking strategies
/// do not park for this phase.
#[inline]
fn spin_on_dependent(
    sequence: i64,
    dependent: &DependentSequence,
    barrier: &dyn SequenceBarrier,
) -> Result<i64> {
    loop {
        let available_sequence = dependent.get();
        if available_sequence >= sequence {
            return Ok(available_sequence);
        }
        barrier.check_alert()?;
        hint::spin_loop();
    }
}

/// Blocking wait strategy using a lock and condition variable
///
/// Use when CPU resources matter more than throughput and latency.
#[derive(Debug, Default)]
pub struct BlockingWaitStrategy {
    mutex: Mutex<()>,
    condvar: Condvar,
}

impl BlockingWaitStrategy {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WaitStrategy for BlockingWaitStrategy {
    fn wait_for(
        &self,
        sequence: i64,
        cursor: &Sequence,
        dependent: &DependentSequence,
        barrier: &dyn SequenceBarrier,
    ) -> Result<i64> {
        if cursor.get() < sequence {
            let mut guard = self.mutex.lock();
            // Re-checked after every wake: wakeups may be spurious or stale.
            while cursor.get() < sequence {
                barrier.check_alert()?;
                self.condvar.wait(&mut guard);
            }
        }

        spin_on_dependent(sequence, dependent, barrier)
    }

    fn signal_all_when_blocking(&self) {
        let _guard = self.mutex.lock();
        self.condvar.notify_all();
    }
}

/// Blocking wait strategy that skips the wake-up when nobody is parked
///
/// Producers only take the lock when a waiter has announced itself through
/// `signal_needed`. Both sides place a sequentially consistent fence between
/// their own write (cursor or alert on the producer side, the flag on the
/// waiter side) and their read of the other side's variable, so at least one
/// of them observes the other: either the waiter sees the new cursor and does
/// not park, or the producer sees the flag and notifies. A waiter holds the
/// mutex from raising the flag until it parks, so that notification cannot
/// slip in between.
///
/// Opt-in; [`BlockingWaitStrategy`] is the conservative default.
#[derive(Debug, Default)]
pub struct LiteBlockingWaitStrategy {
    mutex: Mutex<()>,
    condvar: Condvar,
    signal_needed: AtomicBool,
    wakeups: AtomicU64,
}

impl LiteBlockingWaitStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a waiter has announced itself since the last wake-up
    pub fn is_signal_needed(&self) -> bool {
        self.signal_needed.load(Ordering::Acquire)
    }

    /// Number of times a publisher actually took the lock to notify waiters
    pub fn wakeup_count(&self) -> u64 {
        self.wakeups.load(Ordering::Relaxed)
    }
}

impl WaitStrategy for LiteBlockingWaitStrategy {
    fn wait_for(
        &self,
        sequence: i64,
        cursor: &Sequence,
        dependent: &DependentSequence,
        barrier: &dyn SequenceBarrier,
    ) -> Result<i64> {
        if cursor.get() < sequence {
            let mut guard = self.mutex.lock();
            loop {
                self.signal_needed.swap(true, Ordering::SeqCst);
                fence(Ordering::SeqCst);
                if cursor.get() >= sequence {
                    break;
                }
                barrier.check_alert()?;
                self.condvar.wait(&mut guard);
                if cursor.get() >= sequence {
                    break;
                }
            }
        }

        spin_on_dependent(sequence, dependent, barrier)
    }

    fn signal_all_when_blocking(&self) {
        fence(Ordering::SeqCst);
        if self.signal_needed.swap(false, Ordering::SeqCst) {
            let _guard = self.mutex.lock();
            self.condvar.notify_all();
            self.wakeups.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Blocking wait strategy that gives up after a fixed timeout
///
/// Returns `DisruptorError::Timeout` when the cursor has not reached the
/// requested sequence in time; processors route that to the handler's
/// timeout callback and keep waiting.
#[derive(Debug)]
pub struct TimeoutBlockingWaitStrategy {
    mutex: Mutex<()>,
    condvar: Condvar,
    timeout: Duration,
}

impl TimeoutBlockingWaitStrategy {
    pub fn new(timeout: Duration) -> Self {
        Self {
            mutex: Mutex::new(()),
            condvar: Condvar::new(),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl WaitStrategy for TimeoutBlockingWaitStrategy {
    fn wait_for(
        &self,
        sequence: i64,
        cursor: &Sequence,
        dependent: &DependentSequence,
        barrier: &dyn SequenceBarrier,
    ) -> Result<i64> {
        if cursor.get() < sequence {
            let deadline = Instant::now() + self.timeout;
            let mut guard = self.mutex.lock();
            while cursor.get() < sequence {
                barrier.check_alert()?;
                let result = self.condvar.wait_until(&mut guard, deadline);
                if result.timed_out() && cursor.get() < sequence {
                    return Err(DisruptorError::Timeout);
                }
            }
        }

        spin_on_dependent(sequence, dependent, barrier)
    }

    fn signal_all_when_blocking(&self) {
        let _guard = self.mutex.lock();
        self.condvar.notify_all();
    }
}

/// Busy-spin wait strategy
///
/// Lowest latency, 100% CPU while waiting. Use only with dedicated cores.
#[derive(Debug, Default, Clone, Copy)]
pub struct BusySpinWaitStrategy;

impl BusySpinWaitStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl WaitStrategy for BusySpinWaitStrategy {
    fn wait_for(
        &self,
        sequence: i64,
        _cursor: &Sequence,
        dependent: &DependentSequence,
        barrier: &dyn SequenceBarrier,
    ) -> Result<i64> {
        spin_on_dependent(sequence, dependent, barrier)
    }

    fn signal_all_when_blocking(&self) {}
}

const DEFAULT_SPIN_TRIES: u32 = 100;

/// Yielding wait strategy
///
/// Spins for `spin_tries` iterations, then yields the thread on every further
/// iteration.
#[derive(Debug, Clone, Copy)]
pub struct YieldingWaitStrategy {
    spin_tries: u32,
}

impl YieldingWaitStrategy {
    pub fn new() -> Self {
        Self::with_spin_tries(DEFAULT_SPIN_TRIES)
    }

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
        dependent: &DependentSequence,
        barrier: &dyn SequenceBarrier,
    ) -> Result<i64> {
        let mut counter = self.spin_tries;
        loop {
            let available_sequence = dependent.get();
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

const DEFAULT_RETRIES: u32 = 200;
const DEFAULT_SLEEP: Duration = Duration::from_nanos(100);

/// Sleeping wait strategy
///
/// Spins, then yields, then sleeps for `sleep_duration` per iteration once
/// `retries` is exhausted. Low CPU use at the cost of latency spikes.
#[derive(Debug, Clone, Copy)]
pub struct SleepingWaitStrategy {
    retries: u32,
    sleep_duration: Duration,
}

impl SleepingWaitStrategy {
    pub fn new() -> Self {
        Self::with_settings(DEFAULT_RETRIES, DEFAULT_SLEEP)
    }

    pub fn with_settings(retries: u32, sleep_duration: Duration) -> Self {
        Self {
            retries,
            sleep_duration,
        }
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
        dependent: &DependentSequence,
        barrier: &dyn SequenceBarrier,
    ) -> Result<i64> {
        let mut counter = self.retries;
        loop {
            let available_sequence = dependent.get();
            if available_sequence >= sequence {
                return Ok(available_sequence);
            }
            barrier.check_alert()?;
            if counter > 100 {
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
