//! Wait strategies for ring buffer consumers
//!
//! This module provides different wait strategies that control how consumers
//! wait for new data in the ring buffer. Each strategy offers different
//! trade-offs between latency, CPU usage, and throughput.
//!
//! | Strategy | Latency | CPU | Parks threads |
//! |----------|---------|-----|---------------|
//! | `BusySpinWaitStrategy` | lowest | one full core | no |
//! | `YieldingWaitStrategy` | low | high | no |
//! | `SleepingWaitStrategy` | moderate | low | no (sleeps) |
//! | `BlockingWaitStrategy` | higher | lowest | yes |
//! | `TimeoutBlockingWaitStrategy` | higher | lowest | yes, bounded |
//! | `LiteTimeoutBlockingWaitStrategy` | higher | lowest | yes, bounded, elided wake-ups |
//!
//! Every strategy returns a [`WaitResult`]; none of them report a timeout or an
//! alert through `Err`.

use std::sync::atomic::{ AtomicBool, Ordering };
use std::thread;
use std::time::{ Duration, Instant };

use parking_lot::{ Condvar, Mutex };

use crate::constants::{ SLEEPING_RETRIES, YIELDING_SPIN_TRIES };
use crate::disruptor::alert::SequenceBarrierAlert;
use crate::disruptor::sequence::{ DependentSequence, Sequence };

/// Outcome of a wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitResult {
    /// Highest sequence now available, always `>=` the requested one
    Success(i64),
    /// A timeout strategy's deadline lapsed first
    Timeout,
    /// The barrier's alert was raised
    Cancel,
}

impl WaitResult {
    #[inline(always)]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    #[inline(always)]
    pub fn available(&self) -> Option<i64> {
        match self {
            Self::Success(sequence) => Some(*sequence),
            _ => None,
        }
    }
}

/// Trait for wait strategies that determine how consumers wait for data
pub trait WaitStrategy: Send + Sync {
    /// Wait until `dependent` reaches `sequence`.
    ///
    /// # Arguments
    ///
    /// * `sequence` - The sequence number to wait for
    /// * `cursor` - Producer cursor; blocking strategies park on it
    /// * `dependent` - What actually has to reach `sequence` (the cursor itself or
    ///   the upstream consumers)
    /// * `alert` - Cancellation flag of the barrier doing the wait
    fn wait_for(
        &self,
        sequence: i64,
        cursor: &Sequence,
        dependent: &dyn DependentSequence,
        alert: &SequenceBarrierAlert
    ) -> WaitResult;

    /// Wake parked waiters after the cursor moved. No-op unless the strategy parks.
    fn signal_all_when_blocking(&self);
}

/// Short spin then yield, used on the dependent sequence once the cursor is past
/// the requested sequence (upstream consumers are expected to be close behind).
struct SpinWait {
    count: u32,
}

impl SpinWait {
    const SPIN_LIMIT: u32 = 64;

    fn new() -> Self {
        Self { count: 0 }
    }

    #[inline]
    fn spin_once(&mut self) {
        if self.count < Self::SPIN_LIMIT {
            std::hint::spin_loop();
            self.count += 1;
        } else {
            thread::yield_now();
        }
    }
}

#[inline]
fn spin_on_dependent(
    sequence: i64,
    dependent: &dyn DependentSequence,
    alert: &SequenceBarrierAlert
) -> WaitResult {
    let mut spin = SpinWait::new();
    loop {
        let available = dependent.value();
        if available >= sequence {
            return WaitResult::Success(available);
        }
        if alert.is_active() {
            return WaitResult::Cancel;
        }
        spin.spin_once();
    }
}

/// Busy spin wait strategy - lowest latency, highest CPU usage.
/// This strategy continuously checks for new data in a tight loop, making it
/// ideal for scenarios where latency is critical and threads are pinned to
/// dedicated cores. It will consume 100% of a CPU core while waiting.
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
        dependent: &dyn DependentSequence,
        alert: &SequenceBarrierAlert
    ) -> WaitResult {
        loop {
            let available = dependent.value();
            if available >= sequence {
                return WaitResult::Success(available);
            }
            if alert.is_active() {
                return WaitResult::Cancel;
            }
            std::hint::spin_loop();
        }
    }

    fn signal_all_when_blocking(&self) {
        // No-op for busy spin - no blocking threads to signal
    }
}

/// Yielding wait strategy - spins for a fixed number of iterations, then yields
/// the thread on each further iteration. A good compromise between latency and
/// CPU use without the latency spikes of parking.
#[derive(Debug, Clone, Copy)]
pub struct YieldingWaitStrategy {
    spin_tries: u32,
}

impl YieldingWaitStrategy {
    pub fn new() -> Self {
        Self::with_spin_tries(YIELDING_SPIN_TRIES)
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
        dependent: &dyn DependentSequence,
        alert: &SequenceBarrierAlert
    ) -> WaitResult {
        let mut counter = self.spin_tries;

        loop {
            let available = dependent.value();
            if available >= sequence {
                return WaitResult::Success(available);
            }
            if alert.is_active() {
                return WaitResult::Cancel;
            }

            if counter == 0 {
                thread::yield_now();
            } else {
                counter -= 1;
                std::hint::spin_loop();
            }
        }
    }

    fn signal_all_when_blocking(&self) {
        // No-op for yielding - threads will wake up naturally
    }
}

/// Sleeping wait strategy - lowest CPU usage of the non-parking strategies.
/// Spins, then yields, then sleeps for `sleep_duration` per iteration.
#[derive(Debug, Clone, Copy)]
pub struct SleepingWaitStrategy {
    retries: u32,
    sleep_duration: Duration,
}

impl SleepingWaitStrategy {
    pub fn new(sleep_duration: Duration) -> Self {
        Self { retries: SLEEPING_RETRIES, sleep_duration }
    }

    pub fn with_retries(retries: u32, sleep_duration: Duration) -> Self {
        Self { retries, sleep_duration }
    }
}

impl Default for SleepingWaitStrategy {
    fn default() -> Self {
        Self::new(Duration::from_micros(100))
    }
}

impl WaitStrategy for SleepingWaitStrategy {
    fn wait_for(
        &self,
        sequence: i64,
        _cursor: &Sequence,
        dependent: &dyn DependentSequence,
        alert: &SequenceBarrierAlert
    ) -> WaitResult {
        let mut counter = self.retries;

        loop {
            let available = dependent.value();
            if available >= sequence {
                return WaitResult::Success(available);
            }
            if alert.is_active() {
                return WaitResult::Cancel;
            }

            if counter > self.retries / 2 {
                counter -= 1;
                std::hint::spin_loop();
            } else if counter > 0 {
                counter -= 1;
                thread::yield_now();
            } else {
                thread::sleep(self.sleep_duration);
            }
        }
    }

    fn signal_all_when_blocking(&self) {
        // No-op for sleeping - threads will wake up naturally
    }
}

/// Blocking wait strategy - parks consumers on a condition variable until the
/// cursor passes the requested sequence, then spins briefly on the dependent
/// sequence. Publishers pay a lock and a notify on every publish.
pub struct BlockingWaitStrategy {
    mutex: Mutex<()>,
    condition: Condvar,
}

impl BlockingWaitStrategy {
    pub fn new() -> Self {
        Self {
            mutex: Mutex::new(()),
            condition: Condvar::new(),
        }
    }
}

impl Default for BlockingWaitStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl WaitStrategy for BlockingWaitStrategy {
    fn wait_for(
        &self,
        sequence: i64,
        cursor: &Sequence,
        dependent: &dyn DependentSequence,
        alert: &SequenceBarrierAlert
    ) -> WaitResult {
        if cursor.get() < sequence {
            let mut guard = self.mutex.lock();
            while cursor.get() < sequence {
                if alert.is_active() {
                    return WaitResult::Cancel;
                }
                self.condition.wait(&mut guard);
            }
        }

        spin_on_dependent(sequence, dependent, alert)
    }

    fn signal_all_when_blocking(&self) {
        let _guard = self.mutex.lock();
        self.condition.notify_all();
    }
}

/// Blocking wait strategy with a bound on the parked portion of the wait.
///
/// Returns [`WaitResult::Timeout`] when the deadline passes with the cursor still
/// behind. The spin on the dependent sequence afterwards is not bounded.
pub struct TimeoutBlockingWaitStrategy {
    mutex: Mutex<()>,
    condition: Condvar,
    timeout: Duration,
}

impl TimeoutBlockingWaitStrategy {
    pub fn new(timeout: Duration) -> Self {
        Self {
            mutex: Mutex::new(()),
            condition: Condvar::new(),
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
        dependent: &dyn DependentSequence,
        alert: &SequenceBarrierAlert
    ) -> WaitResult {
        if cursor.get() < sequence {
            let deadline = Instant::now() + self.timeout;
            let mut guard = self.mutex.lock();
            while cursor.get() < sequence {
                if alert.is_active() {
                    return WaitResult::Cancel;
                }
                if
                    self.condition.wait_until(&mut guard, deadline).timed_out() &&
                    Instant::now() >= deadline
                {
                    if alert.is_active() {
                        return WaitResult::Cancel;
                    }
                    if cursor.get() >= sequence {
                        break;
                    }
                    return WaitResult::Timeout;
                }
            }
        }

        spin_on_dependent(sequence, dependent, alert)
    }

    fn signal_all_when_blocking(&self) {
        let _guard = self.mutex.lock();
        self.condition.notify_all();
    }
}

/// Variation of [`TimeoutBlockingWaitStrategy`] that elides the lock and notify
/// on publish when no consumer is parked.
///
/// A waiter raises `signal_needed` before every re-check of the cursor; a
/// publisher only takes the lock if it swaps the flag from raised to clear.
pub struct LiteTimeoutBlockingWaitStrategy {
    mutex: Mutex<()>,
    condition: Condvar,
    signal_needed: AtomicBool,
    timeout: Duration,
}

impl LiteTimeoutBlockingWaitStrategy {
    pub fn new(timeout: Duration) -> Self {
        Self {
            mutex: Mutex::new(()),
            condition: Condvar::new(),
            signal_needed: AtomicBool::new(false),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl WaitStrategy for LiteTimeoutBlockingWaitStrategy {
    fn wait_for(
        &self,
        sequence: i64,
        cursor: &Sequence,
        dependent: &dyn DependentSequence,
        alert: &SequenceBarrierAlert
    ) -> WaitResult {
        if cursor.get() < sequence {
            let deadline = Instant::now() + self.timeout;
            let mut guard = self.mutex.lock();
            loop {
                // Raise the flag before re-reading the cursor: a publisher either
                // sees it raised, or its cursor store is visible to the read below.
                self.signal_needed.swap(true, Ordering::SeqCst);
                if cursor.get() >= sequence {
                    break;
                }
                if alert.is_active() {
                    return WaitResult::Cancel;
                }
                if
                    self.condition.wait_until(&mut guard, deadline).timed_out() &&
                    Instant::now() >= deadline
                {
                    if alert.is_active() {
                        return WaitResult::Cancel;
                    }
                    if cursor.get() >= sequence {
                        break;
                    }
                    return WaitResult::Timeout;
                }
            }
        }

        spin_on_dependent(sequence, dependent, alert)
    }

    fn signal_all_when_blocking(&self) {
        if self.signal_needed.swap(false, Ordering::SeqCst) {
            let _guard = self.mutex.lock();
            self.condition.notify_all();
        }
    }
}
