//! Processor lifecycle and the threads processors run on.
//!
//! Every processor moves `Idle -> Running -> Halted`. Arming (the CAS out of
//! `Idle`) always happens on the caller's thread, so starting a processor twice
//! or restarting a halted one is reported to the caller instead of being lost
//! on a background thread.

use std::sync::atomic::{ AtomicU8, AtomicUsize, Ordering };
use std::sync::Arc;
use std::thread::{ self, JoinHandle };

use parking_lot::Mutex;

use crate::affinity::pin_to_cpu;
use crate::disruptor::sequence::Sequence;
use crate::error::{ Result, RippleError };
use crate::insights;

const IDLE: u8 = 0;
const RUNNING: u8 = 1;
const HALTED: u8 = 2;

/// Proof that a processor moved out of `Idle`.
///
/// Only this crate can create one, so the loop behind
/// [`EventProcessor::run_armed`] cannot be entered without winning the arming CAS.
///
/// ```compile_fail
/// let forged = ripple::processor::Armed { _private: () };
/// ```
#[derive(Debug)]
pub struct Armed {
    _private: (),
}

/// Three-state run flag shared by both processor kinds.
#[derive(Debug)]
pub(crate) struct RunState(AtomicU8);

impl RunState {
    pub(crate) fn new() -> Self {
        Self(AtomicU8::new(IDLE))
    }

    /// `Idle -> Running`, or the lifecycle error describing why not.
    pub(crate) fn try_arm(&self, processor: &'static str) -> Result<Armed> {
        match self.0.compare_exchange(IDLE, RUNNING, Ordering::AcqRel, Ordering::Acquire) {
            Ok(_) => Ok(Armed { _private: () }),
            Err(RUNNING) => Err(RippleError::AlreadyRunning { processor }),
            Err(_) => Err(RippleError::Halted { processor }),
        }
    }

    pub(crate) fn halt(&self) {
        self.0.store(HALTED, Ordering::Release);
    }

    #[inline(always)]
    pub(crate) fn is_running(&self) -> bool {
        self.0.load(Ordering::Acquire) == RUNNING
    }
}

/// A consumer loop that can be run on its own thread.
pub trait EventProcessor: Send + Sync + 'static {
    /// Thread and log name
    fn name(&self) -> &'static str;

    /// Progress marker; register it as a gating sequence before starting
    fn sequence(&self) -> Arc<Sequence>;

    /// Stop as soon as the current event is done
    fn halt(&self);

    /// Stop once everything already published is processed
    fn halt_later(&self);

    fn is_running(&self) -> bool;

    /// Run the loop on the calling thread until halted.
    fn run(&self) -> Result<()> {
        let armed = self.arm()?;
        self.run_armed(armed);
        Ok(())
    }

    #[doc(hidden)]
    fn arm(&self) -> Result<Armed>;

    #[doc(hidden)]
    fn run_armed(&self, armed: Armed);
}

/// Runs processor loops somewhere: the execution context a processor starts on.
pub trait Executor: Send + Sync {
    fn execute(&self, name: &str, task: Box<dyn FnOnce() + Send + 'static>) -> Result<()>;
}

/// Start `processor` on a new named thread.
pub fn start<P>(processor: &Arc<P>) -> Result<JoinHandle<()>> where P: EventProcessor + ?Sized {
    let armed = processor.arm()?;
    let p = processor.clone();
    match
        thread::Builder
            ::new()
            .name(processor.name().to_string())
            .spawn(move || p.run_armed(armed))
    {
        Ok(handle) => Ok(handle),
        Err(e) => {
            processor.halt();
            Err(e.into())
        }
    }
}

/// Start `processor` on `executor`.
pub fn start_on<P>(processor: &Arc<P>, executor: &dyn Executor) -> Result<()>
    where P: EventProcessor + ?Sized
{
    let armed = processor.arm()?;
    let p = processor.clone();
    if let Err(e) = executor.execute(processor.name(), Box::new(move || p.run_armed(armed))) {
        processor.halt();
        return Err(e);
    }
    Ok(())
}

/// One dedicated OS thread per task.
///
/// With affinity configured, threads are pinned to the listed cores round-robin.
#[derive(Debug, Default)]
pub struct ThreadExecutor {
    handles: Mutex<Vec<JoinHandle<()>>>,
    cores: Vec<usize>,
    next_core: AtomicUsize,
}

impl ThreadExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_affinity(cores: Vec<usize>) -> Self {
        Self {
            cores,
            ..Self::default()
        }
    }

    /// Wait for every thread started so far.
    pub fn join_all(&self) -> Result<()> {
        let handles = std::mem::take(&mut *self.handles.lock());
        let mut panicked = 0;
        for handle in handles {
            if handle.join().is_err() {
                panicked += 1;
            }
        }
        if panicked > 0 {
            return Err(RippleError::unexpected(format!("{} processor thread(s) panicked", panicked)));
        }
        Ok(())
    }

    pub fn thread_count(&self) -> usize {
        self.handles.lock().len()
    }
}

impl Executor for ThreadExecutor {
    fn execute(&self, name: &str, task: Box<dyn FnOnce() + Send + 'static>) -> Result<()> {
        let core = if self.cores.is_empty() {
            None
        } else {
            let i = self.next_core.fetch_add(1, Ordering::Relaxed);
            Some(self.cores[i % self.cores.len()])
        };

        let handle = thread::Builder
            ::new()
            .name(name.to_string())
            .spawn(move || {
                if let Some(cpu) = core {
                    if let Err(e) = pin_to_cpu(cpu) {
                        insights::record_pin_failure(cpu, &e);
                    }
                }
                task();
            })?;
        self.handles.lock().push(handle);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    #[test]
    fn test_run_state_transitions() {
        let state = RunState::new();
        assert!(!state.is_running());
        state.try_arm("test").unwrap();
        assert!(state.is_running());
        assert!(matches!(state.try_arm("test"), Err(RippleError::AlreadyRunning { .. })));

        state.halt();
        state.halt();
        assert!(!state.is_running());
        assert!(matches!(state.try_arm("test"), Err(RippleError::Halted { .. })));
    }

    #[test]
    fn test_halt_before_start_is_terminal() {
        let state = RunState::new();
        state.halt();
        assert!(matches!(state.try_arm("test"), Err(RippleError::Halted { .. })));
    }

    #[test]
    fn test_thread_executor_runs_tasks() {
        let executor = ThreadExecutor::with_affinity(vec![0]);
        let ran = Arc::new(AtomicBool::new(false));
        let r = ran.clone();
        executor
            .execute(
                "ripple-test",
                Box::new(move || {
                    assert_eq!(thread::current().name(), Some("ripple-test"));
                    r.store(true, Ordering::SeqCst);
                })
            )
            .unwrap();
        assert_eq!(executor.thread_count(), 1);
        executor.join_all().unwrap();
        assert!(ran.load(Ordering::SeqCst));
        assert_eq!(executor.thread_count(), 0);
    }

    #[test]
    fn test_join_all_reports_panics() {
        let executor = ThreadExecutor::new();
        executor.execute("ripple-panic", Box::new(|| panic!("boom"))).unwrap();
        assert!(executor.join_all().is_err());
    }
}
