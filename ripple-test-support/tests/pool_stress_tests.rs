//! Worker pool and wait strategy stress tests
//!
//! Pools are checked for exactly-once delivery under uneven worker speeds;
//! timeout strategies are checked for accuracy and for prompt halting.

use ripple::{
    processor,
    BatchEventProcessor,
    BlockingWaitStrategy,
    EventHandler,
    EventProcessor,
    RingBuffer,
    ThreadExecutor,
    TimeoutBlockingWaitStrategy,
    WorkHandler,
    WorkerPool,
    YieldingWaitStrategy,
};
use ripple_test_support::{
    print_summary,
    DeliveryLedger,
    Jitter,
    StressConfig,
    StressCounters,
    StressRunner,
};
use std::sync::atomic::{ AtomicI64, Ordering };
use std::sync::{ Arc, Mutex };
use std::thread;
use std::time::{ Duration, Instant };

struct Summer {
    total: Arc<AtomicI64>,
}

impl WorkHandler<i64> for Summer {
    fn on_event(&mut self, event: &i64) -> anyhow::Result<()> {
        self.total.fetch_add(*event, Ordering::Relaxed);
        Ok(())
    }
}

#[test]
fn test_two_workers_sum_small_ring() {
    let ring = Arc::new(
        RingBuffer::create_single_producer(|| 0i64, 16, Arc::new(BlockingWaitStrategy::new())).unwrap()
    );
    let total = Arc::new(AtomicI64::new(0));
    let handlers: Vec<Box<dyn WorkHandler<i64>>> = (0..2)
        .map(|_| Box::new(Summer { total: total.clone() }) as Box<dyn WorkHandler<i64>>)
        .collect();
    let pool = WorkerPool::new(ring.clone(), &[], handlers).unwrap();
    let executor = ThreadExecutor::new();
    pool.start(&executor).unwrap();

    for value in 0..1000i64 {
        ring.publish_event(|slot, _| {
            *slot = value;
        });
    }
    pool.drain_and_halt();
    executor.join_all().unwrap();

    assert_eq!(total.load(Ordering::Relaxed), (0..1000).sum::<i64>());
    assert!(!pool.is_running());
}

/// Records each delivery in a shared ledger, pausing randomly first.
struct LedgerHandler {
    worker: usize,
    ledger: Arc<DeliveryLedger>,
    jitter: Jitter,
    counters: Option<Arc<StressCounters>>,
}

impl WorkHandler<i64> for LedgerHandler {
    fn on_event(&mut self, event: &i64) -> anyhow::Result<()> {
        self.jitter.pause();
        let first_delivery = self.ledger.record(self.worker, *event);
        if let Some(counters) = &self.counters {
            if first_delivery {
                counters.record_consume();
            } else {
                counters.record_fault();
            }
        }
        anyhow::ensure!(first_delivery, "event {} delivered twice", event);
        Ok(())
    }
}

fn ledger_pool(
    ring: &Arc<RingBuffer<i64>>,
    workers: usize,
    ledger: &Arc<DeliveryLedger>,
    max_jitter: u32,
    counters: Option<Arc<StressCounters>>
) -> WorkerPool<i64> {
    let handlers: Vec<Box<dyn WorkHandler<i64>>> = (0..workers)
        .map(|worker| {
            Box::new(LedgerHandler {
                worker,
                ledger: ledger.clone(),
                jitter: Jitter::new(worker as u64, max_jitter),
                counters: counters.clone(),
            }) as Box<dyn WorkHandler<i64>>
        })
        .collect();
    WorkerPool::new(ring.clone(), &[], handlers).unwrap()
}

#[test]
fn test_pool_delivers_exactly_once_with_uneven_workers() {
    const WORKERS: usize = 4;
    const EVENTS: usize = 50_000;

    let ring = Arc::new(
        RingBuffer::create_multi_producer(|| -1i64, 64, Arc::new(YieldingWaitStrategy::new())).unwrap()
    );
    let ledger = Arc::new(DeliveryLedger::new(EVENTS, WORKERS));
    let pool = ledger_pool(&ring, WORKERS, &ledger, 256, None);
    let executor = ThreadExecutor::new();
    pool.start(&executor).unwrap();

    // Two producers interleave; each owns half of the value space
    let producers: Vec<_> = (0..2)
        .map(|p| {
            let ring = ring.clone();
            thread::spawn(move || {
                for value in (p..EVENTS as i64).step_by(2) {
                    ring.publish_event(|slot, _| {
                        *slot = value;
                    });
                }
            })
        })
        .collect();
    for p in producers {
        p.join().unwrap();
    }
    pool.drain_and_halt();
    executor.join_all().unwrap();

    assert_eq!(ledger.duplicates(), 0);
    let missing = ledger.missing();
    assert!(missing.is_empty(), "{} missing, first: {:?}", missing.len(), missing.first());
    assert!(ledger.is_exactly_once());
    assert_eq!(ledger.per_worker().iter().sum::<u64>(), EVENTS as u64);
    assert_eq!(ring.metrics().snapshot().handler_faults, 0);
}

#[test]
fn test_pool_stress_run() {
    let config = StressConfig::new(Duration::from_secs(1))
        .with_producers(2)
        .with_consumers(3)
        .with_ring_size(1024)
        .with_batch_size(8)
        .with_jitter(64);
    // Upper bound on what the producers can publish in the run
    const CAPACITY: usize = 8_000_000;

    let ring = Arc::new(
        RingBuffer::create_multi_producer(
            || -1i64,
            config.ring_size,
            Arc::new(YieldingWaitStrategy::new())
        ).unwrap()
    );
    let runner = StressRunner::new(config.clone());
    let ledger = Arc::new(DeliveryLedger::new(CAPACITY, config.consumers));
    let pool = ledger_pool(
        &ring,
        config.consumers,
        &ledger,
        config.max_jitter_spins,
        Some(runner.counters())
    );
    let executor = ThreadExecutor::new();
    pool.start(&executor).unwrap();

    let next_value = Arc::new(AtomicI64::new(0));
    let metrics = runner.run_with_progress(|counters| {
        let producers: Vec<_> = (0..config.producers)
            .map(|_| {
                let ring = ring.clone();
                let counters = counters.clone();
                let next_value = next_value.clone();
                let batch = config.batch_size;
                thread::spawn(move || {
                    while counters.is_running() {
                        let first = next_value.fetch_add(batch, Ordering::Relaxed);
                        if first + batch > (CAPACITY as i64) {
                            break;
                        }
                        let mut value = first;
                        ring.publish_events(batch, |slot, _| {
                            *slot = value;
                            value += 1;
                        }).unwrap();
                        counters.record_publish(batch as u64);
                    }
                })
            })
            .collect();
        for p in producers {
            p.join().unwrap();
        }
        pool.drain_and_halt();
    });
    executor.join_all().unwrap();

    print_summary("Worker pool stress", &metrics);
    assert_eq!(metrics.faults, 0);
    assert_eq!(ring.metrics().snapshot().handler_faults, 0);
    assert_eq!(metrics.backlog(), 0);
    assert_eq!(ledger.duplicates(), 0);
    assert_eq!(ledger.delivered() as u64, metrics.published);
}

/// Remembers when each timeout fired.
struct TimeoutRecorder {
    timeouts: Arc<Mutex<Vec<Instant>>>,
}

impl EventHandler<i64> for TimeoutRecorder {
    fn on_event(&mut self, _event: &i64, _sequence: i64, _end_of_batch: bool) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_timeout(&mut self, _sequence: i64) -> anyhow::Result<()> {
        self.timeouts.lock().unwrap().push(Instant::now());
        Ok(())
    }
}

#[test]
fn test_timeout_strategy_never_fires_early() {
    let timeout = Duration::from_millis(20);
    let ring = Arc::new(
        RingBuffer::create_single_producer(
            || 0i64,
            8,
            Arc::new(TimeoutBlockingWaitStrategy::new(timeout))
        ).unwrap()
    );
    let timeouts = Arc::new(Mutex::new(Vec::new()));
    let consumer = Arc::new(
        BatchEventProcessor::new(ring.clone(), ring.new_barrier(&[]), TimeoutRecorder {
            timeouts: timeouts.clone(),
        })
    );
    ring.add_gating_sequences(&[consumer.sequence()]);

    let started = Instant::now();
    let handle = processor::start(&consumer).unwrap();
    thread::sleep(Duration::from_millis(250));
    consumer.halt();
    handle.join().unwrap();

    let fired = timeouts.lock().unwrap().clone();
    assert!(fired.len() >= 3, "only {} timeouts in 250ms", fired.len());
    assert!(fired[0].duration_since(started) >= timeout);
    for pair in fired.windows(2) {
        assert!(pair[1].duration_since(pair[0]) >= timeout);
    }
    assert_eq!(ring.metrics().snapshot().timeouts, fired.len() as u64);
}

#[test]
fn test_blocked_consumer_halts_promptly() {
    let ring = Arc::new(
        RingBuffer::create_single_producer(|| 0i64, 8, Arc::new(BlockingWaitStrategy::new())).unwrap()
    );
    let consumer = Arc::new(
        BatchEventProcessor::new(ring.clone(), ring.new_barrier(&[]), TimeoutRecorder {
            timeouts: Arc::new(Mutex::new(Vec::new())),
        })
    );
    ring.add_gating_sequences(&[consumer.sequence()]);
    let handle = processor::start(&consumer).unwrap();

    // Let it park on the condvar with nothing published
    thread::sleep(Duration::from_millis(50));
    assert!(consumer.is_running());

    let halted_at = Instant::now();
    consumer.halt();
    handle.join().unwrap();

    assert!(halted_at.elapsed() < Duration::from_secs(1));
    assert!(!consumer.is_running());
}

#[test]
fn test_idle_pool_halts_promptly() {
    let ring = Arc::new(
        RingBuffer::create_multi_producer(|| 0i64, 16, Arc::new(BlockingWaitStrategy::new())).unwrap()
    );
    let ledger = Arc::new(DeliveryLedger::new(0, 3));
    let pool = ledger_pool(&ring, 3, &ledger, 0, None);
    let executor = ThreadExecutor::new();
    pool.start(&executor).unwrap();
    thread::sleep(Duration::from_millis(50));
    assert_eq!(executor.thread_count(), 3);

    let halted_at = Instant::now();
    pool.halt();
    executor.join_all().unwrap();

    assert!(halted_at.elapsed() < Duration::from_secs(1));
    assert!(!pool.is_running());
    assert_eq!(executor.thread_count(), 0);
}
