//! Running Total - one producer, two chained consumers
//!
//! A journaler sees every number first; a summer behind it keeps the total.
//! The summer's barrier tracks the journaler, so it never reads a slot the
//! journaler has not finished.

use std::sync::atomic::{ AtomicU64, Ordering };
use std::sync::Arc;
use std::time::Instant;

use ripple::{
    processor,
    BatchEventProcessor,
    BlockingWaitStrategy,
    EventHandler,
    EventProcessor,
    RingBuffer,
};

const RING_SIZE: usize = 1024;
const MAX_NUMBER: u64 = 1_000_000;
const WARMUP: i64 = 10_000;

struct Journaler {
    batches: u64,
}

impl EventHandler<u64> for Journaler {
    fn on_event(&mut self, _event: &u64, _sequence: i64, end_of_batch: bool) -> anyhow::Result<()> {
        if end_of_batch {
            self.batches += 1;
        }
        Ok(())
    }

    fn on_shutdown(&mut self) -> anyhow::Result<()> {
        println!("Journaler: {} batches", self.batches);
        Ok(())
    }
}

struct Summer {
    total: Arc<AtomicU64>,
}

impl EventHandler<u64> for Summer {
    fn on_event(&mut self, event: &u64, _sequence: i64, _end_of_batch: bool) -> anyhow::Result<()> {
        self.total.fetch_add(*event, Ordering::Relaxed);
        Ok(())
    }
}

fn main() -> ripple::Result<()> {
    println!("\n╔════════════════════════════════════════════════════════╗");
    println!("║  Running Total - 1 producer, 2 chained consumers       ║");
    println!("╚════════════════════════════════════════════════════════╝\n");

    let ring = Arc::new(
        RingBuffer::create_single_producer(|| 0u64, RING_SIZE, Arc::new(BlockingWaitStrategy::new()))?
    );

    let journaler = Arc::new(
        BatchEventProcessor::new(ring.clone(), ring.new_barrier(&[]), Journaler { batches: 0 })
    );
    let total = Arc::new(AtomicU64::new(0));
    let summer = Arc::new(
        BatchEventProcessor::new(ring.clone(), ring.new_barrier(&[journaler.sequence()]), Summer {
            total: total.clone(),
        })
    );
    // Only the last consumer in the chain gates the producer
    ring.add_gating_sequences(&[summer.sequence()]);

    let journal_thread = processor::start(&journaler)?;
    let sum_thread = processor::start(&summer)?;

    // Zeros leave the total alone; counters restart once they are through
    for _ in 0..WARMUP {
        ring.publish_event(|slot, _| *slot = 0);
    }
    while summer.sequence().get() < WARMUP - 1 {
        std::thread::yield_now();
    }
    ring.metrics().reset();

    let start = Instant::now();
    for number in 1..=MAX_NUMBER {
        ring.publish_event(|slot, _| *slot = number);
    }

    let last = WARMUP + (MAX_NUMBER as i64) - 1;
    while summer.sequence().get() < last {
        std::thread::yield_now();
    }
    let elapsed = start.elapsed();

    journaler.halt();
    summer.halt();
    journal_thread.join().ok();
    sum_thread.join().ok();

    let expected = (MAX_NUMBER * (MAX_NUMBER + 1)) / 2;
    println!("Total:    {}", total.load(Ordering::Relaxed));
    println!("Expected: {}", expected);
    println!("Time:     {:?}", elapsed);
    println!("Metrics:  {}", ring.metrics().snapshot());
    assert_eq!(total.load(Ordering::Relaxed), expected);
    Ok(())
}
