//! Order Fulfilment - 2 producers, worker pool of 4
//!
//! Each order is handled by exactly one worker. Workers count what they
//! handled; the counts add up to the number of orders published.

use std::sync::atomic::{ AtomicU64, Ordering };
use std::sync::Arc;
use std::thread;
use std::time::{ Duration, Instant };

use ripple::{
    ProducerType,
    RingBuffer,
    RingBufferConfig,
    ThreadExecutor,
    WaitStrategyType,
    WorkHandler,
    WorkerPool,
};

const RING_SIZE: usize = 4096;
const ORDERS_PER_PRODUCER: u64 = 250_000;
const NUM_PRODUCERS: u64 = 2;
const NUM_WORKERS: usize = 4;

#[derive(Default, Clone, Copy)]
struct Order {
    id: u64,
    quantity: u64,
}

struct Fulfiller {
    handled: Arc<AtomicU64>,
    units: Arc<AtomicU64>,
}

impl WorkHandler<Order> for Fulfiller {
    fn on_event(&mut self, order: &Order) -> anyhow::Result<()> {
        self.handled.fetch_add(1, Ordering::Relaxed);
        self.units.fetch_add(order.quantity, Ordering::Relaxed);
        Ok(())
    }

    fn on_timeout(&mut self, _sequence: i64) -> anyhow::Result<()> {
        // Idle worker; nothing to flush
        Ok(())
    }
}

fn main() -> ripple::Result<()> {
    println!("\n╔════════════════════════════════════════════════════════╗");
    println!("║  Order Fulfilment - 2 producers, 4 workers             ║");
    println!("╚════════════════════════════════════════════════════════╝\n");

    let config = RingBufferConfig::new(RING_SIZE)?
        .with_producer_type(ProducerType::Multi)
        .with_wait_strategy(WaitStrategyType::LiteTimeoutBlocking(Duration::from_millis(10)));
    let ring = Arc::new(RingBuffer::from_config(Order::default, &config)?);

    let counters: Vec<_> = (0..NUM_WORKERS).map(|_| Arc::new(AtomicU64::new(0))).collect();
    let units = Arc::new(AtomicU64::new(0));
    let handlers: Vec<Box<dyn WorkHandler<Order>>> = counters
        .iter()
        .map(|handled| {
            Box::new(Fulfiller { handled: handled.clone(), units: units.clone() }) as Box<dyn WorkHandler<Order>>
        })
        .collect();

    let pool = WorkerPool::new(ring.clone(), &[], handlers)?;
    let executor = ThreadExecutor::with_affinity(
        (0..ripple::affinity::available_cores()).collect()
    );
    pool.start(&executor)?;

    let start = Instant::now();
    let producers: Vec<_> = (0..NUM_PRODUCERS)
        .map(|p| {
            let ring = ring.clone();
            thread::spawn(move || {
                for i in 0..ORDERS_PER_PRODUCER {
                    ring.publish_event(|order, _| {
                        order.id = p * ORDERS_PER_PRODUCER + i;
                        order.quantity = 1 + (order.id % 3);
                    });
                }
            })
        })
        .collect();
    for p in producers {
        p.join().ok();
    }

    pool.drain_and_halt();
    executor.join_all()?;
    let elapsed = start.elapsed();

    let total_orders = NUM_PRODUCERS * ORDERS_PER_PRODUCER;
    for (worker, handled) in counters.iter().enumerate() {
        println!("Worker {}: {} orders", worker, handled.load(Ordering::Relaxed));
    }
    let handled: u64 = counters.iter().map(|c| c.load(Ordering::Relaxed)).sum();
    let expected_units: u64 = (0..total_orders).map(|id| 1 + (id % 3)).sum();

    println!("Handled:  {} / {}", handled, total_orders);
    println!("Units:    {} / {}", units.load(Ordering::Relaxed), expected_units);
    println!("Time:     {:?}", elapsed);
    println!("Metrics:  {}", ring.metrics().snapshot());
    assert_eq!(handled, total_orders);
    assert_eq!(units.load(Ordering::Relaxed), expected_units);
    Ok(())
}
