//! Wait strategy comparison
//!
//! Same one-producer/one-consumer pipeline under every wait strategy, so the
//! latency/CPU trade-off shows up as throughput.
//!
//! Run: cargo bench --bench bench_wait_strategies

use criterion::{ criterion_group, criterion_main, BenchmarkId, Criterion, Throughput };
use std::hint::black_box;
use std::sync::Arc;
use std::time::Duration;

use ripple::{
    processor,
    BatchEventProcessor,
    EventHandler,
    EventProcessor,
    ProducerType,
    RingBuffer,
    RingBufferConfig,
    WaitStrategyType,
};

const RING_SIZE: usize = 16 * 1024;
const TOTAL_EVENTS: i64 = 200_000;

struct Count(u64);

impl EventHandler<u64> for Count {
    fn on_event(&mut self, _event: &u64, _sequence: i64, _end_of_batch: bool) -> anyhow::Result<()> {
        self.0 += 1;
        Ok(())
    }
}

fn run(wait_strategy: WaitStrategyType, events: i64) -> i64 {
    let config = RingBufferConfig::new(RING_SIZE)
        .unwrap()
        .with_producer_type(ProducerType::Single)
        .with_wait_strategy(wait_strategy);
    let ring = Arc::new(RingBuffer::from_config(|| 0u64, &config).unwrap());
    let consumer = Arc::new(BatchEventProcessor::new(ring.clone(), ring.new_barrier(&[]), Count(0)));
    ring.add_gating_sequences(&[consumer.sequence()]);
    let handle = processor::start(&consumer).unwrap();

    for _ in 0..events {
        ring.publish_event(|slot, seq| *slot = seq as u64);
    }

    let done = consumer.sequence();
    while done.get() < events - 1 {
        std::thread::yield_now();
    }
    consumer.halt();
    handle.join().unwrap();
    black_box(done.get())
}

fn benchmark_wait_strategies(c: &mut Criterion) {
    let mut group = c.benchmark_group("Wait Strategies (200k events)");
    group.throughput(Throughput::Elements(TOTAL_EVENTS as u64));
    group.sample_size(10);

    let strategies = [
        ("busy_spin", WaitStrategyType::BusySpin),
        ("yielding", WaitStrategyType::Yielding),
        ("sleeping", WaitStrategyType::Sleeping),
        ("blocking", WaitStrategyType::Blocking),
        ("timeout_blocking", WaitStrategyType::TimeoutBlocking(Duration::from_millis(1))),
        ("lite_timeout_blocking", WaitStrategyType::LiteTimeoutBlocking(Duration::from_millis(1))),
    ];

    for (name, strategy) in strategies {
        group.bench_with_input(BenchmarkId::new("strategy", name), &strategy, |b, &strategy| {
            b.iter(|| run(strategy, TOTAL_EVENTS))
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_wait_strategies);
criterion_main!(benches);
