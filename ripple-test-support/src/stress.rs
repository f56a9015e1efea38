//! Stress testing utilities for long-running pipeline tests.

use std::sync::atomic::{ AtomicBool, AtomicU64, Ordering };
use std::sync::Arc;
use std::time::{ Duration, Instant };

use rand::rngs::SmallRng;
use rand::{ Rng, SeedableRng };

/// Configuration for stress tests
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Duration to run the test
    pub duration: Duration,
    /// Number of producer threads
    pub producers: usize,
    /// Number of consumers (batch processors or pool members)
    pub consumers: usize,
    /// Ring buffer size (power of 2)
    pub ring_size: usize,
    /// Events claimed per `publish_events` call
    pub batch_size: i64,
    /// Upper bound of the random spin before each handled event (0 = none)
    pub max_jitter_spins: u32,
    /// Print progress every N seconds
    pub report_interval: Duration,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            duration: Duration::from_secs(2),
            producers: 1,
            consumers: 1,
            ring_size: 1024,
            batch_size: 1,
            max_jitter_spins: 0,
            report_interval: Duration::from_millis(500),
        }
    }
}

impl StressConfig {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            ..Default::default()
        }
    }

    pub fn with_producers(mut self, n: usize) -> Self {
        self.producers = n;
        self
    }

    pub fn with_consumers(mut self, n: usize) -> Self {
        self.consumers = n;
        self
    }

    pub fn with_ring_size(mut self, size: usize) -> Self {
        self.ring_size = size;
        self
    }

    pub fn with_batch_size(mut self, size: i64) -> Self {
        self.batch_size = size;
        self
    }

    pub fn with_jitter(mut self, max_spins: u32) -> Self {
        self.max_jitter_spins = max_spins;
        self
    }

    pub fn jitter(&self, seed: u64) -> Option<Jitter> {
        (self.max_jitter_spins > 0).then(|| Jitter::new(seed, self.max_jitter_spins))
    }
}

/// Random busy pause, used to make consumers run at uneven speeds.
pub struct Jitter {
    rng: SmallRng,
    max_spins: u32,
}

impl Jitter {
    pub fn new(seed: u64, max_spins: u32) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
            max_spins,
        }
    }

    pub fn pause(&mut self) {
        let spins = self.rng.gen_range(0..=self.max_spins);
        for _ in 0..spins {
            std::hint::spin_loop();
        }
        // Occasionally give up the core entirely
        if self.rng.gen_ratio(1, 64) {
            std::thread::yield_now();
        }
    }
}

/// Metrics collected during stress testing
#[derive(Debug, Clone, Default)]
pub struct StressMetrics {
    pub published: u64,
    pub consumed: u64,
    pub faults: u64,
    pub duration: Duration,
    pub peak_rate: f64,
}

impl StressMetrics {
    pub fn publish_rate(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            (self.published as f64) / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    pub fn consume_rate(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            (self.consumed as f64) / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Events published but not (yet) consumed
    pub fn backlog(&self) -> u64 {
        self.published.saturating_sub(self.consumed)
    }
}

/// Shared counters for stress testing
pub struct StressCounters {
    pub published: AtomicU64,
    pub consumed: AtomicU64,
    pub faults: AtomicU64,
    pub running: AtomicBool,
}

impl StressCounters {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn record_publish(&self, events: u64) {
        self.published.fetch_add(events, Ordering::Relaxed);
    }

    pub fn record_consume(&self) {
        self.consumed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fault(&self) {
        self.faults.fetch_add(1, Ordering::Relaxed);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StressMetrics {
        StressMetrics {
            published: self.published.load(Ordering::Relaxed),
            consumed: self.consumed.load(Ordering::Relaxed),
            faults: self.faults.load(Ordering::Relaxed),
            ..Default::default()
        }
    }
}

impl Default for StressCounters {
    fn default() -> Self {
        Self {
            published: AtomicU64::new(0),
            consumed: AtomicU64::new(0),
            faults: AtomicU64::new(0),
            running: AtomicBool::new(true),
        }
    }
}

/// Runs a pipeline for the configured duration, reporting progress on stderr.
pub struct StressRunner {
    config: StressConfig,
    counters: Arc<StressCounters>,
}

impl StressRunner {
    pub fn new(config: StressConfig) -> Self {
        Self {
            config,
            counters: StressCounters::new(),
        }
    }

    pub fn counters(&self) -> Arc<StressCounters> {
        self.counters.clone()
    }

    pub fn config(&self) -> &StressConfig {
        &self.config
    }

    /// Run `test_fn` until it returns. Producers should stop publishing once
    /// `counters.is_running()` turns false; the reporter clears it when the
    /// configured duration has elapsed.
    pub fn run_with_progress<F>(&self, test_fn: F) -> StressMetrics
        where F: FnOnce(Arc<StressCounters>)
    {
        let start = Instant::now();
        let counters = self.counters.clone();
        let duration = self.config.duration;
        let report_interval = self.config.report_interval;

        let report_counters = counters.clone();
        let reporter = std::thread::spawn(move || {
            let mut last_published = 0u64;
            let mut peak_rate = 0.0f64;

            while report_counters.is_running() {
                std::thread::sleep(report_interval);

                let published = report_counters.published.load(Ordering::Relaxed);
                let consumed = report_counters.consumed.load(Ordering::Relaxed);
                let faults = report_counters.faults.load(Ordering::Relaxed);

                let rate = ((published - last_published) as f64) / report_interval.as_secs_f64();
                peak_rate = peak_rate.max(rate);
                last_published = published;

                let elapsed = start.elapsed();
                eprintln!(
                    "[{:>5.1}s] published: {:>10}, consumed: {:>10}, rate: {:>10.0}/s, faults: {}",
                    elapsed.as_secs_f64(),
                    published,
                    consumed,
                    rate,
                    faults
                );

                if elapsed >= duration {
                    report_counters.stop();
                    break;
                }
            }

            peak_rate
        });

        test_fn(counters.clone());

        counters.stop();
        let peak_rate = reporter.join().unwrap_or(0.0);

        let mut metrics = counters.snapshot();
        metrics.duration = start.elapsed();
        metrics.peak_rate = peak_rate;
        metrics
    }
}

/// Print a summary of stress test results
pub fn print_summary(name: &str, metrics: &StressMetrics) {
    eprintln!("\n╔══════════════════════════════════════════════════════════════╗");
    eprintln!("║  {:<60}║", name);
    eprintln!("╠══════════════════════════════════════════════════════════════╣");
    eprintln!("║  Duration:        {:>10.2}s                                 ║", metrics.duration.as_secs_f64());
    eprintln!("║  Published:       {:>10}                                  ║", metrics.published);
    eprintln!("║  Consumed:        {:>10}                                  ║", metrics.consumed);
    eprintln!("║  Publish Rate:    {:>10.0} ev/s                            ║", metrics.publish_rate());
    eprintln!("║  Consume Rate:    {:>10.0} ev/s                            ║", metrics.consume_rate());
    eprintln!("║  Peak Rate:       {:>10.0} ev/s                            ║", metrics.peak_rate);
    eprintln!("║  Faults:          {:>10}                                  ║", metrics.faults);
    eprintln!("╚══════════════════════════════════════════════════════════════╝");

    if metrics.faults > 0 {
        eprintln!("\n❌ FAILED: {} faults detected", metrics.faults);
    } else if metrics.backlog() > 0 {
        eprintln!("\n⚠️  WARNING: {} events not consumed", metrics.backlog());
    } else {
        eprintln!("\n✅ PASSED: every published event consumed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stress_counters() {
        let counters = StressCounters::new();
        counters.record_publish(3);
        counters.record_consume();
        counters.record_consume();
        counters.record_fault();

        let metrics = counters.snapshot();
        assert_eq!(metrics.published, 3);
        assert_eq!(metrics.consumed, 2);
        assert_eq!(metrics.faults, 1);
        assert_eq!(metrics.backlog(), 1);
    }

    #[test]
    fn test_stress_metrics_rates() {
        let metrics = StressMetrics {
            published: 1000,
            consumed: 990,
            duration: Duration::from_secs(10),
            ..Default::default()
        };
        assert!((metrics.publish_rate() - 100.0).abs() < 0.1);
        assert!((metrics.consume_rate() - 99.0).abs() < 0.1);
    }

    #[test]
    fn test_jitter_is_seeded() {
        let config = StressConfig::default().with_jitter(8);
        let mut jitter = config.jitter(42).unwrap();
        jitter.pause();
        assert!(StressConfig::default().jitter(42).is_none());
    }

    #[test]
    fn test_jitter_rng_is_reproducible() {
        let mut a = SmallRng::seed_from_u64(7);
        let mut b = SmallRng::seed_from_u64(7);
        let first: Vec<u32> = (0..4).map(|_| a.gen_range(0..=64)).collect();
        let second: Vec<u32> = (0..4).map(|_| b.gen_range(0..=64)).collect();
        assert_eq!(first, second);
        assert!(first.iter().all(|&spins| spins <= 64));
    }

    #[test]
    fn test_runner_stops_after_duration() {
        let config = StressConfig::new(Duration::from_millis(50));
        let runner = StressRunner::new(StressConfig {
            report_interval: Duration::from_millis(10),
            ..config
        });
        let metrics = runner.run_with_progress(|counters| {
            while counters.is_running() {
                counters.record_publish(1);
                counters.record_consume();
                std::thread::sleep(Duration::from_millis(1));
            }
        });
        assert!(metrics.duration >= Duration::from_millis(50));
        assert_eq!(metrics.backlog(), 0);
    }
}
