//! Loom models of the lock-free claim/publish protocols.
//!
//! - Multi-producer publication: availability flags plus the helping CAS that
//!   advances the published cursor
//! - Work pool claiming: the two-phase sequence update around the work CAS
//!
//! Run with: RUSTFLAGS="--cfg loom" cargo test --test loom_sequencer --release

#[cfg(loom)]
mod loom_tests {
    use loom::sync::atomic::{ AtomicI32, AtomicI64, Ordering };
    use loom::sync::Arc;
    use loom::thread;

    const SIZE: i64 = 4;
    const SHIFT: u32 = 2;

    struct Published {
        claim: AtomicI64,
        cursor: AtomicI64,
        available: Vec<AtomicI32>,
        slots: Vec<AtomicI64>,
    }

    impl Published {
        fn new() -> Self {
            Self {
                claim: AtomicI64::new(-1),
                cursor: AtomicI64::new(-1),
                available: (0..SIZE).map(|_| AtomicI32::new(-1)).collect(),
                slots: (0..SIZE).map(|_| AtomicI64::new(0)).collect(),
            }
        }

        fn is_available(&self, sequence: i64) -> bool {
            let index = (sequence & (SIZE - 1)) as usize;
            self.available[index].load(Ordering::SeqCst) == ((sequence >> SHIFT) as i32)
        }

        fn highest_published(&self, low: i64, high: i64) -> i64 {
            for sequence in low..=high {
                if !self.is_available(sequence) {
                    return sequence - 1;
                }
            }
            high
        }

        fn publish(&self, sequence: i64, value: i64) {
            let index = (sequence & (SIZE - 1)) as usize;
            self.slots[index].store(value, Ordering::Relaxed);
            self.available[index].store((sequence >> SHIFT) as i32, Ordering::SeqCst);
            loop {
                let current = self.cursor.load(Ordering::SeqCst);
                let claimed = self.claim.load(Ordering::SeqCst);
                let highest = self.highest_published(current + 1, claimed);
                if highest <= current {
                    return;
                }
                let _ = self.cursor.compare_exchange(current, highest, Ordering::SeqCst, Ordering::SeqCst);
            }
        }
    }

    /// Two producers finishing in any order: the cursor ends at the last claim
    /// and a consumer never reads past an unpublished slot.
    #[test]
    fn test_multi_producer_cursor_is_gap_free() {
        loom::model(|| {
            let ring = Arc::new(Published::new());

            let producers: Vec<_> = (0..2)
                .map(|_| {
                    let r = ring.clone();
                    thread::spawn(move || {
                        let sequence = r.claim.fetch_add(1, Ordering::SeqCst) + 1;
                        r.publish(sequence, sequence + 100);
                    })
                })
                .collect();

            let r = ring.clone();
            let consumer = thread::spawn(move || {
                let visible = r.cursor.load(Ordering::Acquire);
                for sequence in 0..=visible {
                    assert!(r.is_available(sequence), "cursor {} exposed gap at {}", visible, sequence);
                    let index = (sequence & (SIZE - 1)) as usize;
                    assert_eq!(r.slots[index].load(Ordering::Relaxed), sequence + 100);
                }
            });

            for p in producers {
                p.join().unwrap();
            }
            consumer.join().unwrap();

            assert_eq!(ring.cursor.load(Ordering::SeqCst), 1);
        });
    }

    /// Two workers competing for two events: each event is claimed once and a
    /// worker's sequence never passes an event it still holds.
    #[test]
    fn test_work_sequence_claim_is_exclusive() {
        loom::model(|| {
            let work = Arc::new(AtomicI64::new(-1));

            let workers: Vec<_> = (0..2)
                .map(|_| {
                    let w = work.clone();
                    thread::spawn(move || {
                        let own = AtomicI64::new(-1);
                        loop {
                            let next = w.load(Ordering::Acquire) + 1;
                            own.store(next - 1, Ordering::Release);
                            if
                                w
                                    .compare_exchange(next - 1, next, Ordering::SeqCst, Ordering::Acquire)
                                    .is_ok()
                            {
                                assert!(own.load(Ordering::Acquire) < next);
                                return next;
                            }
                        }
                    })
                })
                .collect();

            let mut claimed: Vec<i64> = workers
                .into_iter()
                .map(|h| h.join().unwrap())
                .collect();
            claimed.sort_unstable();
            assert_eq!(claimed, vec![0, 1]);
            assert_eq!(work.load(Ordering::SeqCst), 1);
        });
    }
}
