//! Ripple constants
//!
//! Sentinels and defaults shared by the sequencers, barriers and processors.

/// Default ring buffer size (must be power of 2)
pub const DEFAULT_RING_BUFFER_SIZE: usize = 64 * 1024;

/// Value of every sequence before anything has been claimed or processed
pub const INITIAL_CURSOR_VALUE: i64 = -1;

/// Sequence value a work processor uses to step out of the gating set
pub const RELEASED_SEQUENCE: i64 = i64::MAX;

/// Cache line size used for sequence padding (covers adjacent-line prefetch)
pub const CACHE_LINE_SIZE: usize = 128;

/// Spin iterations before the yielding strategy starts yielding
pub const YIELDING_SPIN_TRIES: u32 = 100;

/// Retries before the sleeping strategy starts sleeping
pub const SLEEPING_RETRIES: u32 = 200;
