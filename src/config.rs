//! Per-node configuration: ring size `m` and successor-list size `r` are
//! fixed at construction and never change.

use std::time::Duration;

/// Default maintenance tick.
pub const DEFAULT_INTERVAL_MILLIS: u64 = 1_000;

#[derive(Clone, Copy, Debug)]
pub struct RingConfig {
    /// Ring width in bits: the identifier space is `[0, 2^m)`.
    pub m: u32,
    /// Successor-list length.
    pub r: usize,
    /// Sleep between maintenance rounds.
    pub interval: Duration,
}

impl RingConfig {
    pub fn new(m: u32, r: usize) -> Self {
        RingConfig {
            m,
            r,
            interval: Duration::from_millis(DEFAULT_INTERVAL_MILLIS),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}
