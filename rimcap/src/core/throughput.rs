// SPDX-License-Identifier: MIT

use std::time::{Duration, Instant};

use rimio::MIB;

/// Running average of a phase's transfer rate.
///
/// Only time spent inside timed sections counts, so pauses between
/// units (event handling, progress rendering) do not skew the figure.
#[derive(Debug, Default, Clone)]
pub struct Throughput {
    bytes: u64,
    busy: Duration,
}

impl Throughput {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn start(&self) -> Instant {
        Instant::now()
    }

    /// Accounts `bytes` transferred since `started`.
    #[inline]
    pub fn record(&mut self, started: Instant, bytes: u64) {
        self.add(started.elapsed(), bytes);
    }

    #[inline]
    pub fn add(&mut self, busy: Duration, bytes: u64) {
        self.busy += busy;
        self.bytes += bytes;
    }

    #[inline]
    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    /// Average MiB/s so far; 0 until any time has elapsed.
    pub fn mb_per_sec(&self) -> f64 {
        let secs = self.busy.as_secs_f64();
        if secs > 0.0 {
            (self.bytes as f64 / MIB as f64) / secs
        } else {
            0.0
        }
    }
}
