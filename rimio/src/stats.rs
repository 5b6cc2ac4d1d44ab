// SPDX-License-Identifier: MIT

use core::ops::AddAssign;

use crate::{RimIO, RimIOResult, RimIOSetLen};

/// Simple counters, no_std friendly.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct IoStats {
    pub reads: u64,
    pub read_bytes: u64,
    pub writes: u64,
    pub write_bytes: u64,
    pub flushes: u64,
    pub syncs: u64,
    pub resizes: u64,

    // Useful sizes to diagnose granularity
    pub max_read: u64,
    pub max_write: u64,
}

impl IoStats {
    #[inline]
    pub fn reset(&mut self) {
        *self = IoStats::default();
    }
}

impl AddAssign for IoStats {
    fn add_assign(&mut self, rhs: Self) {
        self.reads += rhs.reads;
        self.read_bytes += rhs.read_bytes;
        self.writes += rhs.writes;
        self.write_bytes += rhs.write_bytes;
        self.flushes += rhs.flushes;
        self.syncs += rhs.syncs;
        self.resizes += rhs.resizes;
        self.max_read = self.max_read.max(rhs.max_read);
        self.max_write = self.max_write.max(rhs.max_write);
    }
}

/// Transparent instrumentation wrapper.
///
/// Counts only attempted transfers; failed calls are still counted so the
/// totals reflect what was asked of the medium.
#[derive(Debug)]
pub struct IOCounter<IO: RimIO> {
    inner: IO,
    pub stats: IoStats,
}

impl<IO: RimIO> IOCounter<IO> {
    #[inline]
    pub fn new(inner: IO) -> Self {
        Self {
            inner,
            stats: IoStats::default(),
        }
    }

    #[inline]
    pub fn snapshot(&self) -> IoStats {
        self.stats
    }

    #[inline]
    pub fn get_ref(&self) -> &IO {
        &self.inner
    }

    #[inline]
    pub fn into_inner(self) -> IO {
        self.inner
    }
}

impl<IO: RimIO> RimIO for IOCounter<IO> {
    #[inline]
    fn write_at(&mut self, offset: u64, data: &[u8]) -> RimIOResult {
        let len = data.len() as u64;
        self.stats.writes += 1;
        self.stats.write_bytes += len;
        self.stats.max_write = self.stats.max_write.max(len);

        self.inner.write_at(offset, data)
    }

    #[inline]
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> RimIOResult {
        let len = buf.len() as u64;
        self.stats.reads += 1;
        self.stats.read_bytes += len;
        self.stats.max_read = self.stats.max_read.max(len);

        self.inner.read_at(offset, buf)
    }

    #[inline]
    fn flush(&mut self) -> RimIOResult {
        self.stats.flushes += 1;
        self.inner.flush()
    }

    #[inline]
    fn sync(&mut self) -> RimIOResult {
        self.stats.syncs += 1;
        self.inner.sync()
    }
}

impl<IO: RimIOSetLen> RimIOSetLen for IOCounter<IO> {
    #[inline]
    fn set_len(&mut self, len: u64) -> RimIOResult {
        self.stats.resizes += 1;
        self.inner.set_len(len)
    }
}
