// SPDX-License-Identifier: MIT
#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(feature = "alloc")]
use alloc::vec;
#[cfg(feature = "alloc")]
use alloc::vec::Vec;

// Core modules
pub mod errors;
mod macros;
pub mod stats;

// Backend modules
#[cfg(feature = "mem")]
mod mem;

#[cfg(feature = "std")]
mod std;

// Prelude re-exports (central entrypoint)
pub mod prelude {
    pub use super::RimIO;
    pub use super::RimIOExt;
    pub use super::RimIOSetLen;
    pub use super::errors::*;
    pub use super::stats::*;

    #[cfg(feature = "mem")]
    pub use super::mem::{MemDisk, MemFault, MemRimIO, Overflow, SharedMemDisk};

    #[cfg(feature = "std")]
    pub use super::std::StdRimIO;
}

// Internal use
use errors::*;

// Constants

/// One mebibyte. Capacity tests size blocks and files in whole MiB.
pub const MIB: u64 = 1024 * 1024;

// Traits

/// Positional IO abstraction trait.
///
/// Every call addresses the object by absolute offset, so a handle never
/// carries an implicit cursor between operations.
/// Implementations may target files, RAM or simulated media.
pub trait RimIO {
    /// Writes all of `data` at `offset`. A partial write is `ShortWrite`.
    fn write_at(&mut self, offset: u64, data: &[u8]) -> RimIOResult;

    /// Reads exactly `buf.len()` bytes from `offset`. EOF is `ShortRead`.
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> RimIOResult;

    /// Flushes any buffered data (may be a no-op).
    fn flush(&mut self) -> RimIOResult;

    /// Best-effort durable flush down to the medium.
    fn sync(&mut self) -> RimIOResult {
        self.flush()
    }
}

/// Extension helpers for RimIO.
pub trait RimIOExt: RimIO {
    /// Reads `len` bytes at `offset` into a fresh buffer.
    #[cfg(feature = "alloc")]
    #[inline]
    fn read_vec_at(&mut self, offset: u64, len: usize) -> RimIOResult<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.read_at(offset, &mut buf)?;
        Ok(buf)
    }

    /// Reads `expected.len()` bytes at `offset` into `scratch` and compares.
    ///
    /// `scratch` is resized as needed so callers can reuse one allocation.
    #[cfg(feature = "alloc")]
    #[inline]
    fn matches_at(
        &mut self,
        offset: u64,
        expected: &[u8],
        scratch: &mut Vec<u8>,
    ) -> RimIOResult<bool> {
        scratch.resize(expected.len(), 0);
        self.read_at(offset, scratch)?;
        Ok(scratch.as_slice() == expected)
    }

    // Implements read/write helpers for primitive types (u8, u16, u32, u64)
    RimIO_impl_primitive_rw!(u8, u16, u32, u64);
}

impl<T: RimIO + ?Sized> RimIOExt for T {}

/// Trait for setting the length of a RimIO object.
///
/// Allows resizing the underlying storage (if supported by the backend).
pub trait RimIOSetLen: RimIO {
    /// Sets the length of the storage, growing or truncating it.
    fn set_len(&mut self, len: u64) -> RimIOResult;
}

impl<T: RimIO + ?Sized> RimIO for &mut T {
    #[inline]
    fn write_at(&mut self, offset: u64, data: &[u8]) -> RimIOResult {
        (**self).write_at(offset, data)
    }

    #[inline]
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> RimIOResult {
        (**self).read_at(offset, buf)
    }

    #[inline]
    fn flush(&mut self) -> RimIOResult {
        (**self).flush()
    }

    #[inline]
    fn sync(&mut self) -> RimIOResult {
        (**self).sync()
    }
}
