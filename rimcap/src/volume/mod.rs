// SPDX-License-Identifier: MIT

//! Volume under test.
//!
//! A [`Volume`] is the only collaborator the tester talks to: space and
//! validity queries, a listing of the root directory and the file
//! primitives needed to materialize the plan. File handles are plain
//! [`RimIO`] objects, so the phases never see the backend.

use std::path::Path;

use rimio::prelude::*;

use crate::core::CapResult;

#[cfg(feature = "mem")]
mod mem_volume;
mod std_volume;

#[cfg(feature = "mem")]
pub use mem_volume::MemVolume;
pub use std_volume::{MountInfo, StdVolume, mountpoints};

/// Space figures of a volume, in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpaceInfo {
    pub total: u64,
    pub used: u64,
    pub available: u64,
}

/// Entry of the volume root directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootEntry {
    pub name: String,
    pub is_dir: bool,
}

/// Filesystem collaborator of a capacity test.
pub trait Volume {
    /// Read-write handle on a test file.
    type File: RimIO + RimIOSetLen;

    /// Root directory of the volume.
    fn root(&self) -> &Path;

    /// Whether the volume is mounted and ready.
    fn is_valid(&self) -> bool;

    fn space(&self) -> CapResult<SpaceInfo>;

    /// Volume label, if the backend knows one.
    fn name(&self) -> Option<String>;

    /// Immediate entries of the root directory, unsorted.
    fn list_root(&self) -> CapResult<Vec<RootEntry>>;

    /// Creates (or truncates) a file for reading and writing.
    fn create(&mut self, path: &Path) -> RimIOResult<Self::File>;

    fn remove(&mut self, path: &Path) -> RimIOResult;
}

/// Sorts root entries the way they are displayed: directories first, then
/// case-insensitively by name.
pub fn sort_entries(entries: &mut [RootEntry]) {
    entries.sort_by(|a, b| {
        b.is_dir
            .cmp(&a.is_dir)
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
            .then_with(|| a.name.cmp(&b.name))
    });
}
