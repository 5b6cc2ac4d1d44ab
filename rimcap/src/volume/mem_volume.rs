// SPDX-License-Identifier: MIT

use std::path::{Path, PathBuf};

use rimio::prelude::*;

use crate::core::{CapError, CapResult};
use crate::volume::{RootEntry, SpaceInfo, Volume};

/// In-memory volume over a simulated [`MemDisk`].
///
/// Files occupy consecutive regions of the disk in creation order, so a
/// plan laid out on an empty `MemVolume` maps block offsets one-to-one
/// onto disk addresses. Leftover names can be seeded to simulate a root
/// polluted by a crashed run.
#[derive(Debug)]
pub struct MemVolume {
    root: PathBuf,
    label: Option<String>,
    disk: SharedMemDisk,
    files: Vec<(String, usize)>,
    leftovers: Vec<RootEntry>,
    valid: bool,
}

impl MemVolume {
    pub fn new(root: impl Into<PathBuf>, disk: MemDisk) -> Self {
        Self {
            root: root.into(),
            label: None,
            disk: disk.into_shared(),
            files: vec![],
            leftovers: vec![],
            valid: true,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Adds a root entry that holds no data.
    pub fn with_entry(mut self, name: impl Into<String>, is_dir: bool) -> Self {
        self.leftovers.push(RootEntry {
            name: name.into(),
            is_dir,
        });
        self
    }

    /// Simulates the medium being unplugged (or plugged back).
    pub fn set_valid(&mut self, valid: bool) {
        self.valid = valid;
    }

    #[inline]
    pub fn disk(&self) -> &SharedMemDisk {
        &self.disk
    }

    /// Names of the data files currently on the volume, in creation order.
    pub fn file_names(&self) -> Vec<String> {
        self.files.iter().map(|(name, _)| name.clone()).collect()
    }

    fn file_name(&self, path: &Path) -> RimIOResult<String> {
        if path.parent() != Some(self.root.as_path()) {
            return Err(RimIOError::NotFound);
        }
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or(RimIOError::NotFound)
    }
}

impl Volume for MemVolume {
    type File = MemRimIO;

    fn root(&self) -> &Path {
        &self.root
    }

    fn is_valid(&self) -> bool {
        self.valid
    }

    fn space(&self) -> CapResult<SpaceInfo> {
        if !self.valid {
            return Err(CapError::InvalidMountpoint);
        }
        let disk = self.disk.borrow();
        Ok(SpaceInfo {
            total: disk.advertised(),
            used: disk.allocated(),
            available: disk.available(),
        })
    }

    fn name(&self) -> Option<String> {
        self.label.clone()
    }

    fn list_root(&self) -> CapResult<Vec<RootEntry>> {
        if !self.valid {
            return Err(CapError::InvalidMountpoint);
        }
        let files = self.files.iter().map(|(name, _)| RootEntry {
            name: name.clone(),
            is_dir: false,
        });
        Ok(self.leftovers.iter().cloned().chain(files).collect())
    }

    fn create(&mut self, path: &Path) -> RimIOResult<MemRimIO> {
        if !self.valid {
            return Err(RimIOError::NotFound);
        }
        let name = self.file_name(path)?;
        if let Some(pos) = self.files.iter().position(|(n, _)| *n == name) {
            // Truncate: the old extent is dropped and a new one allocated.
            let (_, region) = self.files.remove(pos);
            self.disk.borrow_mut().release(region);
        }
        let io = MemRimIO::create(&self.disk)?;
        self.files.push((name, io.region()));
        Ok(io)
    }

    fn remove(&mut self, path: &Path) -> RimIOResult {
        let name = self.file_name(path)?;
        if let Some(pos) = self.files.iter().position(|(n, _)| *n == name) {
            let (_, region) = self.files.remove(pos);
            self.disk.borrow_mut().release(region);
            return Ok(());
        }
        if let Some(pos) = self.leftovers.iter().position(|e| e.name == name && !e.is_dir) {
            self.leftovers.remove(pos);
            return Ok(());
        }
        Err(RimIOError::NotFound)
    }
}
