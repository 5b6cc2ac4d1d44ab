// SPDX-License-Identifier: MIT

use std::path::{Path, PathBuf};

use rimio::prelude::*;

use crate::volume::Volume;

/// Test files of one run, removed when the guard drops.
///
/// Handles are closed first, then every created file is removed in
/// reverse creation order. Removal errors are ignored. The guard may drop
/// at any point, including before the first file exists.
pub(crate) struct TestFiles<'v, V: Volume> {
    volume: &'v mut V,
    handles: Vec<IOCounter<V::File>>,
    created: Vec<PathBuf>,
}

impl<'v, V: Volume> TestFiles<'v, V> {
    pub(crate) fn new(volume: &'v mut V) -> Self {
        Self {
            volume,
            handles: vec![],
            created: vec![],
        }
    }

    /// Creates a file and returns its handle.
    pub(crate) fn create(&mut self, path: &Path) -> RimIOResult<&mut IOCounter<V::File>> {
        let file = self.volume.create(path)?;
        self.created.push(path.to_path_buf());
        self.handles.push(IOCounter::new(file));
        let last = self.handles.len() - 1;
        Ok(&mut self.handles[last])
    }

    #[inline]
    pub(crate) fn handles_mut(&mut self) -> &mut [IOCounter<V::File>] {
        &mut self.handles
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.created.len()
    }

    /// IO counters summed over every handle of the run.
    pub(crate) fn io_stats(&self) -> IoStats {
        let mut total = IoStats::default();
        for h in &self.handles {
            total += h.snapshot();
        }
        total
    }
}

impl<V: Volume> Drop for TestFiles<'_, V> {
    fn drop(&mut self) {
        self.handles.clear();
        for path in self.created.drain(..).rev() {
            let _ = self.volume.remove(&path);
        }
    }
}
