// SPDX-License-Identifier: MIT

//! Space planning.
//!
//! The available bytes are cut into files of `file_size_max`, each file into
//! blocks of `block_size_max`; only the last file of the plan and the last
//! block of each file may be shorter. Offsets are `index * max_size`, never
//! a running sum.

use std::path::{Path, PathBuf};

/// Terminator of every file and block tag.
pub const TAG_MARKER: u8 = 0x01;

/// One write/verify unit inside a test file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockInfo {
    /// Offset within the owning file.
    pub rel_offset: u64,
    /// Offset within the whole test.
    pub abs_offset: u64,
    pub size: u64,
    /// `"<file>:<block>"` followed by [`TAG_MARKER`].
    pub tag: Vec<u8>,
}

impl BlockInfo {
    #[inline]
    pub fn abs_end(&self) -> u64 {
        self.abs_offset + self.size
    }
}

/// One planned test file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub index: usize,
    pub path: PathBuf,
    /// Offset within the whole test.
    pub offset: u64,
    pub size: u64,
    pub blocks: Vec<BlockInfo>,
    /// `"<file>"` followed by [`TAG_MARKER`].
    pub tag: Vec<u8>,
}

impl FileInfo {
    #[inline]
    pub fn end(&self) -> u64 {
        self.offset + self.size
    }
}

/// Ordered partition of the tested space into files and blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    files: Vec<FileInfo>,
    total: u64,
}

pub fn file_tag(file_index: usize) -> Vec<u8> {
    let mut tag = file_index.to_string().into_bytes();
    tag.push(TAG_MARKER);
    tag
}

pub fn block_tag(file_index: usize, block_index: usize) -> Vec<u8> {
    let mut tag = format!("{file_index}:{block_index}").into_bytes();
    tag.push(TAG_MARKER);
    tag
}

/// Name of the `index`-th test file.
pub fn file_name(prefix: &str, index: usize) -> String {
    format!("{prefix}{index}")
}

/// Splits `total` into `(count, last)` chunks of `max`; `last` is the
/// size of the final chunk.
#[inline]
fn split(total: u64, max: u64) -> (u64, u64) {
    let count = total.div_ceil(max);
    let rem = total % max;
    (count, if rem == 0 { max } else { rem })
}

impl Plan {
    /// Plans `bytes_available` bytes under `root`.
    ///
    /// Pure computation: the preconditions (`bytes_available > 0`,
    /// `0 < block_size_max < file_size_max`) are checked by the caller and
    /// only asserted here.
    pub fn new(
        root: &Path,
        prefix: &str,
        bytes_available: u64,
        file_size_max: u64,
        block_size_max: u64,
    ) -> Self {
        debug_assert!(bytes_available > 0);
        debug_assert!(block_size_max > 0 && block_size_max < file_size_max);

        let (file_count, last_file_size) = split(bytes_available, file_size_max);
        let mut files = Vec::with_capacity(file_count as usize);

        for i in 0..file_count {
            let index = i as usize;
            let size = if i == file_count - 1 {
                last_file_size
            } else {
                file_size_max
            };
            let offset = i * file_size_max;

            let (block_count, last_block_size) = split(size, block_size_max);
            let blocks = (0..block_count)
                .map(|j| {
                    let rel_offset = j * block_size_max;
                    BlockInfo {
                        rel_offset,
                        abs_offset: offset + rel_offset,
                        size: if j == block_count - 1 {
                            last_block_size
                        } else {
                            block_size_max
                        },
                        tag: block_tag(index, j as usize),
                    }
                })
                .collect::<Vec<_>>();
            debug_assert_eq!(blocks.iter().map(|b| b.size).sum::<u64>(), size);

            files.push(FileInfo {
                index,
                path: root.join(file_name(prefix, index)),
                offset,
                size,
                blocks,
                tag: file_tag(index),
            });
        }
        debug_assert_eq!(files.iter().map(|f| f.size).sum::<u64>(), bytes_available);

        Self {
            files,
            total: bytes_available,
        }
    }

    #[inline]
    pub fn files(&self) -> &[FileInfo] {
        &self.files
    }

    #[inline]
    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn block_count(&self) -> usize {
        self.files.iter().map(|f| f.blocks.len()).sum()
    }

    /// Block containing the absolute offset `abs`, as `(file, block)`.
    pub fn locate(&self, abs: u64) -> Option<(&FileInfo, &BlockInfo)> {
        let file = self.files.iter().find(|f| abs >= f.offset && abs < f.end())?;
        let block = file
            .blocks
            .iter()
            .find(|b| abs >= b.abs_offset && abs < b.abs_end())?;
        Some((file, block))
    }
}

impl core::fmt::Display for Plan {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let blocks = self.block_count();
        write!(
            f,
            "{} bytes in {} file(s), {} block(s)",
            self.total,
            self.files.len(),
            blocks
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use rimio::MIB;

    fn check_invariants(plan: &Plan, total: u64, file_max: u64, block_max: u64) {
        let files = plan.files();
        assert_eq!(files.iter().map(|f| f.size).sum::<u64>(), total);

        let mut next = 0u64;
        for (i, f) in files.iter().enumerate() {
            assert_eq!(f.index, i);
            assert!(f.size > 0);
            assert_eq!(f.offset, next, "files must be contiguous");
            if i + 1 < files.len() {
                assert_eq!(f.size, file_max);
            } else {
                assert!(f.size <= file_max);
            }

            let mut rel = 0u64;
            for (j, b) in f.blocks.iter().enumerate() {
                assert!(b.size > 0);
                assert_eq!(b.rel_offset, rel, "blocks must be contiguous");
                assert_eq!(b.abs_offset, f.offset + rel);
                if j + 1 < f.blocks.len() {
                    assert_eq!(b.size, block_max);
                } else {
                    assert!(b.size <= block_max);
                }
                rel += b.size;
            }
            assert_eq!(rel, f.size);
            next = f.end();
        }
        assert_eq!(next, total);
    }

    #[test]
    fn test_exact_multiple() {
        let plan = Plan::new(Path::new("/mnt/usb"), "CAPACITYTESTER", 8 * MIB, 4 * MIB, MIB);
        assert_eq!(plan.files().len(), 2);
        assert_eq!(plan.block_count(), 8);
        assert_eq!(plan.files()[1].path, Path::new("/mnt/usb/CAPACITYTESTER1"));
        check_invariants(&plan, 8 * MIB, 4 * MIB, MIB);
    }

    #[test]
    fn test_short_last_file_and_block() {
        let total = 9 * MIB + 12345;
        let plan = Plan::new(Path::new("/mnt"), "T", total, 4 * MIB, MIB);
        assert_eq!(plan.files().len(), 3);
        let last = plan.files().last().unwrap();
        assert_eq!(last.size, MIB + 12345);
        assert_eq!(last.offset, 8 * MIB);
        assert_eq!(last.blocks.len(), 2);
        assert_eq!(last.blocks[1].size, 12345);
        check_invariants(&plan, total, 4 * MIB, MIB);
    }

    #[test]
    fn test_single_byte() {
        let plan = Plan::new(Path::new("/mnt"), "T", 1, 2 * MIB, MIB);
        assert_eq!(plan.files().len(), 1);
        assert_eq!(plan.files()[0].blocks.len(), 1);
        check_invariants(&plan, 1, 2 * MIB, MIB);
    }

    #[test]
    fn test_random_sweep() {
        let mut rng = StdRng::seed_from_u64(0x5EED);
        for _ in 0..200 {
            let block_max = rng.gen_range(1..=8u64) * MIB;
            let file_max = block_max + rng.gen_range(1..=16u64) * MIB;
            let total = rng.gen_range(1..=64 * MIB);
            let plan = Plan::new(Path::new("/v"), "T", total, file_max, block_max);
            check_invariants(&plan, total, file_max, block_max);
        }
    }

    #[test]
    fn test_offsets_do_not_overflow_on_large_volumes() {
        let total = 2 * 1024 * 1024 * MIB + 3;
        let plan = Plan::new(Path::new("/v"), "T", total, 512 * MIB, 16 * MIB);
        let last = plan.files().last().unwrap();
        assert_eq!(last.offset, 4096 * 512 * MIB);
        assert_eq!(last.size, 3);
        assert_eq!(plan.files().iter().map(|f| f.size).sum::<u64>(), total);
    }

    #[test]
    fn test_tags_are_unique() {
        let plan = Plan::new(Path::new("/v"), "T", 40 * MIB + 7, 4 * MIB, MIB);
        let mut seen = std::collections::HashSet::new();
        for f in plan.files() {
            assert_eq!(*f.tag.last().unwrap(), TAG_MARKER);
            for b in &f.blocks {
                assert_eq!(*b.tag.last().unwrap(), TAG_MARKER);
                assert!(seen.insert(b.tag.clone()), "duplicate tag {:?}", b.tag);
            }
        }
        assert_eq!(block_tag(1, 11), b"1:11\x01");
        assert_ne!(block_tag(11, 1), block_tag(1, 11));
        assert_eq!(file_tag(10), b"10\x01");
    }

    #[test]
    fn test_locate() {
        let plan = Plan::new(Path::new("/v"), "T", 9 * MIB, 4 * MIB, MIB);
        let (f, b) = plan.locate(5 * MIB + 10).unwrap();
        assert_eq!(f.index, 1);
        assert_eq!(b.abs_offset, 5 * MIB);
        assert!(plan.locate(9 * MIB).is_none());
    }
}
