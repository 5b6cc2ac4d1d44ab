// SPDX-License-Identifier: MIT

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use rimio::prelude::*;

use crate::core::{CapError, CapResult};
use crate::volume::{RootEntry, SpaceInfo, Volume};

/// Mounted filesystem as listed by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountInfo {
    pub device: String,
    pub mountpoint: PathBuf,
    pub fs_type: String,
}

impl MountInfo {
    /// Whether the mount is backed by a block device.
    pub fn is_block_device(&self) -> bool {
        self.device.starts_with("/dev/")
    }
}

/// Volume backed by the host filesystem.
///
/// [`StdVolume::new`] requires `root` to be a mountpoint.
/// [`StdVolume::directory`] accepts any existing directory, which is how
/// a test is pointed at a subdirectory or a temporary directory.
#[derive(Debug, Clone)]
pub struct StdVolume {
    root: PathBuf,
    require_mount: bool,
}

impl StdVolume {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            require_mount: true,
        }
    }

    pub fn directory(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            require_mount: false,
        }
    }

    #[inline]
    pub fn requires_mount(&self) -> bool {
        self.require_mount
    }

    /// Mount entry whose mountpoint is exactly `root`.
    pub fn mount(&self) -> Option<MountInfo> {
        let root = fs::canonicalize(&self.root).ok()?;
        mountpoints()
            .ok()?
            .into_iter()
            .rev()
            .find(|m| m.mountpoint == root)
    }

    #[cfg(target_os = "linux")]
    fn is_mount_root(&self) -> bool {
        self.mount().is_some()
    }

    /// A mount root lives on another device than its parent.
    #[cfg(all(unix, not(target_os = "linux")))]
    fn is_mount_root(&self) -> bool {
        use std::os::unix::fs::MetadataExt;

        let (Ok(root), Ok(parent)) = (
            fs::metadata(&self.root),
            fs::metadata(self.root.join("..")),
        ) else {
            return false;
        };
        root.dev() != parent.dev() || root.ino() == parent.ino()
    }

    #[cfg(not(unix))]
    fn is_mount_root(&self) -> bool {
        true
    }
}

impl Volume for StdVolume {
    type File = StdRimIO;

    fn root(&self) -> &Path {
        &self.root
    }

    fn is_valid(&self) -> bool {
        !self.root.as_os_str().is_empty()
            && self.root.is_dir()
            && (!self.require_mount || self.is_mount_root())
            && self.space().is_ok()
    }

    #[cfg(unix)]
    fn space(&self) -> CapResult<SpaceInfo> {
        use nix::sys::statvfs::statvfs;

        let st = statvfs(self.root.as_path()).map_err(|e| CapError::from(std::io::Error::from(e)))?;
        let frsize = st.fragment_size() as u64;
        let total = st.blocks() as u64 * frsize;
        let free = st.blocks_free() as u64 * frsize;
        Ok(SpaceInfo {
            total,
            used: total.saturating_sub(free),
            available: st.blocks_available() as u64 * frsize,
        })
    }

    #[cfg(not(unix))]
    fn space(&self) -> CapResult<SpaceInfo> {
        Err(CapError::Volume("Space query not supported on this platform"))
    }

    fn name(&self) -> Option<String> {
        let mount = self.mount()?;
        device_label(&mount.device)
    }

    fn list_root(&self) -> CapResult<Vec<RootEntry>> {
        let mut res = vec![];
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            res.push(RootEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_dir: entry.file_type()?.is_dir(),
            });
        }
        Ok(res)
    }

    fn create(&mut self, path: &Path) -> RimIOResult<StdRimIO> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        Ok(StdRimIO::new(file))
    }

    fn remove(&mut self, path: &Path) -> RimIOResult {
        fs::remove_file(path)?;
        Ok(())
    }
}

/// Lists mounted filesystems (Linux `/proc/self/mounts`).
#[cfg(target_os = "linux")]
pub fn mountpoints() -> CapResult<Vec<MountInfo>> {
    let content = fs::read_to_string("/proc/self/mounts")?;
    Ok(parse_mounts(&content))
}

#[cfg(not(target_os = "linux"))]
pub fn mountpoints() -> CapResult<Vec<MountInfo>> {
    Ok(vec![])
}

fn parse_mounts(content: &str) -> Vec<MountInfo> {
    content
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let device = unescape_mount_field(fields.next()?);
            let mountpoint = unescape_mount_field(fields.next()?);
            let fs_type = fields.next()?.to_string();
            Some(MountInfo {
                device,
                mountpoint: PathBuf::from(mountpoint),
                fs_type,
            })
        })
        .collect()
}

/// Decodes the `\ooo` octal escapes used by the kernel for blanks.
fn unescape_mount_field(field: &str) -> String {
    let bytes = field.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\'
            && i + 3 < bytes.len()
            && let Some(v) = octal3(&bytes[i + 1..i + 4])
        {
            out.push(v);
            i += 4;
            continue;
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn octal3(digits: &[u8]) -> Option<u8> {
    let mut v: u32 = 0;
    for &d in digits {
        if !(b'0'..=b'7').contains(&d) {
            return None;
        }
        v = v * 8 + (d - b'0') as u32;
    }
    u8::try_from(v).ok()
}

/// Decodes the `\xHH` escapes udev uses in `/dev/disk/by-label` names.
fn decode_label(name: &str) -> String {
    let bytes = name.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\'
            && bytes.get(i + 1) == Some(&b'x')
            && let Some(hex) = name.get(i + 2..i + 4)
            && let Ok(v) = u8::from_str_radix(hex, 16)
        {
            out.push(v);
            i += 4;
            continue;
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn device_label(device: &str) -> Option<String> {
    let device = fs::canonicalize(device).ok()?;
    for entry in fs::read_dir("/dev/disk/by-label").ok()? {
        let Ok(entry) = entry else { continue };
        if fs::canonicalize(entry.path()).ok().as_ref() == Some(&device) {
            return Some(decode_label(&entry.file_name().to_string_lossy()));
        }
    }
    None
}
