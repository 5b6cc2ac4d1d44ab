// SPDX-License-Identifier: MIT

//! Simulated storage medium.
//!
//! A [`MemDisk`] advertises one capacity and physically stores another,
//! which is exactly how counterfeit flash behaves. Files are laid out
//! append-only in a virtual address space in creation order; addresses
//! past the physical capacity follow the disk's [`Overflow`] policy.

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;

use crate::{RimIO, RimIOError, RimIOResult, RimIOSetLen};

/// What happens to virtual addresses beyond the physical capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overflow {
    /// Honest medium: writes past the physical end fail with `StorageFull`.
    Reject,
    /// Writes are accepted and dropped, reads return zeroes.
    Discard,
    /// Addresses alias onto the physical cells (`addr % physical`).
    Wrap,
}

/// Fault injected at a virtual address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemFault {
    /// Any write covering `at` stops right before it and reports `ShortWrite`.
    ShortWrite { at: u64 },
    /// Any read covering `at` returns a flipped byte there.
    CorruptRead { at: u64 },
    /// Creating a file is refused with `PermissionDenied`.
    DenyCreate,
    /// Resizing a file is refused with `StorageFull`.
    DenyResize,
}

#[derive(Debug, Clone, Copy)]
struct Region {
    base: u64,
    len: u64,
    live: bool,
}

/// Simulated medium shared by every file handle opened on it.
#[derive(Debug)]
pub struct MemDisk {
    advertised: u64,
    physical: u64,
    overflow: Overflow,
    cells: Vec<u8>,
    regions: Vec<Region>,
    faults: Vec<MemFault>,
}

pub type SharedMemDisk = Rc<RefCell<MemDisk>>;

const CORRUPT_MASK: u8 = 0x5A;

impl MemDisk {
    /// A medium claiming `advertised` bytes while holding only `physical`.
    pub fn new(advertised: u64, physical: u64, overflow: Overflow) -> Self {
        Self {
            advertised,
            physical: physical.min(advertised),
            overflow,
            cells: Vec::new(),
            regions: Vec::new(),
            faults: Vec::new(),
        }
    }

    /// A genuine medium: physical capacity equals the advertised one.
    pub fn honest(capacity: u64) -> Self {
        Self::new(capacity, capacity, Overflow::Reject)
    }

    pub fn with_fault(mut self, fault: MemFault) -> Self {
        self.faults.push(fault);
        self
    }

    pub fn inject(&mut self, fault: MemFault) {
        self.faults.push(fault);
    }

    pub fn into_shared(self) -> SharedMemDisk {
        Rc::new(RefCell::new(self))
    }

    #[inline]
    pub fn advertised(&self) -> u64 {
        self.advertised
    }

    #[inline]
    pub fn physical(&self) -> u64 {
        self.physical
    }

    #[inline]
    pub fn overflow(&self) -> Overflow {
        self.overflow
    }

    /// Virtual bytes currently handed out to files.
    pub fn allocated(&self) -> u64 {
        self.regions
            .iter()
            .rev()
            .find(|r| r.live)
            .map(|r| r.base + r.len)
            .unwrap_or(0)
    }

    /// Advertised bytes not yet handed out.
    #[inline]
    pub fn available(&self) -> u64 {
        self.advertised.saturating_sub(self.allocated())
    }

    fn has_fault(&self, fault: MemFault) -> bool {
        self.faults.contains(&fault)
    }

    fn region(&self, id: usize) -> RimIOResult<Region> {
        self.regions
            .get(id)
            .copied()
            .filter(|r| r.live)
            .ok_or(RimIOError::NotFound)
    }

    fn open_region(&mut self) -> RimIOResult<usize> {
        if self.has_fault(MemFault::DenyCreate) {
            return Err(RimIOError::PermissionDenied);
        }
        let base = self.allocated();
        self.regions.push(Region {
            base,
            len: 0,
            live: true,
        });
        Ok(self.regions.len() - 1)
    }

    /// Frees a region. Trailing dead regions are reclaimed.
    pub fn release(&mut self, id: usize) {
        if let Some(r) = self.regions.get_mut(id) {
            r.live = false;
        }
        while self.regions.last().is_some_and(|r| !r.live) {
            self.regions.pop();
        }
    }

    fn is_tail(&self, id: usize) -> bool {
        self.regions
            .iter()
            .rposition(|r| r.live)
            .is_some_and(|last| last == id)
    }

    fn resize(&mut self, id: usize, new_len: u64) -> RimIOResult {
        let region = self.region(id)?;
        if new_len > region.len {
            if !self.is_tail(id) {
                // Growing would overlap the next file's extent.
                return Err(RimIOError::Unsupported);
            }
            let end = region
                .base
                .checked_add(new_len)
                .ok_or(RimIOError::OutOfBounds)?;
            if end > self.advertised {
                return Err(RimIOError::StorageFull);
            }
        }
        self.regions[id].len = new_len;
        Ok(())
    }

    /// Maps `addr` to a physical cell and the length of the contiguous run.
    fn span(&self, addr: u64, want: u64) -> (Option<u64>, u64) {
        if addr < self.physical {
            return (Some(addr), want.min(self.physical - addr));
        }
        match self.overflow {
            Overflow::Wrap if self.physical > 0 => {
                let p = addr % self.physical;
                (Some(p), want.min(self.physical - p))
            }
            _ => (None, want),
        }
    }

    fn ensure_cells(&mut self, end: u64) {
        if (self.cells.len() as u64) < end {
            self.cells.resize(end as usize, 0);
        }
    }

    fn store(&mut self, addr: u64, data: &[u8]) -> RimIOResult {
        let end = addr + data.len() as u64;
        let cut = self.faults.iter().find_map(|f| match *f {
            MemFault::ShortWrite { at } if at >= addr && at < end => Some((at - addr) as usize),
            _ => None,
        });
        let data = match cut {
            Some(n) => &data[..n],
            None => data,
        };

        let mut pos = 0usize;
        while pos < data.len() {
            let (target, run) = self.span(addr + pos as u64, (data.len() - pos) as u64);
            let run = run as usize;
            match target {
                Some(p) => {
                    self.ensure_cells(p + run as u64);
                    let p = p as usize;
                    self.cells[p..p + run].copy_from_slice(&data[pos..pos + run]);
                }
                None if self.overflow == Overflow::Reject => return Err(RimIOError::StorageFull),
                None => {}
            }
            pos += run;
        }

        match cut {
            Some(_) => Err(RimIOError::ShortWrite),
            None => Ok(()),
        }
    }

    fn load(&mut self, addr: u64, buf: &mut [u8]) -> RimIOResult {
        let mut pos = 0usize;
        while pos < buf.len() {
            let (target, run) = self.span(addr + pos as u64, (buf.len() - pos) as u64);
            let run = run as usize;
            let dst = &mut buf[pos..pos + run];
            match target {
                Some(p) => {
                    let p = p as usize;
                    let stored = self.cells.get(p..).unwrap_or_default();
                    let have = stored.len().min(run);
                    dst[..have].copy_from_slice(&stored[..have]);
                    dst[have..].fill(0);
                }
                None => dst.fill(0),
            }
            pos += run;
        }

        let end = addr + buf.len() as u64;
        for f in &self.faults {
            if let MemFault::CorruptRead { at } = *f
                && at >= addr
                && at < end
            {
                buf[(at - addr) as usize] ^= CORRUPT_MASK;
            }
        }
        Ok(())
    }
}

/// File handle on a [`MemDisk`].
#[derive(Debug, Clone)]
pub struct MemRimIO {
    disk: SharedMemDisk,
    region: usize,
}

impl MemRimIO {
    /// Allocates a new empty file at the current end of the disk.
    pub fn create(disk: &SharedMemDisk) -> RimIOResult<Self> {
        let region = disk.borrow_mut().open_region()?;
        Ok(Self {
            disk: Rc::clone(disk),
            region,
        })
    }

    /// Opens another handle on an existing file.
    pub fn reopen(disk: &SharedMemDisk, region: usize) -> RimIOResult<Self> {
        disk.borrow().region(region)?;
        Ok(Self {
            disk: Rc::clone(disk),
            region,
        })
    }

    #[inline]
    pub fn region(&self) -> usize {
        self.region
    }

    /// Virtual address of offset 0 of this file.
    pub fn base(&self) -> RimIOResult<u64> {
        Ok(self.disk.borrow().region(self.region)?.base)
    }

    pub fn len(&self) -> RimIOResult<u64> {
        Ok(self.disk.borrow().region(self.region)?.len)
    }
}

impl RimIO for MemRimIO {
    fn write_at(&mut self, offset: u64, data: &[u8]) -> RimIOResult {
        let mut disk = self.disk.borrow_mut();
        let region = disk.region(self.region)?;
        let end = offset
            .checked_add(data.len() as u64)
            .ok_or(RimIOError::OutOfBounds)?;
        if end > region.len {
            disk.resize(self.region, end)?;
        }
        disk.store(region.base + offset, data)
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> RimIOResult {
        let mut disk = self.disk.borrow_mut();
        let region = disk.region(self.region)?;
        let end = offset
            .checked_add(buf.len() as u64)
            .ok_or(RimIOError::OutOfBounds)?;
        if end > region.len {
            return Err(RimIOError::ShortRead);
        }
        disk.load(region.base + offset, buf)
    }

    #[inline]
    fn flush(&mut self) -> RimIOResult {
        Ok(())
    }
}

impl RimIOSetLen for MemRimIO {
    fn set_len(&mut self, len: u64) -> RimIOResult {
        let mut disk = self.disk.borrow_mut();
        if disk.has_fault(MemFault::DenyResize) {
            return Err(RimIOError::StorageFull);
        }
        disk.resize(self.region, len)
    }
}
