// SPDX-License-Identifier: MIT

use std::fs::File;
use std::io::{Error, ErrorKind, Read, Seek, SeekFrom, Write};

use crate::{RimIO, RimIOError, RimIOResult, RimIOSetLen};

/// File-backed `RimIO`.
///
/// Owns the handle: dropping a `StdRimIO` closes the file.
#[derive(Debug)]
pub struct StdRimIO {
    file: File,
}

impl StdRimIO {
    #[inline]
    pub fn new(file: File) -> Self {
        Self { file }
    }

    #[inline]
    pub fn get_ref(&self) -> &File {
        &self.file
    }

    #[inline]
    pub fn into_inner(self) -> File {
        self.file
    }
}

impl RimIO for StdRimIO {
    fn write_at(&mut self, offset: u64, data: &[u8]) -> RimIOResult {
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(data)?;
        Ok(())
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> RimIOResult {
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.read_exact(buf)?;
        Ok(())
    }

    fn flush(&mut self) -> RimIOResult {
        self.file.flush()?;
        Ok(())
    }

    fn sync(&mut self) -> RimIOResult {
        self.file.flush()?;
        self.file.sync_data()?;
        Ok(())
    }
}

impl RimIOSetLen for StdRimIO {
    fn set_len(&mut self, len: u64) -> RimIOResult {
        self.file.set_len(len)?;
        Ok(())
    }
}

impl From<Error> for RimIOError {
    #[cold]
    #[inline(never)]
    fn from(e: Error) -> Self {
        match e.kind() {
            ErrorKind::PermissionDenied => RimIOError::PermissionDenied,
            ErrorKind::NotFound => RimIOError::NotFound,
            ErrorKind::StorageFull => RimIOError::StorageFull,
            ErrorKind::WriteZero => RimIOError::ShortWrite,
            ErrorKind::UnexpectedEof => RimIOError::ShortRead,
            ErrorKind::Unsupported => RimIOError::Unsupported,
            _ => match e.raw_os_error() {
                Some(code) => RimIOError::Os(code),
                None => RimIOError::Other("I/O error"),
            },
        }
    }
}
