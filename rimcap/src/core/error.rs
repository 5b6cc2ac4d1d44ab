// SPDX-License-Identifier: MIT

use core::fmt;

pub use rimio::errors::*;

bitflags::bitflags! {
    /// Accumulated fault classification of a run.
    ///
    /// Flags combine: a permission fault found while creating a file sets
    /// both `CREATE` and `PERMISSIONS`, a cancelled run carries `ABORTED`
    /// next to whatever else was already recorded. The empty set means
    /// "unknown" (nothing classified yet).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ErrorFlags: u32 {
        const CREATE      = 1 << 0;
        /// Qualifier on `CREATE`: access was denied.
        const PERMISSIONS = 1 << 1;
        const WRITE       = 1 << 2;
        /// Qualifier on `WRITE`: growing a file failed.
        const RESIZE      = 1 << 3;
        const VERIFY      = 1 << 4;
        /// No space was available at plan time.
        const FULL        = 1 << 5;
        /// The run stopped because cancellation was requested.
        const ABORTED     = 1 << 6;
        /// Leftover test files blocked the run.
        const CONFLICT    = 1 << 7;
    }
}

impl ErrorFlags {
    pub const UNKNOWN: ErrorFlags = ErrorFlags::empty();

    #[inline]
    pub fn is_unknown(&self) -> bool {
        self.is_empty()
    }

    #[inline]
    pub fn is_aborted(&self) -> bool {
        self.contains(ErrorFlags::ABORTED)
    }
}

impl fmt::Display for ErrorFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unknown() {
            return write!(f, "UNKNOWN");
        }
        let mut first = true;
        for (name, _) in self.iter_names() {
            if !first {
                write!(f, " | ")?;
            }
            write!(f, "{name}")?;
            first = false;
        }
        Ok(())
    }
}

/// Errors raised outside of a run: configuration, preflight, queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapError {
    IO(RimIOError),
    InvalidConfig(&'static str),
    Config(String),
    InvalidMountpoint,
    Conflicts(Vec<String>),
    Volume(&'static str),
}

impl CapError {
    pub fn msg(&self) -> &str {
        match self {
            CapError::IO(e) => e.msg(),
            CapError::InvalidConfig(msg) => msg,
            CapError::Config(msg) => msg,
            CapError::InvalidMountpoint => "Not a valid mountpoint",
            CapError::Conflicts(_) => "Leftover test files present",
            CapError::Volume(msg) => msg,
        }
    }
}

impl From<RimIOError> for CapError {
    fn from(e: RimIOError) -> Self {
        CapError::IO(e)
    }
}

impl From<std::io::Error> for CapError {
    fn from(e: std::io::Error) -> Self {
        CapError::IO(e.into())
    }
}

impl fmt::Display for CapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.msg())?;
        match self {
            CapError::Conflicts(files) => write!(f, ": {}", files.join(", "))?,
            CapError::IO(RimIOError::Os(code)) => write!(f, " (code {code})")?,
            _ => {}
        }
        Ok(())
    }
}

impl std::error::Error for CapError {}

pub type CapResult<T = ()> = Result<T, CapError>;
