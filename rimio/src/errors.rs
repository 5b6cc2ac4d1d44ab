// SPDX-License-Identifier: MIT

use core::fmt;

/// Result type for RimIO operations.
pub type RimIOResult<T = ()> = core::result::Result<T, RimIOError>;

/// Error type for RimIO operations.
///
/// Callers classify faults by variant, never by OS message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RimIOError {
    /// Access to the backing object was denied.
    PermissionDenied,
    /// The backing object does not exist.
    NotFound,
    /// The medium reported that it is out of space.
    StorageFull,
    /// Fewer bytes than requested were written.
    ShortWrite,
    /// End of data reached before the buffer was filled.
    ShortRead,
    /// Attempted to read or write out of bounds.
    OutOfBounds,
    /// Unsupported operation for this backend.
    Unsupported,
    /// Raw OS error code.
    Os(i32),
    Other(&'static str),
}

impl RimIOError {
    pub fn msg(&self) -> &'static str {
        match self {
            RimIOError::PermissionDenied => "Permission denied",
            RimIOError::NotFound => "Not found",
            RimIOError::StorageFull => "No space left on medium",
            RimIOError::ShortWrite => "Short write",
            RimIOError::ShortRead => "Short read",
            RimIOError::OutOfBounds => "Out of bounds",
            RimIOError::Unsupported => "Unsupported operation",
            RimIOError::Os(_) => "OS error",
            RimIOError::Other(msg) => msg,
        }
    }

    /// True when the fault indicates access denial.
    #[inline]
    pub fn is_permission(&self) -> bool {
        matches!(self, RimIOError::PermissionDenied)
    }
}

impl From<&'static str> for RimIOError {
    #[inline]
    fn from(msg: &'static str) -> Self {
        RimIOError::Other(msg)
    }
}

impl fmt::Display for RimIOError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.msg())?;
        if let RimIOError::Os(code) = self {
            write!(f, " (code {code})")?;
        }
        Ok(())
    }
}

#[cfg(feature = "std")]
impl std::error::Error for RimIOError {}
