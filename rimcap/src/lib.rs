// SPDX-License-Identifier: MIT

//! Capacity verification for mounted filesystems.
//!
//! The tester fills the free space of a volume with uniquely tagged test
//! files, reads everything back and removes the files again. Counterfeit
//! media that advertise more storage than they hold fail one of the
//! checks, and the first failing offset approximates the real capacity.
//!
//! See [`VolumeTester`] for the entry point and [`volume::Volume`] for
//! the filesystem seam.

// Core Modules
pub mod core;
pub mod volume;

mod phase;
mod session;

pub use session::VolumeTester;

// Prelude re-exports (central entrypoint)
pub mod prelude {
    pub use crate::VolumeTester;
    pub use crate::core::*;
    pub use crate::volume::{RootEntry, SpaceInfo, StdVolume, Volume};

    #[cfg(feature = "mem")]
    pub use crate::volume::MemVolume;
}
