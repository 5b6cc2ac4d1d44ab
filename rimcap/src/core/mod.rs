// === Sub-modules ===
pub mod config;
pub mod error;
pub mod events;
pub mod pattern;
pub mod plan;
pub mod throughput;

// === Error types ===
pub use error::*;

pub use config::{TesterConfig, parse_size};
pub use events::*;
pub use pattern::{Pattern, SENTINEL};
pub use plan::{BlockInfo, FileInfo, Plan, TAG_MARKER};
pub use throughput::Throughput;
