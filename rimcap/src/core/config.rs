// SPDX-License-Identifier: MIT

use serde::{Deserialize, Deserializer};
use std::{fs, path::Path};

use crate::core::error::*;
use rimio::MIB;

pub const DEFAULT_BLOCK_SIZE_MAX: u64 = 16 * MIB;
pub const DEFAULT_FILE_SIZE_MAX: u64 = 512 * MIB;
pub const DEFAULT_FILE_PREFIX: &str = "CAPACITYTESTER";

/// Tunables of a capacity test.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TesterConfig {
    /// Size of one write/verify unit, whole MiB.
    #[serde(deserialize_with = "de_size")]
    pub block_size_max: u64,
    /// Size of one test file, whole MiB, larger than a block.
    #[serde(deserialize_with = "de_size")]
    pub file_size_max: u64,
    /// Name prefix of the test files in the volume root.
    pub file_prefix: String,
    /// Force a durable flush around every file and block.
    pub sync: bool,
    /// Fixed pattern seed. `None` seeds from the clock.
    pub seed: Option<u64>,
    /// Upper bound on the bytes covered by the plan.
    #[serde(deserialize_with = "de_opt_size")]
    pub max_bytes: Option<u64>,
}

impl Default for TesterConfig {
    fn default() -> Self {
        Self {
            block_size_max: DEFAULT_BLOCK_SIZE_MAX,
            file_size_max: DEFAULT_FILE_SIZE_MAX,
            file_prefix: DEFAULT_FILE_PREFIX.to_string(),
            sync: true,
            seed: None,
            max_bytes: None,
        }
    }
}

impl TesterConfig {
    pub fn from_file(path: &Path) -> CapResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> CapResult<Self> {
        let config: TesterConfig =
            toml::from_str(content).map_err(|e| CapError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_block_size(mut self, bytes: u64) -> Self {
        self.block_size_max = bytes;
        self
    }

    pub fn with_file_size(mut self, bytes: u64) -> Self {
        self.file_size_max = bytes;
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.file_prefix = prefix.into();
        self
    }

    pub fn with_sync(mut self, sync: bool) -> Self {
        self.sync = sync;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_max_bytes(mut self, bytes: u64) -> Self {
        self.max_bytes = Some(bytes);
        self
    }

    pub fn validate(&self) -> CapResult {
        if self.block_size_max == 0 || !self.block_size_max.is_multiple_of(MIB) {
            return Err(CapError::InvalidConfig(
                "block size must be a positive multiple of 1 MiB",
            ));
        }
        if self.file_size_max == 0 || !self.file_size_max.is_multiple_of(MIB) {
            return Err(CapError::InvalidConfig(
                "file size must be a positive multiple of 1 MiB",
            ));
        }
        if self.file_size_max <= self.block_size_max {
            return Err(CapError::InvalidConfig(
                "file size must be larger than block size",
            ));
        }
        if self.block_size_max > usize::MAX as u64 {
            return Err(CapError::InvalidConfig("block size exceeds address space"));
        }
        if self.file_prefix.is_empty() {
            return Err(CapError::InvalidConfig("file prefix must not be empty"));
        }
        if self.file_prefix.contains(['/', '\\']) {
            return Err(CapError::InvalidConfig(
                "file prefix must not contain path separators",
            ));
        }
        Ok(())
    }
}

/// Parses sizes like `"16M"`, `"1G"`, `"512K"` or a bare byte count.
pub fn parse_size(size: &str) -> CapResult<u64> {
    let lower = size.trim().to_lowercase();
    let lower = lower.strip_suffix("ib").or(lower.strip_suffix('b')).unwrap_or(&lower);

    let (num, mult) = if let Some(num) = lower.strip_suffix('k') {
        (num, 1024)
    } else if let Some(num) = lower.strip_suffix('m') {
        (num, MIB)
    } else if let Some(num) = lower.strip_suffix('g') {
        (num, 1024 * MIB)
    } else if let Some(num) = lower.strip_suffix('t') {
        (num, 1024 * 1024 * MIB)
    } else {
        (lower, 1)
    };

    num.trim()
        .parse::<u64>()
        .ok()
        .and_then(|n| n.checked_mul(mult))
        .ok_or_else(|| CapError::Config(format!("Invalid size '{size}'. Use K, M, G or T suffix.")))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawSize {
    Bytes(u64),
    Text(String),
}

impl RawSize {
    fn bytes<E: serde::de::Error>(self) -> Result<u64, E> {
        match self {
            RawSize::Bytes(n) => Ok(n),
            RawSize::Text(s) => parse_size(&s).map_err(|e| E::custom(e.to_string())),
        }
    }
}

fn de_size<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    RawSize::deserialize(deserializer)?.bytes()
}

fn de_opt_size<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<RawSize>::deserialize(deserializer)?
        .map(RawSize::bytes)
        .transpose()
}
