//! Configuration types for RamFS Core

use serde::{Deserialize, Serialize};

/// Figures reported by `statfs`. They are fixed and never derived from usage.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatfsConfig {
    pub block_size: u32,
    pub fragment_size: u32,
    pub blocks: u64,
    pub blocks_free: u64,
    pub files: u64,
    pub files_free: u64,
    pub name_max: u32,
}

impl Default for StatfsConfig {
    fn default() -> Self {
        Self {
            block_size: 1024,
            fragment_size: 1024,
            blocks: 4_096_000,
            blocks_free: 4_096_000,
            files: 1_000_000,
            files_free: 1_000_000,
            name_max: 255,
        }
    }
}

/// Main filesystem configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FsConfig {
    /// Permission bits of the root directory created at construction
    pub root_mode: u32,
    /// Creation and rename targets must sit under an existing directory
    pub require_parent: bool,
    /// Creating over an occupied path replaces the old entry instead of failing
    pub replace_existing: bool,
    pub statfs: StatfsConfig,
}

impl Default for FsConfig {
    fn default() -> Self {
        Self {
            root_mode: 0o777,
            require_parent: true,
            replace_existing: false,
            statfs: StatfsConfig::default(),
        }
    }
}
