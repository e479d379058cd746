//! RamFS Core — memory-resident namespace store
//!
//! This crate holds every path's metadata and content in memory and
//! implements the filesystem operation contract against it. A kernel bridge
//! (see `ramfs-fuse-host`) translates VFS requests into calls on
//! [`FsOperations`].

pub mod config;
pub mod error;
pub mod fs;
pub mod ops;
pub mod path;
pub mod table;
pub mod types;

// Re-export key types for convenience
pub use config::{FsConfig, StatfsConfig};
pub use error::{FsError, FsResult};
pub use fs::RamFs;
pub use ops::FsOperations;
pub use types::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(FsError::NotFound.to_string(), "not found");
        assert_eq!(
            FsError::InvalidPath("a/b".to_string()).to_string(),
            "invalid path: a/b"
        );
    }

    #[test]
    fn test_errno_mapping() {
        assert_eq!(FsError::NotFound.errno(), 2);
        assert_eq!(FsError::AlreadyExists.errno(), 17);
        assert_eq!(FsError::NotADirectory.errno(), 20);
        assert_eq!(FsError::IsADirectory.errno(), 21);
        assert_eq!(FsError::InvalidArgument.errno(), 22);
        assert_eq!(FsError::NoSpace.errno(), 28);
    }

    #[test]
    fn test_config_creation() {
        let config = FsConfig {
            root_mode: 0o755,
            require_parent: false,
            replace_existing: true,
            statfs: StatfsConfig::default(),
        };
        let fs = RamFs::new(config);
        assert_eq!(fs.getattr("/").unwrap().mode, S_IFDIR | 0o755);
        assert!(fs.config().replace_existing);
    }
}
