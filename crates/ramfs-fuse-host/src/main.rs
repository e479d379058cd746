//! RamFS FUSE Host — Linux/macOS filesystem adapter
//!
//! This binary mounts a RamFS namespace using libfuse (Linux) or
//! macFUSE (macOS).

#[cfg(feature = "fuse")]
mod adapter;

#[cfg(feature = "fuse")]
use adapter::RamFsFuse;
use anyhow::{Context, Result};
use clap::Parser;
use ramfs_core::{FsConfig, RamFs};
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
struct Args {
    /// Mount point for the filesystem
    mount_point: PathBuf,

    /// Configuration file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Allow other users to access the filesystem
    #[arg(long)]
    allow_other: bool,

    /// Allow root to access the filesystem
    #[arg(long)]
    allow_root: bool,

    /// Auto unmount on process exit
    #[arg(long)]
    auto_unmount: bool,
}

fn load_config(config_path: Option<PathBuf>) -> Result<FsConfig> {
    match config_path {
        Some(path) => {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("reading config {}", path.display()))?;
            let config: FsConfig = serde_json::from_str(&content)
                .with_context(|| format!("parsing config {}", path.display()))?;
            Ok(config)
        }
        None => Ok(FsConfig::default()),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    info!("Starting RamFS FUSE Host");
    info!("Mount point: {}", args.mount_point.display());

    let config = load_config(args.config)?;
    info!("Configuration loaded: {:?}", config);

    let store = RamFs::new(config);

    #[cfg(feature = "fuse")]
    {
        let filesystem = RamFsFuse::new(store);

        let mut mount_options = vec![
            fuser::MountOption::FSName("ramfs".to_string()),
            fuser::MountOption::Subtype("ramfs".to_string()),
        ];

        if args.allow_other {
            mount_options.push(fuser::MountOption::AllowOther);
        }

        if args.allow_root {
            mount_options.push(fuser::MountOption::AllowRoot);
        }

        if args.auto_unmount {
            mount_options.push(fuser::MountOption::AutoUnmount);
        }

        info!("Mounting filesystem...");
        fuser::mount2(filesystem, &args.mount_point, &mount_options)?;
    }

    #[cfg(not(feature = "fuse"))]
    {
        warn!("FUSE support not compiled in. This binary is for testing only.");
        info!("RamFS store initialised with {} entries", store.entry_count());
        info!(
            "Ignoring mount flags allow_other={} allow_root={} auto_unmount={}",
            args.allow_other, args.allow_root, args.auto_unmount
        );
        info!("To enable FUSE support, compile with: cargo build --features fuse");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_config_loading_default() {
        let config = load_config(None).unwrap();
        assert!(config.require_parent);
        assert!(!config.replace_existing);
        assert_eq!(config.root_mode, 0o777);
    }

    #[test]
    fn test_config_loading_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        let config_json = r#"{
            "root_mode": 493,
            "require_parent": false,
            "replace_existing": true,
            "statfs": {
                "block_size": 4096,
                "fragment_size": 4096,
                "blocks": 1000,
                "blocks_free": 900,
                "files": 10,
                "files_free": 5,
                "name_max": 128
            }
        }"#;
        temp_file.write_all(config_json.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = load_config(Some(temp_file.path().to_path_buf())).unwrap();

        assert_eq!(config.root_mode, 0o755);
        assert!(!config.require_parent);
        assert!(config.replace_existing);
        assert_eq!(config.statfs.block_size, 4096);
        assert_eq!(config.statfs.blocks_free, 900);
        assert_eq!(config.statfs.name_max, 128);
    }

    #[test]
    fn test_config_loading_rejects_garbage() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"not json").unwrap();
        temp_file.flush().unwrap();

        assert!(load_config(Some(temp_file.path().to_path_buf())).is_err());
    }

    #[test]
    fn test_args_parse() {
        let args = Args::parse_from(["ramfs-fuse-host", "/mnt/ram", "--auto-unmount"]);
        assert_eq!(args.mount_point, PathBuf::from("/mnt/ram"));
        assert!(args.auto_unmount);
        assert!(!args.allow_other);
        assert!(args.config.is_none());
    }

    #[cfg(feature = "fuse")]
    #[test]
    fn test_adapter_creation() {
        let adapter = adapter::RamFsFuse::new(RamFs::default());
        assert_eq!(adapter.path_of(fuser::FUSE_ROOT_ID), Some("/"));
    }
}
