//! The operation contract the kernel bridge dispatches into.

use crate::error::FsResult;
use crate::types::{Attributes, HandleId, StatFs};

/// Filesystem verbs addressed by path. Each call is a self-contained
/// transaction against the namespace.
pub trait FsOperations: Send + Sync {
    fn getattr(&self, path: &str) -> FsResult<Attributes>;
    fn mkdir(&self, path: &str, mode: u32) -> FsResult<()>;
    fn rmdir(&self, path: &str) -> FsResult<()>;
    fn create(&self, path: &str, mode: u32) -> FsResult<()>;
    fn symlink(&self, path: &str, target: &str) -> FsResult<()>;
    fn unlink(&self, path: &str) -> FsResult<()>;
    fn rename(&self, old: &str, new: &str) -> FsResult<()>;
    fn read(&self, path: &str, length: usize, offset: u64) -> FsResult<Vec<u8>>;
    fn readlink(&self, path: &str) -> FsResult<String>;
    fn write(&self, path: &str, data: &[u8], offset: u64) -> FsResult<usize>;
    fn truncate(&self, path: &str, length: u64) -> FsResult<()>;
    fn readdir(&self, path: &str) -> FsResult<Vec<String>>;
    fn chmod(&self, path: &str, mode: u32) -> FsResult<()>;
    fn chown(&self, path: &str, uid: u32, gid: u32) -> FsResult<()>;
    fn set_times(&self, path: &str, atime: Option<i64>, mtime: Option<i64>) -> FsResult<()>;
    fn statfs(&self) -> StatFs;
    fn open(&self, path: &str, flags: i32) -> FsResult<HandleId>;
}
