//! In-memory namespace store for RamFS Core

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, warn};

use crate::config::FsConfig;
use crate::error::{FsError, FsResult};
use crate::ops::FsOperations;
use crate::path::{self, ROOT};
use crate::table::{Entry, EntryTable};
use crate::types::{Attributes, EntryKind, HandleId, StatFs};

/// The namespace store. A single lock guards the whole table because rename
/// and recursive removal touch many keys at once.
pub struct RamFs {
    config: FsConfig,
    table: Mutex<EntryTable>,
}

impl RamFs {
    pub fn new(config: FsConfig) -> Self {
        let mut table = EntryTable::new();
        table.put(ROOT, Entry::directory(config.root_mode, Self::current_timestamp()));
        debug!("root directory created with mode {:o}", config.root_mode);

        Self {
            config,
            table: Mutex::new(table),
        }
    }

    pub fn config(&self) -> &FsConfig {
        &self.config
    }

    /// Number of stored entries, root included
    pub fn entry_count(&self) -> usize {
        self.table().len()
    }

    fn current_timestamp() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0)
    }

    // Every operation validates before it mutates, so a panic never leaves the
    // table half-updated and the poison flag carries no information.
    fn table(&self) -> MutexGuard<'_, EntryTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_parent(&self, table: &EntryTable, path: &str) -> FsResult<()> {
        if !self.config.require_parent {
            return Ok(());
        }
        let parent = path::parent_of(path);
        if !table.get(parent)?.is_dir() {
            return Err(FsError::NotADirectory);
        }
        Ok(())
    }

    /// Insert a freshly built entry at `path`, honouring the parent and
    /// overwrite policies.
    fn insert_new(&self, path: &str, entry: Entry) -> FsResult<()> {
        path::validate(path)?;
        if path == ROOT {
            return Err(FsError::AlreadyExists);
        }

        let mut table = self.table();
        self.check_parent(&table, path)?;
        if table.contains(path) {
            if !self.config.replace_existing {
                warn!("refusing to overwrite existing entry {}", path);
                return Err(FsError::AlreadyExists);
            }
            let removed = table.remove_subtree(path);
            debug!("replaced {} ({} entries dropped)", path, removed);
        }
        table.put(path, entry);
        Ok(())
    }

    /// Bytes a single file may reach: the advertised statfs capacity
    fn capacity(&self) -> u64 {
        let figures = &self.config.statfs;
        figures.blocks.saturating_mul(u64::from(figures.block_size))
    }

    /// Zero-extend `content` to `len` bytes without letting a failed
    /// allocation abort the process.
    fn grow_to(content: &mut Vec<u8>, len: u64, capacity: u64) -> FsResult<()> {
        if len > capacity {
            return Err(FsError::NoSpace);
        }
        let len = usize::try_from(len).map_err(|_| FsError::NoSpace)?;
        if len > content.len() {
            content
                .try_reserve_exact(len - content.len())
                .map_err(|_| FsError::NoSpace)?;
            content.resize(len, 0);
        }
        Ok(())
    }
}

impl Default for RamFs {
    fn default() -> Self {
        Self::new(FsConfig::default())
    }
}

impl FsOperations for RamFs {
    fn getattr(&self, path: &str) -> FsResult<Attributes> {
        debug!("getattr {}", path);
        path::validate(path)?;
        let table = self.table();
        Ok(table.get(path)?.attributes())
    }

    fn mkdir(&self, path: &str, mode: u32) -> FsResult<()> {
        debug!("mkdir {} {:o}", path, mode);
        self.insert_new(path, Entry::directory(mode, Self::current_timestamp()))
    }

    fn rmdir(&self, path: &str) -> FsResult<()> {
        debug!("rmdir {}", path);
        path::validate(path)?;
        if path == ROOT {
            return Err(FsError::InvalidArgument);
        }

        let mut table = self.table();
        if !table.get(path)?.is_dir() {
            return Err(FsError::NotADirectory);
        }
        let removed = table.remove_subtree(path);
        debug!("rmdir {} removed {} entries", path, removed);
        Ok(())
    }

    fn create(&self, path: &str, mode: u32) -> FsResult<()> {
        debug!("create {} {:o}", path, mode);
        self.insert_new(path, Entry::file(mode, Self::current_timestamp()))
    }

    fn symlink(&self, path: &str, target: &str) -> FsResult<()> {
        debug!("symlink {} -> {}", path, target);
        self.insert_new(path, Entry::symlink(target, Self::current_timestamp()))
    }

    fn unlink(&self, path: &str) -> FsResult<()> {
        debug!("unlink {}", path);
        path::validate(path)?;

        let mut table = self.table();
        if table.get(path)?.is_dir() {
            return Err(FsError::IsADirectory);
        }
        table.remove(path)?;
        Ok(())
    }

    fn rename(&self, old: &str, new: &str) -> FsResult<()> {
        debug!("rename {} -> {}", old, new);
        path::validate(old)?;
        path::validate(new)?;

        let mut table = self.table();
        table.get(old)?;
        if old == new {
            return Ok(());
        }
        // Root cannot move, nothing can replace it, and a subtree cannot be
        // moved into itself or onto one of its ancestors.
        if old == ROOT || new == ROOT || path::is_within(new, old) || path::is_within(old, new) {
            return Err(FsError::InvalidArgument);
        }
        self.check_parent(&table, new)?;

        if table.contains(new) {
            let replaced = table.remove_subtree(new);
            debug!("rename replaced {} ({} entries dropped)", new, replaced);
        }
        for from in table.paths_with_prefix(old) {
            let entry = table.remove(&from)?;
            table.put(path::rebase(&from, old, new), entry);
        }
        Ok(())
    }

    fn read(&self, path: &str, length: usize, offset: u64) -> FsResult<Vec<u8>> {
        debug!("read {} len={} offset={}", path, length, offset);
        path::validate(path)?;

        let mut table = self.table();
        let entry = table.get_mut(path)?;
        let Some(content) = entry.content.as_ref() else {
            return Err(FsError::IsADirectory);
        };

        let start = usize::try_from(offset).unwrap_or(usize::MAX).min(content.len());
        let end = start.saturating_add(length).min(content.len());
        let data = content[start..end].to_vec();
        entry.times.atime = Self::current_timestamp();
        Ok(data)
    }

    fn readlink(&self, path: &str) -> FsResult<String> {
        debug!("readlink {}", path);
        path::validate(path)?;

        let table = self.table();
        let entry = table.get(path)?;
        if entry.kind != EntryKind::Symlink {
            return Err(FsError::InvalidArgument);
        }
        let target = entry.content.clone().unwrap_or_default();
        String::from_utf8(target).map_err(|_| FsError::InvalidArgument)
    }

    fn write(&self, path: &str, data: &[u8], offset: u64) -> FsResult<usize> {
        debug!("write {} len={} offset={}", path, data.len(), offset);
        path::validate(path)?;

        let capacity = self.capacity();
        let mut table = self.table();
        let entry = table.get_mut(path)?;
        let Some(content) = entry.content.as_mut() else {
            return Err(FsError::IsADirectory);
        };

        let end = offset
            .checked_add(data.len() as u64)
            .ok_or(FsError::NoSpace)?;
        // Any gap between the old end and `offset` is zero-filled
        Self::grow_to(content, end, capacity)?;
        let start = offset as usize;
        content[start..start + data.len()].copy_from_slice(data);
        entry.times.mtime = Self::current_timestamp();
        Ok(data.len())
    }

    fn truncate(&self, path: &str, length: u64) -> FsResult<()> {
        debug!("truncate {} {}", path, length);
        path::validate(path)?;
        let capacity = self.capacity();
        let mut table = self.table();
        let entry = table.get_mut(path)?;
        let Some(content) = entry.content.as_mut() else {
            return Err(FsError::IsADirectory);
        };
        Self::grow_to(content, length, capacity)?;
        // `length` fits in usize once grow_to has accepted it
        content.truncate(length as usize);
        entry.times.mtime = Self::current_timestamp();
        Ok(())
    }

    fn readdir(&self, path: &str) -> FsResult<Vec<String>> {
        debug!("readdir {}", path);
        path::validate(path)?;

        let table = self.table();
        if !table.get(path)?.is_dir() {
            return Err(FsError::NotADirectory);
        }
        Ok(table.children_of(path))
    }

    fn chmod(&self, path: &str, mode: u32) -> FsResult<()> {
        debug!("chmod {} {:o}", path, mode);
        path::validate(path)?;
        self.table().get_mut(path)?.set_permissions(mode);
        Ok(())
    }

    fn chown(&self, path: &str, uid: u32, gid: u32) -> FsResult<()> {
        debug!("chown {} {} {}", path, uid, gid);
        path::validate(path)?;

        let mut table = self.table();
        let entry = table.get_mut(path)?;
        entry.uid = Some(uid);
        entry.gid = Some(gid);
        Ok(())
    }

    fn set_times(&self, path: &str, atime: Option<i64>, mtime: Option<i64>) -> FsResult<()> {
        debug!("utimens {} {:?} {:?}", path, atime, mtime);
        path::validate(path)?;

        let mut table = self.table();
        let entry = table.get_mut(path)?;
        if let Some(atime) = atime {
            entry.times.atime = atime;
        }
        if let Some(mtime) = mtime {
            entry.times.mtime = mtime;
        }
        Ok(())
    }

    fn statfs(&self) -> StatFs {
        let figures = &self.config.statfs;
        StatFs {
            block_size: figures.block_size,
            fragment_size: figures.fragment_size,
            blocks: figures.blocks,
            blocks_free: figures.blocks_free,
            blocks_available: figures.blocks_free,
            files: figures.files,
            files_free: figures.files_free,
            name_max: figures.name_max,
        }
    }

    fn open(&self, path: &str, flags: i32) -> FsResult<HandleId> {
        debug!("open {} flags={:#o}", path, flags);
        path::validate(path)?;
        self.table().get(path)?;
        Ok(HandleId::PLACEHOLDER)
    }
}
