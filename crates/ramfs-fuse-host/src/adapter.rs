//! RamFS FUSE adapter implementation
//!
//! Maps FUSE operations to RamFS Core calls. The core is keyed by path, so
//! the adapter keeps an inode <-> path table that follows renames and
//! removals.

#[cfg(not(feature = "fuse"))]
compile_error!("This module requires the 'fuse' feature to be enabled");

use fuser::{
    FileAttr, FileType, Filesystem, KernelConfig, ReplyAttr, ReplyCreate, ReplyData,
    ReplyDirectory, ReplyEmpty, ReplyEntry, ReplyOpen, ReplyStatfs, ReplyWrite, Request,
    TimeOrNow, FUSE_ROOT_ID,
};
use libc::{c_int, EINVAL, ENOENT};
use ramfs_core::path::{self, ROOT};
use ramfs_core::{Attributes, EntryKind, FsError, FsOperations, PERMISSION_BITS};
use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

const TTL: Duration = Duration::from_secs(1);

/// RamFS FUSE filesystem adapter
pub struct RamFsFuse<F: FsOperations> {
    /// Core namespace store
    store: F,
    paths: HashMap<u64, String>,
    inodes: HashMap<String, u64>,
    next_ino: u64,
}

impl<F: FsOperations> RamFsFuse<F> {
    pub fn new(store: F) -> Self {
        let mut paths = HashMap::new();
        let mut inodes = HashMap::new();
        paths.insert(FUSE_ROOT_ID, ROOT.to_string());
        inodes.insert(ROOT.to_string(), FUSE_ROOT_ID);

        Self {
            store,
            paths,
            inodes,
            next_ino: FUSE_ROOT_ID + 1,
        }
    }

    /// Get the path for a given inode
    pub fn path_of(&self, ino: u64) -> Option<&str> {
        self.paths.get(&ino).map(String::as_str)
    }

    fn resolve(&self, ino: u64) -> Result<String, c_int> {
        self.path_of(ino).map(str::to_string).ok_or(ENOENT)
    }

    fn child_path(&self, parent: u64, name: &OsStr) -> Result<String, c_int> {
        let parent = self.resolve(parent)?;
        let name = name.to_str().ok_or(EINVAL)?;
        Ok(path::join(&parent, name))
    }

    fn ino_for(&mut self, path: &str) -> u64 {
        if let Some(ino) = self.inodes.get(path) {
            return *ino;
        }
        let ino = self.next_ino;
        self.next_ino += 1;
        self.paths.insert(ino, path.to_string());
        self.inodes.insert(path.to_string(), ino);
        ino
    }

    fn forget_subtree(&mut self, root: &str) {
        let doomed: Vec<String> = self
            .inodes
            .keys()
            .filter(|p| path::is_within(p, root))
            .cloned()
            .collect();
        for p in doomed {
            if let Some(ino) = self.inodes.remove(&p) {
                self.paths.remove(&ino);
            }
        }
    }

    fn move_subtree(&mut self, from: &str, to: &str) {
        self.forget_subtree(to);
        let moved: Vec<(String, u64)> = self
            .inodes
            .iter()
            .filter(|(p, _)| path::is_within(p, from))
            .map(|(p, ino)| (p.clone(), *ino))
            .collect();
        for (old, ino) in moved {
            let new = path::rebase(&old, from, to);
            self.inodes.remove(&old);
            self.inodes.insert(new.clone(), ino);
            self.paths.insert(ino, new);
        }
    }

    /// Look up `path` and build the FUSE attribute record for it
    fn entry_attr(&mut self, path: &str) -> Result<FileAttr, c_int> {
        let attr = self.store.getattr(path).map_err(|e| e.errno())?;
        let ino = self.ino_for(path);
        Ok(attr_to_fuse(&attr, ino))
    }

    /// Apply a setattr request. The resize runs first: it is the only step
    /// that can fail on an existing entry, so a rejected request changes
    /// nothing.
    #[allow(clippy::too_many_arguments)]
    fn apply_attrs(
        &self,
        path: &str,
        mode: Option<u32>,
        uid: Option<u32>,
        gid: Option<u32>,
        size: Option<u64>,
        atime: Option<i64>,
        mtime: Option<i64>,
    ) -> Result<(), FsError> {
        let current = self.store.getattr(path)?;
        if let Some(size) = size {
            self.store.truncate(path, size)?;
        }
        if let Some(mode) = mode {
            self.store.chmod(path, mode)?;
        }
        if uid.is_some() || gid.is_some() {
            let uid = uid.or(current.uid).unwrap_or(0);
            let gid = gid.or(current.gid).unwrap_or(0);
            self.store.chown(path, uid, gid)?;
        }
        if atime.is_some() || mtime.is_some() {
            self.store.set_times(path, atime, mtime)?;
        }
        Ok(())
    }

    /// Record the caller as owner of a freshly created entry
    fn claim(&self, req: &Request<'_>, path: &str) -> Result<(), c_int> {
        self.store
            .chown(path, req.uid(), req.gid())
            .map_err(|e| e.errno())
    }
}

fn to_system_time(secs: i64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(secs.max(0) as u64)
}

fn to_secs(time: TimeOrNow) -> i64 {
    let time = match time {
        TimeOrNow::SpecificTime(t) => t,
        TimeOrNow::Now => SystemTime::now(),
    };
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn file_type(kind: Option<EntryKind>) -> FileType {
    match kind {
        Some(EntryKind::Directory) => FileType::Directory,
        Some(EntryKind::Symlink) => FileType::Symlink,
        Some(EntryKind::File) | None => FileType::RegularFile,
    }
}

/// Convert core Attributes to FUSE FileAttr
fn attr_to_fuse(attr: &Attributes, ino: u64) -> FileAttr {
    FileAttr {
        ino,
        size: attr.size,
        blocks: attr.size.div_ceil(512), // 512-byte blocks
        atime: to_system_time(attr.times.atime),
        mtime: to_system_time(attr.times.mtime),
        ctime: to_system_time(attr.times.ctime),
        crtime: to_system_time(attr.times.ctime),
        kind: file_type(attr.kind()),
        perm: (attr.mode & PERMISSION_BITS) as u16,
        nlink: attr.nlink.unwrap_or(1),
        uid: attr.uid.unwrap_or(0),
        gid: attr.gid.unwrap_or(0),
        rdev: 0,
        blksize: 512,
        flags: 0, // macOS specific
    }
}

fn log_failure(op: &str, path: &str, err: &FsError) -> c_int {
    match err {
        FsError::NotFound => debug!("{} {}: {}", op, path, err),
        _ => warn!("{} {} failed: {}", op, path, err),
    }
    err.errno()
}

impl<F: FsOperations> Filesystem for RamFsFuse<F> {
    fn init(&mut self, req: &Request<'_>, _config: &mut KernelConfig) -> Result<(), c_int> {
        self.claim(req, ROOT)
    }

    fn lookup(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        let result = self
            .child_path(parent, name)
            .and_then(|path| self.entry_attr(&path));
        match result {
            Ok(attr) => reply.entry(&TTL, &attr, 0),
            Err(errno) => reply.error(errno),
        }
    }

    fn getattr(&mut self, _req: &Request<'_>, ino: u64, _fh: Option<u64>, reply: ReplyAttr) {
        match self.resolve(ino).and_then(|path| self.entry_attr(&path)) {
            Ok(attr) => reply.attr(&TTL, &attr),
            Err(errno) => reply.error(errno),
        }
    }

    fn setattr(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        mode: Option<u32>,
        uid: Option<u32>,
        gid: Option<u32>,
        size: Option<u64>,
        atime: Option<TimeOrNow>,
        mtime: Option<TimeOrNow>,
        _ctime: Option<SystemTime>,
        _fh: Option<u64>,
        _crtime: Option<SystemTime>,
        _chgtime: Option<SystemTime>,
        _bkuptime: Option<SystemTime>,
        _flags: Option<u32>,
        reply: ReplyAttr,
    ) {
        let path = match self.resolve(ino) {
            Ok(path) => path,
            Err(errno) => return reply.error(errno),
        };

        let result = self.apply_attrs(
            &path,
            mode,
            uid,
            gid,
            size,
            atime.map(to_secs),
            mtime.map(to_secs),
        );

        if let Err(err) = result {
            return reply.error(log_failure("setattr", &path, &err));
        }
        match self.entry_attr(&path) {
            Ok(attr) => reply.attr(&TTL, &attr),
            Err(errno) => reply.error(errno),
        }
    }

    fn readlink(&mut self, _req: &Request<'_>, ino: u64, reply: ReplyData) {
        let path = match self.resolve(ino) {
            Ok(path) => path,
            Err(errno) => return reply.error(errno),
        };
        match self.store.readlink(&path) {
            Ok(target) => reply.data(target.as_bytes()),
            Err(err) => reply.error(log_failure("readlink", &path, &err)),
        }
    }

    fn mkdir(
        &mut self,
        req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        mode: u32,
        _umask: u32,
        reply: ReplyEntry,
    ) {
        let path = match self.child_path(parent, name) {
            Ok(path) => path,
            Err(errno) => return reply.error(errno),
        };
        if let Err(err) = self.store.mkdir(&path, mode) {
            return reply.error(log_failure("mkdir", &path, &err));
        }
        let result = self.claim(req, &path).and_then(|_| self.entry_attr(&path));
        match result {
            Ok(attr) => reply.entry(&TTL, &attr, 0),
            Err(errno) => reply.error(errno),
        }
    }

    fn unlink(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let path = match self.child_path(parent, name) {
            Ok(path) => path,
            Err(errno) => return reply.error(errno),
        };
        match self.store.unlink(&path) {
            Ok(()) => {
                self.forget_subtree(&path);
                reply.ok();
            }
            Err(err) => reply.error(log_failure("unlink", &path, &err)),
        }
    }

    fn rmdir(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let path = match self.child_path(parent, name) {
            Ok(path) => path,
            Err(errno) => return reply.error(errno),
        };
        match self.store.rmdir(&path) {
            Ok(()) => {
                self.forget_subtree(&path);
                reply.ok();
            }
            Err(err) => reply.error(log_failure("rmdir", &path, &err)),
        }
    }

    fn symlink(
        &mut self,
        req: &Request<'_>,
        parent: u64,
        link_name: &OsStr,
        target: &Path,
        reply: ReplyEntry,
    ) {
        let path = match self.child_path(parent, link_name) {
            Ok(path) => path,
            Err(errno) => return reply.error(errno),
        };
        let Some(target) = target.to_str() else {
            return reply.error(EINVAL);
        };
        if let Err(err) = self.store.symlink(&path, target) {
            return reply.error(log_failure("symlink", &path, &err));
        }
        let result = self.claim(req, &path).and_then(|_| self.entry_attr(&path));
        match result {
            Ok(attr) => reply.entry(&TTL, &attr, 0),
            Err(errno) => reply.error(errno),
        }
    }

    fn rename(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        newparent: u64,
        newname: &OsStr,
        _flags: u32,
        reply: ReplyEmpty,
    ) {
        let paths = self
            .child_path(parent, name)
            .and_then(|old| Ok((old, self.child_path(newparent, newname)?)));
        let (old, new) = match paths {
            Ok(paths) => paths,
            Err(errno) => return reply.error(errno),
        };
        match self.store.rename(&old, &new) {
            Ok(()) => {
                if old != new {
                    self.move_subtree(&old, &new);
                }
                reply.ok();
            }
            Err(err) => reply.error(log_failure("rename", &old, &err)),
        }
    }

    fn open(&mut self, _req: &Request<'_>, ino: u64, flags: i32, reply: ReplyOpen) {
        let path = match self.resolve(ino) {
            Ok(path) => path,
            Err(errno) => return reply.error(errno),
        };
        match self.store.open(&path, flags) {
            Ok(handle) => reply.opened(handle.0, 0),
            Err(err) => reply.error(log_failure("open", &path, &err)),
        }
    }

    fn read(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        let path = match self.resolve(ino) {
            Ok(path) => path,
            Err(errno) => return reply.error(errno),
        };
        let Ok(offset) = u64::try_from(offset) else {
            return reply.error(EINVAL);
        };
        match self.store.read(&path, size as usize, offset) {
            Ok(data) => reply.data(&data),
            Err(err) => reply.error(log_failure("read", &path, &err)),
        }
    }

    fn write(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        data: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyWrite,
    ) {
        let path = match self.resolve(ino) {
            Ok(path) => path,
            Err(errno) => return reply.error(errno),
        };
        let Ok(offset) = u64::try_from(offset) else {
            return reply.error(EINVAL);
        };
        match self.store.write(&path, data, offset) {
            Ok(written) => reply.written(written as u32),
            Err(err) => reply.error(log_failure("write", &path, &err)),
        }
    }

    fn readdir(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        let path = match self.resolve(ino) {
            Ok(path) => path,
            Err(errno) => return reply.error(errno),
        };
        let names = match self.store.readdir(&path) {
            Ok(names) => names,
            Err(err) => return reply.error(log_failure("readdir", &path, &err)),
        };

        let parent_ino = self.ino_for(path::parent_of(&path));
        let mut entries = vec![
            (ino, FileType::Directory, ".".to_string()),
            (parent_ino, FileType::Directory, "..".to_string()),
        ];
        for name in names {
            let child = path::join(&path, &name);
            let Ok(attr) = self.store.getattr(&child) else {
                continue;
            };
            let child_ino = self.ino_for(&child);
            entries.push((child_ino, file_type(attr.kind()), name));
        }

        let skip = usize::try_from(offset).unwrap_or(0);
        for (i, (entry_ino, kind, name)) in entries.into_iter().enumerate().skip(skip) {
            // The buffer is full once add() returns true
            if reply.add(entry_ino, (i + 1) as i64, kind, &name) {
                break;
            }
        }
        reply.ok();
    }

    fn statfs(&mut self, _req: &Request<'_>, _ino: u64, reply: ReplyStatfs) {
        let stats = self.store.statfs();
        reply.statfs(
            stats.blocks,
            stats.blocks_free,
            stats.blocks_available,
            stats.files,
            stats.files_free,
            stats.block_size,
            stats.name_max,
            stats.fragment_size,
        );
    }

    fn create(
        &mut self,
        req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        mode: u32,
        _umask: u32,
        flags: i32,
        reply: ReplyCreate,
    ) {
        let path = match self.child_path(parent, name) {
            Ok(path) => path,
            Err(errno) => return reply.error(errno),
        };
        let handle = self
            .store
            .create(&path, mode)
            .and_then(|_| self.store.open(&path, flags));
        let handle = match handle {
            Ok(handle) => handle,
            Err(err) => return reply.error(log_failure("create", &path, &err)),
        };
        let result = self.claim(req, &path).and_then(|_| self.entry_attr(&path));
        match result {
            Ok(attr) => reply.created(&TTL, &attr, 0, handle.0, 0),
            Err(errno) => reply.error(errno),
        }
    }
}
