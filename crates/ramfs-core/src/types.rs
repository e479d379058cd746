//! Core type definitions for RamFS

/// Mask selecting the type tag of a mode
pub const S_IFMT: u32 = 0o170000;
pub const S_IFDIR: u32 = 0o040000;
pub const S_IFREG: u32 = 0o100000;
pub const S_IFLNK: u32 = 0o120000;
/// Permission, setuid/setgid and sticky bits
pub const PERMISSION_BITS: u32 = 0o7777;

/// Placeholder handle returned by `open`; handles are not tracked
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HandleId(pub u64);

impl HandleId {
    pub const PLACEHOLDER: HandleId = HandleId(0);
}

/// Entry timestamps, in whole seconds since the Unix epoch
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FileTimes {
    pub atime: i64,
    pub mtime: i64,
    /// Creation time
    pub ctime: i64,
}

impl FileTimes {
    pub fn all(now: i64) -> Self {
        Self {
            atime: now,
            mtime: now,
            ctime: now,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    File,
    Symlink,
}

impl EntryKind {
    pub fn type_bits(self) -> u32 {
        match self {
            EntryKind::Directory => S_IFDIR,
            EntryKind::File => S_IFREG,
            EntryKind::Symlink => S_IFLNK,
        }
    }

    pub fn from_mode(mode: u32) -> Option<Self> {
        match mode & S_IFMT {
            S_IFDIR => Some(EntryKind::Directory),
            S_IFREG => Some(EntryKind::File),
            S_IFLNK => Some(EntryKind::Symlink),
            _ => None,
        }
    }
}

/// Metadata record returned by `getattr`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attributes {
    pub size: u64,
    pub times: FileTimes,
    /// Type tag OR permission bits
    pub mode: u32,
    pub uid: Option<u32>,
    pub gid: Option<u32>,
    /// Absent on directories
    pub nlink: Option<u32>,
}

impl Attributes {
    pub fn kind(&self) -> Option<EntryKind> {
        EntryKind::from_mode(self.mode)
    }

    pub fn is_dir(&self) -> bool {
        self.mode & S_IFMT == S_IFDIR
    }
}

/// Filesystem statistics returned by `statfs`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatFs {
    pub block_size: u32,
    pub fragment_size: u32,
    pub blocks: u64,
    pub blocks_free: u64,
    pub blocks_available: u64,
    pub files: u64,
    pub files_free: u64,
    pub name_max: u32,
}
