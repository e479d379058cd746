//! Entry table: the flat map from absolute path to entry.
//!
//! There is no explicit tree. Parent/child relationships are recovered from
//! the path strings, so listing a directory scans the keys.

use std::collections::BTreeMap;
use std::ops::Bound;

use crate::error::{FsError, FsResult};
use crate::path;
use crate::types::{Attributes, EntryKind, FileTimes, PERMISSION_BITS, S_IFMT};

/// Stored record for one path
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    pub kind: EntryKind,
    pub times: FileTimes,
    pub mode: u32,
    pub uid: Option<u32>,
    pub gid: Option<u32>,
    pub nlink: Option<u32>,
    /// File bytes or symlink target; `None` for directories
    pub content: Option<Vec<u8>>,
}

impl Entry {
    pub fn directory(mode: u32, now: i64) -> Self {
        Self {
            kind: EntryKind::Directory,
            times: FileTimes::all(now),
            mode: EntryKind::Directory.type_bits() | (mode & PERMISSION_BITS),
            uid: None,
            gid: None,
            nlink: None,
            content: None,
        }
    }

    pub fn file(mode: u32, now: i64) -> Self {
        Self {
            kind: EntryKind::File,
            times: FileTimes::all(now),
            mode: EntryKind::File.type_bits() | (mode & PERMISSION_BITS),
            uid: None,
            gid: None,
            nlink: Some(1),
            content: Some(Vec::new()),
        }
    }

    pub fn symlink(target: &str, now: i64) -> Self {
        Self {
            kind: EntryKind::Symlink,
            times: FileTimes::all(now),
            mode: EntryKind::Symlink.type_bits() | 0o777,
            uid: None,
            gid: None,
            nlink: Some(1),
            content: Some(target.as_bytes().to_vec()),
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    pub fn size(&self) -> u64 {
        self.content.as_ref().map_or(0, |c| c.len() as u64)
    }

    /// Replace the permission bits, keeping the type tag.
    pub fn set_permissions(&mut self, mode: u32) {
        self.mode = (self.mode & S_IFMT) | (mode & PERMISSION_BITS);
    }

    pub fn attributes(&self) -> Attributes {
        Attributes {
            size: self.size(),
            times: self.times,
            mode: self.mode,
            uid: self.uid,
            gid: self.gid,
            nlink: self.nlink,
        }
    }
}

/// Path-keyed entry storage
#[derive(Debug, Default)]
pub struct EntryTable {
    entries: BTreeMap<String, Entry>,
}

impl EntryTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    pub fn get(&self, path: &str) -> FsResult<&Entry> {
        self.entries.get(path).ok_or(FsError::NotFound)
    }

    pub fn get_mut(&mut self, path: &str) -> FsResult<&mut Entry> {
        self.entries.get_mut(path).ok_or(FsError::NotFound)
    }

    /// Insert or overwrite the entry at `path`.
    pub fn put(&mut self, path: impl Into<String>, entry: Entry) -> Option<Entry> {
        self.entries.insert(path.into(), entry)
    }

    pub fn remove(&mut self, path: &str) -> FsResult<Entry> {
        self.entries.remove(path).ok_or(FsError::NotFound)
    }

    /// Names of the entries whose parent is `path`. The root never lists itself.
    pub fn children_of(&self, path: &str) -> Vec<String> {
        self.entries
            .keys()
            .filter(|key| key.as_str() != path::ROOT && path::parent_of(key) == path)
            .map(|key| path::tail_of(key).to_string())
            .collect()
    }

    /// `path` itself plus every descendant at any depth.
    pub fn paths_with_prefix(&self, path: &str) -> Vec<String> {
        self.entries
            .range::<str, _>((Bound::Included(path), Bound::Unbounded))
            .take_while(|(key, _)| key.starts_with(path))
            .filter(|(key, _)| path::is_within(key, path))
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Remove `path` and all of its descendants, returning how many went.
    pub fn remove_subtree(&mut self, path: &str) -> usize {
        let doomed = self.paths_with_prefix(path);
        for key in &doomed {
            self.entries.remove(key);
        }
        doomed.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_with(paths: &[&str]) -> EntryTable {
        let mut table = EntryTable::new();
        table.put("/", Entry::directory(0o755, 0));
        for p in paths {
            table.put(*p, Entry::file(0o644, 0));
        }
        table
    }

    #[test]
    fn test_children_of_root_excludes_root() {
        let table = table_with(&["/a", "/b", "/a/c"]);
        let mut names = table.children_of("/");
        names.sort();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_children_of_nested() {
        let table = table_with(&["/d", "/d/x", "/d/y", "/d/y/z", "/dx"]);
        let mut names = table.children_of("/d");
        names.sort();
        assert_eq!(names, vec!["x", "y"]);
    }

    #[test]
    fn test_paths_with_prefix_is_delimited() {
        let table = table_with(&["/data", "/data/a", "/data-x", "/data/a/b", "/database"]);
        assert_eq!(
            table.paths_with_prefix("/data"),
            vec!["/data", "/data/a", "/data/a/b"]
        );
    }

    #[test]
    fn test_paths_with_prefix_of_root_and_leaf() {
        let table = table_with(&["/a", "/a/b"]);
        assert_eq!(table.paths_with_prefix("/"), vec!["/", "/a", "/a/b"]);
        assert_eq!(table.paths_with_prefix("/a/b"), vec!["/a/b"]);
        assert!(table.paths_with_prefix("/z").is_empty());
    }

    #[test]
    fn test_remove_subtree() {
        let mut table = table_with(&["/data", "/data/a", "/database"]);
        assert_eq!(table.remove_subtree("/data"), 2);
        assert!(table.contains("/database"));
        assert!(!table.contains("/data/a"));
    }

    #[test]
    fn test_get_and_remove_missing() {
        let mut table = EntryTable::new();
        assert_eq!(table.get("/nope"), Err(FsError::NotFound));
        assert_eq!(table.remove("/nope"), Err(FsError::NotFound));
    }

    #[test]
    fn test_set_permissions_keeps_type_tag() {
        let mut entry = Entry::directory(0o755, 0);
        entry.set_permissions(0o100700);
        assert_eq!(entry.mode, crate::types::S_IFDIR | 0o700);
    }
}
