use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use ramfs_core::*;

fn names(list: Vec<String>) -> HashSet<String> {
    list.into_iter().collect()
}

fn set(items: &[&str]) -> HashSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_root_survives_operations() {
    let fs = RamFs::default();
    fs.mkdir("/d", 0o755).unwrap();
    fs.create("/d/x", 0o644).unwrap();
    fs.rename("/d", "/e").unwrap();
    fs.rmdir("/e").unwrap();
    assert_eq!(fs.rmdir("/"), Err(FsError::InvalidArgument));
    assert_eq!(fs.unlink("/"), Err(FsError::IsADirectory));
    assert_eq!(fs.rename("/", "/z"), Err(FsError::InvalidArgument));
    assert_eq!(fs.getattr("/z"), Err(FsError::NotFound));

    let attr = fs.getattr("/").unwrap();
    assert_eq!(attr.kind(), Some(EntryKind::Directory));
    assert_eq!(fs.entry_count(), 1);
}

#[test]
fn test_create_write_read_round_trip() {
    let fs = RamFs::default();
    fs.create("/a", 0o644).unwrap();
    fs.write("/a", b"hello", 0).unwrap();

    assert_eq!(fs.read("/a", 5, 0).unwrap(), b"hello");
    assert_eq!(fs.getattr("/a").unwrap().size, 5);
}

#[test]
fn test_partial_read_clipping() {
    let fs = RamFs::default();
    fs.create("/a", 0o644).unwrap();
    fs.write("/a", b"hello", 0).unwrap();

    assert_eq!(fs.read("/a", 100, 2).unwrap(), b"llo");
}

#[test]
fn test_rename_moves_identity() {
    let fs = RamFs::default();
    fs.create("/a", 0o644).unwrap();
    let before = fs.getattr("/a").unwrap();

    fs.rename("/a", "/b").unwrap();

    assert_eq!(fs.getattr("/a"), Err(FsError::NotFound));
    let after = fs.getattr("/b").unwrap();
    assert_eq!(after.times, before.times);
    assert_eq!(after.mode, before.mode);
}

#[test]
fn test_listing_reflects_live_children() {
    let fs = RamFs::default();
    fs.mkdir("/d", 0o755).unwrap();
    fs.create("/d/x", 0o644).unwrap();
    fs.create("/d/y", 0o644).unwrap();
    assert_eq!(names(fs.readdir("/d").unwrap()), set(&["x", "y"]));

    fs.unlink("/d/x").unwrap();
    assert_eq!(names(fs.readdir("/d").unwrap()), set(&["y"]));
}

#[test]
fn test_recursive_directory_removal() {
    let fs = RamFs::default();
    fs.mkdir("/d", 0o755).unwrap();
    fs.create("/d/x", 0o644).unwrap();
    fs.mkdir("/d/sub", 0o755).unwrap();
    fs.create("/d/sub/deep", 0o644).unwrap();

    fs.rmdir("/d").unwrap();

    for path in ["/d", "/d/x", "/d/sub", "/d/sub/deep"] {
        assert_eq!(fs.getattr(path), Err(FsError::NotFound), "{path} survived");
    }
}

#[test]
fn test_set_mode_is_idempotent() {
    let fs = RamFs::default();
    fs.create("/f", 0o644).unwrap();
    fs.chmod("/f", 0o600).unwrap();
    let once = fs.getattr("/f").unwrap().mode;
    fs.chmod("/f", 0o600).unwrap();

    assert_eq!(fs.getattr("/f").unwrap().mode, once);
    assert_eq!(once, S_IFREG | 0o600);
}

#[test]
fn test_not_found_propagation() {
    let fs = RamFs::default();
    let missing = "/never";

    assert_eq!(fs.getattr(missing), Err(FsError::NotFound));
    assert_eq!(fs.rmdir(missing), Err(FsError::NotFound));
    assert_eq!(fs.unlink(missing), Err(FsError::NotFound));
    assert_eq!(fs.rename(missing, "/other"), Err(FsError::NotFound));
    assert_eq!(fs.read(missing, 1, 0), Err(FsError::NotFound));
    assert_eq!(fs.readlink(missing), Err(FsError::NotFound));
    assert_eq!(fs.write(missing, b"x", 0), Err(FsError::NotFound));
    assert_eq!(fs.truncate(missing, 0), Err(FsError::NotFound));
    assert_eq!(fs.readdir(missing), Err(FsError::NotFound));
    assert_eq!(fs.chmod(missing, 0o644), Err(FsError::NotFound));
    assert_eq!(fs.chown(missing, 1, 1), Err(FsError::NotFound));
    assert_eq!(fs.set_times(missing, Some(1), Some(1)), Err(FsError::NotFound));
    assert_eq!(fs.open(missing, 0), Err(FsError::NotFound));

    assert_eq!(fs.entry_count(), 1);
    assert_eq!(fs.getattr("/other"), Err(FsError::NotFound));
}

#[test]
fn test_shared_store_across_threads() {
    let fs = Arc::new(RamFs::default());
    fs.mkdir("/t", 0o755).unwrap();

    let workers: Vec<_> = (0..8)
        .map(|i| {
            let fs = Arc::clone(&fs);
            thread::spawn(move || {
                let path = format!("/t/f{i}");
                fs.create(&path, 0o644).unwrap();
                fs.write(&path, format!("worker {i}").as_bytes(), 0).unwrap();
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(fs.readdir("/t").unwrap().len(), 8);
    assert_eq!(fs.read("/t/f3", 64, 0).unwrap(), b"worker 3");
}

#[test]
fn test_store_behind_trait_object() {
    let fs: Box<dyn FsOperations> = Box::new(RamFs::default());
    fs.create("/obj", 0o640).unwrap();
    assert_eq!(fs.getattr("/obj").unwrap().mode, S_IFREG | 0o640);
    assert_eq!(fs.statfs().name_max, 255);
}
