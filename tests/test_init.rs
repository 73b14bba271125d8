// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Init and reload tests: budget floors, geometry failures, header
// validation across reopen.

use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use edgefs::{EdgeFs, FsError, SystemInfo, DATA_FILE_NAME, INDEX_FILE_NAME};
use tempfile::TempDir;

fn info(root: &Path, disk_capacity: u64, usable_memory: u64) -> SystemInfo {
    SystemInfo {
        disk_capacity,
        disk_root_dir: root.to_path_buf(),
        usable_memory,
    }
}

#[test]
fn memory_below_the_floor_is_rejected() {
    let dir = TempDir::new().unwrap();
    assert!(matches!(
        EdgeFs::init(&info(dir.path(), 1 << 30, 64)),
        Err(FsError::InitMemory)
    ));
}

#[test]
fn zero_disk_capacity_is_rejected() {
    let dir = TempDir::new().unwrap();
    assert!(matches!(
        EdgeFs::init(&info(dir.path(), 0, 1 << 20)),
        Err(FsError::InitSizing)
    ));
}

#[test]
fn disk_smaller_than_one_chunk_is_rejected() {
    let dir = TempDir::new().unwrap();
    assert!(matches!(
        EdgeFs::init(&info(dir.path(), 1000, 1 << 20)),
        Err(FsError::InitSizing)
    ));
}

#[test]
fn fresh_init_creates_both_backing_files() {
    let dir = TempDir::new().unwrap();
    let fs = EdgeFs::init(&info(dir.path(), 64 << 20, 1 << 20)).expect("init");
    assert!(dir.path().join(INDEX_FILE_NAME).is_file());
    assert!(dir.path().join(DATA_FILE_NAME).is_file());
    assert!(fs.chunk_num() > 0);
}

#[test]
fn reopen_with_identical_budgets_succeeds() {
    let dir = TempDir::new().unwrap();
    let si = info(dir.path(), 64 << 20, 1 << 20);
    let geo = {
        let fs = EdgeFs::init(&si).expect("first init");
        *fs.geometry()
    };
    let fs = EdgeFs::init(&si).expect("reopen");
    assert_eq!(*fs.geometry(), geo);
}

#[test]
fn reopen_with_different_budgets_is_rejected() {
    let dir = TempDir::new().unwrap();
    {
        EdgeFs::init(&info(dir.path(), 64 << 20, 1 << 20)).expect("first init");
    }
    // Half the disk yields a different geometry; the stored header must win.
    assert!(matches!(
        EdgeFs::init(&info(dir.path(), 32 << 20, 1 << 20)),
        Err(FsError::InitHeaderMismatch)
    ));
}

#[test]
fn corrupted_magic_is_rejected() {
    let dir = TempDir::new().unwrap();
    {
        EdgeFs::init(&info(dir.path(), 64 << 20, 1 << 20)).expect("first init");
    }

    let path = dir.path().join(INDEX_FILE_NAME);
    let mut file = OpenOptions::new().read(true).write(true).open(path).unwrap();
    let mut magic = [0u8; 1];
    file.read_exact(&mut magic).unwrap();
    file.seek(SeekFrom::Start(0)).unwrap();
    file.write_all(&[magic[0] ^ 0xFF]).unwrap();
    drop(file);

    assert!(matches!(
        EdgeFs::init(&info(dir.path(), 64 << 20, 1 << 20)),
        Err(FsError::InitHeaderMismatch)
    ));
}

#[test]
fn truncated_index_file_is_rejected() {
    let dir = TempDir::new().unwrap();
    {
        EdgeFs::init(&info(dir.path(), 64 << 20, 1 << 20)).expect("first init");
    }

    let path = dir.path().join(INDEX_FILE_NAME);
    let len = std::fs::metadata(&path).unwrap().len();
    let file = OpenOptions::new().write(true).open(&path).unwrap();
    file.set_len(len / 2).unwrap();
    drop(file);

    assert!(matches!(
        EdgeFs::init(&info(dir.path(), 64 << 20, 1 << 20)),
        Err(FsError::InitHeaderMismatch)
    ));
}
