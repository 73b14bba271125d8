// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Data file manager: a flat array of chunks, accessed with positional
// (unaligned) reads and writes. Chunk i lives at [i·chunk_size, (i+1)·chunk_size).

use std::fs::OpenOptions;
use std::os::unix::fs::FileExt;
use std::path::Path;

use log::info;

use crate::error::FsError;
use crate::layout::DATA_FILE_NAME;

pub struct DataFile {
    file: std::fs::File,
}

impl DataFile {
    /// Open (or create) the data file under `root`, grown to `disk_size`
    /// bytes so every chunk offset is backed.
    pub fn open(root: &Path, disk_size: u64) -> Result<Self, FsError> {
        let path = root.join(DATA_FILE_NAME);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(FsError::InitMmap)?;
        let len = file.metadata().map_err(FsError::InitMmap)?.len();
        if len < disk_size {
            file.set_len(disk_size).map_err(FsError::InitMmap)?;
        }
        info!("data file {} size {disk_size}", path.display());
        Ok(Self { file })
    }

    /// Write `buf` at the absolute byte `offset`, looping over short
    /// transfers.
    pub fn write_at(&self, buf: &[u8], offset: u64) -> Result<(), FsError> {
        self.file.write_all_at(buf, offset).map_err(FsError::IoWrite)
    }

    /// Fill `buf` from the absolute byte `offset`, looping over short
    /// transfers.
    pub fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<(), FsError> {
        self.file.read_exact_at(buf, offset).map_err(FsError::IoRead)
    }
}
