// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Index file manager: owns the descriptor behind the mapped region and
// decides fresh-create vs reload.

use std::fs::{self, File, OpenOptions};
use std::path::Path;

use log::info;

use crate::error::FsError;
use crate::layout::INDEX_FILE_NAME;

pub struct IndexFile {
    file: File,
    existed: bool,
}

impl IndexFile {
    /// Open (or create) the index file under `root`.
    ///
    /// A zero-length file counts as not existing: it carries no header to
    /// validate and is re-initialised from scratch.
    pub fn open(root: &Path) -> Result<Self, FsError> {
        fs::create_dir_all(root).map_err(FsError::InitMmap)?;
        let path = root.join(INDEX_FILE_NAME);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(FsError::InitMmap)?;
        let existed = file.metadata().map_err(FsError::InitMmap)?.len() > 0;
        info!("index file {} existed {existed}", path.display());
        Ok(Self { file, existed })
    }

    pub fn existed(&self) -> bool {
        self.existed
    }

    pub fn file(&self) -> &File {
        &self.file
    }
}
