// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Embedded content-addressed chunk store for edge-cache workloads: a fixed
// disk region carved into equal-sized chunks, indexed by a persistent
// memory-mapped meta pool that is simultaneously the hash bucket array and
// the per-file chain arena.

pub mod digest;

mod bitmap;
mod data;
mod error;
mod fs;
mod index;
mod layout;
mod region;

pub use error::FsError;
pub use fs::{EdgeFs, FileStat, SystemInfo};
pub use layout::{
    Geometry, DATA_FILE_NAME, INDEX_FILE_NAME, INVALID_CHUNKID, MAX_CHUNK_SIZE, MIN_CHUNK_SIZE,
};
