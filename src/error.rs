// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Failure kinds for store initialisation and the read/write engines.

use std::io;

use thiserror::Error;

/// Errors surfaced by [`crate::EdgeFs`].
///
/// Init-time kinds (`Init*`) are fatal: the store handle is never
/// constructed. Runtime kinds come back from `write`/`read`; a partial data
/// write is *not* an error — it surfaces as a short count instead.
#[derive(Debug, Error)]
pub enum FsError {
    /// The memory budget cannot hold even one header, one bitmap byte and
    /// one meta record.
    #[error("usable memory below the minimum index footprint")]
    InitMemory,

    /// The computed geometry is unusable (a zero parameter, or the derived
    /// sizes exceed the configured disk/memory budgets).
    #[error("computed store geometry is unusable")]
    InitSizing,

    /// Creating, truncating or mapping one of the backing files failed.
    #[error("index or data file setup failed")]
    InitMmap(#[source] io::Error),

    /// The existing index file does not match the geometry recomputed from
    /// the caller's `SystemInfo`.
    #[error("index file header does not match the computed geometry")]
    InitHeaderMismatch,

    /// The bitmap has fewer free chunks than the write needs.
    #[error("no free chunk available")]
    NoFreeChunk,

    /// The hash bucket chain is owned entirely by a different name and has
    /// no unused slot to claim.
    #[error("hash bucket is occupied by a different name")]
    BucketOccupied,

    /// A positional write on the data file failed.
    #[error("data file write failed")]
    IoWrite(#[source] io::Error),

    /// A positional read on the data file failed.
    #[error("data file read failed")]
    IoRead(#[source] io::Error),

    /// No chain for this name exists in the meta pool.
    #[error("name not present in the store")]
    NotFound,

    /// The requested read offset lies beyond the stored length.
    #[error("read offset beyond the stored length")]
    BadOffset,
}
