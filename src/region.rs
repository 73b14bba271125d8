// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Owned handle over the memory-mapped index file: header + bitmap + meta
// pool, mapped read-write shared. Raw pointers stay confined to this module;
// everything above it addresses the pool by chunk id.

use std::fs::File;
use std::io;
use std::os::unix::io::AsRawFd;
use std::ptr;

use log::{error, info};

use crate::error::FsError;
use crate::layout::{Geometry, Header, MetaInfo, MAGIC};

/// The mapped index region. Metadata mutations are direct stores into the
/// mapping; durability is whatever the kernel guarantees for `MAP_SHARED`
/// write-back.
pub struct MappedIndex {
    mem: *mut u8,
    size: usize,
    bitmap_off: usize,
    meta_off: usize,
    chunk_num: u32,
}

// The mapping is driven from one thread at a time; the owning store handle
// serialises all access through &self / &mut self.
unsafe impl Send for MappedIndex {}

impl MappedIndex {
    /// Fresh path: size the index file, map it, zero the mapping and stamp
    /// the header.
    pub fn create(file: &File, geo: &Geometry) -> Result<Self, FsError> {
        file.set_len(geo.mmap_size).map_err(FsError::InitMmap)?;
        let this = Self::map(file, geo)?;

        unsafe { ptr::write_bytes(this.mem, 0, this.size) };

        let head = unsafe { &mut *(this.mem as *mut Header) };
        head.magic = MAGIC;
        head.usable_memory = geo.mmap_size;
        head.coverable_disk_size = geo.disk_size;
        head.chunk_num = geo.chunk_num;
        head.chunk_size = geo.chunk_size;
        head.bitmap_size = geo.bitmap_size;

        info!(
            "index created, memory {} diskSize {} chunkNum {} chunkSize {} bitmapSize {}",
            head.usable_memory,
            head.coverable_disk_size,
            head.chunk_num,
            head.chunk_size,
            head.bitmap_size
        );
        Ok(this)
    }

    /// Reload path: map the existing file and validate every header field
    /// against the geometry recomputed from the caller's budgets.
    pub fn open(file: &File, geo: &Geometry) -> Result<Self, FsError> {
        let file_len = file.metadata().map_err(FsError::InitMmap)?.len();
        if file_len != geo.mmap_size {
            error!(
                "index reload failed, file is {file_len} bytes, expected {}",
                geo.mmap_size
            );
            return Err(FsError::InitHeaderMismatch);
        }

        let this = Self::map(file, geo)?;

        let head = this.header();
        if head.magic != MAGIC
            || head.usable_memory != geo.mmap_size
            || head.coverable_disk_size != geo.disk_size
            || head.chunk_num != geo.chunk_num
            || head.chunk_size != geo.chunk_size
            || head.bitmap_size != geo.bitmap_size
        {
            error!(
                "index reload failed, header {:?} does not match geometry {:?}",
                head, geo
            );
            return Err(FsError::InitHeaderMismatch);
        }

        info!(
            "index reloaded, memory {} diskSize {} chunkNum {} chunkSize {} bitmapSize {}",
            head.usable_memory,
            head.coverable_disk_size,
            head.chunk_num,
            head.chunk_size,
            head.bitmap_size
        );
        Ok(this)
    }

    fn map(file: &File, geo: &Geometry) -> Result<Self, FsError> {
        let size = geo.mmap_size as usize;
        let mem = unsafe {
            libc::mmap(
                ptr::null_mut(),
                size,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                file.as_raw_fd(),
                0,
            )
        };
        if mem == libc::MAP_FAILED {
            let err = io::Error::last_os_error();
            error!("mmap failed, mmapSize {size} err {err}");
            return Err(FsError::InitMmap(err));
        }
        Ok(Self {
            mem: mem as *mut u8,
            size,
            bitmap_off: geo.bitmap_offset(),
            meta_off: geo.meta_offset(),
            chunk_num: geo.chunk_num,
        })
    }

    pub fn header(&self) -> &Header {
        unsafe { &*(self.mem as *const Header) }
    }

    /// Base of the bitmap bytes, for the allocator view.
    pub fn bitmap_ptr(&self) -> *mut u8 {
        unsafe { self.mem.add(self.bitmap_off) }
    }

    fn meta_base(&self) -> *mut MetaInfo {
        unsafe { self.mem.add(self.meta_off) as *mut MetaInfo }
    }

    pub fn meta(&self, id: u32) -> &MetaInfo {
        debug_assert!(id < self.chunk_num);
        unsafe { &*self.meta_base().add(id as usize) }
    }

    pub fn meta_mut(&mut self, id: u32) -> &mut MetaInfo {
        debug_assert!(id < self.chunk_num);
        unsafe { &mut *self.meta_base().add(id as usize) }
    }
}

impl Drop for MappedIndex {
    fn drop(&mut self) {
        if self.mem.is_null() {
            return;
        }
        unsafe { libc::munmap(self.mem as *mut libc::c_void, self.size) };
    }
}
