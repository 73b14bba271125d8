// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// The chunk-allocation and file-assembly engine. A write resolves
// name → sha → bucket → chain tail, fills the tail's trailing space, then
// claims further chunks from the bitmap; a read walks the chain and turns a
// logical (offset, len) into positional reads on the data file.

use std::collections::BTreeMap;
use std::path::PathBuf;

use log::{debug, error, info, log_enabled, warn, Level};

use crate::bitmap::Bitmap;
use crate::data::DataFile;
use crate::digest::{self, NameDigest};
use crate::error::FsError;
use crate::index::IndexFile;
use crate::layout::{Geometry, INVALID_CHUNKID};
use crate::region::MappedIndex;

/// Caller-supplied budgets: how much disk may be covered, where the backing
/// files live, and how much memory the mapped index may take.
#[derive(Debug, Clone)]
pub struct SystemInfo {
    pub disk_capacity: u64,
    pub disk_root_dir: PathBuf,
    pub usable_memory: u64,
}

/// Chain summary for one stored name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStat {
    /// Chunk ids in chain order.
    pub chunk_ids: Vec<u32>,
    /// Bytes stored for this name.
    pub total_len: u64,
    /// Unused trailing bytes in the chain's tail chunk.
    pub tail_idle_len: u32,
}

/// An open store: the mapped index region plus the data file.
///
/// The engine is single-threaded by contract; `write` takes `&mut self` and
/// no operation suspends. Durability of metadata is `MAP_SHARED` write-back,
/// so a crash may lose recent updates.
///
/// # Collisions
///
/// Two names whose digests land in the same bucket cannot coexist: the chain
/// rooted at a bucket belongs to the first name that claimed it, and a write
/// for a second name fails with [`FsError::BucketOccupied`]. The v1 image
/// format cannot fork chains per digest.
pub struct EdgeFs {
    geo: Geometry,
    region: MappedIndex,
    bitmap: Bitmap,
    data: DataFile,
}

impl EdgeFs {
    /// Open the store: compute the geometry from `info`, create or reload
    /// the index mapping, and size the data file.
    ///
    /// A pre-existing index is validated field-by-field against the
    /// recomputed geometry; reopening with different budgets fails with
    /// [`FsError::InitHeaderMismatch`].
    pub fn init(info: &SystemInfo) -> Result<Self, FsError> {
        info!(
            "init, disk {} rootdir {} memory {}",
            info.disk_capacity,
            info.disk_root_dir.display(),
            info.usable_memory
        );

        let geo = Geometry::compute(info.disk_capacity, info.usable_memory)?;
        info!(
            "chunkNum {} chunkSize {} bitmapSize {} mmapSize {} diskSize {}",
            geo.chunk_num, geo.chunk_size, geo.bitmap_size, geo.mmap_size, geo.disk_size
        );

        let index = IndexFile::open(&info.disk_root_dir)?;
        let data = DataFile::open(&info.disk_root_dir, geo.disk_size)?;

        let reloaded = index.existed();
        let region = if reloaded {
            MappedIndex::open(index.file(), &geo)?
        } else {
            MappedIndex::create(index.file(), &geo)?
        };
        // The mapping stays valid after the index descriptor closes.

        let bitmap =
            unsafe { Bitmap::from_raw(region.bitmap_ptr(), geo.bitmap_size as usize, geo.chunk_num) };

        let fs = Self {
            geo,
            region,
            bitmap,
            data,
        };
        if reloaded && log_enabled!(Level::Debug) {
            fs.dump_meta();
        }
        Ok(fs)
    }

    pub fn chunk_size(&self) -> u32 {
        self.geo.chunk_size
    }

    pub fn chunk_num(&self) -> u32 {
        self.geo.chunk_num
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geo
    }

    /// Append `data` to the chain stored for `name`, creating the chain on
    /// first write.
    ///
    /// Returns the number of bytes actually written. On an I/O failure
    /// mid-stream this is a short count; metadata for chunks that never
    /// received their payload is not stamped, so the written prefix stays
    /// readable. Errors mean nothing was written at all.
    pub fn write(&mut self, name: &str, data: &[u8]) -> Result<u64, FsError> {
        if data.is_empty() {
            return Ok(0);
        }

        let sha = digest::digest(name);
        let bucket = digest::hash_key(&sha, self.geo.chunk_num);
        let Some(tail_id) = self.find_tail(bucket, &sha) else {
            warn!("bucket {bucket} occupied by another name, name {name}");
            return Err(FsError::BucketOccupied);
        };

        let chunk_size = u64::from(self.geo.chunk_size);
        let len = data.len() as u64;
        let tail_used = self.region.meta(tail_id).is_used();
        let tail_idle = u64::from(self.region.meta(tail_id).idle_len());

        let first_write_len = if tail_used {
            len.min(tail_idle)
        } else {
            len.min(chunk_size)
        };
        let remain = len - first_write_len;
        let need_chunk_num = remain.div_ceil(chunk_size);
        let last_chunk_write_len = remain % chunk_size;

        debug!(
            "write name {name} len {len} bucket {bucket} tail {tail_id} \
             firstWriteLen {first_write_len} needChunkNum {need_chunk_num} \
             lastChunkWriteLen {last_chunk_write_len}"
        );

        // Reserve a fresh tail slot before scanning for free chunks, so the
        // scan cannot hand the tail's own id back as a continuation. Rolled
        // back on any failure before the slot is stamped.
        let reserved = if !tail_used && need_chunk_num > 0 {
            self.bitmap.insert(tail_id);
            true
        } else {
            false
        };

        let mut idle: Vec<u32> = Vec::new();
        if need_chunk_num > 0 {
            let wanted = u32::try_from(need_chunk_num).unwrap_or(u32::MAX);
            if !self.bitmap.generate_idle(&mut idle, wanted) || idle.is_empty() {
                if reserved {
                    self.bitmap.remove(tail_id);
                }
                warn!("no idle chunk, need {need_chunk_num}");
                return Err(FsError::NoFreeChunk);
            }
        }

        let mut real_write_len: u64 = 0;
        let mut remain_len = len;
        let mut prev_id = tail_id;

        'engine: {
            if first_write_len > 0 {
                let mut disk_off = self.geo.disk_offset(tail_id);
                if tail_used {
                    disk_off += chunk_size - tail_idle;
                }
                if let Err(err) = self
                    .data
                    .write_at(&data[..first_write_len as usize], disk_off)
                {
                    error!("first write failed, len {first_write_len} offset {disk_off}: {err}");
                    if reserved {
                        self.bitmap.remove(tail_id);
                    }
                    break 'engine;
                }
                real_write_len += first_write_len;
                remain_len -= first_write_len;

                if tail_used {
                    let meta = self.region.meta_mut(tail_id);
                    let new_idle = meta.idle_len() - first_write_len as u32;
                    meta.set_idle_len(new_idle);
                } else {
                    self.bitmap.insert(tail_id);
                    let meta = self.region.meta_mut(tail_id);
                    meta.used = 1;
                    meta.sha = sha;
                    meta.set_idle_len((chunk_size - first_write_len) as u32);
                    meta.set_next_chunkid(INVALID_CHUNKID);
                }
            }

            for (i, &chunkid) in idle.iter().enumerate() {
                let write_len = remain_len.min(chunk_size);
                let disk_off = self.geo.disk_offset(chunkid);
                let start = real_write_len as usize;
                if let Err(err) = self
                    .data
                    .write_at(&data[start..start + write_len as usize], disk_off)
                {
                    error!("write failed, chunkid {chunkid} len {write_len} offset {disk_off}: {err}");
                    break 'engine;
                }
                real_write_len += write_len;
                remain_len -= write_len;

                self.bitmap.insert(chunkid);
                let meta = self.region.meta_mut(chunkid);
                meta.used = 1;
                meta.sha = sha;
                meta.set_next_chunkid(INVALID_CHUNKID);
                let idle_len = if i + 1 == idle.len() && last_chunk_write_len != 0 {
                    (chunk_size - last_chunk_write_len) as u32
                } else {
                    0
                };
                meta.set_idle_len(idle_len);
                // Link only after the chunk carries payload and meta; a chunk
                // that never got its payload must stay unreachable.
                self.region.meta_mut(prev_id).set_next_chunkid(chunkid);
                prev_id = chunkid;
            }
        }

        if log_enabled!(Level::Debug) {
            self.dump_meta();
        }
        Ok(real_write_len)
    }

    /// Read up to `out.len()` bytes of `name`'s content starting at the
    /// logical `offset`.
    ///
    /// Returns the number of bytes placed into `out`; short only when the
    /// stored content ends before `out` is full or an I/O failure stopped
    /// the plan mid-way.
    pub fn read(&self, name: &str, out: &mut [u8], offset: u64) -> Result<u64, FsError> {
        let sha = digest::digest(name);
        let bucket = digest::hash_key(&sha, self.geo.chunk_num);

        let (ids, total_written, last_chunk_written) = self.gather_chunks(bucket, &sha);
        if ids.is_empty() {
            warn!("not found, name {name}");
            return Err(FsError::NotFound);
        }
        if offset > total_written {
            warn!("offset too large, offset {offset} totalWritten {total_written}");
            return Err(FsError::BadOffset);
        }
        debug!(
            "read name {name} len {} offset {offset} chunks {} totalWritten {total_written} \
             lastChunkWritten {last_chunk_written}",
            out.len(),
            ids.len()
        );
        if out.is_empty() || offset == total_written {
            return Ok(0);
        }

        let plan = self.build_read_plan(&ids, last_chunk_written, out.len() as u64, offset);

        let mut real_read_len: u64 = 0;
        for (&disk_off, &read_len) in &plan {
            let start = real_read_len as usize;
            let end = start + read_len as usize;
            if let Err(err) = self.data.read_at(&mut out[start..end], disk_off) {
                error!("read failed, offset {disk_off} len {read_len}: {err}");
                break;
            }
            real_read_len += u64::from(read_len);
        }
        Ok(real_read_len)
    }

    /// Chain summary for `name`, or `None` when nothing is stored under it.
    pub fn stat(&self, name: &str) -> Option<FileStat> {
        let sha = digest::digest(name);
        let bucket = digest::hash_key(&sha, self.geo.chunk_num);
        let (ids, total, last_written) = self.gather_chunks(bucket, &sha);
        if ids.is_empty() {
            return None;
        }
        Some(FileStat {
            chunk_ids: ids,
            total_len: total,
            tail_idle_len: self.geo.chunk_size - last_written,
        })
    }

    /// Log every live meta record at debug level.
    pub fn dump_meta(&self) {
        debug!("meta dump start");
        for chunkid in 0..self.geo.chunk_num {
            let meta = self.region.meta(chunkid);
            if !meta.is_used() {
                continue;
            }
            debug!(
                "chunkid {chunkid} idleLen {} nextChunkid {}",
                meta.idle_len(),
                meta.next_chunkid()
            );
        }
        debug!("meta dump end");
    }

    /// Walk the bucket chain looking for the write target.
    ///
    /// The tail is the first unused record encountered (the bucket is empty,
    /// or the chain ran into a reclaimed slot — tolerated), otherwise the
    /// last record whose sha matches. `None` means the chain belongs
    /// entirely to a different sha.
    fn find_tail(&self, bucket: u32, sha: &NameDigest) -> Option<u32> {
        let mut tail = None;
        let mut cur = bucket;
        for _ in 0..=self.geo.chunk_num {
            let meta = self.region.meta(cur);
            if !meta.is_used() {
                return Some(cur);
            }
            if meta.sha == *sha {
                tail = Some(cur);
            }
            let next = meta.next_chunkid();
            if next == INVALID_CHUNKID {
                return tail;
            }
            if next >= self.geo.chunk_num {
                warn!("chain from bucket {bucket} holds bad next id {next}");
                return tail;
            }
            cur = next;
        }
        warn!("chain from bucket {bucket} exceeds the pool size");
        tail
    }

    /// Collect the chain's chunk ids for `sha` along with the total stored
    /// length and the bytes written into the tail chunk.
    fn gather_chunks(&self, bucket: u32, sha: &NameDigest) -> (Vec<u32>, u64, u32) {
        let mut ids = Vec::new();
        let mut total_written = 0u64;
        let mut last_chunk_written = 0u32;

        if !self.region.meta(bucket).is_used() {
            return (ids, total_written, last_chunk_written);
        }

        let mut cur = bucket;
        for _ in 0..=self.geo.chunk_num {
            let meta = self.region.meta(cur);
            if meta.sha == *sha {
                ids.push(cur);
                last_chunk_written = self.geo.chunk_size - meta.idle_len();
                total_written += u64::from(last_chunk_written);
            }
            let next = meta.next_chunkid();
            if next == INVALID_CHUNKID {
                return (ids, total_written, last_chunk_written);
            }
            if next >= self.geo.chunk_num {
                warn!("chain from bucket {bucket} holds bad next id {next}");
                return (ids, total_written, last_chunk_written);
            }
            cur = next;
        }
        warn!("chain from bucket {bucket} exceeds the pool size");
        (ids, total_written, last_chunk_written)
    }

    /// Turn a logical `(offset, read_len)` over the chain into positional
    /// data-file reads, keyed (and therefore executed) by ascending disk
    /// offset. Chain order and disk order differ only across collisions of
    /// the allocator's scan; the copy must not rely on chain order.
    fn build_read_plan(
        &self,
        ids: &[u32],
        last_chunk_written: u32,
        read_len: u64,
        offset: u64,
    ) -> BTreeMap<u64, u32> {
        let chunk_size = u64::from(self.geo.chunk_size);
        let first_idx = (offset / chunk_size) as usize;
        let skip = offset % chunk_size;
        let mut plan = BTreeMap::new();

        if first_idx + 1 == ids.len() {
            // The offset already lies in the tail chunk.
            let len = (u64::from(last_chunk_written) - skip).min(read_len);
            plan.insert(self.geo.disk_offset(ids[first_idx]) + skip, len as u32);
            return plan;
        }

        let first_read = (chunk_size - skip).min(read_len);
        plan.insert(self.geo.disk_offset(ids[first_idx]) + skip, first_read as u32);

        let mut remain = read_len - first_read;
        for idx in first_idx + 1..ids.len() {
            if remain == 0 {
                break;
            }
            let id = ids[idx];
            let len = if idx + 1 == ids.len() {
                let written = u64::from(self.geo.chunk_size - self.region.meta(id).idle_len());
                remain.min(written)
            } else {
                remain.min(chunk_size)
            };
            plan.insert(self.geo.disk_offset(id), len as u32);
            remain -= len;
        }
        plan
    }
}
