//! # Memory-mapped file backing store
//!
//! An append-only, length-prefixed log of node payloads, read back through
//! a read-only `memmap2` mapping that gets replaced after each flush.
//! `fs2::FileExt::try_lock_exclusive` (released on drop) ensures only one
//! process may hold the file open for writing at a time.
//!
//! ## On-disk format
//!
//! A sequence of frames, each `[len: u32 LE][payload: len bytes]`, written
//! in append order starting at byte 0. A `NodeId`'s value is not a byte
//! offset; it is the 1-based index of its frame in this sequence. The
//! index mapping ids to `(offset, len)` is rebuilt by scanning the file
//! once at open time — this adapter keeps no separate index file, a
//! simplification noted in the design ledger.

use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use memmap2::{Mmap, MmapOptions};

use crate::domain::errors::{EngineError, Result};
use crate::domain::node::NodeId;
use crate::ports::BackingStore;

/// One frame's location within the mapped file.
#[derive(Clone, Copy)]
struct Frame {
    offset: u64,
    len: u32,
}

/// `BackingStore` over a single append-only, memory-mapped file.
pub struct MmapBackingStore {
    path: PathBuf,
    writer: File,
    mmap: Mmap,
    frames: Vec<Frame>,
    write_offset: u64,
}

impl MmapBackingStore {
    /// Open (creating if absent) the paged file at `path`, taking an
    /// exclusive advisory lock for the lifetime of the returned store.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        // Not opened with `append(true)`: on Unix that sets O_APPEND,
        // which forces every write to the current end of file regardless
        // of where `seek` last left the cursor — incompatible with
        // `overwrite`'s need to write at an arbitrary earlier offset.
        // Instead every write path below seeks explicitly first.
        let writer = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| EngineError::Io(e.to_string()))?;
        writer
            .try_lock_exclusive()
            .map_err(|e| EngineError::Io(format!("could not lock {}: {e}", path.display())))?;

        let frames = Self::scan_frames(&writer)?;
        let write_offset = writer
            .metadata()
            .map_err(|e| EngineError::Io(e.to_string()))?
            .len();
        let mmap = Self::remap(&writer)?;

        #[cfg(feature = "tracing-log")]
        tracing::info!(path = %path.display(), frame_count = frames.len(), "opened mmap backing store");

        Ok(MmapBackingStore {
            path,
            writer,
            mmap,
            frames,
            write_offset,
        })
    }

    /// Path this store was opened against.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn scan_frames(file: &File) -> Result<Vec<Frame>> {
        let len = file
            .metadata()
            .map_err(|e| EngineError::Io(e.to_string()))?
            .len();
        if len == 0 {
            return Ok(Vec::new());
        }
        let mapping = unsafe {
            MmapOptions::new()
                .map(file)
                .map_err(|e| EngineError::Io(e.to_string()))?
        };
        let mut frames = Vec::new();
        let mut offset = 0u64;
        while offset < len {
            let header_end = offset as usize + 4;
            if header_end > mapping.len() {
                return Err(EngineError::Io("truncated frame header".into()));
            }
            let frame_len =
                u32::from_le_bytes(mapping[offset as usize..header_end].try_into().unwrap());
            let payload_end = header_end + frame_len as usize;
            if payload_end > mapping.len() {
                return Err(EngineError::Io("truncated frame payload".into()));
            }
            frames.push(Frame {
                offset: header_end as u64,
                len: frame_len,
            });
            offset = payload_end as u64;
        }
        Ok(frames)
    }

    fn remap(file: &File) -> Result<Mmap> {
        // Safety: the file is exclusively locked by this process for the
        // store's whole lifetime, and the store never hands out a slice
        // across a call that might append and invalidate this mapping.
        unsafe { MmapOptions::new().map(file) }.map_err(|e| EngineError::Io(e.to_string()))
    }

    fn frame(&self, id: NodeId) -> Result<Frame> {
        self.frames
            .get(id.get() as usize - 1)
            .copied()
            .ok_or(EngineError::CorruptNode {
                id: id.get(),
                reason: "read of an id past the end of the frame index".into(),
            })
    }
}

impl BackingStore for MmapBackingStore {
    fn read(&self, id: NodeId) -> Result<&[u8]> {
        let frame = self.frame(id)?;
        let start = frame.offset as usize;
        let end = start + frame.len as usize;
        Ok(&self.mmap[start..end])
    }

    fn write(&mut self, bytes: &[u8]) -> Result<NodeId> {
        self.writer
            .seek(SeekFrom::Start(self.write_offset))
            .map_err(|e| EngineError::Io(e.to_string()))?;
        self.writer
            .write_all(&(bytes.len() as u32).to_le_bytes())
            .map_err(|e| EngineError::Io(e.to_string()))?;
        self.writer
            .write_all(bytes)
            .map_err(|e| EngineError::Io(e.to_string()))?;
        let offset = self.write_offset + 4;
        self.frames.push(Frame {
            offset,
            len: bytes.len() as u32,
        });
        self.write_offset = offset + bytes.len() as u64;
        self.mmap = Self::remap(&self.writer)?;
        NodeId::new(self.frames.len() as u64)
    }

    fn overwrite(&mut self, id: NodeId, bytes: &[u8]) -> Result<()> {
        let frame = self.frame(id)?;
        if bytes.len() as u32 > frame.len {
            return Err(EngineError::InvalidArgument(format!(
                "overwrite of {} bytes does not fit in {}-byte slot",
                bytes.len(),
                frame.len
            )));
        }
        self.writer
            .seek(SeekFrom::Start(frame.offset))
            .map_err(|e| EngineError::Io(e.to_string()))?;
        self.writer
            .write_all(bytes)
            .map_err(|e| EngineError::Io(e.to_string()))?;
        self.mmap = Self::remap(&self.writer)?;
        Ok(())
    }

    fn free(&mut self, _id: NodeId) -> Result<()> {
        // This adapter never reclaims file space; freed frames simply
        // become unreachable once the node store stops handing out their
        // id. Compaction, if ever needed, is a separate offline process.
        Ok(())
    }

    fn next_id(&self) -> NodeId {
        NodeId::new(self.frames.len() as u64 + 1).expect("frame count stays within 60 bits")
    }

    fn flush_from(&mut self, _prev_id: NodeId) -> Result<()> {
        self.writer
            .sync_data()
            .map_err(|e| EngineError::Io(e.to_string()))?;
        #[cfg(feature = "tracing-log")]
        tracing::debug!(frame_count = self.frames.len(), "flushed backing store to disk");
        Ok(())
    }

    fn is_same_file(&self, _a: NodeId, _b: NodeId) -> bool {
        // A single paged file has no internal segment boundaries.
        true
    }
}

impl Drop for MmapBackingStore {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.writer);
        #[cfg(feature = "tracing-log")]
        tracing::debug!(path = %self.path.display(), "released backing store lock");
    }
}
