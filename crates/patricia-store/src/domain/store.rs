//! # NodeStore: paged allocation, in-place update, free-slot recycling
//!
//! Layers a copy-on-write and recycling policy on top of an arbitrary
//! `BackingStore`. Two pieces of mutable state make this work:
//!
//! - `update_from`, a single watermark id: nodes allocated at or after it
//!   are "in-frontier" — the current batch's own, not yet visible to any
//!   reader — and may be overwritten in place. Sealing a batch bumps this
//!   to `u64::MAX`, so nothing allocated before the next `ensure_updatable`
//!   call can ever be mutated again. This replaces reference counting
//!   entirely.
//! - `slots`, a per-length singly linked free list. Each cached entry's
//!   own payload holds, in its first 8 bytes, the id of the next entry —
//!   no separate bookkeeping allocation needed.

use crate::ports::BackingStore;

use super::errors::{EngineError, Result};
use super::node::NodeId;

/// Largest payload length tracked by the free-slot cache.
pub const MAX_CACHED_LEN: usize = 256;

/// Smallest payload length that can hold a recycled-slot "next" pointer
/// (one `u64`).
pub const ID_SIZE: usize = 8;

/// Paged node allocator: allocate, read, and conditionally in-place update
/// node payloads, generic over whatever `BackingStore` actually owns the
/// bytes.
pub struct NodeStore<S> {
    backing: S,
    /// Smallest id considered still-mutable. `u64::MAX` means sealed: no
    /// node may be updated in place until `ensure_updatable` runs again.
    update_from: u64,
    /// `slots[len]` is the head of the free list for payloads of exactly
    /// `len` bytes, or `None` if empty.
    slots: Vec<Option<NodeId>>,
    max_cached_len: usize,
}

impl<S: BackingStore> NodeStore<S> {
    /// Wrap `backing`, starting sealed (no in-place updates permitted
    /// until `ensure_updatable` is called for the first batch).
    pub fn new(backing: S, max_cached_len: usize) -> Self {
        assert!(max_cached_len <= MAX_CACHED_LEN);
        NodeStore {
            backing,
            update_from: u64::MAX,
            slots: vec![None; max_cached_len + 1],
            max_cached_len,
        }
    }

    /// Zero-copy byte slice of the node payload at `id`.
    pub fn read(&self, id: NodeId) -> Result<&[u8]> {
        self.backing.read(id)
    }

    /// Allocate a new node, unconditionally (no recycling).
    pub fn write(&mut self, bytes: &[u8]) -> Result<NodeId> {
        self.backing.write(bytes)
    }

    /// Return `id`'s slot straight to the backing allocator, bypassing the
    /// per-length cache.
    pub fn free(&mut self, id: NodeId) -> Result<()> {
        self.backing.free(id)
    }

    /// The backing store's next allocation id.
    pub fn next_id(&self) -> NodeId {
        self.backing.next_id()
    }

    /// Force durability of everything allocated since `prev_id`.
    pub fn flush_from(&mut self, prev_id: NodeId) -> Result<()> {
        self.backing.flush_from(prev_id)
    }

    /// Called at batch start: if currently sealed, mark everything
    /// allocated from here on as in-frontier.
    pub fn ensure_updatable(&mut self) {
        if self.update_from == u64::MAX {
            self.update_from = self.backing.next_id().get();
        }
    }

    /// Called at batch commit: freeze the current frontier (nothing
    /// allocated so far may be mutated again) and drop every cached free
    /// slot, since after sealing they may become visible to readers of
    /// the newly published root.
    pub fn seal(&mut self) {
        self.update_from = u64::MAX;
        for slot in &mut self.slots {
            *slot = None;
        }
    }

    /// `true` if `id` was allocated in the batch currently open (i.e. may
    /// be overwritten in place).
    pub fn is_in_frontier(&self, id: NodeId) -> bool {
        id.get() >= self.update_from
    }

    /// Publish `new_bytes` as the replacement for the node formerly at
    /// `current_id` (or as a brand-new node, when `current_id` is
    /// `NodeId::NULL`, i.e. there was no prior node to replace).
    ///
    /// Overwrites in place when `current_id` is in-frontier and the new
    /// payload fits in its existing slot; otherwise the old slot is
    /// recycled through the per-length free list (or handed to
    /// `BackingStore::free` if too large to cache) and a replacement is
    /// satisfied from the cache or a fresh allocation.
    pub fn try_update_or_add(&mut self, current_id: NodeId, new_bytes: &[u8]) -> Result<NodeId> {
        if current_id.is_null() {
            return self.allocate_fresh(new_bytes);
        }

        let existing_len = self.backing.read(current_id)?.len();
        if self.is_in_frontier(current_id) && new_bytes.len() <= existing_len {
            self.backing.overwrite(current_id, new_bytes)?;
            return Ok(current_id);
        }

        self.recycle(current_id, existing_len)?;
        self.allocate_fresh(new_bytes)
    }

    /// Satisfy a write from the per-length cache if possible, else
    /// allocate fresh.
    fn allocate_fresh(&mut self, bytes: &[u8]) -> Result<NodeId> {
        let len = bytes.len();
        if len <= self.max_cached_len {
            while let Some(candidate) = self.slots[len] {
                let next = self.read_cached_next(candidate)?;
                self.slots[len] = next;
                if self.backing.is_same_file(candidate, self.backing.next_id()) {
                    self.backing.overwrite(candidate, bytes)?;
                    return Ok(candidate);
                }
                // Different file epoch: reusing it would cause a
                // cross-segment random access. Drop it rather than
                // reinserting — it is stale relative to the file we are
                // currently appending to.
            }
        }
        self.backing
            .write(bytes)
            .map_err(|_| EngineError::OutOfSpace)
    }

    /// Prepend `id`'s slot to its length's free list, or hand it to the
    /// backing allocator if too large to cache.
    fn recycle(&mut self, id: NodeId, len: usize) -> Result<()> {
        if (ID_SIZE..self.max_cached_len).contains(&len) {
            let prev_head = self.slots[len];
            let next_bytes = match prev_head {
                Some(next) => next.get().to_le_bytes(),
                None => 0u64.to_le_bytes(),
            };
            let mut header = vec![0u8; len];
            header[0..8].copy_from_slice(&next_bytes);
            self.backing.overwrite(id, &header)?;
            self.slots[len] = Some(id);
            Ok(())
        } else {
            self.backing.free(id)
        }
    }

    /// Read the "next" pointer embedded in a cached slot's first 8 bytes.
    /// `0` decodes back to `None` (the free list's terminator).
    fn read_cached_next(&self, id: NodeId) -> Result<Option<NodeId>> {
        let bytes = self.backing.read(id)?;
        if bytes.len() < 8 {
            return Err(EngineError::CorruptNode {
                id: id.get(),
                reason: "cached free slot shorter than a next-pointer".into(),
            });
        }
        let raw = u64::from_le_bytes(bytes[0..8].try_into().unwrap());
        if raw == 0 {
            Ok(None)
        } else {
            Ok(Some(NodeId::new(raw)?))
        }
    }
}
