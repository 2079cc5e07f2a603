//! # Backing store port
//!
//! The minimal interface the node store needs from whatever actually owns
//! the bytes — a memory-mapped paged file in production, a `HashMap` in
//! tests. This is the boundary named "external collaborator" in the
//! design: the core engine (`domain::store`, `domain::trie`) only ever
//! calls through this trait, and never assumes anything about how ids map
//! to physical storage.
use crate::domain::errors::Result;
use crate::domain::node::NodeId;

/// Backing byte storage consumed by `domain::store::NodeStore`.
///
/// Implementors own durability, paging, and file-epoch bookkeeping; the
/// node store only relies on the contract documented per method.
pub trait BackingStore {
    /// Zero-copy byte slice of the node payload at `id`.
    ///
    /// The returned slice is valid only until the next call to `write` or
    /// `free` on `self` — callers must finish inspecting it (or copy what
    /// they need) before issuing further mutations.
    fn read(&self, id: NodeId) -> Result<&[u8]>;

    /// Allocate a new node, copying `bytes` into the store. Returns its id.
    fn write(&mut self, bytes: &[u8]) -> Result<NodeId>;

    /// Overwrite the payload at `id` in place, without changing its
    /// allocated length. `bytes.len()` must not exceed the slot's current
    /// length (callers enforce this; see `NodeStore::try_update_or_add`).
    /// This is the primitive that makes in-frontier updates and free-slot
    /// recycling possible without a fresh allocation.
    fn overwrite(&mut self, id: NodeId, bytes: &[u8]) -> Result<()>;

    /// Return `id`'s slot to the backing allocator. Does not touch the
    /// node store's own per-length free-slot cache.
    fn free(&mut self, id: NodeId) -> Result<()>;

    /// Monotonically increasing allocation counter: the id a subsequent
    /// `write` would return if nothing else allocates first.
    fn next_id(&self) -> NodeId;

    /// Force durability of every id allocated since `prev_id` (exclusive)
    /// through `next_id` (inclusive).
    fn flush_from(&mut self, prev_id: NodeId) -> Result<()>;

    /// True iff `a` and `b` share the same file epoch — i.e. reusing `a`'s
    /// slot to satisfy a write destined to live near `b` would not cause a
    /// cross-file-segment random access.
    fn is_same_file(&self, a: NodeId, b: NodeId) -> bool;
}
