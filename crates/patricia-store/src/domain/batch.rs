//! # Batch: the single-writer transaction boundary
//!
//! A `Batch` is the only way to mutate a trie. It owns the node store's
//! copy-on-write watermark for its lifetime: opening a batch marks
//! everything allocated from that point as in-frontier (safe to update
//! in place), and committing seals the watermark again so a subsequently
//! opened batch can't accidentally mutate nodes a concurrent reader might
//! still be walking.
//!
//! Only one batch may be open against a given store at a time — enforced
//! here by `Batch::open` taking `&mut NodeStore`, which the borrow
//! checker already refuses to hand out twice.

use crate::ports::BackingStore;

use super::errors::{EngineError, Result};
use super::merkle::root_hash;
use super::nibble::NibblePath;
use super::node::NodeId;
use super::rlp::Hash;
use super::store::NodeStore;
use super::trie::{insert, try_get};

/// How durable a commit must be before `Batch::commit` returns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommitMode {
    /// Compute and return the new root hash; don't force anything to
    /// durable storage. Cheapest, used for read-your-own-writes within a
    /// single process that doesn't need crash durability yet.
    RootOnly,
    /// Seal the watermark so the batch's nodes become eligible for
    /// in-place reuse by a future batch, but still don't force a flush.
    /// The default commit mode.
    SealUpdatable,
    /// Seal, then force every node allocated during the batch out to
    /// durable storage via `BackingStore::flush_from` before returning.
    ForceFlush,
}

impl Default for CommitMode {
    fn default() -> Self {
        CommitMode::SealUpdatable
    }
}

/// An open transaction against a `NodeStore`: a sequence of `set` calls
/// building up a new root, committed all at once.
pub struct Batch<'s, S> {
    store: &'s mut NodeStore<S>,
    root: NodeId,
    root_at_open: NodeId,
    max_value_len: usize,
}

impl<'s, S: BackingStore> Batch<'s, S> {
    /// Open a batch against `store`, starting from `root`. Marks the
    /// store updatable for the duration of this batch. `max_value_len`
    /// comes from the engine's `StoreConfig` and bounds what `set` will
    /// accept.
    pub fn open(store: &'s mut NodeStore<S>, root: NodeId, max_value_len: usize) -> Self {
        store.ensure_updatable();
        Batch {
            store,
            root,
            root_at_open: root,
            max_value_len,
        }
    }

    /// The batch's current root, reflecting every `set` so far.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Insert or overwrite the value at `key` (a 32-byte trie key).
    pub fn set(&mut self, key: &[u8; 32], value: &[u8]) -> Result<()> {
        if value.len() > self.max_value_len {
            return Err(EngineError::InvalidArgument(format!(
                "value length {} exceeds configured max_value_len {}",
                value.len(),
                self.max_value_len
            )));
        }
        let path = NibblePath::from_key(key);
        self.root = insert(self.store, self.root, &path, value)?;
        Ok(())
    }

    /// Look up `key` as of the batch's current, uncommitted state.
    pub fn try_get(&self, key: &[u8; 32]) -> Result<Option<Vec<u8>>> {
        let path = NibblePath::from_key(key);
        try_get(self.store, self.root, &path)
    }

    /// Finish the batch: compute the root hash and, per `mode`, seal the
    /// watermark and/or force durability. Returns the new root id and its
    /// Merkle hash.
    pub fn commit(self, mode: CommitMode) -> Result<(NodeId, Hash)> {
        let hash = root_hash(self.store, self.root)?;
        match mode {
            CommitMode::RootOnly => {}
            CommitMode::SealUpdatable => {
                self.store.seal();
            }
            CommitMode::ForceFlush => {
                self.store.seal();
                self.store.flush_from(self.root_at_open)?;
            }
        }
        Ok((self.root, hash))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory_store::InMemoryBackingStore;

    fn new_store() -> NodeStore<InMemoryBackingStore> {
        NodeStore::new(InMemoryBackingStore::new(), 256)
    }

    #[test]
    fn set_then_get_within_the_same_batch() {
        let mut store = new_store();
        let mut batch = Batch::open(&mut store, NodeId::NULL, 32);
        let key = [0x42u8; 32];
        batch.set(&key, &[7u8; 32]).unwrap();
        assert_eq!(batch.try_get(&key).unwrap(), Some(vec![7u8; 32]));
    }

    #[test]
    fn oversized_value_is_rejected() {
        let mut store = new_store();
        let mut batch = Batch::open(&mut store, NodeId::NULL, 32);
        let key = [0x42u8; 32];
        let err = batch.set(&key, &[0u8; 33]).unwrap_err();
        assert!(matches!(err, EngineError::InvalidArgument(_)));
    }

    #[test]
    fn commit_seals_so_a_later_batch_cannot_reuse_the_slot_in_place() {
        let mut store = new_store();
        let first_root = {
            let mut batch = Batch::open(&mut store, NodeId::NULL, 32);
            batch.set(&[1u8; 32], &[1u8; 32]).unwrap();
            let (root, _hash) = batch.commit(CommitMode::SealUpdatable).unwrap();
            root
        };

        let root_after_second_set = {
            let mut batch = Batch::open(&mut store, first_root, 32);
            batch.set(&[1u8; 32], &[2u8; 32]).unwrap();
            batch.root()
        };
        // The node at first_root is no longer in-frontier after sealing,
        // so overwriting its key must allocate a new id rather than
        // mutating the published node in place.
        assert_ne!(root_after_second_set, first_root);
    }

    #[test]
    fn force_flush_commit_mode_flushes_without_error() {
        let mut store = new_store();
        let mut batch = Batch::open(&mut store, NodeId::NULL, 32);
        batch.set(&[9u8; 32], &[9u8; 32]).unwrap();
        let (_root, _hash) = batch.commit(CommitMode::ForceFlush).unwrap();
    }
}
