//! # In-memory backing store
//!
//! A `Vec`-backed `BackingStore`: no persistence, no paging, a single
//! conceptual file epoch. Used by the crate's own unit and integration
//! tests, and a reasonable default for embedders that don't need
//! durability (e.g. a scratch trie built for a single request and then
//! discarded).

use crate::domain::errors::{EngineError, Result};
use crate::domain::node::NodeId;
use crate::ports::BackingStore;

/// Slots are `None` once freed; ids are never reused at this layer
/// (`NodeStore`'s own free-slot cache handles reuse above us).
#[derive(Default)]
pub struct InMemoryBackingStore {
    slots: Vec<Option<Vec<u8>>>,
}

impl InMemoryBackingStore {
    pub fn new() -> Self {
        // Index 0 is reserved for `NodeId::NULL` and never allocated into.
        InMemoryBackingStore {
            slots: vec![None],
        }
    }

    fn slot(&self, id: NodeId) -> Result<&Vec<u8>> {
        self.slots
            .get(id.get() as usize)
            .and_then(|s| s.as_ref())
            .ok_or(EngineError::CorruptNode {
                id: id.get(),
                reason: "read of freed or never-allocated node id".into(),
            })
    }
}

impl BackingStore for InMemoryBackingStore {
    fn read(&self, id: NodeId) -> Result<&[u8]> {
        self.slot(id).map(|v| v.as_slice())
    }

    fn write(&mut self, bytes: &[u8]) -> Result<NodeId> {
        let id = NodeId::new(self.slots.len() as u64)?;
        self.slots.push(Some(bytes.to_vec()));
        Ok(id)
    }

    fn overwrite(&mut self, id: NodeId, bytes: &[u8]) -> Result<()> {
        let slot = self
            .slots
            .get_mut(id.get() as usize)
            .and_then(|s| s.as_mut())
            .ok_or(EngineError::CorruptNode {
                id: id.get(),
                reason: "overwrite of freed or never-allocated node id".into(),
            })?;
        *slot = bytes.to_vec();
        Ok(())
    }

    fn free(&mut self, id: NodeId) -> Result<()> {
        let slot = self
            .slots
            .get_mut(id.get() as usize)
            .ok_or(EngineError::CorruptNode {
                id: id.get(),
                reason: "free of never-allocated node id".into(),
            })?;
        *slot = None;
        Ok(())
    }

    fn next_id(&self) -> NodeId {
        NodeId::new(self.slots.len() as u64).expect("in-memory store never exceeds 60-bit ids")
    }

    fn flush_from(&mut self, _prev_id: NodeId) -> Result<()> {
        Ok(())
    }

    fn is_same_file(&self, _a: NodeId, _b: NodeId) -> bool {
        // A single growable Vec has no file-segment boundaries.
        true
    }
}
