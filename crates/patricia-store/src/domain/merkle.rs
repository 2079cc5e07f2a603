//! # Merkleization
//!
//! Walks a subtree rooted at a `NodeId`, recursively RLP-encoding each
//! node and its children per the Yellow Paper's trie rule (inline if the
//! child's RLP is under 32 bytes, else reference by Keccak hash), and
//! returns the root hash. This is the only place the on-disk node layout
//! (`domain::node`) and the wire-format RLP layout (`domain::rlp`) meet —
//! everything else in the crate deals with exactly one of the two.

use crate::ports::BackingStore;

use super::errors::Result;
use super::node::{decode_branch, decode_extension, decode_leaf, split_kind, NodeId, NodeKind};
use super::rlp::{child_reference, encode_bytes, encode_list, keccak256, Hash, EMPTY_TRIE_ROOT};
use super::store::NodeStore;

/// RLP-encode the subtree rooted at `id`. Recurses into children to
/// compute their references before assembling this node's own list.
fn node_rlp<S: BackingStore>(store: &NodeStore<S>, id: NodeId) -> Result<Vec<u8>> {
    let body = store.read(id)?;
    let (kind, first, rest_body) = split_kind(id, body)?;
    match kind {
        NodeKind::Leaf => {
            let (path, value) = decode_leaf(rest_body)?;
            let hp = path.encode_hex_prefix(true);
            Ok(encode_list(&[encode_bytes(&hp), encode_bytes(value)]))
        }
        NodeKind::Extension => {
            let (path, child) = decode_extension(rest_body)?;
            let child_rlp = node_rlp(store, child)?;
            let hp = path.encode_hex_prefix(false);
            Ok(encode_list(&[encode_bytes(&hp), child_reference(&child_rlp)]))
        }
        NodeKind::Branch => {
            let view = decode_branch(first, rest_body)?;
            let mut items = Vec::with_capacity(17);
            for nibble in 0u8..16 {
                match view.get(nibble) {
                    Some(child) => {
                        let child_rlp = node_rlp(store, child)?;
                        items.push(child_reference(&child_rlp));
                    }
                    None => items.push(encode_bytes(&[])),
                }
            }
            // Branches in this engine never carry a value of their own:
            // every key is a full-length 64-nibble path, so no key is ever
            // a proper prefix of another and the 17th ("value") slot of
            // the Yellow Paper's branch is always empty here.
            items.push(encode_bytes(&[]));
            Ok(encode_list(&items))
        }
    }
}

/// Root hash of the subtree rooted at `root_id`, or the canonical empty
/// root if `root_id` is null. Unlike child references, the top-level root
/// is always hashed, regardless of how short its RLP encoding is.
pub fn root_hash<S: BackingStore>(store: &NodeStore<S>, root_id: NodeId) -> Result<Hash> {
    if root_id.is_null() {
        return Ok(EMPTY_TRIE_ROOT);
    }
    let rlp = node_rlp(store, root_id)?;
    Ok(keccak256(&rlp))
}

/// Exposed for tests and tooling that want the raw RLP of an arbitrary
/// node rather than just the root hash, e.g. to check a hand-traced
/// encoding against a `child_reference` call directly.
pub fn encode_node_rlp<S: BackingStore>(store: &NodeStore<S>, id: NodeId) -> Result<Vec<u8>> {
    node_rlp(store, id)
}
