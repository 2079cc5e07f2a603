//! # Trie engine: insert and lookup
//!
//! Implements the structural rewrites a Merkle-Patricia trie needs on
//! insert — splitting a leaf or extension at the point two keys diverge,
//! growing a branch from 2 up to 16 children, promoting a branch to the
//! fixed-offset "full" layout once every nibble is occupied — expressed
//! purely in terms of `domain::node`'s encode/decode functions and
//! published through `NodeStore::try_update_or_add` so that every
//! rewritten node reuses its old slot whenever the copy-on-write
//! watermark allows it.
//!
//! Every key handled here is a full 64-nibble path (the engine targets
//! Ethereum state/storage tries, whose keys are Keccak hashes): no key is
//! ever a proper prefix of another, so a branch node never needs to carry
//! a value of its own, and a leaf's path length always equals however
//! many nibbles are left to consume at its depth.

use crate::ports::BackingStore;

use super::errors::Result;
use super::nibble::NibblePath;
use super::node::{
    decode_branch, decode_extension, decode_kind, decode_leaf, encode_branch_full,
    encode_branch_sparse, encode_extension, encode_leaf, encoded_branch_len,
    encoded_extension_len, encoded_leaf_len, split_kind, NodeId, NodeKind,
};
use super::store::NodeStore;

/// Publish a leaf node at `current_id` (or freshly, if `current_id` is
/// `NodeId::NULL`).
fn publish_leaf<S: BackingStore>(
    store: &mut NodeStore<S>,
    current_id: NodeId,
    path: &NibblePath<'_>,
    value: &[u8],
) -> Result<NodeId> {
    let mut buf = vec![0u8; encoded_leaf_len(path, value.len())];
    encode_leaf(path, value, &mut buf);
    store.try_update_or_add(current_id, &buf)
}

/// Publish an extension node at `current_id` (or freshly).
fn publish_extension<S: BackingStore>(
    store: &mut NodeStore<S>,
    current_id: NodeId,
    path: &NibblePath<'_>,
    child: NodeId,
) -> Result<NodeId> {
    let mut buf = vec![0u8; encoded_extension_len(path)];
    encode_extension(path, child, &mut buf);
    store.try_update_or_add(current_id, &buf)
}

/// Publish a branch node (sparse or full, chosen by `entries.len()`) at
/// `current_id` (or freshly). `entries` need not be nibble-sorted.
fn publish_branch<S: BackingStore>(
    store: &mut NodeStore<S>,
    current_id: NodeId,
    entries: &[(u8, NodeId)],
) -> Result<NodeId> {
    let mut buf = vec![0u8; encoded_branch_len(entries.len())];
    if entries.len() == 16 {
        let mut full = [NodeId::NULL; 16];
        for (nibble, id) in entries {
            full[*nibble as usize] = *id;
        }
        encode_branch_full(&full, &mut buf);
    } else {
        encode_branch_sparse(entries, &mut buf);
    }
    store.try_update_or_add(current_id, &buf)
}

/// Re-collect a decoded branch's entries into a `Vec` so they can be
/// rebuilt with one changed or one added.
fn branch_entries(first_byte: u8, body: &[u8]) -> Result<Vec<(u8, NodeId)>> {
    Ok(decode_branch(first_byte, body)?.iter().collect())
}

/// Relocate whatever continues below a divergence point for the "old"
/// side of a leaf/extension split, returning the id a sibling branch
/// should use for that side's child.
///
/// For a leaf, the remaining path (after consuming the shared prefix and
/// the one divergent nibble) is always re-published as a fresh leaf. For
/// an extension, an empty remainder means the branch can point directly
/// at the extension's old child with no wrapper node; a non-empty
/// remainder is re-published as a fresh, shorter extension.
fn relocate_old_side<S: BackingStore>(
    store: &mut NodeStore<S>,
    old_path: &NibblePath<'_>,
    old_payload: OldPayload<'_>,
    common: usize,
) -> Result<NodeId> {
    let remainder = old_path.slice_from(common + 1);
    match old_payload {
        OldPayload::LeafValue(value) => publish_leaf(store, NodeId::NULL, &remainder, value),
        OldPayload::ExtensionChild(child) => {
            if remainder.is_empty() {
                Ok(child)
            } else {
                publish_extension(store, NodeId::NULL, &remainder, child)
            }
        }
    }
}

enum OldPayload<'a> {
    LeafValue(&'a [u8]),
    ExtensionChild(NodeId),
}

/// Build the node that replaces `current_id`'s old leaf-or-extension
/// content once it's been found to diverge from `path` at nibble
/// `common`: a two-child branch, wrapped in an extension over the shared
/// prefix when `common > 0`.
fn split_at_divergence<S: BackingStore>(
    store: &mut NodeStore<S>,
    current_id: NodeId,
    old_path: &NibblePath<'_>,
    old_payload: OldPayload<'_>,
    path: &NibblePath<'_>,
    value: &[u8],
    common: usize,
) -> Result<NodeId> {
    let old_nibble = old_path.nibble_at(common);
    let new_nibble = path.nibble_at(common);
    debug_assert_ne!(old_nibble, new_nibble);

    let old_child = relocate_old_side(store, old_path, old_payload, common)?;
    let new_child = publish_leaf(store, NodeId::NULL, &path.slice_from(common + 1), value)?;
    let entries = [(old_nibble, old_child), (new_nibble, new_child)];

    if common == 0 {
        // The branch takes over current_id's own slot directly; nothing
        // shared precedes it.
        publish_branch(store, current_id, &entries)
    } else {
        // The branch is a new node; current_id's slot becomes the
        // extension over the shared prefix that leads to it.
        let branch_id = publish_branch(store, NodeId::NULL, &entries)?;
        publish_extension(store, current_id, &path.slice_to(common), branch_id)
    }
}

/// Insert `value` at `path` into the subtree rooted at `current_id`,
/// returning the (possibly new) id of that subtree's root.
///
/// If the returned id equals `current_id`, the caller's reference to this
/// subtree does not need to change (either nothing below changed, or the
/// change was published in place).
pub fn insert<S: BackingStore>(
    store: &mut NodeStore<S>,
    current_id: NodeId,
    path: &NibblePath<'_>,
    value: &[u8],
) -> Result<NodeId> {
    if current_id.is_null() {
        return publish_leaf(store, NodeId::NULL, path, value);
    }

    let body = store.read(current_id)?.to_vec();
    let (kind, first, rest_body) = split_kind(current_id, &body)?;
    match kind {
        NodeKind::Leaf => {
            let (leaf_path, leaf_value) = decode_leaf(rest_body)?;
            let common = leaf_path.first_different_nibble(path);
            if common == leaf_path.len() && common == path.len() {
                // Same key: overwrite the value in place.
                publish_leaf(store, current_id, path, value)
            } else {
                split_at_divergence(
                    store,
                    current_id,
                    &leaf_path,
                    OldPayload::LeafValue(leaf_value),
                    path,
                    value,
                    common,
                )
            }
        }
        NodeKind::Extension => {
            let (ext_path, child) = decode_extension(rest_body)?;
            let common = ext_path.first_different_nibble(path);
            if common == ext_path.len() {
                let new_child = insert(store, child, &path.slice_from(common), value)?;
                if new_child == child {
                    Ok(current_id)
                } else {
                    publish_extension(store, current_id, &ext_path, new_child)
                }
            } else {
                split_at_divergence(
                    store,
                    current_id,
                    &ext_path,
                    OldPayload::ExtensionChild(child),
                    path,
                    value,
                    common,
                )
            }
        }
        NodeKind::Branch => {
            let nibble = path.nibble_at(0);
            let rest = path.slice_from(1);
            let mut entries = branch_entries(first, rest_body)?;
            match entries.iter().position(|(n, _)| *n == nibble) {
                Some(slot) => {
                    let child = entries[slot].1;
                    let new_child = insert(store, child, &rest, value)?;
                    if new_child == child {
                        Ok(current_id)
                    } else {
                        entries[slot].1 = new_child;
                        publish_branch(store, current_id, &entries)
                    }
                }
                None => {
                    let new_child = publish_leaf(store, NodeId::NULL, &rest, value)?;
                    entries.push((nibble, new_child));
                    publish_branch(store, current_id, &entries)
                }
            }
        }
    }
}

/// Look up `path` in the subtree rooted at `root_id`.
pub fn try_get<S: BackingStore>(
    store: &NodeStore<S>,
    root_id: NodeId,
    path: &NibblePath<'_>,
) -> Result<Option<Vec<u8>>> {
    if root_id.is_null() {
        return Ok(None);
    }
    let body = store.read(root_id)?;
    let (kind, first, rest_body) = split_kind(root_id, body)?;
    match kind {
        NodeKind::Leaf => {
            let (leaf_path, value) = decode_leaf(rest_body)?;
            // Compare against the remaining path at this depth, not
            // against the leaf's own path trivially equaling itself.
            if leaf_path == *path {
                Ok(Some(value.to_vec()))
            } else {
                Ok(None)
            }
        }
        NodeKind::Extension => {
            let (ext_path, child) = decode_extension(rest_body)?;
            let common = ext_path.first_different_nibble(path);
            if common == ext_path.len() {
                try_get(store, child, &path.slice_from(common))
            } else {
                Ok(None)
            }
        }
        NodeKind::Branch => {
            if path.is_empty() {
                return Ok(None);
            }
            let view = decode_branch(first, rest_body)?;
            match view.get(path.nibble_at(0)) {
                Some(child) => try_get(store, child, &path.slice_from(1)),
                None => Ok(None),
            }
        }
    }
}
