//! # RLP encoding and Keccak hashing
//!
//! Pure functions over byte slices: RLP (recursive length prefix) is
//! Ethereum's self-describing serialization, used here purely to produce
//! the bytes that get Keccak-256 hashed into a Merkle root. None of this
//! is used for the on-disk node layout (see `domain::node`), which has its
//! own, denser encoding.

use sha3::{Digest, Keccak256};

/// A 32-byte Keccak-256 hash.
pub type Hash = [u8; 32];

/// Keccak256 of an empty RLP string (`0x80`). The canonical empty-trie root.
pub const EMPTY_TRIE_ROOT: Hash = keccak_of_empty_string();

const fn keccak_of_empty_string() -> Hash {
    // keccak256(0x80), computed once and pinned as a constant so the crate
    // doesn't need a hashing call just to know the empty root.
    [
        0x56, 0xe8, 0x1f, 0x17, 0x1b, 0xcc, 0x55, 0xa6, 0xff, 0x83, 0x45, 0xe6, 0x92, 0xc0, 0xf8,
        0x6e, 0x5b, 0x48, 0xe0, 0x1b, 0x99, 0x6c, 0xad, 0xc0, 0x01, 0x62, 0x2f, 0xb5, 0xe3, 0x63,
        0xb4, 0x21,
    ]
}

/// Whether a node's Merkle reference is an inline RLP blob or a Keccak hash.
///
/// Per the Ethereum trie rule: if the RLP encoding of a node is 32 bytes
/// or longer, it's referenced by its Keccak-256 hash instead of inline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRef {
    /// RLP encoding short enough (< 32 bytes) to inline directly.
    HasRlp,
    /// RLP encoding was >= 32 bytes; `buf` holds its Keccak-256 hash.
    HasKeccak,
}

/// RLP-encode a byte string.
pub fn encode_bytes(data: &[u8]) -> Vec<u8> {
    if data.len() == 1 && data[0] < 0x80 {
        vec![data[0]]
    } else if data.len() < 56 {
        let mut out = Vec::with_capacity(1 + data.len());
        out.push(0x80 + data.len() as u8);
        out.extend_from_slice(data);
        out
    } else {
        let len_bytes = encode_length(data.len());
        let mut out = Vec::with_capacity(1 + len_bytes.len() + data.len());
        out.push(0xb7 + len_bytes.len() as u8);
        out.extend_from_slice(&len_bytes);
        out.extend_from_slice(data);
        out
    }
}

/// RLP-encode a list of already-RLP-encoded items (each element of `items`
/// is raw bytes to embed inline — wrap with `encode_bytes` first if an
/// item is itself a plain byte string rather than a sub-list/hash).
pub fn encode_list(items: &[Vec<u8>]) -> Vec<u8> {
    let total_len: usize = items.iter().map(Vec::len).sum();
    let mut out = Vec::with_capacity(total_len + 9);
    if total_len < 56 {
        out.push(0xc0 + total_len as u8);
    } else {
        let len_bytes = encode_length(total_len);
        out.push(0xf7 + len_bytes.len() as u8);
        out.extend_from_slice(&len_bytes);
    }
    for item in items {
        out.extend_from_slice(item);
    }
    out
}

/// Minimal big-endian encoding of a length (no leading zero bytes).
fn encode_length(len: usize) -> Vec<u8> {
    let bytes = len.to_be_bytes();
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len() - 1);
    bytes[start..].to_vec()
}

/// Keccak-256 of `data`.
pub fn keccak256(data: &[u8]) -> Hash {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Either inline the RLP bytes of a child (if `< 32` bytes) or its Keccak
/// hash, already wrapped as an RLP byte string ready to splice into a
/// parent list: inline when short, else reference by hash.
pub fn child_reference(child_rlp: &[u8]) -> Vec<u8> {
    if child_rlp.len() < 32 {
        child_rlp.to_vec()
    } else {
        encode_bytes(&keccak256(child_rlp))
    }
}

/// Merkleize an already RLP-encoded node: return the raw RLP if it's
/// shorter than 32 bytes, else its Keccak-256 hash — plus a discriminant
/// telling the caller which case applied.
pub fn merkleize(rlp: &[u8]) -> (NodeRef, Vec<u8>) {
    if rlp.len() < 32 {
        (NodeRef::HasRlp, rlp.to_vec())
    } else {
        (NodeRef::HasKeccak, keccak256(rlp).to_vec())
    }
}
