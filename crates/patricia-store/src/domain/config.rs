//! # Engine configuration
//!
//! A plain, `serde`-deserializable struct with a `Default` impl — no
//! external config-file crate is pulled in, the engine only needs a
//! handful of numeric limits.

use serde::{Deserialize, Serialize};

use super::store::MAX_CACHED_LEN;

/// Tunables for `NodeStore` and `TrieEngine`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Values longer than this are rejected with `InvalidArgument` at
    /// `Batch::set`. State and storage tries fix leaf values at 32 bytes;
    /// this bound exists to catch host misuse early rather than to
    /// support arbitrary-length values.
    pub max_value_len: usize,

    /// Largest payload length tracked by the node store's per-length
    /// free-slot cache (`domain::store::NodeStore::slots`). Recycled nodes
    /// larger than this are returned straight to `BackingStore::free`
    /// instead of being cached. Must not exceed `MAX_CACHED_LEN`.
    pub max_cached_len: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_value_len: 32,
            max_cached_len: MAX_CACHED_LEN,
        }
    }
}

impl StoreConfig {
    /// Validate that `max_cached_len` is within what the store's fixed-size
    /// slot table can track. Called by `TrieEngine::new`/`resume` before
    /// any `NodeStore` is built, so a bad config surfaces as an
    /// `EngineError::InvalidArgument` instead of the allocator's own
    /// internal assertion.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_cached_len > MAX_CACHED_LEN {
            return Err(format!(
                "max_cached_len {} exceeds the store's MAX_CACHED_LEN {}",
                self.max_cached_len, MAX_CACHED_LEN
            ));
        }
        Ok(())
    }
}
