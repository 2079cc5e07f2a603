//! # Engine Error Types
//!
//! Defines all error conditions raised by the node store and trie engine.
//! Each error is recoverable - no panics occur in production code.

use thiserror::Error;

/// Core engine errors.
///
/// All errors are recoverable. None of these cause panics. `CorruptNode`
/// and `OutOfSpace` mean the in-flight batch must be abandoned without
/// commit; the backing store has already recorded whatever partial work
/// happened before the error, but the engine's published root is untouched.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A decoded node's prefix bits fell outside `{00, 01, 10}`, or a
    /// declared child count produced a payload length that does not match
    /// the slot. Fatal to the batch that discovered it.
    #[error("corrupt node at id {id}: {reason}")]
    CorruptNode { id: u64, reason: String },

    /// A `set` key was not exactly 32 bytes, or a value exceeded
    /// `StoreConfig::max_value_len`. Reported locally; the batch's prior
    /// state is unaffected.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The backing store returned no id for a write. Surfaced to the
    /// caller; the batch is abandoned.
    #[error("backing store out of space")]
    OutOfSpace,

    /// A node id would need more than 60 bits to pack into a branch
    /// record. The allocator refuses the allocation outright.
    #[error("node id {0} exceeds the 60-bit branch-record limit")]
    IdSpaceExhausted(u64),

    /// Propagated from a concrete `BackingStore` adapter (e.g. failure to
    /// extend a mapped file). The core never constructs this variant
    /// itself, only adapters do.
    #[error("backing store io error: {0}")]
    Io(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, EngineError>;
