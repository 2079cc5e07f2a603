//! # Adapters
//!
//! Concrete implementations of the `ports` traits. The `memory_store`
//! adapter is always available and backs the crate's own tests; the
//! `mmap_store` adapter is gated behind the `mmap` feature so the core
//! engine never pulls in OS mmap machinery by default.

pub mod memory_store;

#[cfg(feature = "mmap")]
pub mod mmap_store;
