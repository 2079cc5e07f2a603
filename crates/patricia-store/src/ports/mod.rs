//! # Ports
//!
//! Interfaces the domain layer consumes but does not implement. Concrete
//! implementations live in `adapters`.

pub mod backing_store;

pub use backing_store::BackingStore;
