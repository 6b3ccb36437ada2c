//! Persistence Adapters
//!
//! Implementations of the option repository and commitment store.

pub mod in_memory;

pub use in_memory::{InMemoryCommitmentStore, InMemoryOptionRepository};
