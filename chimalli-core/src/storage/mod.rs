//! In-process implementations of the collaborator traits.

pub mod memory;

pub use memory::{MemoryContentStore, MemoryRegistry, MemoryStorage};
