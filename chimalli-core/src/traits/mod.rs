//! Collaborator seams: randomness, durable storage, content storage, registry.

pub mod storage;
pub mod random;
pub mod registry;
