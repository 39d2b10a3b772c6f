//! Shamir secret sharing with per-share public-key encryption.
//!
//! Secrets are split over GF(2^8), each share is sealed to a recipient's
//! P-256 public key, and the resulting blobs are handed to pluggable
//! collaborators (content store, registry, durable key-value store). The
//! CLI and any other front end share identical byte-level behavior.

pub mod error;
pub mod constants;
pub mod config;
pub mod traits;
pub mod crypto;
pub mod sharing;
pub mod keys;
pub mod pipeline;
pub mod cache;
pub mod vault;
pub mod storage;

#[cfg(test)]
pub(crate) mod test_support;
