//! Shamir secret sharing over GF(2^8): split, combine, share encoding.

pub mod share;
pub mod splitter;
pub mod combiner;

pub use combiner::combine;
pub use share::{Share, ShareSet};
pub use splitter::split;
