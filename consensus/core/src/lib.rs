//! Core types shared between the consensus engine client and the graph inspector.
//!
//! These mirror what the engine reports about its DAG: block headers and bodies,
//! GHOSTDAG data, block status and virtual selected parent chain changes.

pub mod block;
pub mod config;
pub mod constants;
pub mod errors;
pub mod ghostdag;
pub mod hash;
pub mod header;
pub mod network;
pub mod notify;

pub use hash::{Hash, HASH_SIZE, ZERO_HASH};

/// Map keyed by block hash
pub type BlockHashMap<V> = std::collections::HashMap<Hash, V>;

/// Set of block hashes
pub type BlockHashSet = std::collections::HashSet<Hash>;

/// GHOSTDAG K parameter type
pub type KType = u16;
