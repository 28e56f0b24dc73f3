use serde::{Deserialize, Serialize};

use crate::Hash;

/// Block header as reported by the consensus engine.
///
/// The hash is precomputed by the engine and carried alongside the header
/// fields, the inspector never rehashes headers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Header {
    /// Cached hash of the header
    pub hash: Hash,
    /// Header version
    pub version: u16,
    /// Parents grouped by level, level 0 holds the direct parents
    pub parents_by_level: Vec<Vec<Hash>>,
    /// Timestamp in milliseconds
    pub timestamp: u64,
    /// Difficulty bits
    pub bits: u32,
    /// DAA score of the block
    pub daa_score: u64,
    /// Blue score of the block
    pub blue_score: u64,
    /// Pruning point known to the block
    pub pruning_point: Hash,
}

impl Header {
    /// Build a header from a hash and its direct parents, all other fields zeroed
    pub fn from_precomputed_hash(hash: Hash, parents: Vec<Hash>) -> Self {
        Self {
            hash,
            version: crate::constants::BLOCK_VERSION,
            parents_by_level: vec![parents],
            timestamp: 0,
            bits: 0,
            daa_score: 0,
            blue_score: 0,
            pruning_point: Hash::default(),
        }
    }

    /// Direct parents of the block (level 0)
    pub fn direct_parents(&self) -> &[Hash] {
        self.parents_by_level.first().map(Vec::as_slice).unwrap_or(&[])
    }
}
