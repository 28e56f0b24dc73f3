use serde::{Deserialize, Serialize};

use crate::header::Header;
use crate::Hash;

/// Block as served by the consensus engine.
///
/// The inspector only reads the header; body fields sent by the engine are
/// ignored when decoding.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    /// Block header containing metadata and parent information
    pub header: Header,
}

impl Block {
    pub fn from_header(header: Header) -> Self {
        Self { header }
    }

    pub fn hash(&self) -> Hash {
        self.header.hash
    }

    pub fn direct_parents(&self) -> &[Hash] {
        self.header.direct_parents()
    }
}

/// Processing status of a block inside the engine
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BlockStatus {
    /// Only the header has been validated
    HeaderOnly,
    /// Body is available and the block is part of the DAG
    UtxoValid,
    /// Body is available, UTXO state not yet verified
    UtxoPendingVerification,
    /// Body is available but disqualified from the selected chain
    DisqualifiedFromChain,
    /// Block failed validation
    Invalid,
}

impl BlockStatus {
    pub fn is_header_only(self) -> bool {
        matches!(self, BlockStatus::HeaderOnly)
    }
}

/// Engine information about a single block
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockInfo {
    pub block_exists: bool,
    pub block_status: BlockStatus,
    pub blue_score: u64,
}
