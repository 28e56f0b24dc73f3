use serde::{Deserialize, Serialize};

use crate::block::Block;
use crate::Hash;

/// Movement of the virtual selected parent chain.
///
/// `removed` and `added` are both ordered chronologically: removed from the
/// previous tip downwards, added from the fork point upwards to the new tip.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualChainChanges {
    pub removed: Vec<Hash>,
    pub added: Vec<Hash>,
}

impl VirtualChainChanges {
    pub fn new(removed: Vec<Hash>, added: Vec<Hash>) -> Self {
        Self { removed, added }
    }

    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.added.is_empty()
    }
}

/// Event emitted by the consensus engine, delivered in engine order
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ConsensusEvent {
    /// A block (or its header) was added to the DAG
    BlockAdded(Block),
    /// The virtual selected parent chain moved
    VirtualChange(VirtualChainChanges),
    /// A notification the inspector does not know how to handle
    #[serde(skip)]
    Unsupported(String),
    /// The event stream broke; no further events follow
    #[serde(skip)]
    StreamError(String),
}
