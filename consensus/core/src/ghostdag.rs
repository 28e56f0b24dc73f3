use serde::{Deserialize, Serialize};

use crate::Hash;

/// GHOSTDAG data of a block as computed by the engine.
///
/// The merge set is the set of blocks a block newly accounts for relative to
/// its selected parent's past, partitioned into blues and reds.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GhostdagData {
    /// Block's blue score
    pub blue_score: u64,
    /// Selected parent with highest blue work
    pub selected_parent: Hash,
    /// Blue blocks of the merge set, selected parent first
    pub mergeset_blues: Vec<Hash>,
    /// Red blocks of the merge set
    pub mergeset_reds: Vec<Hash>,
}

impl GhostdagData {
    pub fn new(selected_parent: Hash, mergeset_blues: Vec<Hash>, mergeset_reds: Vec<Hash>) -> Self {
        Self { blue_score: 0, selected_parent, mergeset_blues, mergeset_reds }
    }
}
