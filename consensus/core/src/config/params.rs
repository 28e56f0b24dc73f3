use serde::{Deserialize, Serialize};

use crate::constants::GHOSTDAG_K;
use crate::network::NetworkType;
use crate::KType;

/// Consensus parameters the inspector needs to know about a network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Params {
    /// Network the parameters apply to
    pub network: NetworkType,
    /// GHOSTDAG K parameter
    pub ghostdag_k: KType,
}

impl Params {
    pub fn for_network(network: NetworkType) -> Self {
        Self { network, ghostdag_k: GHOSTDAG_K }
    }
}

impl From<NetworkType> for Params {
    fn from(network: NetworkType) -> Self {
        Self::for_network(network)
    }
}
