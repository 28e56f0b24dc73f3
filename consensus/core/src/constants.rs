use crate::KType;

/// Default GHOSTDAG K used by mainnet
pub const GHOSTDAG_K: KType = 18;

/// Block version carried by headers produced by the engine
pub const BLOCK_VERSION: u16 = 1;
