//! RPC data models and types

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// JSON-RPC error code the engine uses for unknown blocks
pub const NOT_FOUND_ERROR_CODE: i32 = -32004;

/// RPC error type
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum RpcError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i32, message: String },

    #[error("Not found: {0}")]
    NotFound(String),
}

impl RpcError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RpcError::NotFound(_))
    }
}

pub type RpcResult<T> = std::result::Result<T, RpcError>;

/// Engine identity, recorded by the inspector for compatibility diagnostics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    pub server_version: String,
    pub network: String,
}

/// Payload of a block-added notification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockAddedNotification {
    pub block: consensus_core::block::Block,
}
