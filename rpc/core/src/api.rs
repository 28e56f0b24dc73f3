//! RPC API trait definitions

use async_trait::async_trait;
use consensus_core::block::{Block, BlockInfo};
use consensus_core::ghostdag::GhostdagData;
use consensus_core::header::Header;
use consensus_core::notify::{ConsensusEvent, VirtualChainChanges};
use consensus_core::Hash;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::model::*;

/// Read-only queries the graph inspector issues against the consensus engine
#[async_trait]
pub trait RpcApi: Send + Sync {
    // Node
    async fn get_server_info(&self) -> RpcResult<ServerInfo>;

    // DAG layout
    async fn get_pruning_point(&self) -> RpcResult<Hash>;
    async fn get_headers_selected_tip(&self) -> RpcResult<Hash>;
    /// Ordered hashes between `low` and `high`, `max_blocks == 0` means no limit
    async fn get_hashes_between(&self, low: Hash, high: Hash, max_blocks: u64) -> RpcResult<Vec<Hash>>;
    /// Chain changes from `start` to the current virtual selected parent,
    /// fails with `RpcError::NotFound` if `start` is unknown to the engine
    async fn get_virtual_selected_parent_chain_from_block(&self, start: Hash) -> RpcResult<VirtualChainChanges>;

    // Blocks
    async fn get_block(&self, hash: Hash) -> RpcResult<Block>;
    async fn get_block_even_if_header_only(&self, hash: Hash) -> RpcResult<Block>;
    async fn get_block_header(&self, hash: Hash) -> RpcResult<Header>;
    async fn get_block_info(&self, hash: Hash) -> RpcResult<BlockInfo>;
    async fn get_block_ghostdag_data(&self, hash: Hash) -> RpcResult<GhostdagData>;
}

/// Notification API for streaming events
#[async_trait]
pub trait NotificationApi: Send + Sync {
    /// Subscribes to block-added and virtual-change events.
    ///
    /// Events arrive in engine order; the channel closes when the engine
    /// stops sending them.
    async fn start_notify(&self) -> RpcResult<UnboundedReceiver<ConsensusEvent>>;
}
