#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use consensus_core::block::{Block, BlockInfo, BlockStatus};
use consensus_core::config::Params;
use consensus_core::ghostdag::GhostdagData;
use consensus_core::header::Header;
use consensus_core::network::NetworkType;
use consensus_core::notify::VirtualChainChanges;
use consensus_core::Hash;
use database::{BlockId, BlockRecord, Database};
use graph_inspector::config::ProcessingConfig;
use graph_inspector::Processing;
use rpc_core::{RpcApi, RpcError, RpcResult, ServerInfo};

pub fn hash(n: u64) -> Hash {
    Hash::from_u64_word(n)
}

#[derive(Default)]
struct EngineState {
    blocks: HashMap<Hash, Block>,
    statuses: HashMap<Hash, BlockStatus>,
    ghostdag: HashMap<Hash, GhostdagData>,
    pruning_point: Hash,
    tip: Hash,
    sequence: Vec<Hash>,
    chains: HashMap<Hash, RpcResult<VirtualChainChanges>>,
    failing_block_info: Option<Hash>,
}

/// In-memory consensus engine
#[derive(Default)]
pub struct MockEngine {
    state: Mutex<EngineState>,
}

impl MockEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Adds a fully available block whose GHOSTDAG data selects its first
    /// parent and colors every parent blue
    pub fn add_block(&self, n: u64, parents: &[u64]) -> Block {
        let parents: Vec<Hash> = parents.iter().copied().map(hash).collect();
        let mut header = Header::from_precomputed_hash(hash(n), parents.clone());
        header.timestamp = n * 1000;
        header.blue_score = n;
        let block = Block::from_header(header);

        let mut state = self.state.lock().unwrap();
        state.blocks.insert(hash(n), block.clone());
        state.statuses.insert(hash(n), BlockStatus::UtxoValid);
        let selected_parent = parents.first().copied().unwrap_or_default();
        state.ghostdag.insert(hash(n), GhostdagData::new(selected_parent, parents, vec![]));
        block
    }

    pub fn block(&self, n: u64) -> Block {
        self.state.lock().unwrap().blocks[&hash(n)].clone()
    }

    pub fn set_status(&self, n: u64, status: BlockStatus) {
        self.state.lock().unwrap().statuses.insert(hash(n), status);
    }

    pub fn set_ghostdag(&self, n: u64, selected_parent: u64, blues: &[u64], reds: &[u64]) {
        let data = GhostdagData::new(
            hash(selected_parent),
            blues.iter().copied().map(hash).collect(),
            reds.iter().copied().map(hash).collect(),
        );
        self.state.lock().unwrap().ghostdag.insert(hash(n), data);
    }

    pub fn set_daa_score(&self, n: u64, daa_score: u64) {
        let mut state = self.state.lock().unwrap();
        if let Some(block) = state.blocks.get_mut(&hash(n)) {
            block.header.daa_score = daa_score;
        }
    }

    pub fn set_pruning_point(&self, n: u64) {
        self.state.lock().unwrap().pruning_point = hash(n);
    }

    /// Hashes served between the pruning point and the tip, the last one being the tip
    pub fn set_sequence(&self, sequence: &[u64]) {
        let mut state = self.state.lock().unwrap();
        state.sequence = sequence.iter().copied().map(hash).collect();
        state.tip = state.sequence.last().copied().unwrap_or_default();
    }

    pub fn set_chain_from(&self, start: u64, removed: &[u64], added: &[u64]) {
        let changes = VirtualChainChanges::new(
            removed.iter().copied().map(hash).collect(),
            added.iter().copied().map(hash).collect(),
        );
        self.state.lock().unwrap().chains.insert(hash(start), Ok(changes));
    }

    pub fn fail_chain_from(&self, start: u64, error: RpcError) {
        self.state.lock().unwrap().chains.insert(hash(start), Err(error));
    }

    pub fn fail_block_info(&self, n: u64) {
        self.state.lock().unwrap().failing_block_info = Some(hash(n));
    }

    fn lookup<T: Clone>(map: &HashMap<Hash, T>, hash: &Hash) -> RpcResult<T> {
        map.get(hash).cloned().ok_or_else(|| RpcError::NotFound(format!("block {}", hash)))
    }
}

#[async_trait]
impl RpcApi for MockEngine {
    async fn get_server_info(&self) -> RpcResult<ServerInfo> {
        Ok(ServerInfo { server_version: "1.2.3".into(), network: "mainnet".into() })
    }

    async fn get_pruning_point(&self) -> RpcResult<Hash> {
        Ok(self.state.lock().unwrap().pruning_point)
    }

    async fn get_headers_selected_tip(&self) -> RpcResult<Hash> {
        Ok(self.state.lock().unwrap().tip)
    }

    async fn get_hashes_between(&self, _low: Hash, _high: Hash, _max_blocks: u64) -> RpcResult<Vec<Hash>> {
        Ok(self.state.lock().unwrap().sequence.clone())
    }

    async fn get_virtual_selected_parent_chain_from_block(&self, start: Hash) -> RpcResult<VirtualChainChanges> {
        Self::lookup(&self.state.lock().unwrap().chains, &start)?
    }

    async fn get_block(&self, hash: Hash) -> RpcResult<Block> {
        Self::lookup(&self.state.lock().unwrap().blocks, &hash)
    }

    async fn get_block_even_if_header_only(&self, hash: Hash) -> RpcResult<Block> {
        Self::lookup(&self.state.lock().unwrap().blocks, &hash)
    }

    async fn get_block_header(&self, hash: Hash) -> RpcResult<Header> {
        Self::lookup(&self.state.lock().unwrap().blocks, &hash).map(|block| block.header)
    }

    async fn get_block_info(&self, hash: Hash) -> RpcResult<BlockInfo> {
        let state = self.state.lock().unwrap();
        if state.failing_block_info == Some(hash) {
            return Err(RpcError::Network("connection reset".into()));
        }
        let block_status = Self::lookup(&state.statuses, &hash)?;
        Ok(BlockInfo { block_exists: true, block_status, blue_score: 0 })
    }

    async fn get_block_ghostdag_data(&self, hash: Hash) -> RpcResult<GhostdagData> {
        Self::lookup(&self.state.lock().unwrap().ghostdag, &hash)
    }
}

pub async fn open_database() -> (TempDir, Arc<Database>) {
    let tmp = TempDir::new().unwrap();
    let database = Database::new(&tmp.path().join("graph.db")).await.unwrap();
    database.migrate().await.unwrap();
    (tmp, Arc::new(database))
}

pub fn processing(engine: &Arc<MockEngine>, database: &Arc<Database>, config: ProcessingConfig) -> Arc<Processing> {
    let consensus: Arc<dyn RpcApi> = engine.clone();
    Arc::new(Processing::new(config, Params::from(NetworkType::Mainnet), database.clone(), consensus))
}

/// Stored record of block `n`
pub async fn stored(database: &Database, n: u64) -> Option<BlockRecord> {
    let mut conn = database.pool().acquire().await.unwrap();
    database.blocks().get_block_by_hash(&mut conn, &hash(n)).await.unwrap()
}

pub async fn stored_id(database: &Database, n: u64) -> BlockId {
    stored(database, n).await.unwrap_or_else(|| panic!("block {} is not stored", n)).id
}

pub async fn block_count(database: &Database) -> u64 {
    let mut conn = database.pool().acquire().await.unwrap();
    database.blocks().count(&mut conn).await.unwrap()
}

pub async fn edge_count(database: &Database) -> u64 {
    let mut conn = database.pool().acquire().await.unwrap();
    database.edges().count(&mut conn).await.unwrap()
}
