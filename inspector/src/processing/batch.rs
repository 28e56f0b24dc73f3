//! Collection of the missing ancestors of a block

use sqlx::SqliteConnection;
use std::collections::VecDeque;
use tracing::{debug, warn};

use consensus_core::block::Block;
use consensus_core::{BlockHashMap, BlockHashSet, Hash};
use database::Database;
use rpc_core::RpcApi;

use crate::error::{Result, ResultExt};

/// Ordered batch of a block and every ancestor it needs to be inserted first.
///
/// Ancestors already stored, the pruning point and anything below it are left
/// out. Blocks come out of [`DependencyCollector::pop`] parents first.
pub struct DependencyCollector<'a> {
    database: &'a Database,
    consensus: &'a dyn RpcApi,
    pruning_point: Option<Hash>,
    pruning_blue_score: u64,
    blocks: VecDeque<(Hash, Block)>,
    collected: BlockHashSet,
}

impl<'a> DependencyCollector<'a> {
    pub fn new(database: &'a Database, consensus: &'a dyn RpcApi, pruning_block: Option<&Block>) -> Self {
        Self {
            database,
            consensus,
            pruning_point: pruning_block.map(Block::hash),
            pruning_blue_score: pruning_block.map_or(0, |block| block.header.blue_score),
            blocks: VecDeque::new(),
            collected: BlockHashSet::default(),
        }
    }

    pub async fn collect_block_and_dependencies(&mut self, conn: &mut SqliteConnection, hash: Hash, block: Block) -> Result<()> {
        if self.collected.contains(&hash) {
            return Ok(());
        }

        // (hash, parents already pushed)
        let mut stack = vec![(hash, false)];
        let mut fetched: BlockHashMap<Block> = BlockHashMap::default();
        let mut expanding = BlockHashSet::default();
        fetched.insert(hash, block);

        while let Some((current, expanded)) = stack.pop() {
            if expanded {
                expanding.remove(&current);
                if let Some(block) = fetched.remove(&current) {
                    self.collected.insert(current);
                    self.blocks.push_back((current, block));
                }
                continue;
            }
            if self.collected.contains(&current) || expanding.contains(&current) {
                continue;
            }

            let parents = match fetched.get(&current) {
                Some(_) if self.pruning_point == Some(current) => Vec::new(),
                Some(block) => block.direct_parents().to_vec(),
                None => continue,
            };
            expanding.insert(current);
            stack.push((current, true));

            for parent in parents {
                if self.pruning_point == Some(parent) || self.collected.contains(&parent) {
                    continue;
                }
                if fetched.contains_key(&parent) {
                    // Seen through another child but not emitted yet, it must precede `current`
                    stack.push((parent, false));
                    continue;
                }
                let exists = self
                    .database
                    .blocks()
                    .does_block_exist(conn, &parent)
                    .await
                    .with_context(|| format!("Could not check if parent {} of block {} exists", parent, current))?;
                if exists {
                    continue;
                }
                match self.consensus.get_block_even_if_header_only(parent).await {
                    Ok(parent_block) if parent_block.header.blue_score < self.pruning_blue_score => {
                        debug!("Dependency {} of block {} is below the pruning point", parent, current);
                    }
                    Ok(parent_block) => {
                        debug!("Collected missing dependency {} of block {}", parent, current);
                        fetched.insert(parent, parent_block);
                        stack.push((parent, false));
                    }
                    Err(err) if err.is_not_found() => {
                        warn!("Dependency {} of block {} is unknown to the engine: {}", parent, current, err);
                    }
                    Err(err) => {
                        return Err(err).with_context(|| format!("Could not get dependency {} of block {}", parent, current));
                    }
                }
            }
        }
        Ok(())
    }

    /// Next block to process, ancestors before descendants
    pub fn pop(&mut self) -> Option<(Hash, Block)> {
        self.blocks.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }
}
