use sqlx::SqliteConnection;
use tracing::{debug, error, warn};

use consensus_core::block::Block;
use consensus_core::Hash;
use database::{BlockId, BlockRecord, Edge, HeightGroup};

use super::batch::DependencyCollector;
use super::Processing;
use crate::error::{Result, ResultExt};

impl Processing {
    /// Processes `block` after every missing ancestor it depends on.
    ///
    /// Ancestors are collected down to `pruning_block` when one is given.
    pub(crate) async fn process_block_and_dependencies(
        &self,
        conn: &mut SqliteConnection,
        hash: Hash,
        block: Block,
        pruning_block: Option<&Block>,
    ) -> Result<()> {
        let mut batch = DependencyCollector::new(&self.database, self.consensus.as_ref(), pruning_block);
        batch.collect_block_and_dependencies(conn, hash, block).await?;
        if batch.len() > 1 {
            debug!("Block {} needs {} missing dependencies", hash, batch.len() - 1);
        }

        while let Some((hash, block)) = batch.pop() {
            if !batch.is_empty() {
                warn!("Handling missing dependency block {}", hash);
            }
            self.process_single_block(conn, &block).await?;
        }
        Ok(())
    }

    /// Inserts `block` if it is not stored yet, then records its GHOSTDAG data
    /// once the engine holds its body. Processing a stored block again only
    /// refreshes that data.
    pub(crate) async fn process_single_block(&self, conn: &mut SqliteConnection, block: &Block) -> Result<()> {
        let block_hash = block.hash();
        debug!("Processing block {}", block_hash);

        let blocks = self.database.blocks();
        let exists = blocks
            .does_block_exist(conn, &block_hash)
            .await
            .with_context(|| format!("Could not check if block {} does exist in database", block_hash))?;

        let mut is_incomplete = false;
        let block_id = if exists {
            debug!("Block {} already exists in database; not processed", block_hash);
            None
        } else {
            let (block_id, incomplete) = self.insert_block_structure(conn, block).await?;
            is_incomplete = incomplete;
            Some(block_id)
        };

        let block_info = self
            .consensus
            .get_block_info(block_hash)
            .await
            .with_context(|| format!("Could not get block info for block {}", block_hash))?;
        if block_info.block_status.is_header_only() || is_incomplete {
            debug!("Finished processing block {} without GHOSTDAG data", block_hash);
            return Ok(());
        }

        let block_id = match block_id {
            Some(id) => id,
            None => blocks
                .block_id_by_hash(conn, &block_hash)
                .await
                .with_context(|| format!("Could not get id for block {}", block_hash))?,
        };
        self.store_ghostdag_data(conn, block_hash, block_id).await?;

        debug!("Finished processing block {}", block_hash);
        Ok(())
    }

    /// Inserts the block row, its height group slot and its edges.
    ///
    /// Returns the new id and whether some parents were missing.
    async fn insert_block_structure(&self, conn: &mut SqliteConnection, block: &Block) -> Result<(BlockId, bool)> {
        let block_hash = block.hash();
        let blocks = self.database.blocks();

        let mut is_incomplete = false;
        let mut existing_parents = Vec::with_capacity(block.direct_parents().len());
        for parent in block.direct_parents() {
            let parent_exists = blocks
                .does_block_exist(conn, parent)
                .await
                .with_context(|| format!("Could not check if parent {} for block {} does exist in database", parent, block_hash))?;
            if !parent_exists {
                warn!("Parent {} for block {} does not exist in the database", parent, block_hash);
                is_incomplete = true;
                continue;
            }
            existing_parents.push(*parent);
        }

        let (parent_ids, parent_heights) = blocks
            .block_ids_and_heights_by_hashes(conn, &existing_parents)
            .await
            .with_context(|| format!("Could not resolve parent ids for block {}", block_hash))?;

        let height = parent_heights.iter().map(|h| h + 1).max().unwrap_or(0);
        let height_group_index = self
            .database
            .height_groups()
            .height_group_size(conn, height)
            .await
            .with_context(|| format!("Could not resolve group size for height {} for block {}", height, block_hash))?;

        let record = BlockRecord::structural(block_hash, block.header.timestamp, parent_ids.clone(), height, height_group_index)
            .with_daa_score(block.header.daa_score);
        let block_id =
            blocks.insert_block(conn, &record).await.with_context(|| format!("Could not insert block {}", block_hash))?;

        self.database
            .height_groups()
            .insert_or_update_height_group(conn, &HeightGroup { height, size: height_group_index + 1 })
            .await
            .with_context(|| format!("Could not insert or update height group {} for block {}", height, block_hash))?;

        for (parent_id, parent_height) in parent_ids.into_iter().zip(parent_heights) {
            let parent_height_group_index = blocks
                .block_height_group_index(conn, parent_id)
                .await
                .with_context(|| format!("Could not get height group index of parent id {} for block {}", parent_id, block_hash))?;
            let edge = Edge {
                from_block_id: block_id,
                to_block_id: parent_id,
                from_height: height,
                to_height: parent_height,
                from_height_group_index: height_group_index,
                to_height_group_index: parent_height_group_index,
            };
            self.database
                .edges()
                .insert_edge(conn, &edge)
                .await
                .with_context(|| format!("Could not insert edge from block {} to parent id {}", block_hash, parent_id))?;
        }

        Ok((block_id, is_incomplete))
    }

    async fn store_ghostdag_data(&self, conn: &mut SqliteConnection, block_hash: Hash, block_id: BlockId) -> Result<()> {
        let blocks = self.database.blocks();
        let ghostdag_data = self
            .consensus
            .get_block_ghostdag_data(block_hash)
            .await
            .with_context(|| format!("Could not get GHOSTDAG data for block {}", block_hash))?;

        let selected_parent_id = blocks
            .find_block_id(conn, &ghostdag_data.selected_parent)
            .await
            .with_context(|| format!("Could not get selected parent block id for block {}", block_hash))?;
        if selected_parent_id.is_none() {
            error!("Selected parent {} of block {} is not in the database", ghostdag_data.selected_parent, block_hash);
        }
        blocks
            .update_block_selected_parent(conn, block_id, selected_parent_id)
            .await
            .with_context(|| format!("Could not update selected parent for block {}", block_hash))?;

        let (merge_set_red_ids, missing_reds) = blocks
            .find_block_ids(conn, &ghostdag_data.mergeset_reds)
            .await
            .with_context(|| format!("Could not get ids of merge set reds for block {}", block_hash))?;
        if !missing_reds.is_empty() {
            error!("Could not get ids of merge set reds for block {}: {:?}", block_hash, missing_reds);
        }
        let (merge_set_blue_ids, missing_blues) = blocks
            .find_block_ids(conn, &ghostdag_data.mergeset_blues)
            .await
            .with_context(|| format!("Could not get ids of merge set blues for block {}", block_hash))?;
        if !missing_blues.is_empty() {
            error!("Could not get ids of merge set blues for block {}: {:?}", block_hash, missing_blues);
        }

        blocks
            .update_block_merge_set(conn, block_id, &merge_set_red_ids, &merge_set_blue_ids)
            .await
            .with_context(|| format!("Could not update merge sets colors for block {}", block_hash))?;
        Ok(())
    }
}
