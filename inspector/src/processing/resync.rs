use sqlx::SqliteConnection;
use std::collections::HashMap;
use tracing::info;

use consensus_core::block::Block;
use consensus_core::Hash;
use database::{BlockId, BlockRecord, HeightGroup};

use super::Processing;
use crate::error::{Result, ResultExt};

/// Number of already stored blocks replayed again when resuming, roughly ten
/// minutes of blocks, so that mutations missed while stopped are applied
pub const RESYNC_SAFETY_MARGIN: usize = 600;

/// Blocks between two progress reports of the replay
const PROGRESS_INTERVAL: usize = 1000;

/// Index in the pruning point to tip sequence to resume replaying from, given
/// the length of its prefix already stored
pub fn resume_index(stored_prefix: usize) -> usize {
    stored_prefix.saturating_sub(RESYNC_SAFETY_MARGIN)
}

impl Processing {
    pub(crate) async fn resync_database_in(&self, conn: &mut SqliteConnection) -> Result<()> {
        info!("Resyncing database");

        let pruning_point = self.consensus.get_pruning_point().await.context("Could not get pruning point")?;
        let pruning_block = self
            .consensus
            .get_block(pruning_point)
            .await
            .with_context(|| format!("Could not get pruning point block {}", pruning_point))?;

        let has_pruning_block = self
            .database
            .blocks()
            .does_block_exist(conn, &pruning_point)
            .await
            .with_context(|| format!("Could not check if pruning point {} exists", pruning_point))?;

        let keep_database = has_pruning_block && !self.config.clear_db;
        if keep_database {
            info!("Pruning point {} already in the database", pruning_point);
            info!("Database kept");
            let pruning_height = self
                .database
                .blocks()
                .block_height_by_hash(conn, &pruning_point)
                .await
                .with_context(|| format!("Could not get height of pruning point {}", pruning_point))?;
            info!("Loading cache");
            self.database.load_cache(conn, pruning_height).await.context("Could not load cache")?;
            info!("Cache loaded from the database");
        } else {
            self.rebuild_from_pruning_point(conn, &pruning_block).await?;
        }

        let headers_selected_tip = self.consensus.get_headers_selected_tip().await.context("Could not get headers selected tip")?;
        info!("Load node blocks");
        let hashes = self
            .consensus
            .get_hashes_between(pruning_point, headers_selected_tip, 0)
            .await
            .with_context(|| format!("Could not get hashes between {} and {}", pruning_point, headers_selected_tip))?;
        info!("Node blocks loaded");

        let mut start_index = 0;
        if keep_database {
            self.migrate_daa_scores(conn, &pruning_point, &hashes).await?;

            info!("Syncing {} blocks with the database", hashes.len());
            if !self.config.resync {
                let stored_prefix = self
                    .database
                    .blocks()
                    .find_latest_stored_block_index(conn, &hashes)
                    .await
                    .context("Could not find latest stored block")?;
                info!("First {} blocks already exist in the database", stored_prefix);
                start_index = resume_index(stored_prefix);
            }
        } else {
            info!("Adding {} blocks to the database", hashes.len());
        }

        let total = hashes.len() - start_index;
        for (i, hash) in hashes.iter().enumerate().skip(start_index) {
            let block = self
                .consensus
                .get_block_even_if_header_only(*hash)
                .await
                .with_context(|| format!("Could not get block {}", hash))?;
            self.process_block_and_dependencies(conn, *hash, block, Some(&pruning_block)).await?;

            let added = i + 1 - start_index;
            if added % PROGRESS_INTERVAL == 0 || added == total {
                info!("Added {}/{} blocks to the database", added, total);
            }
        }

        self.resync_virtual_selected_parent_chain_in(conn, false).await?;
        info!("Finished resyncing database");
        Ok(())
    }

    /// Empties the database and stores the pruning point as the root of the graph
    async fn rebuild_from_pruning_point(&self, conn: &mut SqliteConnection, pruning_block: &Block) -> Result<()> {
        let pruning_point = pruning_block.hash();
        self.database.clear(conn).await.context("Could not clear database")?;
        info!("Database cleared");

        let mut root = BlockRecord::structural(pruning_point, pruning_block.header.timestamp, Vec::new(), 0, 0)
            .with_daa_score(pruning_block.header.daa_score);
        // Reference point of the first chain resync
        root.is_in_virtual_selected_parent_chain = true;
        self.database
            .blocks()
            .insert_block(conn, &root)
            .await
            .with_context(|| format!("Could not insert pruning point {}", pruning_point))?;
        self.database
            .height_groups()
            .insert_or_update_height_group(conn, &HeightGroup { height: 0, size: 1 })
            .await
            .context("Could not store height group of pruning point")?;
        info!("Pruning point {} has been added to the database", pruning_point);
        Ok(())
    }

    /// Backfills DAA scores of a database created before they were recorded
    async fn migrate_daa_scores(&self, conn: &mut SqliteConnection, pruning_point: &Hash, hashes: &[Hash]) -> Result<()> {
        let blocks = self.database.blocks();
        let pruning_id = blocks
            .block_id_by_hash(conn, pruning_point)
            .await
            .with_context(|| format!("Could not get id of pruning point {}", pruning_point))?;
        let pruning_record =
            blocks.get_block(conn, pruning_id).await.with_context(|| format!("Could not get pruning point block {}", pruning_id))?;
        let without_daa_score = blocks.block_count_at_daa_score(conn, 0).await.context("Could not count blocks without DAA score")?;
        if pruning_record.daa_score != 0 || without_daa_score <= u64::from(self.params.ghostdag_k) {
            return Ok(());
        }

        info!("Updating DAA score of {} blocks in the database", hashes.len());
        let mut daa_scores: HashMap<BlockId, u64> = HashMap::new();
        for hash in hashes {
            let header = self
                .consensus
                .get_block_header(*hash)
                .await
                .with_context(|| format!("Could not get header of block {}", hash))?;
            // Blocks the database does not hold yet get their score on insertion
            if let Some(id) = blocks.find_block_id(conn, hash).await.with_context(|| format!("Could not get id of block {}", hash))? {
                daa_scores.insert(id, header.daa_score);
            }
        }
        info!("DAA scores of {} blocks collected", daa_scores.len());
        blocks.update_block_daa_scores(conn, &daa_scores).await.context("Could not update DAA scores")?;
        info!("DAA scores of {} blocks stored in the database", daa_scores.len());
        Ok(())
    }
}
