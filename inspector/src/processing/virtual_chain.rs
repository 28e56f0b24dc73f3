use sqlx::SqliteConnection;
use std::collections::HashMap;
use tracing::{debug, error, info};

use consensus_core::notify::VirtualChainChanges;
use consensus_core::Hash;
use database::{BlockColor, BlockId};

use super::Processing;
use crate::error::{Result, ResultExt};

impl Processing {
    /// Applies a chain diff: removed blocks leave the chain and turn gray, added
    /// blocks join it and their merge sets are colored.
    ///
    /// With `with_dependencies` every block missing from the database is
    /// reported as an inconsistency, otherwise it is silently skipped.
    pub(crate) async fn apply_virtual_change(
        &self,
        conn: &mut SqliteConnection,
        changes: &VirtualChainChanges,
        with_dependencies: bool,
    ) -> Result<()> {
        if changes.is_empty() {
            return Ok(());
        }

        let mut block_colors: HashMap<BlockId, BlockColor> = HashMap::new();
        let mut chain_membership: HashMap<BlockId, bool> = HashMap::new();

        for removed in &changes.removed {
            if let Some(id) = self.resolve(conn, removed, "removed", with_dependencies).await? {
                block_colors.insert(id, BlockColor::Gray);
                chain_membership.insert(id, false);
            }
        }
        for added in &changes.added {
            if let Some(id) = self.resolve(conn, added, "added", with_dependencies).await? {
                chain_membership.insert(id, true);
            }
        }
        self.database
            .blocks()
            .update_blocks_in_virtual_selected_parent_chain(conn, &chain_membership)
            .await
            .context("Could not update blocks in virtual selected parent chain")?;

        for added in &changes.added {
            let ghostdag_data = self
                .consensus
                .get_block_ghostdag_data(*added)
                .await
                .with_context(|| format!("Could not get GHOSTDAG data for added block {}", added))?;

            for blue in &ghostdag_data.mergeset_blues {
                if let Some(id) = self.resolve(conn, blue, "merge set blue", with_dependencies).await? {
                    block_colors.insert(id, BlockColor::Blue);
                }
            }
            for red in &ghostdag_data.mergeset_reds {
                if let Some(id) = self.resolve(conn, red, "merge set red", with_dependencies).await? {
                    block_colors.insert(id, BlockColor::Red);
                }
            }
        }

        debug!("Updating {} chain memberships and {} colors", chain_membership.len(), block_colors.len());
        self.database.blocks().update_block_colors(conn, &block_colors).await.context("Could not update block colors")?;
        Ok(())
    }

    async fn resolve(&self, conn: &mut SqliteConnection, hash: &Hash, role: &str, with_dependencies: bool) -> Result<Option<BlockId>> {
        let id = self
            .database
            .blocks()
            .find_block_id(conn, hash)
            .await
            .with_context(|| format!("Could not look up {} block {}", role, hash))?;
        if id.is_none() && with_dependencies {
            error!("Could not get id of {} block {}", role, hash);
        }
        Ok(id)
    }

    /// Recomputes the chain diff from the highest stored chain block and applies it.
    ///
    /// The pass is abandoned, without failing, when there is no reference block
    /// or the engine cannot compute the diff from it.
    pub(crate) async fn resync_virtual_selected_parent_chain_in(
        &self,
        conn: &mut SqliteConnection,
        with_dependencies: bool,
    ) -> Result<()> {
        info!("Resyncing virtual selected parent chain");

        let highest = self
            .database
            .blocks()
            .highest_block_in_virtual_selected_parent_chain(conn)
            .await
            .context("Could not get highest block in virtual selected parent chain")?;
        let Some(highest) = highest else {
            error!("No block of the virtual selected parent chain is in the database");
            return Ok(());
        };
        let highest_hash = highest.block_hash;
        info!("Resyncing virtual selected parent chain from block {}", highest_hash);

        let changes = match self.consensus.get_virtual_selected_parent_chain_from_block(highest_hash).await {
            Ok(changes) => changes,
            Err(err) if err.is_not_found() => {
                // The engine's database is older than ours
                error!("Could not get virtual selected parent chain from block {}: {}", highest_hash, err);
                return Ok(());
            }
            Err(err) => {
                error!("Virtual selected parent chain resync from block {} abandoned: {}", highest_hash, err);
                return Ok(());
            }
        };

        if let Some(virtual_selected_parent) = changes.added.last().copied() {
            if with_dependencies {
                let block = self
                    .consensus
                    .get_block(virtual_selected_parent)
                    .await
                    .with_context(|| format!("Could not get virtual selected parent block {}", virtual_selected_parent))?;
                self.process_block_and_dependencies(conn, virtual_selected_parent, block, None).await?;
            }
            self.apply_virtual_change(conn, &changes, with_dependencies).await?;
            info!("Updated the virtual selected parent chain");
        }

        info!("Finished resyncing virtual selected parent chain");
        Ok(())
    }
}
