use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use std::collections::HashMap;
use std::sync::Arc;

use consensus_core::Hash;

use crate::cache::{BlockCache, CachedBlock};
use crate::errors::{DbError, DbResult};
use crate::model::{BlockColor, BlockId, BlockRecord};

/// Upper bound of bound parameters per batched lookup
const LOOKUP_CHUNK_SIZE: usize = 500;

#[derive(sqlx::FromRow)]
struct LayoutRow {
    id: i64,
    block_hash: String,
    height: i64,
    height_group_index: i64,
}

impl LayoutRow {
    fn into_cached(self) -> DbResult<(Hash, CachedBlock)> {
        let hash = self.block_hash.parse::<Hash>().map_err(|e| DbError::InvalidData(e.to_string()))?;
        Ok((hash, CachedBlock { id: self.id, height: self.height as u64, height_group_index: self.height_group_index as u64 }))
    }
}

pub struct BlockStore {
    cache: Arc<BlockCache>,
}

impl BlockStore {
    pub fn new(cache: Arc<BlockCache>) -> Self {
        Self { cache }
    }

    /// Layout of the block with the given hash, from the cache or the database
    async fn lookup(&self, conn: &mut SqliteConnection, hash: &Hash) -> DbResult<Option<CachedBlock>> {
        if let Some(cached) = self.cache.get(hash) {
            return Ok(Some(cached));
        }
        let row = sqlx::query_as::<_, LayoutRow>(
            "SELECT id, block_hash, height, height_group_index FROM blocks WHERE block_hash = ?",
        )
        .bind(hash.to_string())
        .fetch_optional(&mut *conn)
        .await?;

        match row {
            Some(row) => {
                let (hash, cached) = row.into_cached()?;
                self.cache.insert(hash, cached);
                Ok(Some(cached))
            }
            None => Ok(None),
        }
    }

    /// Layouts of every stored block among `hashes`, keyed by hash
    async fn lookup_many(&self, conn: &mut SqliteConnection, hashes: &[Hash]) -> DbResult<HashMap<Hash, CachedBlock>> {
        let mut found = HashMap::with_capacity(hashes.len());
        let mut missing = Vec::new();
        for hash in hashes {
            match self.cache.get(hash) {
                Some(cached) => {
                    found.insert(*hash, cached);
                }
                None => missing.push(*hash),
            }
        }

        for chunk in missing.chunks(LOOKUP_CHUNK_SIZE) {
            let mut query = QueryBuilder::<Sqlite>::new(
                "SELECT id, block_hash, height, height_group_index FROM blocks WHERE block_hash IN (",
            );
            let mut separated = query.separated(", ");
            for hash in chunk {
                separated.push_bind(hash.to_string());
            }
            separated.push_unseparated(")");

            let rows = query.build_query_as::<LayoutRow>().fetch_all(&mut *conn).await?;
            for row in rows {
                let (hash, cached) = row.into_cached()?;
                self.cache.insert(hash, cached);
                found.insert(hash, cached);
            }
        }
        Ok(found)
    }

    pub async fn does_block_exist(&self, conn: &mut SqliteConnection, hash: &Hash) -> DbResult<bool> {
        Ok(self.lookup(conn, hash).await?.is_some())
    }

    /// Inserts a new block row and returns its assigned id
    pub async fn insert_block(&self, conn: &mut SqliteConnection, block: &BlockRecord) -> DbResult<BlockId> {
        let result = sqlx::query(
            r#"
            INSERT INTO blocks (
                block_hash, timestamp, parent_ids, height, height_group_index,
                selected_parent_id, color, is_in_virtual_selected_parent_chain,
                merge_set_red_ids, merge_set_blue_ids, daa_score
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(block.block_hash.to_string())
        .bind(block.timestamp as i64)
        .bind(serde_json::to_string(&block.parent_ids)?)
        .bind(block.height as i64)
        .bind(block.height_group_index as i64)
        .bind(block.selected_parent_id)
        .bind(block.color.as_str())
        .bind(block.is_in_virtual_selected_parent_chain)
        .bind(serde_json::to_string(&block.merge_set_red_ids)?)
        .bind(serde_json::to_string(&block.merge_set_blue_ids)?)
        .bind(block.daa_score as i64)
        .execute(&mut *conn)
        .await?;

        let id = result.last_insert_rowid();
        self.cache.insert(
            block.block_hash,
            CachedBlock { id, height: block.height, height_group_index: block.height_group_index },
        );
        Ok(id)
    }

    pub async fn get_block(&self, conn: &mut SqliteConnection, id: BlockId) -> DbResult<BlockRecord> {
        sqlx::query_as::<_, BlockRecord>("SELECT * FROM blocks WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("block id {}", id)))
    }

    pub async fn get_block_by_hash(&self, conn: &mut SqliteConnection, hash: &Hash) -> DbResult<Option<BlockRecord>> {
        Ok(sqlx::query_as::<_, BlockRecord>("SELECT * FROM blocks WHERE block_hash = ?")
            .bind(hash.to_string())
            .fetch_optional(&mut *conn)
            .await?)
    }

    /// Id of the block, `None` when the block is not stored
    pub async fn find_block_id(&self, conn: &mut SqliteConnection, hash: &Hash) -> DbResult<Option<BlockId>> {
        Ok(self.lookup(conn, hash).await?.map(|cached| cached.id))
    }

    pub async fn block_id_by_hash(&self, conn: &mut SqliteConnection, hash: &Hash) -> DbResult<BlockId> {
        self.find_block_id(conn, hash).await?.ok_or_else(|| DbError::NotFound(format!("block {}", hash)))
    }

    pub async fn block_height_by_hash(&self, conn: &mut SqliteConnection, hash: &Hash) -> DbResult<u64> {
        self.lookup(conn, hash)
            .await?
            .map(|cached| cached.height)
            .ok_or_else(|| DbError::NotFound(format!("block {}", hash)))
    }

    /// Resolves `hashes` to ids, preserving input order.
    ///
    /// Returns the resolved ids along with the hashes that are not stored.
    pub async fn find_block_ids(&self, conn: &mut SqliteConnection, hashes: &[Hash]) -> DbResult<(Vec<BlockId>, Vec<Hash>)> {
        let found = self.lookup_many(conn, hashes).await?;
        let mut ids = Vec::with_capacity(hashes.len());
        let mut missing = Vec::new();
        for hash in hashes {
            match found.get(hash) {
                Some(cached) => ids.push(cached.id),
                None => missing.push(*hash),
            }
        }
        Ok((ids, missing))
    }

    /// Ids and heights of `hashes`, in input order. Every hash must be stored.
    pub async fn block_ids_and_heights_by_hashes(
        &self,
        conn: &mut SqliteConnection,
        hashes: &[Hash],
    ) -> DbResult<(Vec<BlockId>, Vec<u64>)> {
        let found = self.lookup_many(conn, hashes).await?;
        let mut ids = Vec::with_capacity(hashes.len());
        let mut heights = Vec::with_capacity(hashes.len());
        for hash in hashes {
            let cached = found.get(hash).ok_or_else(|| DbError::NotFound(format!("block {}", hash)))?;
            ids.push(cached.id);
            heights.push(cached.height);
        }
        Ok((ids, heights))
    }

    pub async fn block_height(&self, conn: &mut SqliteConnection, id: BlockId) -> DbResult<u64> {
        let height: Option<i64> = sqlx::query_scalar("SELECT height FROM blocks WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        height.map(|h| h as u64).ok_or_else(|| DbError::NotFound(format!("block id {}", id)))
    }

    pub async fn block_height_group_index(&self, conn: &mut SqliteConnection, id: BlockId) -> DbResult<u64> {
        let index: Option<i64> = sqlx::query_scalar("SELECT height_group_index FROM blocks WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        index.map(|i| i as u64).ok_or_else(|| DbError::NotFound(format!("block id {}", id)))
    }

    pub async fn update_block_selected_parent(
        &self,
        conn: &mut SqliteConnection,
        id: BlockId,
        selected_parent_id: Option<BlockId>,
    ) -> DbResult<()> {
        sqlx::query("UPDATE blocks SET selected_parent_id = ? WHERE id = ?")
            .bind(selected_parent_id)
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    pub async fn update_block_merge_set(
        &self,
        conn: &mut SqliteConnection,
        id: BlockId,
        merge_set_red_ids: &[BlockId],
        merge_set_blue_ids: &[BlockId],
    ) -> DbResult<()> {
        sqlx::query("UPDATE blocks SET merge_set_red_ids = ?, merge_set_blue_ids = ? WHERE id = ?")
            .bind(serde_json::to_string(merge_set_red_ids)?)
            .bind(serde_json::to_string(merge_set_blue_ids)?)
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    pub async fn update_blocks_in_virtual_selected_parent_chain(
        &self,
        conn: &mut SqliteConnection,
        membership: &HashMap<BlockId, bool>,
    ) -> DbResult<()> {
        for (id, is_member) in membership {
            sqlx::query("UPDATE blocks SET is_in_virtual_selected_parent_chain = ? WHERE id = ?")
                .bind(*is_member)
                .bind(*id)
                .execute(&mut *conn)
                .await?;
        }
        Ok(())
    }

    pub async fn update_block_colors(&self, conn: &mut SqliteConnection, colors: &HashMap<BlockId, BlockColor>) -> DbResult<()> {
        for (id, color) in colors {
            sqlx::query("UPDATE blocks SET color = ? WHERE id = ?")
                .bind(color.as_str())
                .bind(*id)
                .execute(&mut *conn)
                .await?;
        }
        Ok(())
    }

    pub async fn update_block_daa_scores(&self, conn: &mut SqliteConnection, daa_scores: &HashMap<BlockId, u64>) -> DbResult<()> {
        for (id, daa_score) in daa_scores {
            sqlx::query("UPDATE blocks SET daa_score = ? WHERE id = ?")
                .bind(*daa_score as i64)
                .bind(*id)
                .execute(&mut *conn)
                .await?;
        }
        Ok(())
    }

    pub async fn block_count_at_daa_score(&self, conn: &mut SqliteConnection, daa_score: u64) -> DbResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM blocks WHERE daa_score = ?")
            .bind(daa_score as i64)
            .fetch_one(&mut *conn)
            .await?;
        Ok(count as u64)
    }

    /// Chain member with the greatest height, ties broken by the latest id
    pub async fn highest_block_in_virtual_selected_parent_chain(
        &self,
        conn: &mut SqliteConnection,
    ) -> DbResult<Option<BlockRecord>> {
        Ok(sqlx::query_as::<_, BlockRecord>(
            r#"
            SELECT * FROM blocks
            WHERE is_in_virtual_selected_parent_chain = TRUE
            ORDER BY height DESC, id DESC
            LIMIT 1
            "#,
        )
        .fetch_optional(&mut *conn)
        .await?)
    }

    /// Length of the longest prefix of `hashes` whose blocks are all stored
    pub async fn find_latest_stored_block_index(&self, conn: &mut SqliteConnection, hashes: &[Hash]) -> DbResult<usize> {
        let mut index = 0;
        for chunk in hashes.chunks(LOOKUP_CHUNK_SIZE) {
            let found = self.lookup_many(conn, chunk).await?;
            match chunk.iter().position(|hash| !found.contains_key(hash)) {
                Some(position) => return Ok(index + position),
                None => index += chunk.len(),
            }
        }
        Ok(index)
    }

    pub async fn count(&self, conn: &mut SqliteConnection) -> DbResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM blocks").fetch_one(&mut *conn).await?;
        Ok(count as u64)
    }

    pub(crate) async fn preload(&self, conn: &mut SqliteConnection, min_height: u64) -> DbResult<usize> {
        let rows = sqlx::query_as::<_, LayoutRow>(
            "SELECT id, block_hash, height, height_group_index FROM blocks WHERE height >= ? ORDER BY height",
        )
        .bind(min_height as i64)
        .fetch_all(&mut *conn)
        .await?;

        let loaded = rows.len();
        for row in rows {
            let (hash, cached) = row.into_cached()?;
            self.cache.insert(hash, cached);
        }
        Ok(loaded)
    }
}
