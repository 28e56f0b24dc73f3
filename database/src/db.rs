//! Database connection management

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Sqlite, SqliteConnection, SqlitePool};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::cache::BlockCache;
use crate::errors::DbResult;
use crate::schema::MIGRATIONS;
use crate::stores::{AppConfigStore, BlockStore, EdgeStore, HeightGroupStore};

/// Transaction every mutation of the graph runs in
pub type DbTransaction = sqlx::Transaction<'static, Sqlite>;

pub const DEFAULT_CACHE_CAPACITY: usize = 1_000_000;

pub struct Database {
    pool: SqlitePool,
    cache: Arc<BlockCache>,
    blocks: BlockStore,
    edges: EdgeStore,
    height_groups: HeightGroupStore,
    app_config: AppConfigStore,
}

impl Database {
    pub async fn new(database_path: &Path) -> DbResult<Self> {
        Self::with_cache_capacity(database_path, DEFAULT_CACHE_CAPACITY).await
    }

    pub async fn with_cache_capacity(database_path: &Path, cache_capacity: usize) -> DbResult<Self> {
        // Ensure the database directory exists
        if let Some(parent) = database_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(database_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .acquire_timeout(Duration::from_secs(30))
            .connect_with(options)
            .await?;

        let cache = Arc::new(BlockCache::new(cache_capacity));
        Ok(Self {
            pool,
            blocks: BlockStore::new(cache.clone()),
            edges: EdgeStore,
            height_groups: HeightGroupStore,
            app_config: AppConfigStore,
            cache,
        })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn cache(&self) -> &BlockCache {
        &self.cache
    }

    pub fn blocks(&self) -> &BlockStore {
        &self.blocks
    }

    pub fn edges(&self) -> &EdgeStore {
        &self.edges
    }

    pub fn height_groups(&self) -> &HeightGroupStore {
        &self.height_groups
    }

    pub fn app_config(&self) -> &AppConfigStore {
        &self.app_config
    }

    pub async fn migrate(&self) -> DbResult<()> {
        for statement in MIGRATIONS {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    pub async fn begin(&self) -> DbResult<DbTransaction> {
        Ok(self.pool.begin().await?)
    }

    /// Removes every block, edge and height group. The app config row survives.
    pub async fn clear(&self, conn: &mut SqliteConnection) -> DbResult<()> {
        sqlx::query("DELETE FROM edges").execute(&mut *conn).await?;
        sqlx::query("DELETE FROM height_groups").execute(&mut *conn).await?;
        sqlx::query("DELETE FROM blocks").execute(&mut *conn).await?;
        sqlx::query("DELETE FROM sqlite_sequence WHERE name = 'blocks'").execute(&mut *conn).await?;
        self.cache.clear();
        Ok(())
    }

    /// Fills the lookup cache with every block at or above `min_height`
    pub async fn load_cache(&self, conn: &mut SqliteConnection, min_height: u64) -> DbResult<usize> {
        let loaded = self.blocks.preload(conn, min_height).await?;
        debug!("Loaded {} blocks into the cache", loaded);
        Ok(loaded)
    }
}
