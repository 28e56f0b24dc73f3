//! The processing engine keeping the graph database in step with the consensus engine

pub mod batch;
pub mod block_processor;
pub mod ingestor;
pub mod resync;
pub mod virtual_chain;

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info};

use consensus_core::block::Block;
use consensus_core::config::Params;
use consensus_core::notify::VirtualChainChanges;
use database::{AppConfig, Database, DbTransaction};
use rpc_core::RpcApi;

use crate::config::ProcessingConfig;
use crate::error::{Result, ResultExt};

pub use batch::DependencyCollector;
pub use ingestor::EventIngestor;
pub use resync::{resume_index, RESYNC_SAFETY_MARGIN};

/// Service owning every mutation of the graph database.
///
/// All public entry points are serialized by one lock and each runs in its
/// own database transaction.
pub struct Processing {
    config: ProcessingConfig,
    params: Params,
    database: Arc<Database>,
    consensus: Arc<dyn RpcApi>,
    lock: Mutex<()>,
}

impl Processing {
    pub fn new(config: ProcessingConfig, params: Params, database: Arc<Database>, consensus: Arc<dyn RpcApi>) -> Self {
        Self { config, params, database, consensus, lock: Mutex::new(()) }
    }

    /// Records the process identity and brings the database up to the engine's tip
    pub async fn initialize(&self) -> Result<()> {
        self.register_app_config().await?;
        self.resync_database().await
    }

    pub async fn register_app_config(&self) -> Result<()> {
        let _guard = self.lock.lock().await;
        info!("Registering app config");
        let server_info = self.consensus.get_server_info().await.context("Could not get engine server info")?;
        let app_config = AppConfig {
            engine_version: server_info.server_version,
            processing_version: env!("CARGO_PKG_VERSION").to_string(),
            network: self.params.network.to_string(),
        };
        if app_config.network != server_info.network {
            error!("Engine runs on network {} but the inspector is configured for {}", server_info.network, app_config.network);
        }

        let mut tx = self.database.begin().await?;
        let result: Result<()> = self.database.app_config().store_app_config(&mut tx, &app_config).await.map_err(Into::into);
        self.finish(tx, result).await?;
        info!("Finished registering app config");
        Ok(())
    }

    /// Stores `block` along with any missing ancestor, then enriches it
    pub async fn process_block(&self, block: &Block) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut tx = self.database.begin().await?;
        let result = self.process_block_and_dependencies(&mut tx, block.hash(), block.clone(), None).await;
        self.finish(tx, result).await
    }

    /// Applies a chain diff announced by the engine
    pub async fn process_virtual_change(&self, changes: &VirtualChainChanges) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut tx = self.database.begin().await?;
        let result = self.apply_virtual_change(&mut tx, changes, true).await;
        self.finish(tx, result).await
    }

    pub async fn resync_database(&self) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut tx = self.database.begin().await?;
        let result = self.resync_database_in(&mut tx).await;
        self.finish(tx, result).await
    }

    pub async fn resync_virtual_selected_parent_chain(&self) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut tx = self.database.begin().await?;
        let result = self.resync_virtual_selected_parent_chain_in(&mut tx, false).await;
        self.finish(tx, result).await
    }

    /// Like [`Processing::resync_virtual_selected_parent_chain`], but first stores the new
    /// virtual selected parent with its missing ancestors
    pub async fn resync_virtual_selected_parent_chain_with_dependencies(&self) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut tx = self.database.begin().await?;
        let result = self.resync_virtual_selected_parent_chain_in(&mut tx, true).await;
        self.finish(tx, result).await
    }

    /// Commits on success. On failure the transaction is rolled back and the
    /// lookup cache, which may hold rows of the rolled back transaction, is dropped.
    async fn finish<T>(&self, tx: DbTransaction, result: Result<T>) -> Result<T> {
        match result {
            Ok(value) => {
                if let Err(err) = tx.commit().await {
                    self.database.cache().clear();
                    return Err(err).context("Could not commit transaction");
                }
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    error!("Could not roll back transaction: {}", rollback_err);
                }
                self.database.cache().clear();
                Err(err)
            }
        }
    }
}
