use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

use consensus_core::network::NetworkType;

use crate::cli::Args;
use crate::error::{ProcessingError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub network: NetworkType,
    pub log_level: String,
    pub database: DatabaseConfig,
    pub rpc: RpcConfig,
    pub processing: ProcessingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    /// Number of blocks kept in the lookup cache
    pub cache_capacity: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcConfig {
    pub url: String,
}

/// Startup behavior of the processing engine
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// Rebuild the graph from the pruning point even if it is already stored
    pub clear_db: bool,
    /// Replay the whole pruning point to tip range instead of resuming
    pub resync: bool,
}

impl Config {
    /// Load configuration from file if it exists, otherwise use defaults
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let content = fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| ProcessingError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Load default configuration for network
    pub fn for_network(network: &str) -> Result<Self> {
        let network: NetworkType = network.parse().map_err(|e| ProcessingError::Config(format!("{}", e)))?;
        let mut config = Config { network, ..Config::default() };
        config.database.path = PathBuf::from(format!("./data/graph-inspector-{}.db", network));
        Ok(config)
    }

    /// Override config with environment variables
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("DATABASE_URL") {
            self.database.path = PathBuf::from(url.trim_start_matches("sqlite:"));
        }
        if let Ok(url) = std::env::var("ENGINE_RPC_URL") {
            self.rpc.url = url;
        }
    }

    /// Override config with CLI arguments
    pub fn apply_cli_overrides(&mut self, args: &Args) -> Result<()> {
        if let Some(network) = &args.network {
            self.network = network.parse().map_err(|e| ProcessingError::Config(format!("{}", e)))?;
        }
        if let Some(path) = &args.database_path {
            self.database.path = path.clone();
        }
        if let Some(url) = &args.rpc_url {
            self.rpc.url = url.clone();
        }
        if let Some(level) = &args.log_level {
            self.log_level = level.clone();
        }
        if args.clear_db {
            self.processing.clear_db = true;
        }
        if args.resync {
            self.processing.resync = true;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.rpc.url).map_err(|e| ProcessingError::Config(format!("Invalid RPC url {}: {}", self.rpc.url, e)))?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(ProcessingError::Config(format!("RPC url {} must use ws:// or wss://", self.rpc.url)));
        }
        if self.database.path.as_os_str().is_empty() {
            return Err(ProcessingError::Config("Database path is empty".to_string()));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            network: NetworkType::Mainnet,
            log_level: "info".to_string(),
            database: DatabaseConfig {
                path: PathBuf::from("./data/graph-inspector.db"),
                cache_capacity: database::db::DEFAULT_CACHE_CAPACITY,
            },
            rpc: RpcConfig { url: "ws://localhost:16110".to_string() },
            processing: ProcessingConfig::default(),
        }
    }
}
