use anyhow::Context;
use std::process;
use std::sync::Arc;
use tracing::{error, info};

use consensus_core::config::Params;
use database::Database;
use graph_inspector::{cli, Config, EventIngestor, Processing};
use rpc_core::{NotificationApi, RpcApi, RpcClient};

#[tokio::main]
async fn main() {
    let args = cli::parse_args();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {:#}", e);
            process::exit(1);
        }
    };

    init_logging(&config.log_level);
    info!("Starting graph inspector {} on {}", env!("CARGO_PKG_VERSION"), config.network);

    if let Err(e) = run(config).await {
        error!("Graph inspector error: {:#}", e);
        process::exit(1);
    }

    info!("Graph inspector stopped");
}

fn load_config(args: &cli::Args) -> anyhow::Result<Config> {
    let mut config = match (&args.config_path, &args.network) {
        (Some(path), _) => Config::load(path)?,
        (None, Some(network)) => Config::for_network(network)?,
        (None, None) => Config::default(),
    };
    config.apply_env_overrides();
    config.apply_cli_overrides(args)?;
    config.validate()?;
    Ok(config)
}

fn init_logging(log_level: &str) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    fmt().with_env_filter(filter).with_target(true).with_thread_ids(true).init();
}

async fn run(config: Config) -> anyhow::Result<()> {
    info!("Database path: {:?}", config.database.path);
    let database = Arc::new(Database::with_cache_capacity(&config.database.path, config.database.cache_capacity).await?);
    database.migrate().await.context("Database migration failed")?;
    info!("Database migrations completed");

    info!("Connecting to the consensus engine at {}", config.rpc.url);
    let client = Arc::new(RpcClient::new(&config.rpc.url)?);
    // Subscribe before resyncing, events raised meanwhile wait in the channel
    let events = client.start_notify().await.context("Could not subscribe to engine notifications")?;

    let consensus: Arc<dyn RpcApi> = client;
    let processing = Arc::new(Processing::new(config.processing.clone(), Params::from(config.network), database, consensus));
    processing.initialize().await?;

    let ingestor = EventIngestor::new(processing);
    ingestor.spawn(events).await.context("Event ingestor task panicked")??;
    Ok(())
}
