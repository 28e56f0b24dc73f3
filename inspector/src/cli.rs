use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Default)]
#[command(name = "graph-inspector")]
#[command(about = "Mirrors the consensus engine's block DAG into a graph database", long_about = None)]
pub struct Args {
    /// Path to configuration file (optional, uses defaults if not provided)
    #[arg(short, long)]
    pub config_path: Option<PathBuf>,

    /// SQLite database file
    #[arg(short, long)]
    pub database_path: Option<PathBuf>,

    /// Consensus engine RPC url (ws:// or wss://)
    #[arg(short, long)]
    pub rpc_url: Option<String>,

    /// Network (mainnet, testnet, devnet, simnet)
    #[arg(short, long)]
    pub network: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// Clear the database and rebuild it from the pruning point
    #[arg(long)]
    pub clear_db: bool,

    /// Replay every block from the pruning point even if the database is kept
    #[arg(long)]
    pub resync: bool,
}

pub fn parse_args() -> Args {
    Args::parse()
}
