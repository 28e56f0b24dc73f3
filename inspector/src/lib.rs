//! Graph inspector
//!
//! Mirrors the block DAG of a consensus engine into a SQLite graph database:
//! block ancestry, per-height layout, GHOSTDAG coloring and the virtual
//! selected parent chain.

pub mod cli;
pub mod config;
pub mod error;
pub mod processing;

pub use config::Config;
pub use error::{ProcessingError, Result};
pub use processing::{EventIngestor, Processing};
