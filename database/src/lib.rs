//! SQLite storage for the derived DAG graph.
//!
//! Blocks live in a flat table keyed by a sequential id, adjacency is kept in
//! a separate edge table. Every mutating call takes a connection so that the
//! caller decides the transactional scope.

pub mod cache;
pub mod db;
pub mod errors;
pub mod model;
pub mod schema;
pub mod stores;

pub use db::{Database, DbTransaction};
pub use errors::{DbError, DbResult};
pub use model::{AppConfig, BlockColor, BlockId, BlockRecord, Edge, HeightGroup};
