//! Rows of the derived graph

use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};
use std::fmt;
use std::str::FromStr;

use consensus_core::Hash;

use crate::errors::DbError;

/// Sequential id assigned to a block on insertion
pub type BlockId = i64;

/// Consensus coloring of a block as last reported by the engine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockColor {
    #[default]
    Gray,
    Red,
    Blue,
}

impl BlockColor {
    pub fn as_str(self) -> &'static str {
        match self {
            BlockColor::Gray => "gray",
            BlockColor::Red => "red",
            BlockColor::Blue => "blue",
        }
    }
}

impl fmt::Display for BlockColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BlockColor {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gray" => Ok(BlockColor::Gray),
            "red" => Ok(BlockColor::Red),
            "blue" => Ok(BlockColor::Blue),
            other => Err(DbError::InvalidData(format!("unknown block color {}", other))),
        }
    }
}

/// A block of the derived graph.
///
/// `id` is zero until the record has been inserted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRecord {
    pub id: BlockId,
    pub block_hash: Hash,
    pub timestamp: u64,
    pub parent_ids: Vec<BlockId>,
    pub height: u64,
    pub height_group_index: u64,
    pub selected_parent_id: Option<BlockId>,
    pub color: BlockColor,
    pub is_in_virtual_selected_parent_chain: bool,
    pub merge_set_red_ids: Vec<BlockId>,
    pub merge_set_blue_ids: Vec<BlockId>,
    pub daa_score: u64,
}

impl BlockRecord {
    /// A structural-only record: gray, off the chain, without GHOSTDAG data
    pub fn structural(block_hash: Hash, timestamp: u64, parent_ids: Vec<BlockId>, height: u64, height_group_index: u64) -> Self {
        Self {
            id: 0,
            block_hash,
            timestamp,
            parent_ids,
            height,
            height_group_index,
            selected_parent_id: None,
            color: BlockColor::Gray,
            is_in_virtual_selected_parent_chain: false,
            merge_set_red_ids: Vec::new(),
            merge_set_blue_ids: Vec::new(),
            daa_score: 0,
        }
    }

    pub fn with_daa_score(mut self, daa_score: u64) -> Self {
        self.daa_score = daa_score;
        self
    }
}

fn decode_ids(column: &str, raw: &str) -> Result<Vec<BlockId>, sqlx::Error> {
    serde_json::from_str(raw).map_err(|e| sqlx::Error::ColumnDecode { index: column.to_string(), source: Box::new(e) })
}

impl<'r> FromRow<'r, SqliteRow> for BlockRecord {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let block_hash: String = row.try_get("block_hash")?;
        let block_hash = Hash::from_str(&block_hash)
            .map_err(|e| sqlx::Error::ColumnDecode { index: "block_hash".into(), source: Box::new(e) })?;
        let color: String = row.try_get("color")?;
        let color = BlockColor::from_str(&color)
            .map_err(|e| sqlx::Error::ColumnDecode { index: "color".into(), source: Box::new(e) })?;
        let parent_ids: String = row.try_get("parent_ids")?;
        let merge_set_red_ids: String = row.try_get("merge_set_red_ids")?;
        let merge_set_blue_ids: String = row.try_get("merge_set_blue_ids")?;

        Ok(Self {
            id: row.try_get("id")?,
            block_hash,
            timestamp: row.try_get::<i64, _>("timestamp")? as u64,
            parent_ids: decode_ids("parent_ids", &parent_ids)?,
            height: row.try_get::<i64, _>("height")? as u64,
            height_group_index: row.try_get::<i64, _>("height_group_index")? as u64,
            selected_parent_id: row.try_get("selected_parent_id")?,
            color,
            is_in_virtual_selected_parent_chain: row.try_get("is_in_virtual_selected_parent_chain")?,
            merge_set_red_ids: decode_ids("merge_set_red_ids", &merge_set_red_ids)?,
            merge_set_blue_ids: decode_ids("merge_set_blue_ids", &merge_set_blue_ids)?,
            daa_score: row.try_get::<i64, _>("daa_score")? as u64,
        })
    }
}

/// Edge from a block to one of its parents, with both endpoints' layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub from_block_id: BlockId,
    pub to_block_id: BlockId,
    pub from_height: u64,
    pub to_height: u64,
    pub from_height_group_index: u64,
    pub to_height_group_index: u64,
}

impl<'r> FromRow<'r, SqliteRow> for Edge {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            from_block_id: row.try_get("from_block_id")?,
            to_block_id: row.try_get("to_block_id")?,
            from_height: row.try_get::<i64, _>("from_height")? as u64,
            to_height: row.try_get::<i64, _>("to_height")? as u64,
            from_height_group_index: row.try_get::<i64, _>("from_height_group_index")? as u64,
            to_height_group_index: row.try_get::<i64, _>("to_height_group_index")? as u64,
        })
    }
}

/// Number of blocks sharing a height
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeightGroup {
    pub height: u64,
    pub size: u64,
}

/// Identity of the process that owns the database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct AppConfig {
    pub engine_version: String,
    pub processing_version: String,
    pub network: String,
}
