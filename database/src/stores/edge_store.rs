use sqlx::SqliteConnection;

use crate::errors::DbResult;
use crate::model::{BlockId, Edge};

pub struct EdgeStore;

impl EdgeStore {
    pub async fn insert_edge(&self, conn: &mut SqliteConnection, edge: &Edge) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO edges (
                from_block_id, to_block_id, from_height, to_height,
                from_height_group_index, to_height_group_index
            ) VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(edge.from_block_id)
        .bind(edge.to_block_id)
        .bind(edge.from_height as i64)
        .bind(edge.to_height as i64)
        .bind(edge.from_height_group_index as i64)
        .bind(edge.to_height_group_index as i64)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    /// Edges leaving `block_id`, i.e. towards its parents
    pub async fn edges_from(&self, conn: &mut SqliteConnection, block_id: BlockId) -> DbResult<Vec<Edge>> {
        Ok(sqlx::query_as::<_, Edge>("SELECT * FROM edges WHERE from_block_id = ? ORDER BY to_block_id")
            .bind(block_id)
            .fetch_all(&mut *conn)
            .await?)
    }

    pub async fn count(&self, conn: &mut SqliteConnection) -> DbResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM edges").fetch_one(&mut *conn).await?;
        Ok(count as u64)
    }
}
