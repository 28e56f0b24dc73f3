use sqlx::SqliteConnection;

use crate::errors::DbResult;
use crate::model::HeightGroup;

pub struct HeightGroupStore;

impl HeightGroupStore {
    /// Number of blocks at `height`, zero for a height never seen
    pub async fn height_group_size(&self, conn: &mut SqliteConnection, height: u64) -> DbResult<u64> {
        let size: Option<i64> = sqlx::query_scalar("SELECT size FROM height_groups WHERE height = ?")
            .bind(height as i64)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(size.unwrap_or(0) as u64)
    }

    pub async fn height_group(&self, conn: &mut SqliteConnection, height: u64) -> DbResult<Option<HeightGroup>> {
        let size: Option<i64> = sqlx::query_scalar("SELECT size FROM height_groups WHERE height = ?")
            .bind(height as i64)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(size.map(|size| HeightGroup { height, size: size as u64 }))
    }

    pub async fn insert_or_update_height_group(&self, conn: &mut SqliteConnection, group: &HeightGroup) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO height_groups (height, size) VALUES (?, ?)
            ON CONFLICT (height) DO UPDATE SET size = EXCLUDED.size
            "#,
        )
        .bind(group.height as i64)
        .bind(group.size as i64)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }
}
