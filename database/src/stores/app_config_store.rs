use sqlx::SqliteConnection;

use crate::errors::DbResult;
use crate::model::AppConfig;

pub struct AppConfigStore;

impl AppConfigStore {
    /// Writes the single app config row, replacing any previous one
    pub async fn store_app_config(&self, conn: &mut SqliteConnection, app_config: &AppConfig) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO app_config (id, engine_version, processing_version, network)
            VALUES (TRUE, ?, ?, ?)
            ON CONFLICT (id) DO UPDATE SET
                engine_version = EXCLUDED.engine_version,
                processing_version = EXCLUDED.processing_version,
                network = EXCLUDED.network
            "#,
        )
        .bind(&app_config.engine_version)
        .bind(&app_config.processing_version)
        .bind(&app_config.network)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    pub async fn get_app_config(&self, conn: &mut SqliteConnection) -> DbResult<Option<AppConfig>> {
        Ok(sqlx::query_as::<_, AppConfig>(
            "SELECT engine_version, processing_version, network FROM app_config WHERE id = TRUE",
        )
        .fetch_optional(&mut *conn)
        .await?)
    }
}
