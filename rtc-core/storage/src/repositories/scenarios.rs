use sqlx::SqlitePool;
use tracing::debug;

use crate::error::Result;
use crate::models::ScenarioRecord;

/// 场景仓储
pub struct ScenarioRepository {
    pool: SqlitePool,
}

impl ScenarioRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 保存场景定义（同名覆盖并递增版本号）
    pub async fn upsert(
        &self,
        name: &str,
        description: Option<&str>,
        definition: &str,
        tags: Option<&str>,
    ) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO scenarios (name, description, definition, tags)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(name) DO UPDATE SET
                description = excluded.description,
                definition = excluded.definition,
                tags = excluded.tags,
                version = version + 1,
                updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(name)
        .bind(description)
        .bind(definition)
        .bind(tags)
        .execute(&self.pool)
        .await?;

        debug!("Upserted scenario: {}", name);
        Ok(result.last_insert_rowid())
    }

    /// 根据名称获取场景
    pub async fn get_by_name(&self, name: &str) -> Result<Option<ScenarioRecord>> {
        let record = sqlx::query_as::<_, ScenarioRecord>(
            r#"
            SELECT id, name, description, definition, tags, version, created_at, updated_at
            FROM scenarios
            WHERE name = ?
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// 列出所有场景
    pub async fn list(&self) -> Result<Vec<ScenarioRecord>> {
        let records = sqlx::query_as::<_, ScenarioRecord>(
            r#"
            SELECT id, name, description, definition, tags, version, created_at, updated_at
            FROM scenarios
            ORDER BY name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// 删除场景
    pub async fn delete(&self, name: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM scenarios WHERE name = ?")
            .bind(name)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
