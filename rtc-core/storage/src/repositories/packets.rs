use sqlx::SqlitePool;
use tracing::debug;

use crate::error::Result;
use crate::models::PacketTemplateRecord;

/// 报文模板仓储
pub struct PacketRepository {
    pool: SqlitePool,
}

impl PacketRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 保存模板（同名覆盖）
    pub async fn upsert(
        &self,
        name: &str,
        code: &str,
        attributes_json: &str,
        description: Option<&str>,
    ) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO packet_templates (name, code, attributes, description)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(name) DO UPDATE SET
                code = excluded.code,
                attributes = excluded.attributes,
                description = excluded.description,
                updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(name)
        .bind(code)
        .bind(attributes_json)
        .bind(description)
        .execute(&self.pool)
        .await?;

        debug!("Upserted packet template: {}", name);
        Ok(result.last_insert_rowid())
    }

    /// 根据名称获取模板
    pub async fn get_by_name(&self, name: &str) -> Result<Option<PacketTemplateRecord>> {
        let record = sqlx::query_as::<_, PacketTemplateRecord>(
            r#"
            SELECT id, name, code, attributes, description, created_at, updated_at
            FROM packet_templates
            WHERE name = ?
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// 列出所有模板
    pub async fn list(&self) -> Result<Vec<PacketTemplateRecord>> {
        let records = sqlx::query_as::<_, PacketTemplateRecord>(
            r#"
            SELECT id, name, code, attributes, description, created_at, updated_at
            FROM packet_templates
            ORDER BY name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}
