use sqlx::SqlitePool;
use tracing::debug;

use crate::error::Result;
use crate::models::ResultSummaryRecord;

/// 执行结果汇总仓储
pub struct SummaryRepository {
    pool: SqlitePool,
}

impl SummaryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 创建结果汇总
    pub async fn create(&self, summary: &ResultSummaryRecord) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO result_summaries
            (execution_id, total_steps, success_count, failed_count, skipped_count,
             duration_ms, passed)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(summary.execution_id)
        .bind(summary.total_steps)
        .bind(summary.success_count)
        .bind(summary.failed_count)
        .bind(summary.skipped_count)
        .bind(summary.duration_ms)
        .bind(summary.passed)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        debug!("Created result summary with ID: {}", id);
        Ok(id)
    }

    /// 根据执行 ID 获取汇总
    pub async fn get_by_execution(&self, execution_id: i64) -> Result<Option<ResultSummaryRecord>> {
        let record = sqlx::query_as::<_, ResultSummaryRecord>(
            r#"
            SELECT id, execution_id, total_steps, success_count, failed_count,
                   skipped_count, duration_ms, passed, created_at
            FROM result_summaries
            WHERE execution_id = ?
            "#,
        )
        .bind(execution_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }
}
