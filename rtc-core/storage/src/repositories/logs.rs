use rtc_common::LogEntry;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::Result;
use crate::models::ExecutionLogRecord;

/// 执行日志仓储
pub struct LogRepository {
    pool: SqlitePool,
}

impl LogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 批量写入一次执行的日志
    ///
    /// 整批在一个事务内落库；seq 从 0 递增，保证读取端可按写入顺序重放。
    pub async fn append_batch(&self, execution_id: i64, entries: &[LogEntry]) -> Result<()> {
        if entries.is_empty() {
            debug!("No log entries to persist for execution {}", execution_id);
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        for (seq, entry) in entries.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO execution_logs (execution_id, seq, timestamp, level, message, detail)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(execution_id)
            .bind(seq as i64)
            .bind(entry.timestamp)
            .bind(entry.level.as_tag())
            .bind(&entry.message)
            .bind(&entry.detail)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        debug!(
            "Persisted {} log entries for execution {}",
            entries.len(),
            execution_id
        );
        Ok(())
    }

    /// 读取一次执行的全部日志（按写入顺序）
    pub async fn get_by_execution(&self, execution_id: i64) -> Result<Vec<ExecutionLogRecord>> {
        let records = sqlx::query_as::<_, ExecutionLogRecord>(
            r#"
            SELECT id, execution_id, seq, timestamp, level, message, detail
            FROM execution_logs
            WHERE execution_id = ?
            ORDER BY seq ASC
            "#,
        )
        .bind(execution_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// 统计一次执行的日志条数
    pub async fn count(&self, execution_id: i64) -> Result<i64> {
        let count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM execution_logs WHERE execution_id = ?")
                .bind(execution_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count.0)
    }
}
