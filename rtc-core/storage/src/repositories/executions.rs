use chrono::{DateTime, Utc};
use rtc_common::ExecutionStatus;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{Result, StorageError};
use crate::models::{ExecutionFilter, ExecutionRecord};

/// 执行记录仓储
pub struct ExecutionRepository {
    pool: SqlitePool,
}

impl ExecutionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 创建新的执行记录（初始状态 Running）
    pub async fn create(
        &self,
        scenario_name: &str,
        server_profile: &str,
        start_time: DateTime<Utc>,
    ) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO executions (scenario_name, server_profile, start_time, status)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(scenario_name)
        .bind(server_profile)
        .bind(start_time)
        .bind(ExecutionStatus::Running.to_string())
        .execute(&self.pool)
        .await?;

        let execution_id = result.last_insert_rowid();
        debug!("Created execution record with ID: {}", execution_id);

        Ok(execution_id)
    }

    /// 写入终态
    ///
    /// 仅允许 Running -> 终态 的迁移；记录已处于终态时返回
    /// InvalidTransition，不覆盖已有结果。
    pub async fn finish(
        &self,
        id: i64,
        end_time: DateTime<Utc>,
        status: ExecutionStatus,
    ) -> Result<()> {
        if !status.is_terminal() {
            return Err(StorageError::ValidationError(format!(
                "finish called with non-terminal status: {}",
                status
            )));
        }

        let result = sqlx::query(
            r#"
            UPDATE executions
            SET end_time = ?, status = ?
            WHERE id = ? AND status = 'Running'
            "#,
        )
        .bind(end_time)
        .bind(status.to_string())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::InvalidTransition(format!(
                "execution {} is not running",
                id
            )));
        }

        debug!("Execution {} finished with status {}", id, status);
        Ok(())
    }

    /// 根据ID获取执行记录
    pub async fn get_by_id(&self, id: i64) -> Result<Option<ExecutionRecord>> {
        let record = sqlx::query_as::<_, ExecutionRecord>(
            r#"
            SELECT id, scenario_name, server_profile, start_time, end_time, status, created_at
            FROM executions
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// 查询执行记录列表
    pub async fn list(&self, filter: &ExecutionFilter) -> Result<Vec<ExecutionRecord>> {
        let mut query = String::from(
            r#"
            SELECT id, scenario_name, server_profile, start_time, end_time, status, created_at
            FROM executions
            WHERE 1=1
            "#,
        );

        let mut bindings = Vec::new();

        if let Some(scenario_name) = &filter.scenario_name {
            query.push_str(" AND scenario_name = ?");
            bindings.push(scenario_name.clone());
        }

        if let Some(status) = &filter.status {
            query.push_str(" AND status = ?");
            bindings.push(status.clone());
        }

        query.push_str(" ORDER BY start_time DESC");

        if let Some(limit) = filter.limit {
            query.push_str(&format!(" LIMIT {}", limit));
        }

        if let Some(offset) = filter.offset {
            query.push_str(&format!(" OFFSET {}", offset));
        }

        let mut sql_query = sqlx::query_as::<_, ExecutionRecord>(&query);

        for binding in &bindings {
            sql_query = sql_query.bind(binding);
        }

        let records = sql_query.fetch_all(&self.pool).await?;
        Ok(records)
    }
}
