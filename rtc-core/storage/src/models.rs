use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// 执行记录数据库模型
///
/// status 只允许 Running -> {Completed, Failed, Aborted} 迁移，
/// 由 ExecutionRepository::finish 在 SQL 层保证。
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ExecutionRecord {
    pub id: i64,
    pub scenario_name: String,
    pub server_profile: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: String, // 'Running', 'Completed', 'Failed', 'Aborted'
    pub created_at: DateTime<Utc>,
}

/// 执行日志数据库模型
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ExecutionLogRecord {
    pub id: i64,
    pub execution_id: i64,
    pub seq: i64,
    pub timestamp: DateTime<Utc>,
    pub level: String,
    pub message: String,
    pub detail: Option<String>,
}

/// 执行结果汇总数据库模型
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ResultSummaryRecord {
    pub id: i64,
    pub execution_id: i64,
    pub total_steps: i32,
    pub success_count: i32,
    pub failed_count: i32,
    pub skipped_count: i32,
    pub duration_ms: Option<i64>,
    pub passed: bool,
    pub created_at: DateTime<Utc>,
}

/// 场景数据库模型
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ScenarioRecord {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub definition: String,   // YAML/JSON
    pub tags: Option<String>, // JSON array
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 目标服务器档案数据库模型
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ServerProfileRecord {
    pub id: i64,
    pub name: String,
    pub host: String,
    pub ssh_port: i32,
    pub ssh_user: String,
    pub ssh_password: Option<String>,
    pub ssh_key_path: Option<String>,
    pub auth_port: i32,
    pub acct_port: i32,
    pub secret: String,
    pub preamble: Option<String>, // JSON array of preamble commands
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 报文模板数据库模型
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PacketTemplateRecord {
    pub id: i64,
    pub name: String,
    pub code: String,
    pub attributes: String, // JSON array of {name, value}
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 执行记录查询过滤条件
#[derive(Debug, Clone, Default)]
pub struct ExecutionFilter {
    pub scenario_name: Option<String>,
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
