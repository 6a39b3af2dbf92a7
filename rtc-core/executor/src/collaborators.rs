//! 协作方能力接口
//!
//! 引擎只调用能力接口，不实现底层协议。SSH/数据库/RADIUS 工具/HTTP
//! 各有一个 async trait，测试中用内存实现替换。

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use rtc_common::{CommandOutput, RadiusExchange};
use rtc_storage::Storage;
use tracing::debug;

use crate::scenario::{PacketAttribute, PacketTemplate, ServerProfile};
use crate::{ExecutorError, Result};

/// SQL 查询结果
///
/// 行以 列名 -> 文本值 的形式返回，期望值比较发生在文本层。
#[derive(Debug, Clone, Default)]
pub struct QueryRows {
    pub rows: Vec<HashMap<String, String>>,
}

impl QueryRows {
    /// 首行指定列的值
    pub fn first_value(&self, column: &str) -> Option<&str> {
        self.rows.first()?.get(column).map(String::as_str)
    }
}

/// HTTP 请求
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub url: String,
    pub method: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

/// HTTP 响应
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

/// SSH 会话句柄
///
/// 由 SshConnector::connect 创建，整个前置阶段复用同一个句柄，
/// 无论结果如何都必须调用 disconnect。
#[async_trait]
pub trait SshSessionHandle: Send + Sync {
    /// 执行一条远程命令
    async fn execute_command(&self, command: &str) -> Result<CommandOutput>;

    /// 断开会话
    async fn disconnect(&self) -> Result<()>;
}

/// SSH 连接器
#[async_trait]
pub trait SshConnector: Send + Sync {
    /// 为目标服务器建立会话
    async fn connect(&self, profile: &ServerProfile) -> Result<Box<dyn SshSessionHandle>>;
}

/// RADIUS 工具
#[async_trait]
pub trait RadiusTool: Send + Sync {
    /// 执行一次报文交换
    async fn execute_tool(
        &self,
        code: &str,
        attributes: &[(String, String)],
        server: &str,
        secret: &str,
    ) -> Result<RadiusExchange>;
}

/// 目标服务器数据库
#[async_trait]
pub trait QueryDatabase: Send + Sync {
    /// 执行查询
    async fn execute_query(&self, sql: &str) -> Result<QueryRows>;
}

/// HTTP 调用器
#[async_trait]
pub trait HttpCaller: Send + Sync {
    /// 发起一次请求
    async fn request(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// 报文模板来源
#[async_trait]
pub trait PacketSource: Send + Sync {
    /// 按名称查找模板
    async fn get_by_name(&self, name: &str) -> Result<Option<PacketTemplate>>;
}

// ========================================
// 默认实现
// ========================================

/// 基于 rtc-ssh-executor 的 SSH 连接器
pub struct SshExecutorConnector;

#[async_trait]
impl SshConnector for SshExecutorConnector {
    async fn connect(&self, profile: &ServerProfile) -> Result<Box<dyn SshSessionHandle>> {
        let session = rtc_ssh_executor::SshSession::connect(profile.ssh_config())
            .await
            .map_err(|e| ExecutorError::ConnectionError(e.to_string()))?;
        Ok(Box::new(SshExecutorSession { session }))
    }
}

struct SshExecutorSession {
    session: rtc_ssh_executor::SshSession,
}

#[async_trait]
impl SshSessionHandle for SshExecutorSession {
    async fn execute_command(&self, command: &str) -> Result<CommandOutput> {
        self.session
            .execute(command)
            .await
            .map_err(|e| ExecutorError::ConnectionError(e.to_string()))
    }

    async fn disconnect(&self) -> Result<()> {
        self.session
            .close()
            .await
            .map_err(|e| ExecutorError::ConnectionError(e.to_string()))
    }
}

/// 基于 rtc-radius-tool 的 RADIUS 工具
pub struct RadclientTool {
    runner: rtc_radius_tool::RadclientRunner,
}

impl RadclientTool {
    pub fn new(config: rtc_radius_tool::RadiusToolConfig) -> Self {
        Self {
            runner: rtc_radius_tool::RadclientRunner::new(config),
        }
    }
}

#[async_trait]
impl RadiusTool for RadclientTool {
    async fn execute_tool(
        &self,
        code: &str,
        attributes: &[(String, String)],
        server: &str,
        secret: &str,
    ) -> Result<RadiusExchange> {
        self.runner
            .exchange(code, attributes, server, secret)
            .await
            .map_err(|e| ExecutorError::ConnectionError(e.to_string()))
    }
}

/// 基于存储层的报文模板来源
pub struct StoragePacketSource {
    storage: Arc<Storage>,
}

impl StoragePacketSource {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl PacketSource for StoragePacketSource {
    async fn get_by_name(&self, name: &str) -> Result<Option<PacketTemplate>> {
        let record = self
            .storage
            .packets()
            .get_by_name(name)
            .await
            .map_err(|e| ExecutorError::DatabaseError(e.to_string()))?;

        let Some(record) = record else {
            return Ok(None);
        };

        let attributes: Vec<PacketAttribute> = serde_json::from_str(&record.attributes)
            .map_err(|e| ExecutorError::SerdeError(format!("模板 {} 属性解析失败: {}", name, e)))?;

        debug!("加载报文模板: {} ({} 个属性)", name, attributes.len());

        Ok(Some(PacketTemplate {
            name: record.name,
            code: record.code,
            attributes,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_rows_first_value() {
        let mut row = HashMap::new();
        row.insert("acctstatustype".to_string(), "Start".to_string());
        let rows = QueryRows { rows: vec![row] };

        assert_eq!(rows.first_value("acctstatustype"), Some("Start"));
        assert_eq!(rows.first_value("missing"), None);

        let empty = QueryRows::default();
        assert_eq!(empty.first_value("any"), None);
    }
}
