//! RTC 执行器
//!
//! RADIUS 测试场景执行引擎

pub mod collaborators;
pub mod db;
pub mod http;
pub mod logs;
pub mod preamble;
pub mod runner;
pub mod scenario;
pub mod steps;
pub mod variables;

pub use collaborators::{
    HttpCaller, HttpRequest, HttpResponse, PacketSource, QueryDatabase, QueryRows, RadclientTool,
    RadiusTool, SshConnector, SshExecutorConnector, SshSessionHandle, StoragePacketSource,
};
pub use db::MySqlQueryClient;
pub use http::ReqwestCaller;
pub use logs::LogAggregator;
pub use preamble::{PreambleOutcome, PreambleRunner};
pub use runner::ExecutionController;
pub use scenario::{
    HeaderPair, PacketAttribute, PacketTemplate, PortKind, Scenario, ScenarioStep,
    ScenarioVariable, ServerProfile, SshPreambleCommand, StepAction, VariableKind,
};
pub use steps::{RunContext, StepExecutor, StepOutcome};
pub use variables::VariableResolver;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 步骤/命令失败原因分类
///
/// 三类失败对运行状态的影响相同（置为 Failed 并短路剩余步骤），
/// 但日志标签不同，便于定位问题来源。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// 传输层失败 (SSH/DB/RADIUS 工具/HTTP)
    Connection,
    /// 期望校验失败 (子串/列值/状态码/应答属性不匹配)
    Validation,
    /// 配置错误 (缺少报文模板、缺少必填字段等)
    Configuration,
    /// 用户中止 (在边界处观察到)
    Cancelled,
}

impl ErrorKind {
    /// 日志标签
    pub fn as_tag(&self) -> &'static str {
        match self {
            ErrorKind::Connection => "CONNECTION",
            ErrorKind::Validation => "VALIDATION",
            ErrorKind::Configuration => "CONFIGURATION",
            ErrorKind::Cancelled => "CANCELLED",
        }
    }
}

#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("场景加载失败: {0}")]
    ScenarioLoadFailed(String),

    #[error("连接错误: {0}")]
    ConnectionError(String),

    #[error("校验失败: {0}")]
    ValidationError(String),

    #[error("配置错误: {0}")]
    ConfigError(String),

    #[error("执行已中止")]
    Cancelled,

    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("IO 错误: {0}")]
    IoError(#[from] std::io::Error),

    #[error("序列化错误: {0}")]
    SerdeError(String),
}

pub type Result<T> = std::result::Result<T, ExecutorError>;
