//! RADIUS 工具错误定义

use thiserror::Error;

/// RADIUS 工具操作结果类型
pub type Result<T> = std::result::Result<T, RadiusToolError>;

/// RADIUS 工具错误类型
#[derive(Error, Debug)]
pub enum RadiusToolError {
    /// 工具启动失败（二进制不存在、权限不足等）
    #[error("启动 RADIUS 工具失败: {0}")]
    SpawnError(String),

    /// 工具执行错误
    #[error("RADIUS 工具执行失败: {0}")]
    ExecutionError(String),

    /// 超时错误
    #[error("RADIUS 工具执行超时: {0}")]
    TimeoutError(String),

    /// 报文构造错误
    #[error("报文构造失败: {0}")]
    PacketError(String),

    /// IO 错误
    #[error("IO 错误: {0}")]
    IoError(#[from] std::io::Error),
}
