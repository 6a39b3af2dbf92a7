//! RTC 通用类型定义
//!
//! 此 crate 包含执行引擎、存储层和 CLI 之间共享的叶子类型。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 执行状态
///
/// Running 为初始状态，其余三个为互斥的终态。
/// 状态只允许 Running -> 终态 的迁移。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// 运行中（初始状态）
    Running,
    /// 全部步骤成功
    Completed,
    /// 前置命令或步骤失败
    Failed,
    /// 用户中止
    Aborted,
}

impl ExecutionStatus {
    /// 是否为终态
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ExecutionStatus::Running)
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExecutionStatus::Running => "Running",
            ExecutionStatus::Completed => "Completed",
            ExecutionStatus::Failed => "Failed",
            ExecutionStatus::Aborted => "Aborted",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for ExecutionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Running" => Ok(ExecutionStatus::Running),
            "Completed" => Ok(ExecutionStatus::Completed),
            "Failed" => Ok(ExecutionStatus::Failed),
            "Aborted" => Ok(ExecutionStatus::Aborted),
            other => Err(format!("未知的执行状态: {}", other)),
        }
    }
}

/// 日志级别
///
/// 除常规四级外，包含协议收发与 SSH 前置阶段的专用标签，
/// 便于在日志视图中区分来源。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogLevel {
    Info,
    Debug,
    Warn,
    Error,
    /// RADIUS 报文已发送
    Sent,
    /// RADIUS 报文已接收
    Recv,
    /// SSH 前置命令开始执行
    SshCmd,
    /// SSH 前置命令输出
    SshOut,
    /// SSH 前置命令失败
    SshFail,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_tag())
    }
}

impl LogLevel {
    /// 数据库存储用的标签文本
    pub fn as_tag(&self) -> &'static str {
        match self {
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
            LogLevel::Sent => "SENT",
            LogLevel::Recv => "RECV",
            LogLevel::SshCmd => "SSH_CMD",
            LogLevel::SshOut => "SSH_OUT",
            LogLevel::SshFail => "SSH_FAIL",
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INFO" => Ok(LogLevel::Info),
            "DEBUG" => Ok(LogLevel::Debug),
            "WARN" => Ok(LogLevel::Warn),
            "ERROR" => Ok(LogLevel::Error),
            "SENT" => Ok(LogLevel::Sent),
            "RECV" => Ok(LogLevel::Recv),
            "SSH_CMD" => Ok(LogLevel::SshCmd),
            "SSH_OUT" => Ok(LogLevel::SshOut),
            "SSH_FAIL" => Ok(LogLevel::SshFail),
            other => Err(format!("未知的日志级别: {}", other)),
        }
    }
}

/// 一条执行日志
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// 时间戳
    pub timestamp: DateTime<Utc>,

    /// 级别
    pub level: LogLevel,

    /// 消息文本
    pub message: String,

    /// 原始数据（报文全文、SQL 结果等，可选）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl LogEntry {
    /// 构造一条日志
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            message: message.into(),
            detail: None,
        }
    }

    /// 附加原始数据
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Info, message)
    }

    pub fn debug(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Debug, message)
    }

    pub fn warn(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Warn, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Error, message)
    }
}

/// 远程命令执行输出
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommandOutput {
    /// 标准输出
    pub stdout: String,
    /// 标准错误
    pub stderr: String,
    /// 退出码
    pub exit_code: Option<u32>,
}

impl CommandOutput {
    /// 检查命令是否成功执行
    pub fn is_success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// 获取合并的输出（stdout + stderr）
    pub fn combined_output(&self) -> String {
        if self.stderr.is_empty() {
            self.stdout.clone()
        } else if self.stdout.is_empty() {
            self.stderr.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }

    /// 合并输出中是否包含指定子串
    pub fn contains(&self, needle: &str) -> bool {
        self.stdout.contains(needle) || self.stderr.contains(needle)
    }
}

/// 一次 RADIUS 工具调用的结果
///
/// sent/received 是从工具输出中切分出的报文文本表示，
/// raw_output 保留完整输出用于日志留底。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RadiusExchange {
    /// 已发送报文的文本表示
    pub sent_repr: String,
    /// 已接收报文的文本表示（未收到应答时为空）
    pub received_repr: String,
    /// 工具原始输出
    pub raw_output: String,
    /// 工具退出码
    pub exit_code: Option<u32>,
}

impl RadiusExchange {
    /// 工具是否成功完成一次交换
    pub fn is_success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_terminal() {
        assert!(!ExecutionStatus::Running.is_terminal());
        assert!(ExecutionStatus::Completed.is_terminal());
        assert!(ExecutionStatus::Failed.is_terminal());
        assert!(ExecutionStatus::Aborted.is_terminal());
    }

    #[test]
    fn test_status_roundtrip() {
        for status in [
            ExecutionStatus::Running,
            ExecutionStatus::Completed,
            ExecutionStatus::Failed,
            ExecutionStatus::Aborted,
        ] {
            let parsed: ExecutionStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn test_log_level_tags() {
        assert_eq!(LogLevel::SshCmd.as_tag(), "SSH_CMD");
        assert_eq!(LogLevel::Sent.as_tag(), "SENT");
        assert_eq!("SSH_FAIL".parse::<LogLevel>().unwrap(), LogLevel::SshFail);
        assert!("BOGUS".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_log_entry_detail() {
        let entry = LogEntry::info("报文已发送").with_detail("User-Name = test");
        assert_eq!(entry.level, LogLevel::Info);
        assert_eq!(entry.detail.as_deref(), Some("User-Name = test"));
    }

    #[test]
    fn test_command_output() {
        let output = CommandOutput {
            stdout: "radiusd running".to_string(),
            stderr: String::new(),
            exit_code: Some(0),
        };
        assert!(output.is_success());
        assert!(output.contains("running"));
        assert_eq!(output.combined_output(), "radiusd running");
    }

    #[test]
    fn test_command_output_combined() {
        let output = CommandOutput {
            stdout: "out".to_string(),
            stderr: "err".to_string(),
            exit_code: Some(1),
        };
        assert!(!output.is_success());
        assert_eq!(output.combined_output(), "out\nerr");
    }
}
