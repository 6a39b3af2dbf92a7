//! RTC SSH 执行器
//!
//! 场景执行前置阶段使用的 SSH 客户端。通过系统 ssh/sshpass 命令执行远程命令，
//! 兼容性好；会话复用依赖 OpenSSH ControlMaster，保证一次执行只建立一条连接。

mod client;
mod config;
mod error;

pub use client::SshSession;
pub use config::{AuthMethod, SshConfig};
pub use error::{Result, SshError};
