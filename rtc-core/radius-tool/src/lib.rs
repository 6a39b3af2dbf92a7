//! RTC RADIUS 工具调用器
//!
//! 通过 tokio::process 驱动 radclient 兼容的命令行工具完成一次报文交换，
//! 并从工具输出中切分出已发送/已接收报文的文本表示。

mod client;
mod config;
mod error;

pub use client::RadclientRunner;
pub use config::RadiusToolConfig;
pub use error::{RadiusToolError, Result};
