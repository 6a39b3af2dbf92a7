//! radclient 调用实现
//!
//! 报文以 `属性 = 值` 文本行经 stdin 喂给工具，目标与共享密钥走命令行参数。
//! `-x` 模式下工具会回显已发送与已接收的报文，这里按行切分出两段表示。

use std::process::Stdio;

use rtc_common::RadiusExchange;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info};

use crate::config::RadiusToolConfig;
use crate::error::{RadiusToolError, Result};

/// radclient 调用器
pub struct RadclientRunner {
    config: RadiusToolConfig,
}

impl RadclientRunner {
    /// 创建调用器
    pub fn new(config: RadiusToolConfig) -> Self {
        Self { config }
    }

    /// 执行一次报文交换
    ///
    /// # 参数
    /// * `code` - 报文类型（如 "Access-Request"）
    /// * `attributes` - 已完成变量替换的属性列表
    /// * `server` - 目标地址（host:port）
    /// * `secret` - 共享密钥
    pub async fn exchange(
        &self,
        code: &str,
        attributes: &[(String, String)],
        server: &str,
        secret: &str,
    ) -> Result<RadiusExchange> {
        let payload = render_packet(attributes)?;
        let command = tool_command(code);

        info!("调用 RADIUS 工具: {} {} -> {}", command, code, server);
        debug!("报文属性:\n{}", payload);

        let mut cmd = Command::new(&self.config.binary);
        cmd.arg("-x")
            .arg("-r")
            .arg(self.config.retries.to_string())
            .arg("-t")
            .arg(self.config.request_timeout.as_secs().to_string())
            .arg(server)
            .arg(command)
            .arg(secret);

        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .map_err(|e| RadiusToolError::SpawnError(format!("{}: {}", self.config.binary.display(), e)))?;

        // stdin 必须在等待输出前关闭，否则工具会一直等待更多属性行
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(payload.as_bytes()).await?;
            stdin.shutdown().await?;
        }

        // 总超时 = (单次超时 × (重发次数 + 1)) + 余量
        let total_timeout =
            self.config.request_timeout * (self.config.retries + 1) + std::time::Duration::from_secs(2);

        let output = timeout(total_timeout, child.wait_with_output())
            .await
            .map_err(|_| RadiusToolError::TimeoutError(format!("{} -> {}", code, server)))?
            .map_err(|e| RadiusToolError::ExecutionError(format!("等待工具进程失败: {}", e)))?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let raw_output = if stderr.is_empty() {
            stdout.clone()
        } else {
            format!("{}\n{}", stdout, stderr)
        };

        let (sent_repr, received_repr) = parse_exchange(&raw_output);

        let exchange = RadiusExchange {
            sent_repr,
            received_repr,
            raw_output,
            exit_code: output.status.code().map(|c| c as u32),
        };

        debug!(
            "RADIUS 工具完成, 退出码: {:?}, 收到应答: {}",
            exchange.exit_code,
            !exchange.received_repr.is_empty()
        );

        Ok(exchange)
    }

    /// 获取配置
    pub fn config(&self) -> &RadiusToolConfig {
        &self.config
    }
}

/// 将属性列表渲染为工具 stdin 文本
fn render_packet(attributes: &[(String, String)]) -> Result<String> {
    if attributes.is_empty() {
        return Err(RadiusToolError::PacketError("报文没有任何属性".to_string()));
    }

    let mut lines = String::new();
    for (name, value) in attributes {
        if name.trim().is_empty() {
            return Err(RadiusToolError::PacketError("属性名为空".to_string()));
        }
        // 值包含空白或特殊字符时加引号
        if value.chars().any(|c| c.is_whitespace() || c == ',') {
            lines.push_str(&format!("{} = \"{}\"\n", name.trim(), value));
        } else {
            lines.push_str(&format!("{} = {}\n", name.trim(), value));
        }
    }
    Ok(lines)
}

/// 报文类型到工具命令字的映射
fn tool_command(code: &str) -> &'static str {
    match code {
        "Access-Request" => "auth",
        "Accounting-Request" => "acct",
        "Status-Server" => "status",
        "Disconnect-Request" => "disconnect",
        "CoA-Request" => "coa",
        _ => "auto",
    }
}

/// 从 -x 输出中切分出已发送/已接收报文的文本表示
///
/// 输出形如:
/// ```text
/// Sent Access-Request Id 152 from 0.0.0.0:37425 to 10.0.3.21:1812 length 75
///     User-Name = "alice"
/// Received Access-Accept Id 152 from 10.0.3.21:1812 to 0.0.0.0:37425 length 26
///     Reply-Message = "ok"
/// ```
fn parse_exchange(raw: &str) -> (String, String) {
    #[derive(Clone, Copy, PartialEq)]
    enum Section {
        None,
        Sent,
        Received,
    }

    let mut sent = String::new();
    let mut received = String::new();
    let mut section = Section::None;

    for line in raw.lines() {
        if line.starts_with("Sent ") {
            if !sent.is_empty() {
                sent.push('\n');
            }
            sent.push_str(line);
            section = Section::Sent;
        } else if line.starts_with("Received ") {
            if !received.is_empty() {
                received.push('\n');
            }
            received.push_str(line);
            section = Section::Received;
        } else if line.starts_with(char::is_whitespace) && !line.trim().is_empty() {
            // 缩进行归属于上一段报文
            match section {
                Section::Sent => {
                    sent.push('\n');
                    sent.push_str(line);
                }
                Section::Received => {
                    received.push('\n');
                    received.push_str(line);
                }
                Section::None => {}
            }
        } else {
            section = Section::None;
        }
    }

    (sent, received)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_packet() {
        let attrs = vec![
            ("User-Name".to_string(), "alice".to_string()),
            ("Reply-Message".to_string(), "hello world".to_string()),
        ];
        let payload = render_packet(&attrs).unwrap();
        assert!(payload.contains("User-Name = alice"));
        assert!(payload.contains("Reply-Message = \"hello world\""));
    }

    #[test]
    fn test_render_packet_empty() {
        assert!(render_packet(&[]).is_err());
    }

    #[test]
    fn test_tool_command_mapping() {
        assert_eq!(tool_command("Access-Request"), "auth");
        assert_eq!(tool_command("Accounting-Request"), "acct");
        assert_eq!(tool_command("Status-Server"), "status");
        assert_eq!(tool_command("Unknown-Code"), "auto");
    }

    #[test]
    fn test_parse_exchange() {
        let raw = "\
Sent Access-Request Id 152 from 0.0.0.0:37425 to 10.0.3.21:1812 length 75
    User-Name = \"alice\"
    NAS-IP-Address = 127.0.0.1
Received Access-Accept Id 152 from 10.0.3.21:1812 to 0.0.0.0:37425 length 26
    Reply-Message = \"ok\"
";
        let (sent, received) = parse_exchange(raw);
        assert!(sent.starts_with("Sent Access-Request"));
        assert!(sent.contains("NAS-IP-Address"));
        assert!(received.starts_with("Received Access-Accept"));
        assert!(received.contains("Reply-Message"));
    }

    #[test]
    fn test_parse_exchange_no_reply() {
        let raw = "Sent Access-Request Id 7 from 0.0.0.0:40000 to 10.0.3.21:1812 length 20\n    User-Name = \"bob\"\nradclient: no response from server\n";
        let (sent, received) = parse_exchange(raw);
        assert!(!sent.is_empty());
        assert!(received.is_empty());
    }
}
