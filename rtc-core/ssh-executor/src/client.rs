//! SSH 会话实现
//!
//! 使用系统 ssh/sshpass 命令执行远程命令，兼容性好。
//! 前置阶段要求整个执行过程复用同一条连接，这里通过 OpenSSH ControlMaster
//! 实现：connect 时建立一条后台主连接，之后的每条命令都经由控制套接字复用，
//! close 时显式退出主连接。

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};

use rtc_common::CommandOutput;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::config::{AuthMethod, SshConfig};
use crate::error::{Result, SshError};

/// SSH 会话（复用一条 ControlMaster 主连接）
pub struct SshSession {
    config: SshConfig,
    /// 控制套接字路径
    control_path: PathBuf,
    /// 会话是否已关闭
    closed: AtomicBool,
}

impl SshSession {
    /// 建立 SSH 会话
    ///
    /// 先启动后台 ControlMaster 主连接，再执行一条探测命令验证连通性。
    /// 任一步失败都会清理已建立的主连接。
    pub async fn connect(config: SshConfig) -> Result<Self> {
        info!("正在连接 SSH: {}@{}", config.username, config.address());

        let control_path = std::env::temp_dir().join(format!(
            "rtc-ssh-{}-{}.sock",
            std::process::id(),
            config.port
        ));

        let session = Self {
            config,
            control_path,
            closed: AtomicBool::new(false),
        };

        session.open_master().await?;

        // 验证连接（执行简单命令）
        debug!("验证 SSH 连接...");
        match session.execute("echo connected").await {
            Ok(output) if output.stdout.trim() == "connected" => {}
            Ok(output) => {
                session.close().await.ok();
                return Err(SshError::ConnectionError(format!(
                    "SSH 连接验证失败: {}",
                    output.stderr
                )));
            }
            Err(e) => {
                session.close().await.ok();
                return Err(e);
            }
        }

        info!(
            "SSH 连接成功: {}@{}",
            session.config.username,
            session.config.address()
        );
        Ok(session)
    }

    /// 启动 ControlMaster 主连接
    async fn open_master(&self) -> Result<()> {
        let mut cmd = self.base_command();

        // -f: 认证完成后转入后台; -N: 不执行远程命令
        cmd.arg("-M")
            .arg("-f")
            .arg("-N")
            .arg(format!("{}@{}", self.config.username, self.config.host));

        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());

        debug!("启动 ControlMaster: {}", self.control_path.display());

        let connect_timeout = self.config.connect_timeout;
        let output = timeout(connect_timeout, async {
            let child = cmd
                .spawn()
                .map_err(|e| SshError::ConnectionError(format!("启动 SSH 进程失败: {}", e)))?;
            child
                .wait_with_output()
                .await
                .map_err(|e| SshError::ConnectionError(format!("等待 SSH 进程失败: {}", e)))
        })
        .await
        .map_err(|_| SshError::TimeoutError("建立 SSH 主连接超时".to_string()))??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            if stderr.contains("Permission denied")
                || stderr.contains("Authentication failed")
                || stderr.contains("password")
            {
                return Err(SshError::AuthenticationError(stderr));
            }
            return Err(SshError::ConnectionError(stderr));
        }

        Ok(())
    }

    /// 执行命令
    pub async fn execute(&self, command: &str) -> Result<CommandOutput> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(SshError::SessionError("会话已关闭".to_string()));
        }

        debug!("执行命令: {}", command);

        let result = timeout(
            self.config.command_timeout,
            self.execute_internal(command),
        )
        .await
        .map_err(|_| SshError::TimeoutError(format!("命令执行超时: {}", command)))?;

        result
    }

    /// 执行命令内部实现（经由控制套接字复用主连接）
    async fn execute_internal(&self, command: &str) -> Result<CommandOutput> {
        let mut cmd = self.base_command();

        cmd.arg(format!("{}@{}", self.config.username, self.config.host))
            .arg(command);

        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());

        let child = cmd
            .spawn()
            .map_err(|e| SshError::ExecutionError(format!("启动 SSH 进程失败: {}", e)))?;

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| SshError::ExecutionError(format!("等待 SSH 进程失败: {}", e)))?;

        let result = CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            exit_code: output.status.code().map(|c| c as u32),
        };

        debug!(
            "命令执行完成, 退出码: {:?}, stdout 长度: {}, stderr 长度: {}",
            result.exit_code,
            result.stdout.len(),
            result.stderr.len()
        );

        Ok(result)
    }

    /// 执行命令并检查是否成功
    pub async fn execute_checked(&self, command: &str) -> Result<CommandOutput> {
        let output = self.execute(command).await?;

        if !output.is_success() {
            return Err(SshError::ExecutionError(format!(
                "命令执行失败 (退出码 {:?}): {}",
                output.exit_code,
                if output.stderr.is_empty() {
                    &output.stdout
                } else {
                    &output.stderr
                }
            )));
        }

        Ok(output)
    }

    /// 关闭会话（退出 ControlMaster 主连接）
    pub async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let mut cmd = self.base_command();
        cmd.arg("-O")
            .arg("exit")
            .arg(format!("{}@{}", self.config.username, self.config.host));
        cmd.stdout(Stdio::null()).stderr(Stdio::null());

        match cmd.status().await {
            Ok(_) => {
                info!("SSH 会话已关闭: {}", self.config.address());
                Ok(())
            }
            Err(e) => {
                warn!("关闭 SSH 会话失败: {}", e);
                Err(SshError::SessionError(e.to_string()))
            }
        }
    }

    /// 获取配置
    pub fn config(&self) -> &SshConfig {
        &self.config
    }

    /// 构造带通用参数的 ssh 基础命令
    fn base_command(&self) -> Command {
        let mut cmd = match &self.config.auth {
            AuthMethod::Password(password) => {
                // 使用 sshpass 进行密码认证
                let mut cmd = Command::new("sshpass");
                cmd.arg("-p").arg(password);
                cmd.arg("ssh");
                cmd
            }
            AuthMethod::Key { key_path, .. } => {
                let mut cmd = Command::new("ssh");
                if let Ok(expanded) = expand_path(key_path) {
                    cmd.arg("-i").arg(expanded);
                }
                cmd
            }
            AuthMethod::DefaultKey => Command::new("ssh"),
        };

        cmd.arg("-o")
            .arg("StrictHostKeyChecking=no")
            .arg("-o")
            .arg("UserKnownHostsFile=/dev/null")
            .arg("-o")
            .arg(format!(
                "ConnectTimeout={}",
                self.config.connect_timeout.as_secs()
            ))
            .arg("-o")
            .arg("NumberOfPasswordPrompts=1")
            .arg("-o")
            .arg(format!("ControlPath={}", self.control_path.display()))
            .arg("-p")
            .arg(self.config.port.to_string());

        cmd
    }
}

impl Drop for SshSession {
    fn drop(&mut self) {
        // 忘记 close 时尽力退出主连接，避免残留后台进程
        if !self.closed.swap(true, Ordering::SeqCst) {
            let _ = std::process::Command::new("ssh")
                .arg("-O")
                .arg("exit")
                .arg("-o")
                .arg(format!("ControlPath={}", self.control_path.display()))
                .arg("-p")
                .arg(self.config.port.to_string())
                .arg(format!("{}@{}", self.config.username, self.config.host))
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status();
        }
    }
}

/// 展开路径（处理 ~ 等）
fn expand_path(path: &PathBuf) -> Result<PathBuf> {
    let path_str = path.to_string_lossy();
    if path_str.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            let expanded = path_str.replacen('~', &home.to_string_lossy(), 1);
            return Ok(PathBuf::from(expanded));
        }
    }
    Ok(path.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_path() {
        let path = PathBuf::from("/etc/hosts");
        let expanded = expand_path(&path).unwrap();
        assert_eq!(expanded, path);
    }

    #[test]
    fn test_control_path_per_process() {
        let a = std::env::temp_dir().join(format!("rtc-ssh-{}-22.sock", std::process::id()));
        let b = std::env::temp_dir().join(format!("rtc-ssh-{}-2222.sock", std::process::id()));
        assert_ne!(a, b);
    }
}
