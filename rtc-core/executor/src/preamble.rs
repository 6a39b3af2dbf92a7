//! SSH 前置阶段
//!
//! 在任何场景步骤之前按声明顺序执行档案里的前置命令。整个阶段复用
//! 一条 SSH 会话；无论成功、校验失败还是连接异常，会话都会被关闭。
//! 首个失败的命令立即终止剩余前置命令，场景步骤不再进入。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rtc_common::{LogEntry, LogLevel};
use tracing::{info, warn};

use crate::collaborators::SshConnector;
use crate::logs::LogAggregator;
use crate::scenario::ServerProfile;
use crate::ErrorKind;

/// 前置阶段结果
#[derive(Debug, Clone, Default)]
pub struct PreambleOutcome {
    /// 全部启用的命令是否成功
    pub success: bool,

    /// 实际执行的命令数（不含跳过）
    pub commands_run: usize,

    /// 是否在边界处观察到中止请求
    pub aborted: bool,

    /// 失败原因分类
    pub error: Option<ErrorKind>,
}

impl PreambleOutcome {
    fn passed(commands_run: usize) -> Self {
        Self {
            success: true,
            commands_run,
            aborted: false,
            error: None,
        }
    }

    fn failed(commands_run: usize, error: ErrorKind) -> Self {
        Self {
            success: false,
            commands_run,
            aborted: false,
            error: Some(error),
        }
    }
}

/// 前置命令执行器
pub struct PreambleRunner {
    connector: Arc<dyn SshConnector>,
}

impl PreambleRunner {
    pub fn new(connector: Arc<dyn SshConnector>) -> Self {
        Self { connector }
    }

    /// 执行档案声明的全部前置命令
    ///
    /// 中止标志只在命令边界检查；正在执行的命令运行到自身完成或超时。
    pub async fn run(
        &self,
        profile: &ServerProfile,
        logs: &LogAggregator,
        abort: &AtomicBool,
    ) -> PreambleOutcome {
        info!(
            "开始执行前置命令: {} ({} 条)",
            profile.name,
            profile.preamble.len()
        );

        let session = match self.connector.connect(profile).await {
            Ok(session) => session,
            Err(e) => {
                logs.append(
                    LogEntry::new(LogLevel::SshFail, format!("SSH 连接失败: {}", e))
                        .with_detail(format!("{}@{}:{}", profile.ssh_user, profile.host, profile.ssh_port)),
                );
                return PreambleOutcome::failed(0, ErrorKind::Connection);
            }
        };

        let mut outcome = PreambleOutcome::passed(0);

        for (index, command) in profile.preamble.iter().enumerate() {
            if abort.load(Ordering::SeqCst) {
                logs.append(LogEntry::warn("前置阶段观察到中止请求，跳过剩余命令"));
                outcome.aborted = true;
                outcome.success = false;
                outcome.error = Some(ErrorKind::Cancelled);
                break;
            }

            if !command.enabled {
                logs.append(LogEntry::info(format!(
                    "跳过已禁用的前置命令 #{}: {}",
                    index + 1,
                    command.command
                )));
                continue;
            }

            logs.append(LogEntry::new(LogLevel::SshCmd, command.command.clone()));

            match session.execute_command(&command.command).await {
                Ok(output) => {
                    outcome.commands_run += 1;

                    logs.append(
                        LogEntry::new(
                            LogLevel::SshOut,
                            format!("退出码: {:?}", output.exit_code),
                        )
                        .with_detail(output.combined_output()),
                    );

                    if let Some(expected) = &command.expect_output {
                        if !output.contains(expected) {
                            logs.append(
                                LogEntry::new(
                                    LogLevel::SshFail,
                                    format!(
                                        "[{}] 前置命令 #{} 输出中未找到期望子串: {}",
                                        ErrorKind::Validation.as_tag(),
                                        index + 1,
                                        expected
                                    ),
                                )
                                .with_detail(output.combined_output()),
                            );
                            outcome.success = false;
                            outcome.error = Some(ErrorKind::Validation);
                            break;
                        }
                    } else if !output.is_success() {
                        // 未声明期望输出时用退出码判定
                        logs.append(
                            LogEntry::new(
                                LogLevel::SshFail,
                                format!(
                                    "[{}] 前置命令 #{} 退出码非零: {:?}",
                                    ErrorKind::Connection.as_tag(),
                                    index + 1,
                                    output.exit_code
                                ),
                            )
                            .with_detail(output.combined_output()),
                        );
                        outcome.success = false;
                        outcome.error = Some(ErrorKind::Connection);
                        break;
                    }
                }
                Err(e) => {
                    outcome.commands_run += 1;
                    logs.append(LogEntry::new(
                        LogLevel::SshFail,
                        format!(
                            "[{}] 前置命令 #{} 执行失败: {}",
                            ErrorKind::Connection.as_tag(),
                            index + 1,
                            e
                        ),
                    ));
                    outcome.success = false;
                    outcome.error = Some(ErrorKind::Connection);
                    break;
                }
            }
        }

        // 无论结果如何都关闭会话
        if let Err(e) = session.disconnect().await {
            warn!("关闭 SSH 会话失败: {}", e);
        }

        info!(
            "前置阶段结束: success={}, 执行 {} 条命令",
            outcome.success, outcome.commands_run
        );

        outcome
    }
}
