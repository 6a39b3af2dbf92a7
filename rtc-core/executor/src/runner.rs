//! 场景执行控制
//!
//! 一次 start 调用完成一条执行记录的完整生命周期:
//! 建记录(Running) -> 前置阶段 -> 顺序执行步骤 -> 终态推导 -> 收尾
//! (写终态 + 结果汇总 + 日志落库)。收尾在每条终止路径上都会执行。
//!
//! 中止是协作式的: abort 只设置标志，在前置命令/步骤边界被观察；
//! 进行中的协作方调用运行到自身完成或超时。观察到中止后按 Aborted
//! 收尾，优先级高于已出现的 Failed。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use chrono::Utc;
use rtc_common::{ExecutionStatus, LogEntry};
use rtc_storage::{ResultSummaryRecord, Storage};
use tracing::{error, info};

use crate::collaborators::{HttpCaller, PacketSource, QueryDatabase, RadiusTool, SshConnector};
use crate::logs::LogAggregator;
use crate::preamble::PreambleRunner;
use crate::scenario::{Scenario, ServerProfile};
use crate::steps::{RunContext, StepExecutor};
use crate::{ExecutorError, Result};

/// 场景执行控制器
///
/// 一个控制器实例同一时刻只驱动一次执行；并行执行场景需要创建
/// 多个实例，共享的存储层按执行 ID 区分写入。
pub struct ExecutionController {
    storage: Arc<Storage>,
    ssh: Arc<dyn SshConnector>,
    executor: StepExecutor,

    /// 协作式中止标志（仅在边界检查）
    abort_flag: Arc<AtomicBool>,

    /// 当前在途执行 ID
    current_execution: Mutex<Option<i64>>,

    /// 实时日志流订阅端（每次 start 时挂接到新的聚合器）
    live_observers: Mutex<Vec<async_channel::Sender<LogEntry>>>,
}

impl ExecutionController {
    /// 创建控制器
    pub fn new(
        storage: Arc<Storage>,
        ssh: Arc<dyn SshConnector>,
        radius: Arc<dyn RadiusTool>,
        http: Arc<dyn HttpCaller>,
        packets: Arc<dyn PacketSource>,
    ) -> Self {
        Self {
            storage,
            ssh,
            executor: StepExecutor::new(radius, http, packets),
            abort_flag: Arc::new(AtomicBool::new(false)),
            current_execution: Mutex::new(None),
            live_observers: Mutex::new(Vec::new()),
        }
    }

    /// 设置目标数据库协作方（sql 步骤需要）
    pub fn with_database(mut self, database: Arc<dyn QueryDatabase>) -> Self {
        self.executor = self.executor.with_database(database);
        self
    }

    /// 订阅实时日志流
    ///
    /// 订阅对下一次 start 生效，收到该次执行的每条日志；
    /// 执行收尾（日志落库）后流关闭。
    pub fn subscribe(&self) -> async_channel::Receiver<LogEntry> {
        let (sender, receiver) = async_channel::unbounded();
        self.live_observers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(sender);
        receiver
    }

    /// 请求中止指定执行
    ///
    /// 标志在下一个前置命令/步骤边界被观察；进行中的协作方调用不被打断。
    pub fn abort(&self, execution_id: i64) -> Result<()> {
        let current = self
            .current_execution
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        match *current {
            Some(id) if id == execution_id => {
                info!("收到中止请求: 执行 {}", execution_id);
                self.abort_flag.store(true, Ordering::SeqCst);
                Ok(())
            }
            _ => Err(ExecutorError::ConfigError(format!(
                "执行 {} 不在运行中",
                execution_id
            ))),
        }
    }

    /// 执行场景
    ///
    /// 返回执行记录 ID。场景失败/中止不作为 Err 返回（结果在记录里），
    /// 只有建记录失败或收尾失败才返回 Err。
    pub async fn start(&self, scenario: &Scenario, profile: &ServerProfile) -> Result<i64> {
        scenario.validate()?;

        let started_at = Instant::now();
        let execution_id = self
            .storage
            .executions()
            .create(&scenario.name, &profile.name, Utc::now())
            .await
            .map_err(|e| ExecutorError::DatabaseError(e.to_string()))?;

        info!(
            "开始执行场景: {} (目标: {}, 执行 ID: {})",
            scenario.name, profile.name, execution_id
        );

        self.abort_flag.store(false, Ordering::SeqCst);
        *self
            .current_execution
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(execution_id);

        // 每次执行独立的日志批次；已注册的订阅端移交给本次聚合器，
        // 落库后发送端随聚合器清理，订阅流随之关闭
        let aggregator = LogAggregator::new();
        {
            let mut observers = self
                .live_observers
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            for sender in observers.drain(..) {
                aggregator.add_observer(sender);
            }
        }

        let mut failed = false;

        // 前置阶段：首个失败即终止，场景步骤不再进入
        if !profile.preamble.is_empty() {
            let preamble = PreambleRunner::new(Arc::clone(&self.ssh));
            let outcome = preamble.run(profile, &aggregator, &self.abort_flag).await;
            if !outcome.success {
                failed = true;
            }
        }

        // 步骤阶段
        let ctx = RunContext {
            variables: &scenario.variables,
            profile,
        };

        let total_steps = scenario.steps.len();
        let mut executed = 0usize;
        let mut success_count = 0usize;
        let mut failed_count = 0usize;

        if !failed {
            for step in &scenario.steps {
                // 边界处观察中止标志
                if self.abort_flag.load(Ordering::SeqCst) {
                    aggregator.append(LogEntry::warn("在步骤边界观察到中止请求，跳过剩余步骤"));
                    break;
                }

                let outcome = self.executor.execute(step, &ctx).await;
                executed += 1;
                aggregator.append_all(outcome.logs);

                if outcome.success {
                    success_count += 1;
                } else {
                    failed_count += 1;
                    failed = true;
                    error!(
                        "步骤 [{}] 失败 ({:?})，短路剩余步骤",
                        step.id, outcome.error
                    );
                    break;
                }
            }
        }

        // 终态推导：中止优先于失败
        let aborted = self.abort_flag.load(Ordering::SeqCst);
        let status = if aborted {
            ExecutionStatus::Aborted
        } else if failed {
            ExecutionStatus::Failed
        } else {
            ExecutionStatus::Completed
        };

        info!(
            "场景执行结束: {} - {} ({}/{} 步骤成功)",
            scenario.name, status, success_count, executed
        );

        // 收尾：终态写库 + 结果汇总 + 日志落库。
        // 任一失败都继续尝试其余收尾动作，首个错误上抛，
        // 已得出的内存结果不回滚。
        let mut finalize_error: Option<ExecutorError> = None;

        if let Err(e) = self
            .storage
            .executions()
            .finish(execution_id, Utc::now(), status)
            .await
        {
            error!("写入终态失败: {}", e);
            finalize_error.get_or_insert(ExecutorError::DatabaseError(e.to_string()));
        }

        let summary = ResultSummaryRecord {
            id: 0,
            execution_id,
            total_steps: total_steps as i32,
            success_count: success_count as i32,
            failed_count: failed_count as i32,
            skipped_count: (total_steps - executed) as i32,
            duration_ms: Some(started_at.elapsed().as_millis() as i64),
            passed: status == ExecutionStatus::Completed,
            created_at: Utc::now(),
        };
        if let Err(e) = self.storage.summaries().create(&summary).await {
            error!("写入结果汇总失败: {}", e);
            finalize_error.get_or_insert(ExecutorError::DatabaseError(e.to_string()));
        }

        match aggregator.flush(execution_id, self.storage.logs()).await {
            Ok(count) => info!("执行 {} 的 {} 条日志已落库", execution_id, count),
            Err(e) => {
                error!("日志落库失败: {}", e);
                finalize_error.get_or_insert(e);
            }
        }

        *self
            .current_execution
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;

        match finalize_error {
            Some(e) => Err(e),
            None => Ok(execution_id),
        }
    }
}
