//! 步骤执行
//!
//! 按步骤类型分发到对应的协作方。每个步骤返回一个 StepOutcome，
//! 失败的步骤带失败分类；日志条目由调用方统一并入运行日志。

use std::sync::Arc;

use rtc_common::{LogEntry, LogLevel};
use tracing::debug;

use crate::collaborators::{HttpCaller, HttpRequest, PacketSource, QueryDatabase, RadiusTool};
use crate::scenario::{
    HeaderPair, PacketAttribute, PacketTemplate, PortKind, ScenarioStep, ScenarioVariable,
    ServerProfile, StepAction,
};
use crate::variables::VariableResolver;
use crate::ErrorKind;

/// 单步执行结果
#[derive(Debug)]
pub struct StepOutcome {
    /// 是否成功
    pub success: bool,

    /// 本步骤产生的日志
    pub logs: Vec<LogEntry>,

    /// 失败分类（成功时为空）
    pub error: Option<ErrorKind>,
}

impl StepOutcome {
    fn passed(logs: Vec<LogEntry>) -> Self {
        Self {
            success: true,
            logs,
            error: None,
        }
    }

    fn failed(logs: Vec<LogEntry>, error: ErrorKind) -> Self {
        Self {
            success: false,
            logs,
            error: Some(error),
        }
    }
}

/// 一次运行的上下文
pub struct RunContext<'a> {
    /// 场景变量
    pub variables: &'a [ScenarioVariable],

    /// 目标服务器档案
    pub profile: &'a ServerProfile,
}

/// 步骤执行器
pub struct StepExecutor {
    resolver: VariableResolver,
    radius: Arc<dyn RadiusTool>,
    http: Arc<dyn HttpCaller>,
    packets: Arc<dyn PacketSource>,
    database: Option<Arc<dyn QueryDatabase>>,
}

/// 步骤内部失败: 分类 + 描述
type StepFailure = (ErrorKind, String);

impl StepExecutor {
    pub fn new(
        radius: Arc<dyn RadiusTool>,
        http: Arc<dyn HttpCaller>,
        packets: Arc<dyn PacketSource>,
    ) -> Self {
        Self {
            resolver: VariableResolver::new(),
            radius,
            http,
            packets,
            database: None,
        }
    }

    /// 设置目标数据库协作方（sql 步骤需要）
    pub fn with_database(mut self, database: Arc<dyn QueryDatabase>) -> Self {
        self.database = Some(database);
        self
    }

    /// 执行单个步骤
    pub async fn execute(&self, step: &ScenarioStep, ctx: &RunContext<'_>) -> StepOutcome {
        debug!("执行步骤 [{}] {}", step.id, step.display_name());

        let mut logs = Vec::new();

        let result = match &step.action {
            StepAction::Radius {
                packet,
                attributes,
                code,
                expect_reply,
                port,
            } => {
                self.execute_radius(
                    packet.as_deref(),
                    attributes,
                    code.as_deref(),
                    expect_reply,
                    *port,
                    ctx,
                    &mut logs,
                )
                .await
            }
            StepAction::Sql {
                query,
                expect_column,
                expect_value,
            } => {
                self.execute_sql(
                    query,
                    expect_column.as_deref(),
                    expect_value.as_deref(),
                    ctx,
                    &mut logs,
                )
                .await
            }
            StepAction::ApiCall {
                url,
                method,
                headers,
                body,
                expect_status,
                expect_body_contains,
            } => {
                self.execute_api_call(
                    url,
                    method,
                    headers,
                    body.as_deref(),
                    *expect_status,
                    expect_body_contains.as_deref(),
                    ctx,
                    &mut logs,
                )
                .await
            }
            StepAction::Delay { duration_ms } => {
                self.execute_delay(duration_ms, ctx, &mut logs).await
            }
            StepAction::LogMessage { message } => {
                logs.push(LogEntry::info(self.resolver.resolve(message, ctx.variables)));
                Ok(())
            }
            StepAction::LoopStart => {
                logs.push(LogEntry::info(format!(
                    "循环开始标记 [{}]（控制流未实现，仅记录）",
                    step.id
                )));
                Ok(())
            }
            StepAction::LoopEnd => {
                logs.push(LogEntry::info(format!(
                    "循环结束标记 [{}]（控制流未实现，仅记录）",
                    step.id
                )));
                Ok(())
            }
            StepAction::ConditionalStart => {
                logs.push(LogEntry::info(format!(
                    "条件开始标记 [{}]（控制流未实现，仅记录）",
                    step.id
                )));
                Ok(())
            }
            StepAction::ConditionalEnd => {
                logs.push(LogEntry::info(format!(
                    "条件结束标记 [{}]（控制流未实现，仅记录）",
                    step.id
                )));
                Ok(())
            }
        };

        match result {
            Ok(()) => StepOutcome::passed(logs),
            Err((kind, message)) => {
                logs.push(LogEntry::error(format!(
                    "[{}] 步骤 {} 失败: {}",
                    kind.as_tag(),
                    step.id,
                    message
                )));
                StepOutcome::failed(logs, kind)
            }
        }
    }

    /// radius 步骤: 模板解析 -> 变量替换 -> 工具调用 -> 应答校验
    #[allow(clippy::too_many_arguments)]
    async fn execute_radius(
        &self,
        packet: Option<&str>,
        attributes: &[PacketAttribute],
        code: Option<&str>,
        expect_reply: &[PacketAttribute],
        port: PortKind,
        ctx: &RunContext<'_>,
        logs: &mut Vec<LogEntry>,
    ) -> Result<(), StepFailure> {
        let template = if let Some(name) = packet {
            match self.packets.get_by_name(name).await {
                Ok(Some(template)) => template,
                Ok(None) => {
                    return Err((
                        ErrorKind::Configuration,
                        format!("未找到报文模板: {}", name),
                    ))
                }
                Err(e) => {
                    return Err((
                        ErrorKind::Connection,
                        format!("读取报文模板失败: {}", e),
                    ))
                }
            }
        } else {
            // 内联属性即席构造
            PacketTemplate {
                name: "<inline>".to_string(),
                code: code.unwrap_or("Access-Request").to_string(),
                attributes: attributes.to_vec(),
            }
        };

        let resolved: Vec<(String, String)> = template
            .attributes
            .iter()
            .map(|attr| {
                (
                    attr.name.clone(),
                    self.resolver.resolve(&attr.value, ctx.variables),
                )
            })
            .collect();

        let server = ctx.profile.radius_address(port);

        let exchange = self
            .radius
            .execute_tool(&template.code, &resolved, &server, &ctx.profile.secret)
            .await
            .map_err(|e| {
                (
                    ErrorKind::Connection,
                    format!("RADIUS 工具调用失败: {}", e),
                )
            })?;

        let mut sent = LogEntry::new(LogLevel::Sent, format!("{} -> {}", template.code, server));
        if !exchange.sent_repr.is_empty() {
            sent = sent.with_detail(exchange.sent_repr.clone());
        }
        logs.push(sent);

        if !exchange.received_repr.is_empty() {
            logs.push(
                LogEntry::new(LogLevel::Recv, format!("应答 <- {}", server))
                    .with_detail(exchange.received_repr.clone()),
            );
        }

        if !exchange.is_success() {
            return Err((
                ErrorKind::Connection,
                format!(
                    "RADIUS 工具退出码非零: {:?}",
                    exchange.exit_code
                ),
            ));
        }

        // 期望应答属性校验
        for expected in expect_reply {
            let value = self.resolver.resolve(&expected.value, ctx.variables);
            if !reply_contains(&exchange.received_repr, &expected.name, &value) {
                return Err((
                    ErrorKind::Validation,
                    format!("应答中未找到期望属性: {} = {}", expected.name, value),
                ));
            }
        }

        Ok(())
    }

    /// sql 步骤: 查询目标服务器数据库并比较期望列值
    async fn execute_sql(
        &self,
        query: &str,
        expect_column: Option<&str>,
        expect_value: Option<&str>,
        ctx: &RunContext<'_>,
        logs: &mut Vec<LogEntry>,
    ) -> Result<(), StepFailure> {
        let Some(database) = &self.database else {
            return Err((
                ErrorKind::Configuration,
                "未配置目标数据库连接".to_string(),
            ));
        };

        let resolved_query = self.resolver.resolve(query, ctx.variables);
        logs.push(LogEntry::debug("执行 SQL 查询").with_detail(resolved_query.clone()));

        let rows = database
            .execute_query(&resolved_query)
            .await
            .map_err(|e| (ErrorKind::Connection, format!("SQL 查询失败: {}", e)))?;

        logs.push(LogEntry::info(format!("SQL 返回 {} 行", rows.rows.len())));

        if let (Some(column), Some(expected)) = (expect_column, expect_value) {
            let expected = self.resolver.resolve(expected, ctx.variables);
            match rows.first_value(column) {
                Some(actual) if actual == expected => {}
                Some(actual) => {
                    return Err((
                        ErrorKind::Validation,
                        format!("列 {} 期望 {}, 实际 {}", column, expected, actual),
                    ))
                }
                None => {
                    return Err((
                        ErrorKind::Validation,
                        format!("结果首行中没有列 {} (共 {} 行)", column, rows.rows.len()),
                    ))
                }
            }
        }

        Ok(())
    }

    /// api_call 步骤: HTTP 调用与状态/响应体校验
    #[allow(clippy::too_many_arguments)]
    async fn execute_api_call(
        &self,
        url: &str,
        method: &str,
        headers: &[HeaderPair],
        body: Option<&str>,
        expect_status: Option<u16>,
        expect_body_contains: Option<&str>,
        ctx: &RunContext<'_>,
        logs: &mut Vec<LogEntry>,
    ) -> Result<(), StepFailure> {
        let request = HttpRequest {
            url: self.resolver.resolve(url, ctx.variables),
            method: method.to_string(),
            headers: headers
                .iter()
                .map(|header| {
                    (
                        header.name.clone(),
                        self.resolver.resolve(&header.value, ctx.variables),
                    )
                })
                .collect(),
            body: body.map(|b| self.resolver.resolve(b, ctx.variables)),
        };

        let url = request.url.clone();
        logs.push(LogEntry::debug(format!("HTTP {} {}", request.method, url)));

        let response = self
            .http
            .request(request)
            .await
            .map_err(|e| (ErrorKind::Connection, format!("HTTP 调用失败: {}", e)))?;

        logs.push(
            LogEntry::info(format!("HTTP {} <- {}", response.status, url))
                .with_detail(response.body.clone()),
        );

        if let Some(expected) = expect_status {
            if response.status != expected {
                return Err((
                    ErrorKind::Validation,
                    format!("HTTP 状态码期望 {}, 实际 {}", expected, response.status),
                ));
            }
        }

        if let Some(needle) = expect_body_contains {
            let needle = self.resolver.resolve(needle, ctx.variables);
            if !response.body.contains(&needle) {
                return Err((
                    ErrorKind::Validation,
                    format!("响应体中未找到期望子串: {}", needle),
                ));
            }
        }

        Ok(())
    }

    /// delay 步骤: 仅挂起当前运行
    async fn execute_delay(
        &self,
        duration_ms: &str,
        ctx: &RunContext<'_>,
        logs: &mut Vec<LogEntry>,
    ) -> Result<(), StepFailure> {
        let resolved = self.resolver.resolve(duration_ms, ctx.variables);
        let millis: u64 = resolved.trim().parse().map_err(|_| {
            (
                ErrorKind::Configuration,
                format!("延时时长无法解析: {}", resolved),
            )
        })?;

        logs.push(LogEntry::info(format!("延时 {} 毫秒", millis)));
        tokio::time::sleep(std::time::Duration::from_millis(millis)).await;

        Ok(())
    }
}

/// 应答文本中是否出现 `名称 = 值` 属性行（值可以带引号）
fn reply_contains(received: &str, name: &str, value: &str) -> bool {
    received.lines().any(|line| {
        let Some((attr, rest)) = line.trim().split_once('=') else {
            return false;
        };
        attr.trim() == name && rest.trim().trim_matches('"') == value
    })
}
