//! Executions 命令处理

use anyhow::{Context, Result};
use colored::Colorize;
use rtc_storage::ExecutionFilter;

use crate::commands::open_storage;
use crate::config::CliConfig;

pub async fn handle(action: crate::ExecutionsAction) -> Result<()> {
    match action {
        crate::ExecutionsAction::List { limit, scenario } => {
            list_executions(limit, scenario.as_deref()).await
        }
        crate::ExecutionsAction::Logs { id } => show_logs(id).await,
    }
}

async fn list_executions(limit: i64, scenario: Option<&str>) -> Result<()> {
    let config = CliConfig::load()?;
    let storage = open_storage(&config).await?;

    let filter = ExecutionFilter {
        scenario_name: scenario.map(String::from),
        status: None,
        limit: Some(limit),
        offset: None,
    };

    let records = storage.executions().list(&filter).await?;
    if records.is_empty() {
        println!("没有执行记录");
        return Ok(());
    }

    for record in records {
        let status = match record.status.as_str() {
            "Completed" => record.status.green(),
            "Running" => record.status.cyan(),
            "Aborted" => record.status.yellow(),
            _ => record.status.red(),
        };

        let end = record
            .end_time
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());

        println!(
            "{:>6}  {:<10}  {}  {}  -> {}",
            record.id,
            status,
            record.start_time.format("%Y-%m-%d %H:%M:%S"),
            record.scenario_name.cyan(),
            end.bright_black()
        );
    }

    Ok(())
}

async fn show_logs(id: i64) -> Result<()> {
    let config = CliConfig::load()?;
    let storage = open_storage(&config).await?;

    let record = storage
        .executions()
        .get_by_id(id)
        .await?
        .with_context(|| format!("执行记录不存在: {}", id))?;

    println!(
        "执行 {} - 场景 {} @ {} ({})",
        record.id,
        record.scenario_name.cyan(),
        record.server_profile,
        record.status
    );
    println!();

    let logs = storage.logs().get_by_execution(id).await?;
    if logs.is_empty() {
        println!("没有日志");
        return Ok(());
    }

    for entry in logs {
        let level = match entry.level.as_str() {
            "ERROR" | "SSH_FAIL" => entry.level.red().bold(),
            "WARN" => entry.level.yellow(),
            "SENT" | "RECV" => entry.level.cyan(),
            "SSH_CMD" | "SSH_OUT" => entry.level.blue(),
            _ => entry.level.normal(),
        };

        println!(
            "{} [{}] {}",
            entry.timestamp.format("%H:%M:%S%.3f"),
            level,
            entry.message
        );

        if let Some(detail) = &entry.detail {
            for line in detail.lines() {
                println!("    {}", line.bright_black());
            }
        }
    }

    Ok(())
}
