//! Scenario 命令处理

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use rtc_executor::{
    ExecutionController, MySqlQueryClient, RadclientTool, ReqwestCaller, Scenario, ServerProfile,
    SshExecutorConnector, StoragePacketSource,
};
use rtc_radius_tool::RadiusToolConfig;

use crate::commands::{open_storage, record_to_profile};
use crate::config::CliConfig;

pub async fn handle(action: crate::ScenarioAction) -> Result<()> {
    match action {
        crate::ScenarioAction::Run {
            file,
            profile,
            profile_file,
        } => run_scenario(&file, profile.as_deref(), profile_file.as_deref()).await,
        crate::ScenarioAction::Validate { file } => validate_scenario(&file),
        crate::ScenarioAction::List => list_scenarios().await,
        crate::ScenarioAction::Save { file } => save_scenario(&file).await,
    }
}

/// 按扩展名加载场景文件
fn load_scenario(file: &str) -> Result<Scenario> {
    let path = Path::new(file);
    let ext = path.extension().and_then(|s| s.to_str());

    match ext {
        Some("yaml") | Some("yml") => {
            Scenario::from_yaml_file(path).with_context(|| format!("加载场景失败: {}", file))
        }
        Some("json") => {
            Scenario::from_json_file(path).with_context(|| format!("加载场景失败: {}", file))
        }
        _ => anyhow::bail!("不支持的场景文件格式，仅支持 .yaml/.yml 或 .json"),
    }
}

fn spinner(message: String) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        bar.set_style(style);
    }
    bar.set_message(message);
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

async fn run_scenario(
    file: &str,
    profile_name: Option<&str>,
    profile_file: Option<&str>,
) -> Result<()> {
    let config = CliConfig::load()?;

    // 加载场景
    let bar = spinner(format!("加载场景: {}", file));
    let scenario = load_scenario(file)?;
    bar.finish_with_message(format!(
        "{} 场景加载成功: {}",
        "✓".green().bold(),
        scenario.name.cyan()
    ));

    println!();
    if let Some(desc) = &scenario.description {
        println!("描述: {}", desc.bright_black());
    }
    println!("步骤数: {}", scenario.steps.len().to_string().yellow());
    if !scenario.tags.is_empty() {
        println!("标签: {}", scenario.tags.join(", ").bright_black());
    }
    println!();

    // 打开数据库并解析目标档案
    let storage = open_storage(&config).await?;

    let profile: ServerProfile = if let Some(path) = profile_file {
        ServerProfile::from_yaml_file(path).with_context(|| format!("加载档案失败: {}", path))?
    } else if let Some(name) = profile_name {
        let record = storage
            .profiles()
            .get_by_name(name)
            .await
            .context("读取档案失败")?
            .with_context(|| format!("档案不存在: {}", name))?;
        record_to_profile(&record)?
    } else {
        anyhow::bail!("必须通过 --profile 或 --profile-file 指定目标服务器");
    };

    println!(
        "目标服务器: {} ({}:{}/{})",
        profile.name.cyan(),
        profile.host,
        profile.auth_port,
        profile.acct_port
    );
    if !profile.preamble.is_empty() {
        println!("前置命令: {} 条", profile.preamble.len().to_string().yellow());
    }
    println!();

    // 组装执行控制器
    let tool_config = RadiusToolConfig::default()
        .with_binary(&config.radius_tool.binary)
        .request_timeout(Duration::from_secs(config.radius_tool.timeout_secs))
        .retries(config.radius_tool.retries);

    let mut controller = ExecutionController::new(
        Arc::clone(&storage),
        Arc::new(SshExecutorConnector),
        Arc::new(RadclientTool::new(tool_config)),
        Arc::new(ReqwestCaller::new(Duration::from_secs(
            config.http.timeout_secs,
        ))?),
        Arc::new(StoragePacketSource::new(Arc::clone(&storage))),
    );

    if let Some(check_db) = &config.check_database {
        let client = MySqlQueryClient::connect(&check_db.url)
            .await
            .context("连接目标数据库失败")?;
        controller = controller.with_database(Arc::new(client));
    }

    // 实时打印运行日志
    let receiver = controller.subscribe();
    let printer = tokio::spawn(async move {
        while let Ok(entry) = receiver.recv().await {
            let level = match entry.level.as_tag() {
                "ERROR" | "SSH_FAIL" => entry.level.as_tag().red().bold(),
                "WARN" => entry.level.as_tag().yellow(),
                "SENT" | "RECV" => entry.level.as_tag().cyan(),
                _ => entry.level.as_tag().normal(),
            };
            println!(
                "  {} [{}] {}",
                entry.timestamp.format("%H:%M:%S%.3f"),
                level,
                entry.message
            );
        }
    });

    // 执行
    let execution_id = controller.start(&scenario, &profile).await?;
    printer.await.ok();

    // 展示结果
    let record = storage
        .executions()
        .get_by_id(execution_id)
        .await?
        .context("执行记录丢失")?;

    println!();
    let status = match record.status.as_str() {
        "Completed" => record.status.green().bold(),
        "Aborted" => record.status.yellow().bold(),
        _ => record.status.red().bold(),
    };
    println!("执行 {} 结束: {}", execution_id, status);

    if let Some(summary) = storage.summaries().get_by_execution(execution_id).await? {
        println!(
            "步骤: {} 成功 / {} 失败 / {} 跳过 (共 {})",
            summary.success_count.to_string().green(),
            summary.failed_count.to_string().red(),
            summary.skipped_count.to_string().yellow(),
            summary.total_steps
        );
        if let Some(duration) = summary.duration_ms {
            println!("耗时: {} ms", duration);
        }
    }

    if record.status != "Completed" {
        std::process::exit(1);
    }

    Ok(())
}

fn validate_scenario(file: &str) -> Result<()> {
    let scenario = load_scenario(file)?;
    println!(
        "{} 场景合法: {} ({} 个步骤, {} 个变量)",
        "✓".green().bold(),
        scenario.name.cyan(),
        scenario.steps.len(),
        scenario.variables.len()
    );
    Ok(())
}

async fn list_scenarios() -> Result<()> {
    let config = CliConfig::load()?;
    let storage = open_storage(&config).await?;

    let records = storage.scenarios().list().await?;
    if records.is_empty() {
        println!("没有已保存的场景");
        return Ok(());
    }

    for record in records {
        println!(
            "{}  v{}  {}",
            record.name.cyan(),
            record.version,
            record.description.unwrap_or_default().bright_black()
        );
    }
    Ok(())
}

async fn save_scenario(file: &str) -> Result<()> {
    let config = CliConfig::load()?;
    let storage = open_storage(&config).await?;

    let scenario = load_scenario(file)?;
    let definition = scenario.to_yaml()?;
    let tags = if scenario.tags.is_empty() {
        None
    } else {
        Some(serde_json::to_string(&scenario.tags)?)
    };

    storage
        .scenarios()
        .upsert(
            &scenario.name,
            scenario.description.as_deref(),
            &definition,
            tags.as_deref(),
        )
        .await?;

    println!("{} 场景已保存: {}", "✓".green().bold(), scenario.name.cyan());
    Ok(())
}
