//! Profile 命令处理

use anyhow::{Context, Result};
use colored::Colorize;
use rtc_executor::ServerProfile;

use crate::commands::{open_storage, profile_to_record, record_to_profile};
use crate::config::CliConfig;

pub async fn handle(action: crate::ProfileAction) -> Result<()> {
    match action {
        crate::ProfileAction::Import { file } => import_profile(&file).await,
        crate::ProfileAction::Show { name } => show_profile(&name).await,
        crate::ProfileAction::List => list_profiles().await,
    }
}

async fn import_profile(file: &str) -> Result<()> {
    let config = CliConfig::load()?;
    let storage = open_storage(&config).await?;

    let profile =
        ServerProfile::from_yaml_file(file).with_context(|| format!("加载档案失败: {}", file))?;

    let record = profile_to_record(&profile)?;
    storage.profiles().upsert(&record).await?;

    println!(
        "{} 档案已导入: {} ({})",
        "✓".green().bold(),
        profile.name.cyan(),
        profile.host
    );
    Ok(())
}

async fn show_profile(name: &str) -> Result<()> {
    let config = CliConfig::load()?;
    let storage = open_storage(&config).await?;

    let record = storage
        .profiles()
        .get_by_name(name)
        .await?
        .with_context(|| format!("档案不存在: {}", name))?;

    let profile = record_to_profile(&record)?;

    println!("名称: {}", profile.name.cyan());
    println!("主机: {}", profile.host);
    println!("SSH: {}@{}:{}", profile.ssh_user, profile.host, profile.ssh_port);
    println!("RADIUS 端口: 认证 {} / 计费 {}", profile.auth_port, profile.acct_port);

    if profile.preamble.is_empty() {
        println!("前置命令: 无");
    } else {
        println!("前置命令:");
        for (index, command) in profile.preamble.iter().enumerate() {
            let marker = if command.enabled {
                "●".green()
            } else {
                "○".bright_black()
            };
            print!("  {} {}. {}", marker, index + 1, command.command);
            if let Some(expected) = &command.expect_output {
                print!("  (期望输出: {})", expected.bright_black());
            }
            println!();
        }
    }

    Ok(())
}

async fn list_profiles() -> Result<()> {
    let config = CliConfig::load()?;
    let storage = open_storage(&config).await?;

    let records = storage.profiles().list().await?;
    if records.is_empty() {
        println!("没有已保存的档案");
        return Ok(());
    }

    for record in records {
        println!(
            "{}  {}:{}/{}  前置命令 {} 条",
            record.name.cyan(),
            record.host,
            record.auth_port,
            record.acct_port,
            record
                .preamble
                .as_deref()
                .and_then(|p| serde_json::from_str::<Vec<serde_json::Value>>(p).ok())
                .map(|v| v.len())
                .unwrap_or(0)
        );
    }

    Ok(())
}
