//! 命令处理

pub mod executions;
pub mod profile;
pub mod scenario;

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use rtc_executor::{ServerProfile, SshPreambleCommand};
use rtc_storage::{ServerProfileRecord, Storage, StorageManager};

use crate::config::CliConfig;

/// 打开本地数据库
pub(crate) async fn open_storage(config: &CliConfig) -> Result<Arc<Storage>> {
    let manager = StorageManager::new(&config.database.path)
        .await
        .with_context(|| format!("打开数据库失败: {}", config.database.path))?;
    Ok(Arc::new(Storage::from_manager(&manager)))
}

/// 数据库记录转运行时档案
pub(crate) fn record_to_profile(record: &ServerProfileRecord) -> Result<ServerProfile> {
    let preamble: Vec<SshPreambleCommand> = match &record.preamble {
        Some(json) => serde_json::from_str(json)
            .with_context(|| format!("档案 {} 的前置命令解析失败", record.name))?,
        None => Vec::new(),
    };

    Ok(ServerProfile {
        name: record.name.clone(),
        host: record.host.clone(),
        ssh_port: record.ssh_port as u16,
        ssh_user: record.ssh_user.clone(),
        ssh_password: record.ssh_password.clone(),
        ssh_key_path: record.ssh_key_path.clone(),
        auth_port: record.auth_port as u16,
        acct_port: record.acct_port as u16,
        secret: record.secret.clone(),
        preamble,
    })
}

/// 运行时档案转数据库记录
pub(crate) fn profile_to_record(profile: &ServerProfile) -> Result<ServerProfileRecord> {
    let preamble = if profile.preamble.is_empty() {
        None
    } else {
        Some(serde_json::to_string(&profile.preamble).context("前置命令序列化失败")?)
    };

    Ok(ServerProfileRecord {
        id: 0,
        name: profile.name.clone(),
        host: profile.host.clone(),
        ssh_port: profile.ssh_port as i32,
        ssh_user: profile.ssh_user.clone(),
        ssh_password: profile.ssh_password.clone(),
        ssh_key_path: profile.ssh_key_path.clone(),
        auth_port: profile.auth_port as i32,
        acct_port: profile.acct_port as i32,
        secret: profile.secret.clone(),
        preamble,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    })
}
