//! RTC CLI 应用

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

#[derive(Parser)]
#[command(name = "rtc")]
#[command(about = "RTC - RADIUS 测试控制台", long_about = None)]
#[command(version)]
struct Cli {
    /// 日志级别
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 场景管理
    Scenario {
        #[command(subcommand)]
        action: ScenarioAction,
    },

    /// 执行记录管理
    Executions {
        #[command(subcommand)]
        action: ExecutionsAction,
    },

    /// 目标服务器档案管理
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
}

#[derive(Subcommand)]
enum ScenarioAction {
    /// 执行场景文件
    Run {
        /// 场景文件 (.yaml/.yml/.json)
        file: String,

        /// 目标档案名称（数据库中已保存的档案）
        #[arg(long, short = 'p', conflicts_with = "profile_file")]
        profile: Option<String>,

        /// 目标档案文件 (.yaml)
        #[arg(long, conflicts_with = "profile")]
        profile_file: Option<String>,
    },
    /// 校验场景文件
    Validate {
        /// 场景文件 (.yaml/.yml/.json)
        file: String,
    },
    /// 列出已保存的场景
    List,
    /// 保存场景文件到数据库
    Save {
        /// 场景文件 (.yaml/.yml/.json)
        file: String,
    },
}

#[derive(Subcommand)]
enum ExecutionsAction {
    /// 列出执行记录
    List {
        /// 最多显示条数
        #[arg(long, default_value = "20")]
        limit: i64,

        /// 按场景名称过滤
        #[arg(long)]
        scenario: Option<String>,
    },
    /// 显示一次执行的全部日志
    Logs {
        /// 执行 ID
        id: i64,
    },
}

#[derive(Subcommand)]
enum ProfileAction {
    /// 从 YAML 文件导入档案
    Import {
        /// 档案文件 (.yaml)
        file: String,
    },
    /// 显示档案
    Show {
        /// 档案名称
        name: String,
    },
    /// 列出所有档案
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 初始化日志
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Scenario { action } => commands::scenario::handle(action).await,
        Commands::Executions { action } => commands::executions::handle(action).await,
        Commands::Profile { action } => commands::profile::handle(action).await,
    }
}
