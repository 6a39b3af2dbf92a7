mod connection;
mod error;
mod models;
mod repositories;

pub use connection::StorageManager;
pub use error::{Result, StorageError};
pub use models::*;
pub use repositories::*;

use sqlx::SqlitePool;

/// 统一的数据访问层入口
pub struct Storage {
    _pool: SqlitePool,
    executions: ExecutionRepository,
    logs: LogRepository,
    summaries: SummaryRepository,
    scenarios: ScenarioRepository,
    profiles: ProfileRepository,
    packets: PacketRepository,
}

impl Storage {
    /// 从 StorageManager 创建 Storage
    pub fn from_manager(manager: &StorageManager) -> Self {
        let pool = manager.pool().clone();
        Self {
            _pool: pool.clone(),
            executions: ExecutionRepository::new(pool.clone()),
            logs: LogRepository::new(pool.clone()),
            summaries: SummaryRepository::new(pool.clone()),
            scenarios: ScenarioRepository::new(pool.clone()),
            profiles: ProfileRepository::new(pool.clone()),
            packets: PacketRepository::new(pool),
        }
    }

    /// 获取执行记录仓储
    pub fn executions(&self) -> &ExecutionRepository {
        &self.executions
    }

    /// 获取执行日志仓储
    pub fn logs(&self) -> &LogRepository {
        &self.logs
    }

    /// 获取结果汇总仓储
    pub fn summaries(&self) -> &SummaryRepository {
        &self.summaries
    }

    /// 获取场景仓储
    pub fn scenarios(&self) -> &ScenarioRepository {
        &self.scenarios
    }

    /// 获取服务器档案仓储
    pub fn profiles(&self) -> &ProfileRepository {
        &self.profiles
    }

    /// 获取报文模板仓储
    pub fn packets(&self) -> &PacketRepository {
        &self.packets
    }

    /// 获取数据库连接池
    pub fn pool(&self) -> &SqlitePool {
        &self._pool
    }
}
