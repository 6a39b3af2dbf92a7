//! 运行日志聚合
//!
//! 一次执行产生一个聚合器：append 同时写入内存批次与实时观察流，
//! flush 在终态时把整个批次一次性落库。批次在 flush 前由聚合器独占，
//! flush 后由存储层持有唯一的持久副本。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use rtc_common::LogEntry;
use rtc_storage::LogRepository;
use tracing::debug;

use crate::{ExecutorError, Result};

/// 日志聚合器
pub struct LogAggregator {
    /// 内存批次
    entries: Mutex<Vec<LogEntry>>,

    /// 实时观察流发送端
    observers: Mutex<Vec<async_channel::Sender<LogEntry>>>,

    /// 是否已落库（每次执行只允许一次 flush）
    flushed: AtomicBool,
}

impl Default for LogAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl LogAggregator {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            observers: Mutex::new(Vec::new()),
            flushed: AtomicBool::new(false),
        }
    }

    /// 订阅实时日志流
    pub fn subscribe(&self) -> async_channel::Receiver<LogEntry> {
        let (sender, receiver) = async_channel::unbounded();
        self.add_observer(sender);
        receiver
    }

    /// 挂接一个已有的观察流发送端
    pub fn add_observer(&self, sender: async_channel::Sender<LogEntry>) {
        self.observers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(sender);
    }

    /// 追加一条日志
    ///
    /// 实时流先行；已关闭的观察端顺手清理。
    pub fn append(&self, entry: LogEntry) {
        {
            let mut observers = self
                .observers
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            observers.retain(|sender| sender.try_send(entry.clone()).is_ok());
        }

        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(entry);
    }

    /// 批量追加
    pub fn append_all(&self, entries: Vec<LogEntry>) {
        for entry in entries {
            self.append(entry);
        }
    }

    /// 当前批次条数
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 将批次一次性落库
    ///
    /// 每次执行只允许调用一次；重复调用返回错误而不是静默吞掉。
    pub async fn flush(&self, execution_id: i64, repository: &LogRepository) -> Result<usize> {
        if self.flushed.swap(true, Ordering::SeqCst) {
            return Err(ExecutorError::ValidationError(format!(
                "执行 {} 的日志批次已落库",
                execution_id
            )));
        }

        let batch: Vec<LogEntry> = {
            let mut entries = self
                .entries
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            std::mem::take(&mut *entries)
        };

        repository
            .append_batch(execution_id, &batch)
            .await
            .map_err(|e| ExecutorError::DatabaseError(e.to_string()))?;

        // 落库完成后关闭实时流
        self.observers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();

        debug!("执行 {} 的 {} 条日志已落库", execution_id, batch.len());
        Ok(batch.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtc_common::LogLevel;
    use rtc_storage::{Storage, StorageManager};

    #[tokio::test]
    async fn test_append_and_subscribe() {
        let aggregator = LogAggregator::new();
        let receiver = aggregator.subscribe();

        aggregator.append(LogEntry::info("first"));
        aggregator.append(LogEntry::new(LogLevel::Sent, "second"));

        assert_eq!(aggregator.len(), 2);

        let first = receiver.recv().await.unwrap();
        assert_eq!(first.message, "first");
        let second = receiver.recv().await.unwrap();
        assert_eq!(second.level, LogLevel::Sent);
    }

    #[tokio::test]
    async fn test_dropped_subscriber_is_pruned() {
        let aggregator = LogAggregator::new();
        let receiver = aggregator.subscribe();
        drop(receiver);

        aggregator.append(LogEntry::info("after drop"));
        assert_eq!(aggregator.len(), 1);
    }

    #[tokio::test]
    async fn test_flush_once() {
        let manager = StorageManager::new_in_memory().await.unwrap();
        let storage = Storage::from_manager(&manager);
        let execution_id = storage
            .executions()
            .create("s", "p", chrono::Utc::now())
            .await
            .unwrap();

        let aggregator = LogAggregator::new();
        aggregator.append(LogEntry::info("one"));
        aggregator.append(LogEntry::info("two"));

        let count = aggregator.flush(execution_id, storage.logs()).await.unwrap();
        assert_eq!(count, 2);
        assert_eq!(storage.logs().count(execution_id).await.unwrap(), 2);

        // 第二次 flush 被拒绝
        let second = aggregator.flush(execution_id, storage.logs()).await;
        assert!(second.is_err());
        assert_eq!(storage.logs().count(execution_id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_timestamps_non_decreasing() {
        let aggregator = LogAggregator::new();
        for i in 0..20 {
            aggregator.append(LogEntry::info(format!("entry {}", i)));
        }

        let entries = aggregator
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        assert!(entries
            .windows(2)
            .all(|pair| pair[0].timestamp <= pair[1].timestamp));
    }
}
