// 数据库集成测试
use chrono::Utc;
use rtc_common::{ExecutionStatus, LogEntry, LogLevel};
use rtc_storage::{
    ExecutionFilter, ExecutionRepository, LogRepository, PacketRepository, ProfileRepository,
    ResultSummaryRecord, ScenarioRepository, ServerProfileRecord, Storage, StorageManager,
    SummaryRepository,
};
use sqlx::SqlitePool;

/// 创建测试数据库 (内存模式)
async fn setup_test_db() -> SqlitePool {
    let manager = StorageManager::new_in_memory()
        .await
        .expect("Failed to create test database");
    manager.pool().clone()
}

/// 创建测试档案记录
fn create_test_profile(name: &str) -> ServerProfileRecord {
    ServerProfileRecord {
        id: 0,
        name: name.to_string(),
        host: "10.0.3.21".to_string(),
        ssh_port: 22,
        ssh_user: "root".to_string(),
        ssh_password: Some("secret".to_string()),
        ssh_key_path: None,
        auth_port: 1812,
        acct_port: 1813,
        secret: "testing123".to_string(),
        preamble: Some(r#"[{"command":"systemctl restart radiusd","enabled":true}]"#.to_string()),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

// ==================== ExecutionRepository 测试 ====================

#[tokio::test]
async fn test_create_execution() {
    let pool = setup_test_db().await;
    let repo = ExecutionRepository::new(pool);

    let id = repo
        .create("auth-basic", "lab-server", Utc::now())
        .await
        .unwrap();
    assert!(id > 0);

    let record = repo.get_by_id(id).await.unwrap().unwrap();
    assert_eq!(record.scenario_name, "auth-basic");
    assert_eq!(record.server_profile, "lab-server");
    assert_eq!(record.status, "Running");
    assert!(record.end_time.is_none());
}

#[tokio::test]
async fn test_finish_execution() {
    let pool = setup_test_db().await;
    let repo = ExecutionRepository::new(pool);

    let id = repo
        .create("auth-basic", "lab-server", Utc::now())
        .await
        .unwrap();

    repo.finish(id, Utc::now(), ExecutionStatus::Completed)
        .await
        .unwrap();

    let record = repo.get_by_id(id).await.unwrap().unwrap();
    assert_eq!(record.status, "Completed");
    assert!(record.end_time.is_some());
}

#[tokio::test]
async fn test_finish_rejects_double_terminal() {
    let pool = setup_test_db().await;
    let repo = ExecutionRepository::new(pool);

    let id = repo
        .create("auth-basic", "lab-server", Utc::now())
        .await
        .unwrap();

    repo.finish(id, Utc::now(), ExecutionStatus::Failed)
        .await
        .unwrap();

    // 终态记录不允许再次迁移
    let result = repo.finish(id, Utc::now(), ExecutionStatus::Completed).await;
    assert!(result.is_err());

    let record = repo.get_by_id(id).await.unwrap().unwrap();
    assert_eq!(record.status, "Failed");
}

#[tokio::test]
async fn test_finish_rejects_running_status() {
    let pool = setup_test_db().await;
    let repo = ExecutionRepository::new(pool);

    let id = repo
        .create("auth-basic", "lab-server", Utc::now())
        .await
        .unwrap();

    let result = repo.finish(id, Utc::now(), ExecutionStatus::Running).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_list_executions_filter() {
    let pool = setup_test_db().await;
    let repo = ExecutionRepository::new(pool);

    let id1 = repo.create("auth-basic", "lab", Utc::now()).await.unwrap();
    let _id2 = repo.create("acct-basic", "lab", Utc::now()).await.unwrap();

    repo.finish(id1, Utc::now(), ExecutionStatus::Completed)
        .await
        .unwrap();

    let filter = ExecutionFilter {
        scenario_name: Some("auth-basic".to_string()),
        ..Default::default()
    };
    let records = repo.list(&filter).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].scenario_name, "auth-basic");

    let filter = ExecutionFilter {
        status: Some("Running".to_string()),
        ..Default::default()
    };
    let records = repo.list(&filter).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].scenario_name, "acct-basic");
}

// ==================== LogRepository 测试 ====================

#[tokio::test]
async fn test_append_and_read_logs() {
    let pool = setup_test_db().await;
    let executions = ExecutionRepository::new(pool.clone());
    let logs = LogRepository::new(pool);

    let id = executions
        .create("auth-basic", "lab", Utc::now())
        .await
        .unwrap();

    let entries = vec![
        LogEntry::info("开始执行"),
        LogEntry::new(LogLevel::Sent, "Access-Request 已发送").with_detail("User-Name = alice"),
        LogEntry::new(LogLevel::Recv, "Access-Accept 已接收"),
    ];

    logs.append_batch(id, &entries).await.unwrap();

    let records = logs.get_by_execution(id).await.unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(records[0].level, "INFO");
    assert_eq!(records[1].level, "SENT");
    assert_eq!(records[1].detail.as_deref(), Some("User-Name = alice"));
    assert_eq!(records[2].level, "RECV");

    // seq 保持写入顺序
    assert!(records.windows(2).all(|w| w[0].seq < w[1].seq));
}

#[tokio::test]
async fn test_append_empty_batch() {
    let pool = setup_test_db().await;
    let executions = ExecutionRepository::new(pool.clone());
    let logs = LogRepository::new(pool);

    let id = executions
        .create("auth-basic", "lab", Utc::now())
        .await
        .unwrap();

    logs.append_batch(id, &[]).await.unwrap();
    assert_eq!(logs.count(id).await.unwrap(), 0);
}

#[tokio::test]
async fn test_log_batches_are_independent() {
    let pool = setup_test_db().await;
    let executions = ExecutionRepository::new(pool.clone());
    let logs = LogRepository::new(pool);

    let id1 = executions.create("s", "lab", Utc::now()).await.unwrap();
    let id2 = executions.create("s", "lab", Utc::now()).await.unwrap();
    assert_ne!(id1, id2);

    logs.append_batch(id1, &[LogEntry::info("run 1")]).await.unwrap();
    logs.append_batch(id2, &[LogEntry::info("run 2"), LogEntry::info("more")])
        .await
        .unwrap();

    assert_eq!(logs.count(id1).await.unwrap(), 1);
    assert_eq!(logs.count(id2).await.unwrap(), 2);
}

// ==================== SummaryRepository 测试 ====================

#[tokio::test]
async fn test_create_summary() {
    let pool = setup_test_db().await;
    let executions = ExecutionRepository::new(pool.clone());
    let summaries = SummaryRepository::new(pool);

    let id = executions
        .create("auth-basic", "lab", Utc::now())
        .await
        .unwrap();

    let summary = ResultSummaryRecord {
        id: 0,
        execution_id: id,
        total_steps: 4,
        success_count: 3,
        failed_count: 1,
        skipped_count: 0,
        duration_ms: Some(1520),
        passed: false,
        created_at: Utc::now(),
    };

    summaries.create(&summary).await.unwrap();

    let record = summaries.get_by_execution(id).await.unwrap().unwrap();
    assert_eq!(record.total_steps, 4);
    assert_eq!(record.failed_count, 1);
    assert!(!record.passed);
}

// ==================== ScenarioRepository 测试 ====================

#[tokio::test]
async fn test_scenario_upsert_and_get() {
    let pool = setup_test_db().await;
    let repo = ScenarioRepository::new(pool);

    repo.upsert("auth-basic", Some("基础认证"), "name: auth-basic\nsteps: []", None)
        .await
        .unwrap();

    let record = repo.get_by_name("auth-basic").await.unwrap().unwrap();
    assert_eq!(record.version, 1);

    // 同名覆盖递增版本
    repo.upsert("auth-basic", Some("基础认证 v2"), "name: auth-basic\nsteps: []", None)
        .await
        .unwrap();

    let record = repo.get_by_name("auth-basic").await.unwrap().unwrap();
    assert_eq!(record.version, 2);
    assert_eq!(record.description.as_deref(), Some("基础认证 v2"));
}

#[tokio::test]
async fn test_scenario_delete() {
    let pool = setup_test_db().await;
    let repo = ScenarioRepository::new(pool);

    repo.upsert("temp", None, "name: temp\nsteps: []", None)
        .await
        .unwrap();
    assert!(repo.delete("temp").await.unwrap());
    assert!(!repo.delete("temp").await.unwrap());
    assert!(repo.get_by_name("temp").await.unwrap().is_none());
}

// ==================== ProfileRepository 测试 ====================

#[tokio::test]
async fn test_profile_upsert_and_get() {
    let pool = setup_test_db().await;
    let repo = ProfileRepository::new(pool);

    let profile = create_test_profile("lab-server");
    repo.upsert(&profile).await.unwrap();

    let record = repo.get_by_name("lab-server").await.unwrap().unwrap();
    assert_eq!(record.host, "10.0.3.21");
    assert_eq!(record.auth_port, 1812);
    assert!(record.preamble.is_some());

    let all = repo.list().await.unwrap();
    assert_eq!(all.len(), 1);
}

// ==================== PacketRepository 测试 ====================

#[tokio::test]
async fn test_packet_upsert_and_get() {
    let pool = setup_test_db().await;
    let repo = PacketRepository::new(pool);

    let attrs = r#"[{"name":"User-Name","value":"${imsi}"},{"name":"User-Password","value":"${password}"}]"#;
    repo.upsert("auth-request", "Access-Request", attrs, Some("标准认证报文"))
        .await
        .unwrap();

    let record = repo.get_by_name("auth-request").await.unwrap().unwrap();
    assert_eq!(record.code, "Access-Request");
    assert!(record.attributes.contains("User-Name"));

    assert!(repo.get_by_name("missing").await.unwrap().is_none());
}

// ==================== Storage 门面测试 ====================

#[tokio::test]
async fn test_storage_facade() {
    let manager = StorageManager::new_in_memory().await.unwrap();
    let storage = Storage::from_manager(&manager);

    let id = storage
        .executions()
        .create("auth-basic", "lab", Utc::now())
        .await
        .unwrap();

    storage
        .logs()
        .append_batch(id, &[LogEntry::info("hello")])
        .await
        .unwrap();

    assert_eq!(storage.logs().count(id).await.unwrap(), 1);
}
