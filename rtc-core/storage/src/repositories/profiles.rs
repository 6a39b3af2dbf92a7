use sqlx::SqlitePool;
use tracing::debug;

use crate::error::Result;
use crate::models::ServerProfileRecord;

/// 目标服务器档案仓储
pub struct ProfileRepository {
    pool: SqlitePool,
}

impl ProfileRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 保存档案（同名覆盖）
    #[allow(clippy::too_many_arguments)]
    pub async fn upsert(&self, profile: &ServerProfileRecord) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO server_profiles
            (name, host, ssh_port, ssh_user, ssh_password, ssh_key_path,
             auth_port, acct_port, secret, preamble)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(name) DO UPDATE SET
                host = excluded.host,
                ssh_port = excluded.ssh_port,
                ssh_user = excluded.ssh_user,
                ssh_password = excluded.ssh_password,
                ssh_key_path = excluded.ssh_key_path,
                auth_port = excluded.auth_port,
                acct_port = excluded.acct_port,
                secret = excluded.secret,
                preamble = excluded.preamble,
                updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(&profile.name)
        .bind(&profile.host)
        .bind(profile.ssh_port)
        .bind(&profile.ssh_user)
        .bind(&profile.ssh_password)
        .bind(&profile.ssh_key_path)
        .bind(profile.auth_port)
        .bind(profile.acct_port)
        .bind(&profile.secret)
        .bind(&profile.preamble)
        .execute(&self.pool)
        .await?;

        debug!("Upserted server profile: {}", profile.name);
        Ok(result.last_insert_rowid())
    }

    /// 根据名称获取档案
    pub async fn get_by_name(&self, name: &str) -> Result<Option<ServerProfileRecord>> {
        let record = sqlx::query_as::<_, ServerProfileRecord>(
            r#"
            SELECT id, name, host, ssh_port, ssh_user, ssh_password, ssh_key_path,
                   auth_port, acct_port, secret, preamble, created_at, updated_at
            FROM server_profiles
            WHERE name = ?
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// 列出所有档案
    pub async fn list(&self) -> Result<Vec<ServerProfileRecord>> {
        let records = sqlx::query_as::<_, ServerProfileRecord>(
            r#"
            SELECT id, name, host, ssh_port, ssh_user, ssh_password, ssh_key_path,
                   auth_port, acct_port, secret, preamble, created_at, updated_at
            FROM server_profiles
            ORDER BY name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}
