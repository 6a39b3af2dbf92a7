//! RADIUS 工具配置

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// RADIUS 工具配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RadiusToolConfig {
    /// 工具二进制路径（默认从 PATH 查找 radclient）
    #[serde(default = "default_binary")]
    pub binary: PathBuf,

    /// 单次请求超时（秒）
    #[serde(with = "secs_serde", default = "default_request_timeout")]
    pub request_timeout: Duration,

    /// 重发次数
    #[serde(default = "default_retries")]
    pub retries: u32,
}

fn default_binary() -> PathBuf {
    PathBuf::from("radclient")
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_retries() -> u32 {
    3
}

impl Default for RadiusToolConfig {
    fn default() -> Self {
        Self {
            binary: default_binary(),
            request_timeout: default_request_timeout(),
            retries: default_retries(),
        }
    }
}

impl RadiusToolConfig {
    /// 指定工具二进制路径
    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    /// 设置单次请求超时
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// 设置重发次数
    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }
}

/// 以秒为单位序列化 Duration
mod secs_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RadiusToolConfig::default();
        assert_eq!(config.binary, PathBuf::from("radclient"));
        assert_eq!(config.retries, 3);
        assert_eq!(config.request_timeout.as_secs(), 5);
    }

    #[test]
    fn test_config_builder() {
        let config = RadiusToolConfig::default()
            .with_binary("/usr/local/bin/radclient")
            .retries(1)
            .request_timeout(Duration::from_secs(2));
        assert_eq!(config.binary, PathBuf::from("/usr/local/bin/radclient"));
        assert_eq!(config.retries, 1);
        assert_eq!(config.request_timeout.as_secs(), 2);
    }
}
