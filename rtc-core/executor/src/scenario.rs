//! 测试场景定义

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use rtc_ssh_executor::SshConfig;

/// 变量生成方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableKind {
    /// 固定值
    Static,
    /// 每次引用重新生成的随机字符串
    RandomString,
    /// 每次引用重新生成的有界随机整数
    RandomNumber,
    /// 列表值（整体按声明值替换）
    List,
}

/// 场景变量
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioVariable {
    /// 变量名（场景内唯一）
    pub name: String,

    /// 生成方式（默认 static）
    #[serde(default = "default_variable_kind")]
    pub kind: VariableKind,

    /// 源值/模式
    ///
    /// - static/list: 替换用的字面值
    /// - random_string: 生成长度（可选）
    /// - random_number: `min..max` 取值范围（可选）
    #[serde(default)]
    pub value: String,
}

fn default_variable_kind() -> VariableKind {
    VariableKind::Static
}

impl ScenarioVariable {
    /// 创建固定值变量
    pub fn fixed(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: VariableKind::Static,
            value: value.into(),
        }
    }
}

/// RADIUS 报文属性
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacketAttribute {
    /// 属性名
    pub name: String,
    /// 属性值（可包含 ${变量} 占位符）
    pub value: String,
}

impl PacketAttribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// RADIUS 报文模板
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacketTemplate {
    /// 模板名称
    pub name: String,

    /// 报文类型（默认 Access-Request）
    #[serde(default = "default_packet_code")]
    pub code: String,

    /// 属性列表
    pub attributes: Vec<PacketAttribute>,
}

fn default_packet_code() -> String {
    "Access-Request".to_string()
}

/// RADIUS 目标端口类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PortKind {
    /// 认证端口
    #[default]
    Auth,
    /// 计费端口
    Acct,
}

/// 测试步骤
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioStep {
    /// 步骤 ID（场景内唯一）
    pub id: String,

    /// 步骤名称（可选，展示用）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// 动作
    pub action: StepAction,
}

impl ScenarioStep {
    /// 展示名称（无名称时退回步骤 ID）
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

/// 动作类型
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepAction {
    /// RADIUS 报文交换
    Radius {
        /// 引用的报文模板名称（与 attributes 二选一）
        #[serde(default, skip_serializing_if = "Option::is_none")]
        packet: Option<String>,

        /// 内联属性列表
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        attributes: Vec<PacketAttribute>,

        /// 内联报文类型（仅对内联属性生效，默认 Access-Request）
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<String>,

        /// 期望应答中出现的属性
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        expect_reply: Vec<PacketAttribute>,

        /// 目标端口（默认认证端口）
        #[serde(default)]
        port: PortKind,
    },

    /// SQL 检查
    Sql {
        /// 查询语句
        query: String,

        /// 期望列名（与 expect_value 成对出现）
        #[serde(default, skip_serializing_if = "Option::is_none")]
        expect_column: Option<String>,

        /// 期望值
        #[serde(default, skip_serializing_if = "Option::is_none")]
        expect_value: Option<String>,
    },

    /// HTTP 调用
    ApiCall {
        /// 请求地址
        url: String,

        /// 请求方法（默认 GET）
        #[serde(default = "default_http_method")]
        method: String,

        /// 请求头
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        headers: Vec<HeaderPair>,

        /// 请求体
        #[serde(default, skip_serializing_if = "Option::is_none")]
        body: Option<String>,

        /// 期望状态码
        #[serde(default, skip_serializing_if = "Option::is_none")]
        expect_status: Option<u16>,

        /// 期望响应体包含的子串
        #[serde(default, skip_serializing_if = "Option::is_none")]
        expect_body_contains: Option<String>,
    },

    /// 延时（毫秒，支持变量占位符）
    Delay { duration_ms: String },

    /// 输出一条日志
    LogMessage { message: String },

    /// 循环开始标记（控制流未实现，仅记录日志）
    LoopStart,

    /// 循环结束标记
    LoopEnd,

    /// 条件开始标记
    ConditionalStart,

    /// 条件结束标记
    ConditionalEnd,
}

fn default_http_method() -> String {
    "GET".to_string()
}

/// HTTP 请求头
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeaderPair {
    pub name: String,
    pub value: String,
}

/// SSH 前置命令
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SshPreambleCommand {
    /// 命令文本
    pub command: String,

    /// 是否启用（禁用的命令跳过并记录）
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// 期望输出子串（在 stdout 或 stderr 中出现）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expect_output: Option<String>,
}

fn default_enabled() -> bool {
    true
}

/// 目标服务器档案
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerProfile {
    /// 档案名称
    pub name: String,

    /// 主机地址
    pub host: String,

    /// SSH 端口（默认 22）
    #[serde(default = "default_ssh_port")]
    pub ssh_port: u16,

    /// SSH 用户（默认 root）
    #[serde(default = "default_ssh_user")]
    pub ssh_user: String,

    /// SSH 密码（优先于密钥）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_password: Option<String>,

    /// SSH 私钥路径
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_key_path: Option<String>,

    /// RADIUS 认证端口（默认 1812）
    #[serde(default = "default_auth_port")]
    pub auth_port: u16,

    /// RADIUS 计费端口（默认 1813）
    #[serde(default = "default_acct_port")]
    pub acct_port: u16,

    /// 共享密钥
    pub secret: String,

    /// 前置 SSH 命令（按声明顺序执行）
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub preamble: Vec<SshPreambleCommand>,
}

fn default_ssh_port() -> u16 {
    22
}

fn default_ssh_user() -> String {
    "root".to_string()
}

fn default_auth_port() -> u16 {
    1812
}

fn default_acct_port() -> u16 {
    1813
}

impl ServerProfile {
    /// 生成 SSH 配置
    ///
    /// 凭据优先级：密码 > 指定密钥 > 默认密钥
    pub fn ssh_config(&self) -> SshConfig {
        let config = if let Some(password) = &self.ssh_password {
            SshConfig::with_password(&self.host, &self.ssh_user, password)
        } else if let Some(key_path) = &self.ssh_key_path {
            SshConfig::with_key(&self.host, &self.ssh_user, key_path)
        } else {
            SshConfig::with_default_key(&self.host, &self.ssh_user)
        };
        config.port(self.ssh_port)
    }

    /// RADIUS 目标地址（host:port）
    pub fn radius_address(&self, port: PortKind) -> String {
        let port = match port {
            PortKind::Auth => self.auth_port,
            PortKind::Acct => self.acct_port,
        };
        format!("{}:{}", self.host, port)
    }

    /// 从 YAML 文件加载档案
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&content).map_err(|e| crate::ExecutorError::SerdeError(e.to_string()))
    }
}

/// 测试场景
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// 数据库 ID（文件加载时为空）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    /// 场景名称
    pub name: String,

    /// 场景描述
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// 场景变量（名称唯一）
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variables: Vec<ScenarioVariable>,

    /// 测试步骤
    pub steps: Vec<ScenarioStep>,

    /// 标签
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl Scenario {
    /// 从 YAML 文件加载场景
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// 从 YAML 字符串加载场景
    pub fn from_yaml_str(yaml: &str) -> crate::Result<Self> {
        let scenario: Scenario = serde_yaml::from_str(yaml)
            .map_err(|e| crate::ExecutorError::ScenarioLoadFailed(e.to_string()))?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// 从 JSON 文件加载场景
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// 从 JSON 字符串加载场景
    pub fn from_json_str(json: &str) -> crate::Result<Self> {
        let scenario: Scenario = serde_json::from_str(json)
            .map_err(|e| crate::ExecutorError::ScenarioLoadFailed(e.to_string()))?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// 导出为 YAML
    pub fn to_yaml(&self) -> crate::Result<String> {
        serde_yaml::to_string(self).map_err(|e| crate::ExecutorError::SerdeError(e.to_string()))
    }

    /// 导出为 JSON
    pub fn to_json(&self) -> crate::Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| crate::ExecutorError::SerdeError(e.to_string()))
    }

    /// 校验场景定义
    ///
    /// - 步骤 ID 场景内唯一
    /// - 变量名唯一
    /// - radius 步骤必须引用模板或携带内联属性
    pub fn validate(&self) -> crate::Result<()> {
        let mut step_ids = HashSet::new();
        for step in &self.steps {
            if !step_ids.insert(step.id.as_str()) {
                return Err(crate::ExecutorError::ConfigError(format!(
                    "步骤 ID 重复: {}",
                    step.id
                )));
            }

            if let StepAction::Radius {
                packet, attributes, ..
            } = &step.action
            {
                if packet.is_none() && attributes.is_empty() {
                    return Err(crate::ExecutorError::ConfigError(format!(
                        "radius 步骤 {} 缺少 packet 或 attributes",
                        step.id
                    )));
                }
            }

            if let StepAction::Sql {
                expect_column,
                expect_value,
                ..
            } = &step.action
            {
                if expect_column.is_some() != expect_value.is_some() {
                    return Err(crate::ExecutorError::ConfigError(format!(
                        "sql 步骤 {} 的 expect_column 与 expect_value 必须成对出现",
                        step.id
                    )));
                }
            }
        }

        let mut variable_names = HashSet::new();
        for variable in &self.variables {
            if !variable_names.insert(variable.name.as_str()) {
                return Err(crate::ExecutorError::ConfigError(format!(
                    "变量名重复: {}",
                    variable.name
                )));
            }
        }

        Ok(())
    }
}
