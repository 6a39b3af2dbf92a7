//! 变量替换
//!
//! 扫描文本中的 `${名称}` 占位符并按声明的变量替换。
//! 占位符语法用正则整体匹配，变量名是其他名称子串时不会误替换。

use rand::distributions::Alphanumeric;
use rand::Rng;
use regex::{Captures, Regex};
use tracing::warn;

use crate::scenario::{ScenarioVariable, VariableKind};

/// 占位符语法: ${name}
const PLACEHOLDER_PATTERN: &str = r"\$\{([A-Za-z0-9_]+)\}";

/// random_string 默认长度
const DEFAULT_RANDOM_STRING_LEN: usize = 8;

/// random_number 默认取值范围
const DEFAULT_NUMBER_RANGE: (i64, i64) = (0, 99_999_999);

/// 变量替换器
///
/// 无副作用的纯文本变换；随机类变量在每次调用时重新生成，
/// 同一次运行内的多次引用得到不同的值。
pub struct VariableResolver {
    pattern: Regex,
}

impl Default for VariableResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl VariableResolver {
    pub fn new() -> Self {
        Self {
            // 模式为编译期常量，new 不会失败
            pattern: Regex::new(PLACEHOLDER_PATTERN).expect("内置占位符正则"),
        }
    }

    /// 替换模板中的全部占位符
    ///
    /// 未声明的占位符原样保留，不视为错误。
    pub fn resolve(&self, template: &str, variables: &[ScenarioVariable]) -> String {
        self.pattern
            .replace_all(template, |caps: &Captures<'_>| {
                let name = &caps[1];
                match variables.iter().find(|v| v.name == name) {
                    Some(variable) => self.generate(variable),
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }

    /// 生成变量的替换值
    fn generate(&self, variable: &ScenarioVariable) -> String {
        match variable.kind {
            VariableKind::Static | VariableKind::List => variable.value.clone(),
            VariableKind::RandomString => {
                let len = variable
                    .value
                    .trim()
                    .parse::<usize>()
                    .ok()
                    .filter(|n| (1..=128).contains(n))
                    .unwrap_or(DEFAULT_RANDOM_STRING_LEN);

                rand::thread_rng()
                    .sample_iter(&Alphanumeric)
                    .take(len)
                    .map(char::from)
                    .collect()
            }
            VariableKind::RandomNumber => {
                let (min, max) = parse_number_range(&variable.value).unwrap_or_else(|| {
                    if !variable.value.trim().is_empty() {
                        warn!("变量 {} 的取值范围无法解析: {}", variable.name, variable.value);
                    }
                    DEFAULT_NUMBER_RANGE
                });
                rand::thread_rng().gen_range(min..=max).to_string()
            }
        }
    }
}

/// 解析 `min..max` 形式的取值范围
fn parse_number_range(value: &str) -> Option<(i64, i64)> {
    let (min, max) = value.trim().split_once("..")?;
    let min = min.trim().parse::<i64>().ok()?;
    let max = max.trim().parse::<i64>().ok()?;
    if min > max {
        return None;
    }
    Some((min, max))
}
