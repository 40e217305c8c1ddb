//! 配置加载与日志配置

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 默认日志级别过滤表达式，`RUST_LOG` 优先
    pub level: String,
    /// 是否输出 JSON 格式
    pub json_format: bool,
    /// 是否输出 target
    pub show_target: bool,
    /// 是否输出线程 ID
    pub show_thread_ids: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            show_target: true,
            show_thread_ids: false,
        }
    }
}

/// 从配置文件与环境变量加载设置
///
/// 先读取 `file`（扩展名可省略，文件不存在时忽略），再以 `{prefix}__` 前缀的环境变量覆盖，
/// 嵌套字段使用双下划线分隔，例如 `LORN_IOC__LOGGING__LEVEL=debug`。
pub fn load_settings<T>(file: &str, prefix: &str) -> Result<T, ConfigError>
where
    T: for<'de> Deserialize<'de>,
{
    debug!("加载设置: file={}, prefix={}", file, prefix);

    let settings = config::Config::builder()
        .add_source(config::File::with_name(file).required(false))
        .add_source(
            config::Environment::with_prefix(prefix)
                .prefix_separator("__")
                .separator("__"),
        )
        .build()
        .map_err(|e| {
            error!("设置构建失败: {}", e);
            ConfigError::from(e)
        })?;

    settings.try_deserialize().map_err(|e| {
        error!("设置绑定失败: file={}, error={}", file, e);
        ConfigError::from(e)
    })
}
