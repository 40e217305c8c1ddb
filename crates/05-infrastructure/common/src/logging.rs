//! 日志系统初始化

use crate::configuration::LoggingConfig;
use crate::errors::InfrastructureError;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// 初始化全局日志订阅器
///
/// `RUST_LOG` 存在时优先使用，否则使用配置中的级别。全局订阅器已存在时返回
/// [`InfrastructureError::BootstrapFailed`]。
pub fn init_logging(config: &LoggingConfig) -> Result<(), InfrastructureError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.show_target)
        .with_thread_ids(config.show_thread_ids);

    if config.json_format {
        subscriber.json().try_init()
    } else {
        subscriber.try_init()
    }
    .map_err(|e| InfrastructureError::BootstrapFailed {
        message: format!("日志初始化失败: {}", e),
    })?;

    info!("日志系统初始化完成");
    Ok(())
}
