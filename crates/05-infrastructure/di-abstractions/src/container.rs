//! 容器抽象接口
//!
//! 提供按期望 Bean 获取实例的核心抽象以及容器配置

use crate::resolver::{AliasKey, AliasMap, BeanRef, ResolveOptions, WishedBean};
use async_trait::async_trait;
use infrastructure_common::{load_settings, BeanError, BeanResult, ConfigError, LoggingConfig};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::sync::Arc;

/// Bean 工厂 trait
///
/// 容器之间通过这个 trait 互相代理，见 `inherit`。
#[async_trait]
pub trait BeanFactory: Send + Sync {
    /// 解析期望的 Bean
    ///
    /// `required` 为 `false` 时解析不到返回 `Ok(None)`；`extra` 是只对本次调用生效的别名映射。
    async fn get_bean_with(
        &self,
        wished: WishedBean,
        required: bool,
        extra: Option<&AliasMap>,
    ) -> BeanResult<Option<BeanRef>>;

    /// 只查找已经存在的实例，不触发构造
    fn get_cached_bean(&self, wished: &WishedBean, required: bool) -> BeanResult<Option<BeanRef>>;

    /// 写入别名
    fn set(&self, key: AliasKey, value: WishedBean) -> BeanResult<()>;

    /// 解析必需的 Bean
    async fn get_bean(&self, wished: WishedBean) -> BeanResult<BeanRef> {
        let description = wished.to_string();
        self.get_bean_with(wished, true, None)
            .await?
            .ok_or_else(|| BeanError::not_found(description))
    }

    /// 解析可选的 Bean
    async fn get_optional_bean(&self, wished: WishedBean) -> BeanResult<Option<BeanRef>> {
        self.get_bean_with(wished, false, None).await
    }
}

/// 把解析结果向下转型为具体类型
pub fn downcast_bean<T: Any + Send + Sync>(bean: BeanRef, name: &str) -> BeanResult<Arc<T>> {
    bean.downcast::<T>()
        .map_err(|_| BeanError::type_mismatch::<T>(name))
}

/// 容器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    /// 两个令牌之间允许的最大别名跳数
    pub max_alias_depth: usize,
    /// 最大解析深度
    pub max_resolution_depth: usize,
    /// 日志配置
    pub logging: LoggingConfig,
}

impl ContainerConfig {
    /// 从 `config/ioc` 与 `LORN_IOC__*` 环境变量加载
    pub fn load() -> Result<Self, ConfigError> {
        let config: Self = load_settings("config/ioc", "LORN_IOC")?;
        config.validate()?;
        Ok(config)
    }

    /// 校验取值
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_alias_depth == 0 || self.max_resolution_depth == 0 {
            return Err(ConfigError::ValidationError {
                message: "max_alias_depth 与 max_resolution_depth 必须大于 0".to_string(),
            });
        }
        Ok(())
    }

    /// 对应的解析选项
    pub fn resolve_options(&self) -> ResolveOptions {
        ResolveOptions {
            max_depth: self.max_resolution_depth,
            max_alias_depth: self.max_alias_depth,
        }
    }
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            max_alias_depth: 32,
            max_resolution_depth: 100,
            logging: LoggingConfig::default(),
        }
    }
}
