//! 资源加载抽象

use async_trait::async_trait;
use infrastructure_common::BeanResult;

/// 资源加载器
///
/// 按 URL 读取 JSON 资源，用于填充 Bean 的资源属性。
#[async_trait]
pub trait ResourceLoader: Send + Sync {
    /// 读取资源，失败时返回 [`infrastructure_common::BeanError::ResourceUnavailable`]
    async fn get_resource(&self, url: &str) -> BeanResult<serde_json::Value>;
}
