//! 内存资源加载器

use async_trait::async_trait;
use dashmap::DashMap;
use di_abstractions::ResourceLoader;
use infrastructure_common::{BeanError, BeanResult};
use tracing::debug;

/// 按 URL 返回预先登记的 JSON 资源
#[derive(Debug, Default)]
pub struct StaticResourceLoader {
    resources: DashMap<String, serde_json::Value>,
}

impl StaticResourceLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记资源并返回自身，便于链式构建
    pub fn with_resource(self, url: impl Into<String>, value: serde_json::Value) -> Self {
        self.insert(url, value);
        self
    }

    /// 登记或替换资源
    pub fn insert(&self, url: impl Into<String>, value: serde_json::Value) {
        self.resources.insert(url.into(), value);
    }
}

#[async_trait]
impl ResourceLoader for StaticResourceLoader {
    async fn get_resource(&self, url: &str) -> BeanResult<serde_json::Value> {
        debug!("读取资源: {}", url);
        self.resources
            .get(url)
            .map(|value| value.value().clone())
            .ok_or_else(|| BeanError::ResourceUnavailable {
                url: url.to_string(),
                message: "资源未登记".to_string(),
            })
    }
}
