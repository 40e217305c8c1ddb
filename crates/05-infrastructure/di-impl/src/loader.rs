//! JSON 容器配置加载器

use async_trait::async_trait;
use di_abstractions::{ContextLoader, ContextSchema};
use infrastructure_common::ConfigError;
use std::path::PathBuf;
use tracing::{debug, error, info};

#[derive(Debug, Clone)]
enum JsonSource {
    Text(String),
    File(PathBuf),
}

/// 从 JSON 文本或本地文件加载容器配置
#[derive(Debug, Clone)]
pub struct JsonContextLoader {
    source: JsonSource,
}

impl JsonContextLoader {
    /// 直接解析 JSON 文本
    pub fn from_json(json: impl Into<String>) -> Self {
        Self {
            source: JsonSource::Text(json.into()),
        }
    }

    /// 读取本地 JSON 文件
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            source: JsonSource::File(path.into()),
        }
    }
}

#[async_trait]
impl ContextLoader for JsonContextLoader {
    async fn load(&self) -> Result<ContextSchema, ConfigError> {
        let text = match &self.source {
            JsonSource::Text(text) => text.clone(),
            JsonSource::File(path) => {
                debug!("读取容器配置文件: {}", path.display());
                tokio::fs::read_to_string(path).await.map_err(|e| {
                    error!("容器配置文件读取失败: {}, {}", path.display(), e);
                    ConfigError::from(e)
                })?
            }
        };

        let schema: ContextSchema = serde_json::from_str(&text)?;
        schema.validate()?;

        info!(
            "容器配置加载完成: {} 个映射, {} 个启动 Bean",
            schema.beans_definition.len(),
            schema.beans.len()
        );
        Ok(schema)
    }
}
