//! 容器配置文件结构
//!
//! 配置文件把抽象路径映射到实现路径，并列出容器启动时需要立即解析的 Bean。

use async_trait::async_trait;
use infrastructure_common::ConfigError;
use serde::{Deserialize, Serialize};

/// 别名映射条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaBeanDefinition {
    /// 被映射的路径
    pub abstraction: String,
    /// 映射到的路径
    pub support: String,
}

/// 启动时需要解析的 Bean
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaBean {
    pub id: String,
    #[serde(default)]
    pub optional: bool,
}

/// 容器配置文件
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextSchema {
    #[serde(default)]
    pub beans: Vec<SchemaBean>,
    #[serde(default)]
    pub beans_definition: Vec<SchemaBeanDefinition>,
}

impl ContextSchema {
    /// 校验条目不含空路径
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(entry) = self
            .beans_definition
            .iter()
            .find(|entry| entry.abstraction.is_empty() || entry.support.is_empty())
        {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "别名映射不能为空: '{}' -> '{}'",
                    entry.abstraction, entry.support
                ),
            });
        }
        if self.beans.iter().any(|bean| bean.id.is_empty()) {
            return Err(ConfigError::ValidationError {
                message: "启动 Bean 的 id 不能为空".to_string(),
            });
        }
        Ok(())
    }
}

/// 容器配置加载器
#[async_trait]
pub trait ContextLoader: Send + Sync {
    /// 读取并校验配置
    async fn load(&self) -> Result<ContextSchema, ConfigError>;
}
