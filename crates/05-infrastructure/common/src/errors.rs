//! 错误类型定义

use thiserror::Error;

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置文件读取失败: {source}")]
    FileReadError {
        #[from]
        source: std::io::Error,
    },

    #[error("配置解析失败: {source}")]
    ParseError {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("配置序列化失败: {source}")]
    SerializationError {
        #[from]
        source: serde_json::Error,
    },

    #[error("配置验证失败: {message}")]
    ValidationError { message: String },
}

impl From<config::ConfigError> for ConfigError {
    fn from(error: config::ConfigError) -> Self {
        Self::ParseError {
            source: Box::new(error),
        }
    }
}

/// Bean 解析与容器生命周期错误类型
#[derive(Error, Debug)]
pub enum BeanError {
    #[error("参数无效: {message}")]
    InvalidArgument { message: String },

    #[error("Bean 未找到: {bean}")]
    NotFound { bean: String },

    #[error("状态无效: {message}")]
    InvalidState { message: String },

    #[error("容器已经启动: {context}")]
    AlreadyRunning { context: String },

    #[error("容器尚未启动: {context}")]
    NotRunning { context: String },

    #[error("容器未配置或已关闭: {context}")]
    NotConfigured { context: String },

    #[error("检测到循环依赖: {chain}")]
    CircularDependency { chain: String },

    #[error("类型不匹配: {bean}, 期望类型 {expected}")]
    TypeMismatch { bean: String, expected: &'static str },

    #[error("资源加载失败: {url}, 原因: {message}")]
    ResourceUnavailable { url: String, message: String },

    #[error("Bean 创建失败: {bean}, 原因: {source}")]
    ConstructionFailed {
        bean: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl BeanError {
    /// 创建参数无效错误
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// 创建未找到错误
    pub fn not_found(bean: impl Into<String>) -> Self {
        Self::NotFound { bean: bean.into() }
    }

    /// 创建状态无效错误
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// 创建类型不匹配错误
    pub fn type_mismatch<T: ?Sized>(bean: impl Into<String>) -> Self {
        Self::TypeMismatch {
            bean: bean.into(),
            expected: std::any::type_name::<T>(),
        }
    }

    /// 创建 Bean 构造失败错误
    pub fn construction_failed(
        bean: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::ConstructionFailed {
            bean: bean.into(),
            source: source.into(),
        }
    }

    /// 是否为未找到错误
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// 事务错误类型
#[derive(Error, Debug)]
pub enum TransactionError {
    #[error("当前没有活动事务")]
    TransactionRequired,

    #[error("事务操作失败: {message}")]
    OperationFailed { message: String },

    #[error("事务提交失败并已回滚: {cause}, 回滚失败 {} 项", .rollback_failures.len())]
    RolledBack {
        #[source]
        cause: Box<TransactionError>,
        rollback_failures: Vec<TransactionError>,
    },
}

impl TransactionError {
    /// 创建操作失败错误
    pub fn operation_failed(message: impl Into<String>) -> Self {
        Self::OperationFailed {
            message: message.into(),
        }
    }
}

/// 基础设施错误类型
#[derive(Error, Debug)]
pub enum InfrastructureError {
    #[error("配置错误: {source}")]
    ConfigError {
        #[from]
        source: ConfigError,
    },

    #[error("依赖注入错误: {source}")]
    BeanError {
        #[from]
        source: BeanError,
    },

    #[error("事务错误: {source}")]
    TransactionError {
        #[from]
        source: TransactionError,
    },

    #[error("基础设施启动失败: {message}")]
    BootstrapFailed { message: String },
}

/// 结果类型别名
pub type ConfigResult<T> = Result<T, ConfigError>;
pub type BeanResult<T> = Result<T, BeanError>;
pub type TransactionResult<T> = Result<T, TransactionError>;
pub type InfrastructureResult<T> = Result<T, InfrastructureError>;
