//! # Infrastructure Common
//!
//! 这个 crate 提供了 Lorn IoC 运行时各基础设施 crate 共用的类型和工具。
//!
//! ## 核心内容
//!
//! - [`BeanError`] / [`TransactionError`] / [`ConfigError`] - 错误分类
//! - [`ContextState`] / [`Lifecycle`] - 容器生命周期
//! - [`LoggingConfig`] / [`load_settings`] - 设置加载
//! - [`init_logging`] - 日志初始化

pub mod configuration;
pub mod errors;
pub mod lifecycle;
pub mod logging;

pub use configuration::*;
pub use errors::*;
pub use lifecycle::*;
pub use logging::*;
