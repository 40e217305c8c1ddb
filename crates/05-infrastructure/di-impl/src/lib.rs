//! # 依赖注入具体实现
//!
//! 提供应用上下文、Bean 定义注册表以及配置和资源加载器的实现

pub mod context;
pub mod loader;
pub mod registry;
pub mod resource;

pub use context::ApplicationContext;
pub use loader::JsonContextLoader;
pub use registry::BeanRegistry;
pub use resource::StaticResourceLoader;
