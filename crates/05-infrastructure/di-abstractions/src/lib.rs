//! # Dependency Injection Abstractions
//!
//! 依赖注入抽象层，定义 Bean 元数据、期望 Bean 模型和容器的核心接口。
//!
//! ## 核心接口
//!
//! - [`Token`] / [`WishedBean`] / [`AliasMap`] - Bean 标识与别名
//! - [`BeanClass`] / [`BeanDefinition`] - Bean 元数据
//! - [`FactoryBean`] - 工厂 Bean
//! - [`BeanFactory`] - 容器接口
//! - [`ApplicationEvent`] - 应用事件
//! - [`BeanResolver`] / [`ResourceLoader`] / [`ContextLoader`] - 扩展点

pub mod class;
pub mod container;
pub mod definition;
pub mod event;
pub mod factory;
pub mod loader;
pub mod resolver;
pub mod resource;
pub mod token;

pub use class::*;
pub use container::*;
pub use definition::*;
pub use event::*;
pub use factory::*;
pub use loader::*;
pub use resolver::*;
pub use resource::*;
pub use token::*;
