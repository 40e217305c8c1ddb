//! Bean 定义
//!
//! 定义描述一个令牌对应的 Bean 从哪里来、作用域是什么，以及自动装配时使用的解析器。

use crate::class::{AnyBean, BeanClass};
use crate::resolver::{BeanRef, WishedBean};
use crate::token::Token;
use infrastructure_common::BeanResult;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// 工厂方法，以所属配置 Bean 为参数产出新实例
pub type FactoryMethodFn = Arc<dyn Fn(&AnyBean) -> BeanResult<BeanRef> + Send + Sync>;

/// Bean 作用域
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// 在容器链上唯一，实例保存在创建它的容器中
    #[default]
    Singleton,
    /// 进程内唯一，任何容器都不会销毁它
    Global,
    /// 每次解析都创建新实例
    Prototype,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Singleton => "singleton",
            Self::Global => "global",
            Self::Prototype => "prototype",
        };
        f.write_str(name)
    }
}

/// Bean 来源
#[derive(Clone)]
pub enum BeanSource {
    /// 通过 Bean 类构造
    Constructor(Arc<BeanClass>),
    /// 调用配置 Bean 上的工厂方法
    FactoryMethod {
        owner: BeanRef,
        method: String,
        invoke: FactoryMethodFn,
    },
}

impl fmt::Debug for BeanSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constructor(class) => f.debug_tuple("Constructor").field(&class.name()).finish(),
            Self::FactoryMethod { method, .. } => f
                .debug_struct("FactoryMethod")
                .field("method", method)
                .finish_non_exhaustive(),
        }
    }
}

/// Bean 定义
#[derive(Debug, Clone)]
pub struct BeanDefinition {
    pub token: Token,
    pub source: BeanSource,
    pub scope: Scope,
    /// 自动装配时提供额外别名的解析器 Bean
    pub resolver: Option<WishedBean>,
}

impl BeanDefinition {
    /// 由 Bean 类构造的单例定义
    pub fn new(token: &Token, class: BeanClass) -> Self {
        Self {
            token: token.clone(),
            source: BeanSource::Constructor(Arc::new(class)),
            scope: Scope::default(),
            resolver: None,
        }
    }

    /// 由配置 Bean 的工厂方法产出的定义
    pub fn factory_method(
        token: &Token,
        scope: Scope,
        owner: BeanRef,
        method: impl Into<String>,
        invoke: FactoryMethodFn,
    ) -> Self {
        Self {
            token: token.clone(),
            source: BeanSource::FactoryMethod {
                owner,
                method: method.into(),
                invoke,
            },
            scope,
            resolver: None,
        }
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_resolver(mut self, resolver: impl Into<WishedBean>) -> Self {
        self.resolver = Some(resolver.into());
        self
    }

    /// 构造用的 Bean 类，工厂方法定义没有
    pub fn class(&self) -> Option<&Arc<BeanClass>> {
        match &self.source {
            BeanSource::Constructor(class) => Some(class),
            BeanSource::FactoryMethod { .. } => None,
        }
    }

    /// 是否为配置类
    pub fn is_configuration(&self) -> bool {
        self.class().is_some_and(|class| class.is_configuration())
    }
}
