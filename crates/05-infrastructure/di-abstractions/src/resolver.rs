//! 期望 Bean 模型与别名解析抽象
//!
//! 调用方通过 [`WishedBean`] 描述想要的 Bean：别名路径、令牌、现成的值或工厂。
//! 容器借助别名映射 [`AliasMap`] 把路径和令牌逐步解析成最终实例。

use crate::factory::FactoryBean;
use crate::token::Token;
use indexmap::IndexMap;
use infrastructure_common::{BeanError, BeanResult};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// 容器中存放的 Bean 实例
pub type BeanRef = Arc<dyn Any + Send + Sync>;

/// 别名映射的键：令牌或字符串路径
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AliasKey {
    Token(Token),
    Path(String),
}

impl From<Token> for AliasKey {
    fn from(token: Token) -> Self {
        Self::Token(token)
    }
}

impl From<&Token> for AliasKey {
    fn from(token: &Token) -> Self {
        Self::Token(token.clone())
    }
}

impl From<&str> for AliasKey {
    fn from(path: &str) -> Self {
        Self::Path(path.to_string())
    }
}

impl From<String> for AliasKey {
    fn from(path: String) -> Self {
        Self::Path(path)
    }
}

impl fmt::Display for AliasKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Token(token) => write!(f, "{}", token),
            Self::Path(path) => write!(f, "'{}'", path),
        }
    }
}

/// 期望的 Bean
#[derive(Clone)]
pub enum WishedBean {
    /// 字符串别名路径
    Alias(String),
    /// Bean 令牌
    Token(Token),
    /// 已经存在的实例，原样返回
    Value(BeanRef),
    /// 每次解析都会调用的工厂
    Factory(FactoryBean),
}

impl WishedBean {
    /// 别名路径
    pub fn alias(path: impl Into<String>) -> Self {
        Self::Alias(path.into())
    }

    /// 包装一个现成的值
    pub fn value<T: Any + Send + Sync>(value: T) -> Self {
        Self::Value(Arc::new(value))
    }

    /// 可以作为别名映射键的部分
    pub fn as_key(&self) -> Option<AliasKey> {
        match self {
            Self::Alias(path) => Some(AliasKey::Path(path.clone())),
            Self::Token(token) => Some(AliasKey::Token(token.clone())),
            Self::Value(_) | Self::Factory(_) => None,
        }
    }
}

impl From<Token> for WishedBean {
    fn from(token: Token) -> Self {
        Self::Token(token)
    }
}

impl From<&Token> for WishedBean {
    fn from(token: &Token) -> Self {
        Self::Token(token.clone())
    }
}

impl From<&str> for WishedBean {
    fn from(path: &str) -> Self {
        Self::Alias(path.to_string())
    }
}

impl From<AliasKey> for WishedBean {
    fn from(key: AliasKey) -> Self {
        match key {
            AliasKey::Token(token) => Self::Token(token),
            AliasKey::Path(path) => Self::Alias(path),
        }
    }
}

impl From<FactoryBean> for WishedBean {
    fn from(factory: FactoryBean) -> Self {
        Self::Factory(factory)
    }
}

impl fmt::Debug for WishedBean {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Alias(path) => f.debug_tuple("Alias").field(path).finish(),
            Self::Token(token) => f.debug_tuple("Token").field(token).finish(),
            Self::Value(_) => f.write_str("Value(..)"),
            Self::Factory(_) => f.write_str("Factory(..)"),
        }
    }
}

impl fmt::Display for WishedBean {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Alias(path) => write!(f, "'{}'", path),
            Self::Token(token) => write!(f, "{}", token),
            Self::Value(_) => f.write_str("<value>"),
            Self::Factory(_) => f.write_str("<factory>"),
        }
    }
}

/// 有序别名映射
pub type AliasMap = IndexMap<AliasKey, WishedBean>;

/// 自动装配时按路径提供额外别名的解析器
///
/// 返回的键值对合并进本次调用的别名映射，调用方已经提供的条目优先。
pub trait BeanResolver: Send + Sync {
    /// 为 `target` 解析 `path`，无可提供的别名时返回 `None`
    fn resolve(
        &self,
        path: &AliasKey,
        target: &(dyn Any + Send + Sync),
    ) -> Option<Vec<(AliasKey, WishedBean)>>;
}

/// 解析器 Bean 的实例类型
///
/// 作为解析器注册的 Bean 必须产出这个包装，容器据此向下转型。
#[derive(Clone)]
pub struct ResolverBean(pub Arc<dyn BeanResolver>);

impl ResolverBean {
    /// 包装解析器
    pub fn new(resolver: impl BeanResolver + 'static) -> Self {
        Self(Arc::new(resolver))
    }
}

/// 解析上下文
///
/// 每条解析路径持有自己的副本，记录令牌链和当前令牌之后的别名跳数。
#[derive(Debug, Clone, Default)]
pub struct ResolveContext {
    /// 当前解析链，用于检测循环依赖
    pub resolution_chain: Vec<Token>,
    /// 最近一次进入令牌后的别名跳数
    pub alias_hops: usize,
    /// 解析选项
    pub options: ResolveOptions,
}

impl ResolveContext {
    /// 创建新的解析上下文
    pub fn new(options: ResolveOptions) -> Self {
        Self {
            resolution_chain: Vec::new(),
            alias_hops: 0,
            options,
        }
    }

    /// 添加令牌到解析链
    pub fn push_token(&mut self, token: &Token) -> BeanResult<()> {
        if self.resolution_chain.contains(token) {
            return Err(BeanError::CircularDependency {
                chain: self.describe_chain(token),
            });
        }
        if self.resolution_chain.len() >= self.options.max_depth {
            return Err(BeanError::invalid_state(format!(
                "解析深度超过上限 {}: {}",
                self.options.max_depth,
                self.describe_chain(token)
            )));
        }
        self.resolution_chain.push(token.clone());
        self.alias_hops = 0;
        Ok(())
    }

    /// 从解析链中移除最后一个令牌
    pub fn pop_token(&mut self) {
        self.resolution_chain.pop();
    }

    /// 记录一次别名跳转
    pub fn follow_alias(&mut self, key: &AliasKey) -> BeanResult<()> {
        self.alias_hops += 1;
        if self.alias_hops > self.options.max_alias_depth {
            return Err(BeanError::invalid_state(format!(
                "别名链超过上限 {}，可能存在环: {}",
                self.options.max_alias_depth, key
            )));
        }
        Ok(())
    }

    fn describe_chain(&self, next: &Token) -> String {
        self.resolution_chain
            .iter()
            .chain(std::iter::once(next))
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" -> ")
    }
}

/// 解析选项
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// 最大令牌嵌套深度
    pub max_depth: usize,
    /// 两个令牌之间允许的最大别名跳数
    pub max_alias_depth: usize,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            max_depth: 100,
            max_alias_depth: 32,
        }
    }
}
