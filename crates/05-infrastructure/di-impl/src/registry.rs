//! Bean 定义注册表
//!
//! 注册表在多个容器之间共享，保存 Bean 定义、`global` 作用域实例以及这些实例的构造占位。

use dashmap::DashMap;
use di_abstractions::{BeanDefinition, BeanRef, Token};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// 构造中的实例占位，同一令牌的并发解析共享同一次构造
pub(crate) type InFlightCell = Arc<OnceCell<BeanRef>>;

/// Bean 定义注册表
#[derive(Default)]
pub struct BeanRegistry {
    definitions: DashMap<Token, Arc<BeanDefinition>>,
    globals: DashMap<Token, BeanRef>,
    global_cells: DashMap<Token, InFlightCell>,
}

impl BeanRegistry {
    /// 创建空注册表
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册 Bean 定义，同一令牌后注册的覆盖先注册的
    pub fn register(&self, definition: BeanDefinition) -> Option<Arc<BeanDefinition>> {
        let token = definition.token.clone();
        info!("注册 Bean 定义: {} (scope={})", token, definition.scope);

        let previous = self.definitions.insert(token.clone(), Arc::new(definition));
        if previous.is_some() {
            warn!("Bean 定义被覆盖: {}", token);
        }
        previous
    }

    /// 查找 Bean 定义
    pub fn definition(&self, token: &Token) -> Option<Arc<BeanDefinition>> {
        self.definitions
            .get(token)
            .map(|definition| definition.value().clone())
    }

    /// 是否存在 Bean 定义
    pub fn contains(&self, token: &Token) -> bool {
        self.definitions.contains_key(token)
    }

    /// 定义数量
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// 查找 `global` 实例
    pub fn global_instance(&self, token: &Token) -> Option<BeanRef> {
        self.globals.get(token).map(|bean| bean.value().clone())
    }

    /// 保存 `global` 实例
    pub fn store_global(&self, token: &Token, bean: BeanRef) {
        debug!("保存全局实例: {}", token);
        self.globals.insert(token.clone(), bean);
    }

    /// 移除 `global` 实例，只在实例仍是 `bean` 时生效
    pub fn remove_global(&self, token: &Token, bean: &BeanRef) -> bool {
        self.globals
            .remove_if(token, |_, current| Arc::ptr_eq(current, bean))
            .is_some()
    }

    /// `global` 实例数量
    pub fn global_count(&self) -> usize {
        self.globals.len()
    }

    /// 清空全部 `global` 实例，定义保持不变
    pub fn clear_globals(&self) {
        info!("清空全局实例: {} 个", self.globals.len());
        self.globals.clear();
    }

    pub(crate) fn global_cell(&self, token: &Token) -> InFlightCell {
        self.global_cells
            .entry(token.clone())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone()
    }

    pub(crate) fn release_global_cell(&self, token: &Token, cell: &InFlightCell) {
        self.global_cells
            .remove_if(token, |_, current| Arc::ptr_eq(current, cell));
    }
}

impl std::fmt::Debug for BeanRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BeanRegistry")
            .field("definitions", &self.definitions.len())
            .field("globals", &self.globals.len())
            .finish()
    }
}
