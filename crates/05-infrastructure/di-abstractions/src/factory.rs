//! 工厂 Bean
//!
//! 包装一个零参数的生产函数。容器每次解析都会调用它，结果不缓存。

use crate::resolver::BeanRef;
use futures::future::{self, BoxFuture, FutureExt};
use infrastructure_common::BeanResult;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// 工厂产出的异步结果
pub type BeanFuture = BoxFuture<'static, BeanResult<Option<BeanRef>>>;

type Producer = Arc<dyn Fn() -> BeanFuture + Send + Sync>;

/// 工厂 Bean
#[derive(Clone)]
pub struct FactoryBean {
    producer: Producer,
}

impl FactoryBean {
    /// 每次调用都构造新值
    pub fn of<T, F>(factory: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self {
            producer: Arc::new(move || {
                let value: BeanRef = Arc::new(factory());
                future::ready(Ok(Some(value))).boxed()
            }),
        }
    }

    /// 每次调用都返回同一个实例
    pub fn of_ref(value: BeanRef) -> Self {
        Self {
            producer: Arc::new(move || future::ready(Ok(Some(value.clone()))).boxed()),
        }
    }

    /// 异步生产函数，可以返回 `None` 表示无可用实例
    pub fn of_async<F, Fut>(factory: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = BeanResult<Option<BeanRef>>> + Send + 'static,
    {
        Self {
            producer: Arc::new(move || factory().boxed()),
        }
    }

    /// 调用生产函数
    pub async fn produce(&self) -> BeanResult<Option<BeanRef>> {
        (self.producer)().await
    }
}

impl fmt::Debug for FactoryBean {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FactoryBean(..)")
    }
}
