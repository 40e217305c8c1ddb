//! 事务操作
//!
//! 操作是一对提交/补偿动作。事务管理器按登记顺序提交操作，
//! 失败时只补偿已经提交成功的那部分。

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use infrastructure_common::TransactionResult;
use parking_lot::Mutex;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// 事务操作接口
#[async_trait]
pub trait TransactionOperation: Send + Sync {
    /// 操作名称，用于日志和回滚报告
    fn name(&self) -> &str;

    async fn commit(&self) -> TransactionResult<()>;

    /// 补偿已提交的操作
    async fn rollback(&self) -> TransactionResult<()>;
}

/// 共享的操作句柄
pub type Operation = Arc<dyn TransactionOperation>;

type OperationFn = Box<dyn Fn() -> BoxFuture<'static, TransactionResult<()>> + Send + Sync>;

/// 以闭包实现的操作
pub struct FnOperation {
    name: String,
    commit: OperationFn,
    rollback: OperationFn,
}

impl FnOperation {
    pub fn new<C, CF, R, RF>(name: impl Into<String>, commit: C, rollback: R) -> Self
    where
        C: Fn() -> CF + Send + Sync + 'static,
        CF: Future<Output = TransactionResult<()>> + Send + 'static,
        R: Fn() -> RF + Send + Sync + 'static,
        RF: Future<Output = TransactionResult<()>> + Send + 'static,
    {
        Self {
            name: name.into(),
            commit: Box::new(move || commit().boxed()),
            rollback: Box::new(move || rollback().boxed()),
        }
    }

    /// 提交与补偿都不做任何事的操作
    pub fn noop(name: impl Into<String>) -> Self {
        Self::new(name, || async { Ok(()) }, || async { Ok(()) })
    }

    pub fn into_operation(self) -> Operation {
        Arc::new(self)
    }
}

impl fmt::Debug for FnOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnOperation")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl TransactionOperation for FnOperation {
    fn name(&self) -> &str {
        &self.name
    }

    async fn commit(&self) -> TransactionResult<()> {
        (self.commit)().await
    }

    async fn rollback(&self) -> TransactionResult<()> {
        (self.rollback)().await
    }
}

/// 待提交操作队列
///
/// 克隆共享同一份队列。事务提交期间允许继续追加，提交循环每一步都会重新读取长度，
/// 所以在某个操作的提交过程中发起的嵌套调用也会在同一个事务里提交。
#[derive(Clone, Default)]
pub struct OperationQueue {
    inner: Arc<Mutex<Vec<Operation>>>,
}

impl OperationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, operation: Operation) {
        self.inner.lock().push(operation);
    }

    /// 按下标取出操作，不持有锁
    pub fn get(&self, index: usize) -> Option<Operation> {
        self.inner.lock().get(index).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    /// 操作名称快照
    pub fn names(&self) -> Vec<String> {
        self.inner
            .lock()
            .iter()
            .map(|operation| operation.name().to_string())
            .collect()
    }
}

impl fmt::Debug for OperationQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
