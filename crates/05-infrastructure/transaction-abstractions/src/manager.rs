//! 事务管理器接口

use crate::operation::Operation;
use crate::status::TransactionStatus;
use crate::transaction::{RollbackOutcome, Transaction};
use async_trait::async_trait;
use infrastructure_common::{TransactionError, TransactionResult};
use std::sync::Arc;

/// 事务管理器
///
/// 以嵌套计数管理一个事务：深度从 0 到 1 时创建事务，
/// 只有最外层的 `commit`/`rollback` 真正驱动事务。
#[async_trait]
pub trait TransactionManager: Send + Sync {
    /// 登记操作并进入一层嵌套
    async fn begin(&self, operation: Operation) -> TransactionResult<()>;

    /// 退出一层嵌套，最外层时提交事务
    async fn commit(&self) -> TransactionResult<()>;

    /// 退出一层嵌套，最外层时回滚事务
    async fn rollback(&self) -> TransactionResult<RollbackOutcome>;

    fn suspend(&self);

    fn resume(&self);

    fn status(&self) -> TransactionStatus;

    /// 当前（或最近一次）事务
    fn transaction(&self) -> Option<Arc<dyn Transaction>>;

    fn depth(&self) -> usize;
}

/// 回滚观察者，补偿失败时收到通知
pub trait RollbackObserver: Send + Sync {
    fn on_rollback_failure(&self, operation: &str, error: &TransactionError);
}
