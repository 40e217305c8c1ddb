//! 嵌套计数事务管理器

use crate::transaction::BasicTransactionFactory;
use async_trait::async_trait;
use infrastructure_common::{TransactionError, TransactionResult};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use transaction_abstractions::{
    Operation, OperationQueue, RollbackObserver, RollbackOutcome, Transaction, TransactionFactory,
    TransactionManager, TransactionStatus,
};

#[derive(Default)]
struct ManagerState {
    transaction: Option<Arc<dyn Transaction>>,
    depth: usize,
    suspended: bool,
}

/// 事务管理器实现
///
/// 深度从 0 进入 1 时通过工厂创建新事务；嵌套调用只登记操作。
/// 外层提交期间发起的嵌套调用会把操作追加到同一个队列，由外层提交循环一并提交。
pub struct TransactionManagerImpl<F = BasicTransactionFactory> {
    factory: F,
    state: Mutex<ManagerState>,
    pending: OperationQueue,
    observer: Option<Arc<dyn RollbackObserver>>,
}

impl TransactionManagerImpl<BasicTransactionFactory> {
    /// 使用默认事务工厂创建管理器
    pub fn new() -> Self {
        Self::with_factory(BasicTransactionFactory)
    }
}

impl Default for TransactionManagerImpl<BasicTransactionFactory> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: TransactionFactory> TransactionManagerImpl<F> {
    /// 使用指定事务工厂创建管理器
    pub fn with_factory(factory: F) -> Self {
        Self {
            factory,
            state: Mutex::new(ManagerState::default()),
            pending: OperationQueue::new(),
            observer: None,
        }
    }

    /// 设置回滚观察者
    pub fn with_observer(mut self, observer: Arc<dyn RollbackObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// 待提交操作名称
    pub fn pending_operations(&self) -> Vec<String> {
        self.pending.names()
    }

    /// 取出活动事务及当前深度，深度为 0 时视为没有事务
    fn active(&self) -> TransactionResult<(Arc<dyn Transaction>, usize)> {
        let state = self.state.lock();
        match &state.transaction {
            Some(transaction) if state.depth > 0 => Ok((transaction.clone(), state.depth)),
            _ => Err(TransactionError::TransactionRequired),
        }
    }

    fn leave(&self) {
        let mut state = self.state.lock();
        state.depth = state.depth.saturating_sub(1);
        debug!("退出事务嵌套, 深度: {}", state.depth);
    }
}

#[async_trait]
impl<F: TransactionFactory> TransactionManager for TransactionManagerImpl<F> {
    async fn begin(&self, operation: Operation) -> TransactionResult<()> {
        let mut state = self.state.lock();
        if state.depth == 0 {
            state.transaction = Some(self.factory.create_transaction());
            state.suspended = false;
            self.pending.clear();
            info!("开启新事务");
        }
        state.depth += 1;
        debug!("登记事务操作: {}, 深度: {}", operation.name(), state.depth);
        self.pending.push(operation);
        Ok(())
    }

    async fn commit(&self) -> TransactionResult<()> {
        let (transaction, depth) = self.active()?;

        if depth == 1 {
            if let Err(e) = transaction.commit(&self.pending).await {
                warn!("事务提交失败，等待回滚: {}", e);
                return Err(e);
            }
            self.pending.clear();
        }

        self.leave();
        Ok(())
    }

    async fn rollback(&self) -> TransactionResult<RollbackOutcome> {
        let (transaction, depth) = self.active()?;

        let outcome = if depth == 1 {
            let outcome = transaction.rollback().await;
            self.pending.clear();
            if let Some(observer) = &self.observer {
                for failure in &outcome.failures {
                    observer.on_rollback_failure(&failure.operation, &failure.error);
                }
            }
            if !outcome.is_clean() {
                error!("事务回滚完成，但有 {} 个补偿失败", outcome.failures.len());
            }
            outcome
        } else {
            RollbackOutcome::default()
        };

        self.leave();
        Ok(outcome)
    }

    fn suspend(&self) {
        self.state.lock().suspended = true;
        debug!("事务已挂起");
    }

    fn resume(&self) {
        self.state.lock().suspended = false;
        debug!("事务已恢复");
    }

    fn status(&self) -> TransactionStatus {
        let state = self.state.lock();
        match &state.transaction {
            None => TransactionStatus::Closed,
            Some(transaction) => match transaction.status() {
                TransactionStatus::Opened if state.suspended => TransactionStatus::Suspended,
                status => status,
            },
        }
    }

    fn transaction(&self) -> Option<Arc<dyn Transaction>> {
        self.state.lock().transaction.clone()
    }

    fn depth(&self) -> usize {
        self.state.lock().depth
    }
}

impl<F> std::fmt::Debug for TransactionManagerImpl<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("TransactionManagerImpl")
            .field("depth", &state.depth)
            .field("suspended", &state.suspended)
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}

/// 声明式事务
///
/// 登记 `body` 产出的操作并提交；提交失败时回滚，
/// 返回带原始错误和补偿失败列表的 [`TransactionError::RolledBack`]。
pub async fn transactional<M, B>(manager: &M, body: B) -> TransactionResult<()>
where
    M: TransactionManager + ?Sized,
    B: FnOnce() -> Operation,
{
    manager.begin(body()).await?;

    match manager.commit().await {
        Ok(()) => Ok(()),
        Err(cause) => {
            let outcome = manager.rollback().await?;
            Err(TransactionError::RolledBack {
                cause: Box::new(cause),
                rollback_failures: outcome.into_errors(),
            })
        }
    }
}
