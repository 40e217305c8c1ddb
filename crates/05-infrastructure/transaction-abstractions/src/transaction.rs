//! 事务接口

use crate::operation::OperationQueue;
use crate::status::TransactionStatus;
use async_trait::async_trait;
use infrastructure_common::TransactionError;
use std::sync::Arc;

/// 单个补偿操作的失败记录
#[derive(Debug)]
pub struct RollbackFailure {
    pub operation: String,
    pub error: TransactionError,
}

/// 回滚结果
///
/// 补偿失败不会中断后续补偿，全部收集在这里交给调用方。
#[derive(Debug, Default)]
pub struct RollbackOutcome {
    /// 补偿成功的操作数
    pub rolled_back: usize,
    pub failures: Vec<RollbackFailure>,
}

impl RollbackOutcome {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// 拆出补偿失败的错误列表
    pub fn into_errors(self) -> Vec<TransactionError> {
        self.failures.into_iter().map(|failure| failure.error).collect()
    }
}

/// 事务接口
#[async_trait]
pub trait Transaction: Send + Sync {
    /// 按登记顺序提交队列中的操作
    ///
    /// 每一步重新读取队列长度，提交过程中追加的操作同样会被提交。
    /// 某个操作失败时立即返回错误，事务保持打开状态等待回滚。
    async fn commit(&self, operations: &OperationQueue) -> Result<(), TransactionError>;

    /// 补偿已提交成功的操作
    async fn rollback(&self) -> RollbackOutcome;

    fn status(&self) -> TransactionStatus;

    /// 已提交、尚未结束的操作名称
    fn committed_operations(&self) -> Vec<String>;
}

/// 事务工厂
pub trait TransactionFactory: Send + Sync {
    fn create_transaction(&self) -> Arc<dyn Transaction>;
}

impl<F> TransactionFactory for F
where
    F: Fn() -> Arc<dyn Transaction> + Send + Sync,
{
    fn create_transaction(&self) -> Arc<dyn Transaction> {
        self()
    }
}
