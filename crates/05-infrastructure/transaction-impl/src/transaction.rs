//! 基础事务实现

use async_trait::async_trait;
use infrastructure_common::TransactionResult;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, error, info};
use transaction_abstractions::{
    Operation, OperationQueue, RollbackFailure, RollbackOutcome, Transaction, TransactionFactory,
    TransactionStatus,
};
use uuid::Uuid;

struct TransactionState {
    status: TransactionStatus,
    committed: Vec<Operation>,
}

/// 基础事务
///
/// 逐个提交操作，记录提交成功的操作供回滚补偿。
pub struct BasicTransaction {
    id: Uuid,
    state: Mutex<TransactionState>,
}

impl BasicTransaction {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            state: Mutex::new(TransactionState {
                status: TransactionStatus::Opened,
                committed: Vec::new(),
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }
}

impl Default for BasicTransaction {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BasicTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicTransaction")
            .field("id", &self.id)
            .field("status", &self.status())
            .finish()
    }
}

#[async_trait]
impl Transaction for BasicTransaction {
    async fn commit(&self, operations: &OperationQueue) -> TransactionResult<()> {
        let mut index = 0;
        while let Some(operation) = operations.get(index) {
            debug!("提交事务操作: {} ({})", operation.name(), self.id);
            if let Err(e) = operation.commit().await {
                error!("事务操作提交失败: {} ({}), {}", operation.name(), self.id, e);
                return Err(e);
            }
            self.state.lock().committed.push(operation);
            index += 1;
        }

        let mut state = self.state.lock();
        state.committed.clear();
        state.status = TransactionStatus::Committed;
        info!("事务已提交: {}, 共 {} 个操作", self.id, index);
        Ok(())
    }

    async fn rollback(&self) -> RollbackOutcome {
        let committed = std::mem::take(&mut self.state.lock().committed);
        let mut outcome = RollbackOutcome::default();

        for operation in committed {
            match operation.rollback().await {
                Ok(()) => outcome.rolled_back += 1,
                Err(e) => {
                    error!("事务操作补偿失败: {} ({}), {}", operation.name(), self.id, e);
                    outcome.failures.push(RollbackFailure {
                        operation: operation.name().to_string(),
                        error: e,
                    });
                }
            }
        }

        self.state.lock().status = TransactionStatus::RolledBack;
        info!(
            "事务已回滚: {}, 补偿 {} 个操作, 失败 {} 个",
            self.id,
            outcome.rolled_back,
            outcome.failures.len()
        );
        outcome
    }

    fn status(&self) -> TransactionStatus {
        self.state.lock().status
    }

    fn committed_operations(&self) -> Vec<String> {
        self.state
            .lock()
            .committed
            .iter()
            .map(|operation| operation.name().to_string())
            .collect()
    }
}

/// 创建 [`BasicTransaction`] 的工厂
#[derive(Debug, Default, Clone, Copy)]
pub struct BasicTransactionFactory;

impl TransactionFactory for BasicTransactionFactory {
    fn create_transaction(&self) -> Arc<dyn Transaction> {
        Arc::new(BasicTransaction::new())
    }
}
