//! # Transaction Implementation
//!
//! 嵌套事务的默认实现：按登记顺序提交的 [`BasicTransaction`]，
//! 以嵌套计数驱动事务的 [`TransactionManagerImpl`]，以及声明式包装 [`transactional`]。

pub mod manager;
pub mod transaction;

pub use manager::{transactional, TransactionManagerImpl};
pub use transaction::{BasicTransaction, BasicTransactionFactory};
