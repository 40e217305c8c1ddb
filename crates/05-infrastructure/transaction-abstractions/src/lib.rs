//! # Transaction Abstractions
//!
//! 嵌套事务抽象层：事务状态、补偿操作、事务与事务管理器的核心接口。
//!
//! 最外层 `begin`/`commit` 对之间登记的所有操作在同一个事务里按登记顺序提交，
//! 内层调用只增减嵌套深度。

pub mod manager;
pub mod operation;
pub mod status;
pub mod transaction;

pub use manager::*;
pub use operation::*;
pub use status::*;
pub use transaction::*;
