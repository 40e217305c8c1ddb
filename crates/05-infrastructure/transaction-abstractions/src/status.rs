//! 事务状态

use serde::{Deserialize, Serialize};
use std::fmt;

/// 事务状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    /// 尚未开启任何事务
    #[default]
    Closed,
    Opened,
    /// 事务已挂起
    Suspended,
    Committed,
    RolledBack,
}

impl TransactionStatus {
    /// 事务是否已经结束
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Committed | Self::RolledBack)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Closed => "closed",
            Self::Opened => "opened",
            Self::Suspended => "suspended",
            Self::Committed => "committed",
            Self::RolledBack => "rolledback",
        };
        f.write_str(name)
    }
}
