//! 容器生命周期管理

use crate::errors::BeanError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 容器生命周期状态
///
/// `Unconfigured → Configured → Running ⇄ Stopped → Closed`，其中 `Closed` 为终态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextState {
    /// 已创建，尚未写入别名映射
    #[default]
    Unconfigured,
    /// 已配置别名映射
    Configured,
    /// 运行中
    Running,
    /// 已停止，可再次启动
    Stopped,
    /// 已关闭，不可再使用
    Closed,
}

impl ContextState {
    /// 是否处于运行状态
    pub fn is_running(self) -> bool {
        matches!(self, Self::Running)
    }

    /// 是否已关闭
    pub fn is_closed(self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl fmt::Display for ContextState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unconfigured => "unconfigured",
            Self::Configured => "configured",
            Self::Running => "running",
            Self::Stopped => "stopped",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// 组件生命周期管理 trait
pub trait Lifecycle: Send + Sync {
    /// 启动
    fn start(&self) -> Result<(), BeanError>;

    /// 停止
    fn stop(&self) -> Result<(), BeanError>;

    /// 是否运行中
    fn is_running(&self) -> bool;
}

/// 可关闭资源 trait
pub trait Closeable: Send + Sync {
    /// 关闭并释放全部资源
    fn close(&self) -> Result<(), BeanError>;
}
