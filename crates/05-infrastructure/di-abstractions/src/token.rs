//! Bean 令牌
//!
//! 令牌是进程内唯一的 Bean 标识。描述文本只用于日志和错误信息，
//! 两个描述相同的令牌互不相等。

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_TOKEN_ID: AtomicU64 = AtomicU64::new(1);

/// Bean 令牌
#[derive(Clone)]
pub struct Token {
    id: u64,
    description: Arc<str>,
}

impl Token {
    /// 创建新的唯一令牌
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            id: NEXT_TOKEN_ID.fetch_add(1, Ordering::Relaxed),
            description: Arc::from(description.into()),
        }
    }

    /// 令牌序号
    pub fn id(&self) -> u64 {
        self.id
    }

    /// 令牌描述
    pub fn description(&self) -> &str {
        &self.description
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Token {}

impl Hash for Token {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token({}#{})", self.description, self.id)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.description, self.id)
    }
}
