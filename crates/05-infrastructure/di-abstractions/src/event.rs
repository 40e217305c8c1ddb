//! 应用事件
//!
//! 事件类以静态链表表达继承关系，监听器订阅某个事件类时也会收到它的全部子类事件。

use chrono::{DateTime, Utc};
use std::any::Any;
use std::fmt;
use std::ptr;
use uuid::Uuid;

/// 事件类
#[derive(Debug)]
pub struct EventClass {
    name: &'static str,
    parent: Option<&'static EventClass>,
}

impl EventClass {
    /// 根事件类
    pub const fn root(name: &'static str) -> Self {
        Self { name, parent: None }
    }

    /// 继承自 `parent` 的事件类
    pub const fn extends(name: &'static str, parent: &'static EventClass) -> Self {
        Self {
            name,
            parent: Some(parent),
        }
    }

    /// 事件类名称
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// 父事件类
    pub fn parent(&self) -> Option<&'static EventClass> {
        self.parent
    }

    /// 自身等于 `ancestor` 或继承自 `ancestor`
    pub fn is_subclass_of(&self, ancestor: &EventClass) -> bool {
        let mut current = Some(self);
        while let Some(class) = current {
            if ptr::eq(class, ancestor) {
                return true;
            }
            current = class.parent;
        }
        false
    }
}

impl fmt::Display for EventClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// 所有应用事件的基类
pub static APPLICATION_EVENT: EventClass = EventClass::root("ApplicationEvent");
/// 由容器发出的事件
pub static APPLICATION_CONTEXT_EVENT: EventClass =
    EventClass::extends("ApplicationContextEvent", &APPLICATION_EVENT);
/// 容器启动
pub static CONTEXT_START_EVENT: EventClass =
    EventClass::extends("ContextStartEvent", &APPLICATION_CONTEXT_EVENT);
/// 容器停止
pub static CONTEXT_STOP_EVENT: EventClass =
    EventClass::extends("ContextStopEvent", &APPLICATION_CONTEXT_EVENT);
/// Bean 运行时异常
pub static BEAN_RUNTIME_EXCEPTION_EVENT: EventClass =
    EventClass::extends("BeanRuntimeExceptionEvent", &APPLICATION_EVENT);

/// 应用事件
pub trait ApplicationEvent: Send + Sync {
    /// 事件所属的类
    fn event_class(&self) -> &'static EventClass;

    /// 用于向下转型到具体事件类型
    fn as_any(&self) -> &dyn Any;

    /// 事件是否属于 `class`（含子类）
    fn is_instance_of(&self, class: &EventClass) -> bool {
        self.event_class().is_subclass_of(class)
    }
}

/// 事件来源容器
#[derive(Debug, Clone)]
pub struct ContextEventSource {
    pub context_id: Uuid,
    pub context_name: String,
}

/// 容器启动事件
#[derive(Debug, Clone)]
pub struct ContextStartEvent {
    pub source: ContextEventSource,
    pub timestamp: DateTime<Utc>,
}

impl ContextStartEvent {
    pub fn new(source: ContextEventSource) -> Self {
        Self {
            source,
            timestamp: Utc::now(),
        }
    }
}

impl ApplicationEvent for ContextStartEvent {
    fn event_class(&self) -> &'static EventClass {
        &CONTEXT_START_EVENT
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// 容器停止事件
#[derive(Debug, Clone)]
pub struct ContextStopEvent {
    pub source: ContextEventSource,
    pub timestamp: DateTime<Utc>,
}

impl ContextStopEvent {
    pub fn new(source: ContextEventSource) -> Self {
        Self {
            source,
            timestamp: Utc::now(),
        }
    }
}

impl ApplicationEvent for ContextStopEvent {
    fn event_class(&self) -> &'static EventClass {
        &CONTEXT_STOP_EVENT
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Bean 运行时异常事件
///
/// 错误本身不可克隆，事件中保存错误的文本描述。
#[derive(Debug, Clone)]
pub struct BeanRuntimeExceptionEvent {
    pub source: ContextEventSource,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl BeanRuntimeExceptionEvent {
    pub fn new(source: ContextEventSource, message: impl Into<String>) -> Self {
        Self {
            source,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

impl ApplicationEvent for BeanRuntimeExceptionEvent {
    fn event_class(&self) -> &'static EventClass {
        &BEAN_RUNTIME_EXCEPTION_EVENT
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
