//! Bean 类元数据
//!
//! [`BeanClass`] 描述如何构造一个 Bean 以及它的依赖、资源、生命周期钩子、
//! 释放器、事件监听器和工厂方法。元数据通过 [`BeanClassBuilder`] 显式声明，
//! 所有针对具体类型的闭包在构建时被擦除成 `dyn Any` 上的操作。
//!
//! 实例在构造后立即发布到缓存，装配、资源加载和初始化钩子都作用在共享引用上，
//! 因此注入属性使用 [`Injected`] 槽位。

use crate::definition::{FactoryMethodFn, Scope};
use crate::event::{ApplicationEvent, EventClass};
use crate::resolver::{AliasKey, BeanRef, WishedBean};
use crate::token::Token;
use futures::future::{self, BoxFuture, FutureExt};
use infrastructure_common::{BeanError, BeanResult};
use parking_lot::Mutex;
use std::any::{type_name, Any};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// 构造中的 Bean
pub type AnyBean = dyn Any + Send + Sync;

/// 构造函数产出的实例
pub type BeanInstance = Box<AnyBean>;

type ConstructFn = Arc<dyn Fn() -> BeanResult<BeanInstance> + Send + Sync>;
type ProbeFn = Arc<dyn Fn(&AnyBean) -> BeanResult<bool> + Send + Sync>;
type AssignFn = Arc<dyn Fn(&AnyBean, Option<BeanRef>) -> BeanResult<()> + Send + Sync>;
type ResourceAssignFn = Arc<dyn Fn(&AnyBean, serde_json::Value) -> BeanResult<()> + Send + Sync>;
type PostConstructFn =
    Arc<dyn for<'a> Fn(&'a AnyBean) -> BoxFuture<'a, BeanResult<()>> + Send + Sync>;
type PreDestroyFn = Arc<dyn Fn(&AnyBean) -> BeanResult<()> + Send + Sync>;
type DisposerAccessFn = Arc<dyn Fn(&AnyBean) -> Option<&Disposer> + Send + Sync>;
type ListenerFn = Arc<dyn Fn(&AnyBean, &dyn ApplicationEvent) -> BeanResult<()> + Send + Sync>;

/// 释放器
///
/// Bean 把需要在停止时执行的清理动作放在这里。执行一次后即清空，重复调用无副作用。
#[derive(Default)]
pub struct Disposer {
    action: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl Disposer {
    pub fn new(action: impl FnOnce() + Send + 'static) -> Self {
        Self {
            action: Mutex::new(Some(Box::new(action))),
        }
    }

    /// 替换清理动作
    pub fn set(&self, action: impl FnOnce() + Send + 'static) {
        *self.action.lock() = Some(Box::new(action));
    }

    /// 是否还有未执行的清理动作
    pub fn is_armed(&self) -> bool {
        self.action.lock().is_some()
    }

    /// 执行并清空清理动作，返回是否真的执行了
    pub fn dispose(&self) -> bool {
        // 先取出再调用，避免在持锁时执行用户代码
        let action = self.action.lock().take();
        match action {
            Some(action) => {
                action();
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for Disposer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Disposer")
            .field("armed", &self.is_armed())
            .finish()
    }
}

/// 注入槽位
///
/// 只能写入一次。容器在实例发布之后通过共享引用写入依赖或资源。
pub struct Injected<T> {
    cell: OnceCell<T>,
}

/// 自动装配的依赖
pub type Autowired<D> = Injected<Arc<D>>;

/// 注入的外部资源
pub type InjectedResource = Injected<serde_json::Value>;

impl<T> Injected<T> {
    pub fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    /// 预先填好的槽位，容器装配时会拒绝它
    pub fn with(value: T) -> Self {
        Self {
            cell: OnceCell::from(value),
        }
    }

    pub fn get(&self) -> Option<&T> {
        self.cell.get()
    }

    pub fn is_set(&self) -> bool {
        self.cell.initialized()
    }

    /// 写入值，槽位已有值时返回 `false`
    pub fn set(&self, value: T) -> bool {
        self.cell.set(value).is_ok()
    }
}

impl<T> Default for Injected<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for Injected<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Injected").field(&self.get()).finish()
    }
}

/// 自动装配记录
#[derive(Clone)]
pub struct AutowireRecord {
    /// 属性名
    pub property: String,
    /// 期望的 Bean
    pub wished_bean: WishedBean,
    /// 解析失败时是否报错
    pub required: bool,
    /// 交给解析器 Bean 的路径
    pub resolve: Option<AliasKey>,
    probe: ProbeFn,
    assign: AssignFn,
}

impl AutowireRecord {
    /// 属性是否已经有值
    pub fn is_populated(&self, target: &AnyBean) -> BeanResult<bool> {
        (self.probe)(target)
    }

    /// 写入属性，`None` 保持为空
    pub fn assign(&self, target: &AnyBean, value: Option<BeanRef>) -> BeanResult<()> {
        (self.assign)(target, value)
    }
}

impl fmt::Debug for AutowireRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AutowireRecord")
            .field("property", &self.property)
            .field("wished_bean", &self.wished_bean)
            .field("required", &self.required)
            .field("resolve", &self.resolve)
            .finish()
    }
}

/// 资源记录
#[derive(Clone)]
pub struct ResourceRecord {
    pub property: String,
    pub url: String,
    pub required: bool,
    probe: ProbeFn,
    assign: ResourceAssignFn,
}

impl ResourceRecord {
    /// 属性是否已经有值
    pub fn is_populated(&self, target: &AnyBean) -> BeanResult<bool> {
        (self.probe)(target)
    }

    /// 写入资源内容
    pub fn assign(&self, target: &AnyBean, value: serde_json::Value) -> BeanResult<()> {
        (self.assign)(target, value)
    }
}

impl fmt::Debug for ResourceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceRecord")
            .field("property", &self.property)
            .field("url", &self.url)
            .field("required", &self.required)
            .finish()
    }
}

/// 事件监听器记录
#[derive(Clone)]
pub struct EventListenerRecord {
    pub method: String,
    pub event_class: &'static EventClass,
    handler: ListenerFn,
}

impl EventListenerRecord {
    /// 事件是否匹配，按事件类继承关系判断
    pub fn matches(&self, event: &dyn ApplicationEvent) -> bool {
        event.is_instance_of(self.event_class)
    }

    /// 调用监听方法
    pub fn invoke(&self, target: &AnyBean, event: &dyn ApplicationEvent) -> BeanResult<()> {
        (self.handler)(target, event)
    }
}

impl fmt::Debug for EventListenerRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventListenerRecord")
            .field("method", &self.method)
            .field("event_class", &self.event_class.name())
            .finish()
    }
}

/// 配置类声明的工厂方法
#[derive(Clone)]
pub struct FactoryMethodRecord {
    pub token: Token,
    pub scope: Scope,
    pub method: String,
    pub invoke: FactoryMethodFn,
}

impl fmt::Debug for FactoryMethodRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FactoryMethodRecord")
            .field("token", &self.token)
            .field("scope", &self.scope)
            .field("method", &self.method)
            .finish()
    }
}

#[derive(Clone)]
struct NamedHook<F> {
    method: String,
    hook: F,
}

#[derive(Clone)]
struct DisposerRecord {
    name: String,
    access: DisposerAccessFn,
}

/// Bean 类元数据
pub struct BeanClass {
    name: &'static str,
    construct: ConstructFn,
    autowires: Vec<AutowireRecord>,
    resources: Vec<ResourceRecord>,
    post_constructs: Vec<NamedHook<PostConstructFn>>,
    pre_destroys: Vec<NamedHook<PreDestroyFn>>,
    disposers: Vec<DisposerRecord>,
    listeners: Vec<EventListenerRecord>,
    bean_methods: Vec<FactoryMethodRecord>,
}

impl BeanClass {
    /// 以构造函数开始声明 Bean 类
    pub fn builder<T, F>(constructor: F) -> BeanClassBuilder<T>
    where
        T: Any + Send + Sync,
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::try_builder(move || Ok(constructor()))
    }

    /// 以可能失败的构造函数开始声明 Bean 类
    pub fn try_builder<T, F>(constructor: F) -> BeanClassBuilder<T>
    where
        T: Any + Send + Sync,
        F: Fn() -> BeanResult<T> + Send + Sync + 'static,
    {
        BeanClassBuilder {
            class: Self {
                name: type_name::<T>(),
                construct: Arc::new(move || {
                    constructor().map(|bean| Box::new(bean) as BeanInstance)
                }),
                autowires: Vec::new(),
                resources: Vec::new(),
                post_constructs: Vec::new(),
                pre_destroys: Vec::new(),
                disposers: Vec::new(),
                listeners: Vec::new(),
                bean_methods: Vec::new(),
            },
            _marker: PhantomData,
        }
    }

    /// 类型名
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// 构造一个未装配的实例
    pub fn instantiate(&self) -> BeanResult<BeanInstance> {
        (self.construct)()
    }

    pub fn autowires(&self) -> &[AutowireRecord] {
        &self.autowires
    }

    pub fn resources(&self) -> &[ResourceRecord] {
        &self.resources
    }

    pub fn listeners(&self) -> &[EventListenerRecord] {
        &self.listeners
    }

    pub fn bean_methods(&self) -> &[FactoryMethodRecord] {
        &self.bean_methods
    }

    /// 声明了工厂方法的类即配置类
    pub fn is_configuration(&self) -> bool {
        !self.bean_methods.is_empty()
    }

    /// 依次执行初始化钩子
    pub async fn post_construct(&self, target: &AnyBean) -> BeanResult<()> {
        for hook in &self.post_constructs {
            tracing::debug!("执行初始化钩子: {}::{}", self.name, hook.method);
            (hook.hook)(target).await?;
        }
        Ok(())
    }

    /// 依次执行销毁钩子
    pub fn pre_destroy(&self, target: &AnyBean) -> BeanResult<()> {
        for hook in &self.pre_destroys {
            tracing::debug!("执行销毁钩子: {}::{}", self.name, hook.method);
            (hook.hook)(target)?;
        }
        Ok(())
    }

    /// 执行全部释放器，返回真正执行的数量
    pub fn dispose(&self, target: &AnyBean) -> usize {
        self.disposers
            .iter()
            .filter_map(|record| (record.access)(target))
            .filter(|disposer| disposer.dispose())
            .count()
    }

    /// 释放器名称
    pub fn disposer_names(&self) -> impl Iterator<Item = &str> {
        self.disposers.iter().map(|record| record.name.as_str())
    }
}

impl fmt::Debug for BeanClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanClass")
            .field("name", &self.name)
            .field("autowires", &self.autowires)
            .field("resources", &self.resources)
            .field("listeners", &self.listeners)
            .field("bean_methods", &self.bean_methods)
            .finish_non_exhaustive()
    }
}

/// Bean 类构建器
pub struct BeanClassBuilder<T> {
    class: BeanClass,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Any + Send + Sync> BeanClassBuilder<T> {
    /// 声明可选的自动装配属性
    pub fn autowire<D, A>(self, property: &str, wished_bean: impl Into<WishedBean>, access: A) -> Self
    where
        D: Any + Send + Sync,
        A: Fn(&T) -> &Autowired<D> + Send + Sync + 'static,
    {
        self.autowire_with(property, wished_bean, false, None, access)
    }

    /// 声明必需的自动装配属性
    pub fn autowire_required<D, A>(
        self,
        property: &str,
        wished_bean: impl Into<WishedBean>,
        access: A,
    ) -> Self
    where
        D: Any + Send + Sync,
        A: Fn(&T) -> &Autowired<D> + Send + Sync + 'static,
    {
        self.autowire_with(property, wished_bean, true, None, access)
    }

    /// 声明自动装配属性的完整形式
    ///
    /// `resolve` 不为空时，装配前先调用 Bean 定义上的解析器获取额外别名。
    pub fn autowire_with<D, A>(
        mut self,
        property: &str,
        wished_bean: impl Into<WishedBean>,
        required: bool,
        resolve: Option<AliasKey>,
        access: A,
    ) -> Self
    where
        D: Any + Send + Sync,
        A: Fn(&T) -> &Autowired<D> + Send + Sync + 'static,
    {
        let access = Arc::new(access);
        let probe_access = access.clone();
        let class_name = self.class.name;
        let field = property.to_string();

        let probe: ProbeFn = Arc::new(move |target: &AnyBean| {
            target
                .downcast_ref::<T>()
                .map(|bean| probe_access(bean).is_set())
                .ok_or_else(|| BeanError::type_mismatch::<T>(class_name))
        });

        let assign: AssignFn = Arc::new(move |target: &AnyBean, value: Option<BeanRef>| {
            let bean = target
                .downcast_ref::<T>()
                .ok_or_else(|| BeanError::type_mismatch::<T>(class_name))?;
            let Some(value) = value else {
                return Ok(());
            };
            let dependency = value
                .downcast::<D>()
                .map_err(|_| BeanError::type_mismatch::<D>(format!("{class_name}.{field}")))?;
            if access(bean).set(dependency) {
                Ok(())
            } else {
                Err(BeanError::invalid_state(format!(
                    "自动装配属性已有值: {class_name}.{field}"
                )))
            }
        });

        self.class.autowires.push(AutowireRecord {
            property: property.to_string(),
            wished_bean: wished_bean.into(),
            required,
            resolve,
            probe,
            assign,
        });
        self
    }

    /// 声明资源属性
    pub fn resource<A>(mut self, property: &str, url: &str, required: bool, access: A) -> Self
    where
        A: Fn(&T) -> &InjectedResource + Send + Sync + 'static,
    {
        let access = Arc::new(access);
        let probe_access = access.clone();
        let class_name = self.class.name;
        let field = property.to_string();

        let probe: ProbeFn = Arc::new(move |target: &AnyBean| {
            target
                .downcast_ref::<T>()
                .map(|bean| probe_access(bean).is_set())
                .ok_or_else(|| BeanError::type_mismatch::<T>(class_name))
        });

        let assign: ResourceAssignFn = Arc::new(move |target: &AnyBean, value: serde_json::Value| {
            let bean = target
                .downcast_ref::<T>()
                .ok_or_else(|| BeanError::type_mismatch::<T>(class_name))?;
            if access(bean).set(value) {
                Ok(())
            } else {
                Err(BeanError::invalid_state(format!(
                    "资源属性已有值: {class_name}.{field}"
                )))
            }
        });

        self.class.resources.push(ResourceRecord {
            property: property.to_string(),
            url: url.to_string(),
            required,
            probe,
            assign,
        });
        self
    }

    /// 声明初始化钩子，在装配、资源加载和工厂方法注册之后执行
    pub fn post_construct<F>(mut self, method: &str, hook: F) -> Self
    where
        F: for<'a> Fn(&'a T) -> BoxFuture<'a, BeanResult<()>> + Send + Sync + 'static,
    {
        let class_name = self.class.name;
        let erased: PostConstructFn = Arc::new(erase_post_construct(move |target| {
            match target.downcast_ref::<T>() {
                Some(bean) => hook(bean),
                None => future::ready(Err(BeanError::type_mismatch::<T>(class_name))).boxed(),
            }
        }));
        self.class.post_constructs.push(NamedHook {
            method: method.to_string(),
            hook: erased,
        });
        self
    }

    /// 声明销毁钩子
    pub fn pre_destroy<F>(self, method: &str, hook: F) -> Self
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.try_pre_destroy(method, move |bean: &T| {
            hook(bean);
            Ok(())
        })
    }

    /// 声明可能失败的销毁钩子
    pub fn try_pre_destroy<F>(mut self, method: &str, hook: F) -> Self
    where
        F: Fn(&T) -> BeanResult<()> + Send + Sync + 'static,
    {
        let class_name = self.class.name;
        let erased: PreDestroyFn = Arc::new(move |target: &AnyBean| {
            let bean = target
                .downcast_ref::<T>()
                .ok_or_else(|| BeanError::type_mismatch::<T>(class_name))?;
            hook(bean)
        });
        self.class.pre_destroys.push(NamedHook {
            method: method.to_string(),
            hook: erased,
        });
        self
    }

    /// 声明释放器字段
    pub fn disposer<A>(mut self, name: &str, access: A) -> Self
    where
        A: Fn(&T) -> &Disposer + Send + Sync + 'static,
    {
        let erased: DisposerAccessFn = Arc::new(erase_disposer_access(move |target| {
            target.downcast_ref::<T>().map(|bean| access(bean))
        }));
        self.class.disposers.push(DisposerRecord {
            name: name.to_string(),
            access: erased,
        });
        self
    }

    /// 声明事件监听方法
    pub fn listen<F>(mut self, method: &str, event_class: &'static EventClass, handler: F) -> Self
    where
        F: Fn(&T, &dyn ApplicationEvent) + Send + Sync + 'static,
    {
        let class_name = self.class.name;
        let erased: ListenerFn = Arc::new(move |target: &AnyBean, event: &dyn ApplicationEvent| {
            let bean = target
                .downcast_ref::<T>()
                .ok_or_else(|| BeanError::type_mismatch::<T>(class_name))?;
            handler(bean, event);
            Ok(())
        });
        self.class.listeners.push(EventListenerRecord {
            method: method.to_string(),
            event_class,
            handler: erased,
        });
        self
    }

    /// 声明工厂方法，所在类因此成为配置类
    pub fn bean_method<V, F>(mut self, token: &Token, scope: Scope, method: &str, factory: F) -> Self
    where
        V: Any + Send + Sync,
        F: Fn(&T) -> BeanResult<V> + Send + Sync + 'static,
    {
        let class_name = self.class.name;
        let invoke: FactoryMethodFn = Arc::new(move |owner: &AnyBean| {
            let bean = owner
                .downcast_ref::<T>()
                .ok_or_else(|| BeanError::type_mismatch::<T>(class_name))?;
            factory(bean).map(|value| Arc::new(value) as BeanRef)
        });
        self.class.bean_methods.push(FactoryMethodRecord {
            token: token.clone(),
            scope,
            method: method.to_string(),
            invoke,
        });
        self
    }

    /// 完成声明
    pub fn build(self) -> BeanClass {
        self.class
    }
}

fn erase_post_construct<F>(f: F) -> F
where
    F: for<'a> Fn(&'a AnyBean) -> BoxFuture<'a, BeanResult<()>> + Send + Sync + 'static,
{
    f
}

fn erase_disposer_access<F>(f: F) -> F
where
    F: for<'a> Fn(&'a AnyBean) -> Option<&'a Disposer> + Send + Sync + 'static,
{
    f
}
