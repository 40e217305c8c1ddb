//! 应用上下文
//!
//! [`ApplicationContext`] 是带事件广播的 IoC 容器。它持有别名映射和实例缓存，
//! 可以挂接父容器，并通过共享的 [`BeanRegistry`] 按定义构造 Bean。

use crate::registry::{BeanRegistry, InFlightCell};
use async_trait::async_trait;
use dashmap::DashMap;
use di_abstractions::{
    downcast_bean, AliasKey, AliasMap, AnyBean, ApplicationEvent, BeanClass, BeanDefinition,
    BeanFactory, BeanRef, BeanRuntimeExceptionEvent, BeanSource, ContainerConfig, ContextEventSource,
    ContextSchema, ContextStartEvent, ContextStopEvent, FactoryBean, ResolveContext, ResolverBean,
    ResourceLoader, Scope, Token, WishedBean,
};
use futures::future::{BoxFuture, FutureExt};
use indexmap::IndexMap;
use infrastructure_common::{BeanError, BeanResult, Closeable, ContextState, Lifecycle};
use parking_lot::RwLock;
use std::any::Any;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// 实例缓存的键，原型实例使用匿名键
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum InstanceKey {
    Token(Token),
    Anonymous(Uuid),
}

/// 缓存中的实例及其类元数据
#[derive(Clone)]
struct ManagedBean {
    instance: BeanRef,
    class: Option<Arc<BeanClass>>,
}

/// 新实例的存放位置
enum Placement {
    Local(InstanceKey),
    Global,
}

#[derive(Default)]
struct ContextMaps {
    aliases: AliasMap,
    instances: IndexMap<InstanceKey, ManagedBean>,
}

/// 应用上下文
pub struct ApplicationContext {
    id: Uuid,
    name: String,
    registry: Arc<BeanRegistry>,
    config: ContainerConfig,
    state: RwLock<ContextState>,
    /// 关闭后为 `None`
    maps: RwLock<Option<ContextMaps>>,
    parent: RwLock<Option<Arc<ApplicationContext>>>,
    resource_loader: RwLock<Option<Arc<dyn ResourceLoader>>>,
    in_flight: DashMap<Token, InFlightCell>,
}

impl ApplicationContext {
    /// 使用默认配置创建上下文
    pub fn new(name: impl Into<String>, registry: Arc<BeanRegistry>) -> Arc<Self> {
        Self::with_config(name, registry, ContainerConfig::default())
    }

    /// 使用指定配置创建上下文
    pub fn with_config(
        name: impl Into<String>,
        registry: Arc<BeanRegistry>,
        config: ContainerConfig,
    ) -> Arc<Self> {
        let context = Self {
            id: Uuid::new_v4(),
            name: name.into(),
            registry,
            config,
            state: RwLock::new(ContextState::Unconfigured),
            maps: RwLock::new(Some(ContextMaps::default())),
            parent: RwLock::new(None),
            resource_loader: RwLock::new(None),
            in_flight: DashMap::new(),
        };
        info!("创建应用上下文: {} ({})", context.name, context.id);
        Arc::new(context)
    }

    /// 上下文实例标识
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// 上下文名称
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 共享的定义注册表
    pub fn registry(&self) -> &Arc<BeanRegistry> {
        &self.registry
    }

    /// 容器配置
    pub fn config(&self) -> &ContainerConfig {
        &self.config
    }

    /// 当前生命周期状态
    pub fn state(&self) -> ContextState {
        *self.state.read()
    }

    pub fn is_running(&self) -> bool {
        self.state().is_running()
    }

    /// 父容器
    pub fn parent(&self) -> Option<Arc<ApplicationContext>> {
        self.parent.read().clone()
    }

    /// 挂接父容器，本容器找不到的别名和单例会到父容器链上查找
    pub fn set_parent(&self, parent: Arc<ApplicationContext>) -> BeanResult<()> {
        let mut ancestor = Some(parent.clone());
        while let Some(context) = ancestor {
            if context.id == self.id {
                return Err(BeanError::invalid_argument(format!(
                    "不能把 {} 设为自身或后代的子容器",
                    self.name
                )));
            }
            ancestor = context.parent();
        }

        info!("设置父容器: {} -> {}", self.name, parent.name);
        *self.parent.write() = Some(parent);
        Ok(())
    }

    /// 设置资源加载器
    pub fn set_resource_loader(&self, loader: Arc<dyn ResourceLoader>) {
        *self.resource_loader.write() = Some(loader);
    }

    /// 本容器缓存的实例数量，包含原型实例
    pub fn instance_count(&self) -> usize {
        self.maps
            .read()
            .as_ref()
            .map_or(0, |maps| maps.instances.len())
    }

    /// 本容器的别名数量
    pub fn alias_count(&self) -> usize {
        self.maps
            .read()
            .as_ref()
            .map_or(0, |maps| maps.aliases.len())
    }

    // ---------------------------------------------------------------------
    // 别名映射
    // ---------------------------------------------------------------------

    /// 写入别名
    pub fn set(&self, key: impl Into<AliasKey>, value: impl Into<WishedBean>) -> BeanResult<()> {
        let key = key.into();
        let value = value.into();
        debug!("设置别名: {} -> {}", key, value);
        self.write_maps(|maps| {
            maps.aliases.insert(key, value);
        })?;
        self.mark_configured();
        Ok(())
    }

    /// 删除别名，返回被删除的映射
    pub fn unset(&self, key: impl Into<AliasKey>) -> BeanResult<Option<WishedBean>> {
        let key = key.into();
        self.write_maps(|maps| maps.aliases.shift_remove(&key))
    }

    /// 批量写入别名，已存在的键被覆盖
    pub fn configure(&self, aliases: AliasMap) -> BeanResult<()> {
        info!("配置别名映射: {} 项 -> {}", aliases.len(), self.name);
        self.write_maps(|maps| maps.aliases.extend(aliases))?;
        self.mark_configured();
        Ok(())
    }

    /// 按配置文件写入路径映射
    pub fn configure_schema(&self, schema: &ContextSchema) -> BeanResult<()> {
        schema
            .validate()
            .map_err(|e| BeanError::invalid_argument(e.to_string()))?;

        let aliases: AliasMap = schema
            .beans_definition
            .iter()
            .map(|entry| {
                debug!("映射路径: '{}' -> '{}'", entry.abstraction, entry.support);
                (
                    AliasKey::Path(entry.abstraction.clone()),
                    WishedBean::Alias(entry.support.clone()),
                )
            })
            .collect();
        self.configure(aliases)
    }

    /// 解析配置文件中列出的启动 Bean，返回实际得到的实例数量
    pub async fn start_schema_beans(&self, schema: &ContextSchema) -> BeanResult<usize> {
        let mut started = 0;
        for bean in &schema.beans {
            debug!("启动 Bean: {} (required={})", bean.id, !bean.optional);
            let resolved = self
                .get_bean_with(WishedBean::Alias(bean.id.clone()), !bean.optional, None)
                .await?;
            if resolved.is_some() {
                started += 1;
            }
        }
        info!("启动 Bean 完成: {}/{} -> {}", started, schema.beans.len(), self.name);
        Ok(started)
    }

    /// 把期望的 Bean 代理到另一个容器
    pub fn inherit<I>(&self, source: Arc<dyn BeanFactory>, wished_beans: I) -> BeanResult<()>
    where
        I: IntoIterator<Item = WishedBean>,
    {
        for wished in wished_beans {
            let key = wished.as_key().ok_or_else(|| {
                BeanError::invalid_argument(format!("只能代理令牌或路径: {}", wished))
            })?;

            let source = source.clone();
            let proxied = wished.clone();
            let factory = FactoryBean::of_async(move || {
                let source = source.clone();
                let wished = proxied.clone();
                async move { source.get_bean(wished).await.map(Some) }
            });
            self.set(key, factory)?;
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // 解析
    // ---------------------------------------------------------------------

    /// 解析必需的 Bean
    pub async fn get_bean(&self, wished: impl Into<WishedBean>) -> BeanResult<BeanRef> {
        let wished = wished.into();
        let description = wished.to_string();
        self.get_bean_with(wished, true, None)
            .await?
            .ok_or_else(|| BeanError::not_found(description))
    }

    /// 解析可选的 Bean
    pub async fn get_optional_bean(
        &self,
        wished: impl Into<WishedBean>,
    ) -> BeanResult<Option<BeanRef>> {
        self.get_bean_with(wished, false, None).await
    }

    /// 解析必需的 Bean 并向下转型
    pub async fn get_bean_as<T: Any + Send + Sync>(
        &self,
        wished: impl Into<WishedBean>,
    ) -> BeanResult<Arc<T>> {
        let wished = wished.into();
        let description = wished.to_string();
        let bean = self.get_bean(wished).await?;
        downcast_bean::<T>(bean, &description)
    }

    /// 解析期望的 Bean
    ///
    /// `extra` 只对本次调用及其触发的自动装配生效，本容器的别名映射优先于它。
    pub async fn get_bean_with(
        &self,
        wished: impl Into<WishedBean>,
        required: bool,
        extra: Option<&AliasMap>,
    ) -> BeanResult<Option<BeanRef>> {
        let extra = Arc::new(extra.cloned().unwrap_or_default());
        let frame = ResolveContext::new(self.config.resolve_options());
        self.get_bean_inner(wished.into(), required, extra, frame)
            .await
    }

    /// 只查找已存在的实例，不构造也不调用工厂
    pub fn get_cached_bean(
        &self,
        wished: &WishedBean,
        required: bool,
    ) -> BeanResult<Option<BeanRef>> {
        let mut current = wished.clone();
        let mut hops = 0;

        loop {
            let key = match &current {
                WishedBean::Value(bean) => return Ok(Some(bean.clone())),
                WishedBean::Factory(_) => break,
                WishedBean::Alias(path) if path.is_empty() => {
                    return Err(BeanError::invalid_argument("别名路径不能为空"))
                }
                WishedBean::Alias(path) => AliasKey::Path(path.clone()),
                WishedBean::Token(token) => AliasKey::Token(token.clone()),
            };

            hops += 1;
            if hops > self.config.max_alias_depth {
                return Err(BeanError::invalid_state(format!(
                    "别名链超过上限 {}: {}",
                    self.config.max_alias_depth, key
                )));
            }

            match self.resolve_bean(&key, None)? {
                Some(next) => current = next,
                None => break,
            }
        }

        if required {
            Err(BeanError::not_found(wished.to_string()))
        } else {
            Ok(None)
        }
    }

    /// 只做查找的别名解析
    ///
    /// 依次查找本容器的实例缓存、本容器的别名映射、本次调用的别名映射，然后是父容器链。
    pub fn resolve_bean(
        &self,
        key: &AliasKey,
        extra: Option<&AliasMap>,
    ) -> BeanResult<Option<WishedBean>> {
        let local = self.read_maps(|maps| {
            if let AliasKey::Token(token) = key {
                if let Some(managed) = maps.instances.get(&InstanceKey::Token(token.clone())) {
                    return Some(WishedBean::Value(managed.instance.clone()));
                }
            }
            maps.aliases
                .get(key)
                .or_else(|| extra.and_then(|extra| extra.get(key)))
                .cloned()
        })?;

        if local.is_some() {
            return Ok(local);
        }

        match self.parent() {
            Some(parent) => parent.resolve_bean(key, extra),
            None => Ok(None),
        }
    }

    fn get_bean_inner(
        &self,
        wished: WishedBean,
        required: bool,
        extra: Arc<AliasMap>,
        mut frame: ResolveContext,
    ) -> BoxFuture<'_, BeanResult<Option<BeanRef>>> {
        async move {
            match wished {
                WishedBean::Alias(path) => {
                    if path.is_empty() {
                        return Err(BeanError::invalid_argument("别名路径不能为空"));
                    }
                    let key = AliasKey::Path(path);
                    frame.follow_alias(&key)?;

                    match self.resolve_bean(&key, Some(&extra))? {
                        Some(next) => self.get_bean_inner(next, required, extra, frame).await,
                        None if required => {
                            warn!("别名无法解析: {} -> {}", key, self.name);
                            Err(BeanError::not_found(key.to_string()))
                        }
                        None => Ok(None),
                    }
                }
                WishedBean::Token(token) => {
                    if let Some(bean) = self.local_instance(&token)? {
                        return Ok(Some(bean));
                    }

                    let key = AliasKey::Token(token.clone());
                    let aliased = extra.contains_key(&key)
                        || self.read_maps(|maps| maps.aliases.contains_key(&key))?;

                    if !aliased {
                        if let Some(parent) = self.parent() {
                            if let Some(next) = parent.resolve_bean(&key, Some(&extra))? {
                                frame.follow_alias(&key)?;
                                return self.get_bean_inner(next, required, extra, frame).await;
                            }
                        }
                        return self.get_bean_by_token(&token, required, extra, frame).await;
                    }

                    frame.follow_alias(&key)?;
                    let next = match self.read_maps(|maps| maps.aliases.get(&key).cloned())? {
                        Some(next) => Some(next),
                        None => extra.get(&key).cloned(),
                    };
                    match next {
                        Some(next) => self.get_bean_inner(next, required, extra, frame).await,
                        None => self.get_bean_by_token(&token, required, extra, frame).await,
                    }
                }
                WishedBean::Factory(factory) => {
                    let produced = factory.produce().await?;
                    if produced.is_none() && required {
                        return Err(BeanError::not_found("<factory>"));
                    }
                    Ok(produced)
                }
                WishedBean::Value(bean) => Ok(Some(bean)),
            }
        }
        .boxed()
    }

    async fn get_bean_by_token(
        &self,
        token: &Token,
        required: bool,
        extra: Arc<AliasMap>,
        mut frame: ResolveContext,
    ) -> BeanResult<Option<BeanRef>> {
        let Some(definition) = self.registry.definition(token) else {
            if required {
                warn!("Bean 定义不存在: {} -> {}", token, self.name);
                return Err(BeanError::not_found(token.to_string()));
            }
            debug!("可选 Bean 定义不存在: {}", token);
            return Ok(None);
        };

        let bean = match definition.scope {
            Scope::Singleton => self.get_singleton(&definition, extra, frame).await?,
            Scope::Global => self.get_global(&definition, extra, frame).await?,
            Scope::Prototype => {
                // 原型之间的环无法由缓存打断
                frame.push_token(token)?;
                let placement = Placement::Local(InstanceKey::Anonymous(Uuid::new_v4()));
                self.create_bean(&definition, placement, extra, frame)
                    .await?
            }
        };
        Ok(Some(bean))
    }

    async fn get_singleton(
        &self,
        definition: &Arc<BeanDefinition>,
        extra: Arc<AliasMap>,
        mut frame: ResolveContext,
    ) -> BeanResult<BeanRef> {
        let token = &definition.token;
        if let Some(bean) = self.find_singleton_instance(token)? {
            return Ok(bean);
        }
        frame.push_token(token)?;

        let cell = self
            .in_flight
            .entry(token.clone())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();

        let result = cell
            .get_or_try_init(|| async move {
                // 等待期间可能已经由其他任务构造完成
                if let Some(bean) = self.find_singleton_instance(token)? {
                    return Ok(bean);
                }
                let placement = Placement::Local(InstanceKey::Token(token.clone()));
                self.create_bean(definition, placement, extra, frame).await
            })
            .await
            .map(Arc::clone);

        self.in_flight
            .remove_if(token, |_, current| Arc::ptr_eq(current, &cell));
        result
    }

    async fn get_global(
        &self,
        definition: &Arc<BeanDefinition>,
        extra: Arc<AliasMap>,
        mut frame: ResolveContext,
    ) -> BeanResult<BeanRef> {
        let token = &definition.token;
        if let Some(bean) = self.registry.global_instance(token) {
            return Ok(bean);
        }
        frame.push_token(token)?;

        let cell = self.registry.global_cell(token);
        let result = cell
            .get_or_try_init(|| async move {
                if let Some(bean) = self.registry.global_instance(token) {
                    return Ok(bean);
                }
                self.create_bean(definition, Placement::Global, extra, frame)
                    .await
            })
            .await
            .map(Arc::clone);

        self.registry.release_global_cell(token, &cell);
        result
    }

    /// 在本容器及祖先容器中查找单例
    fn find_singleton_instance(&self, token: &Token) -> BeanResult<Option<BeanRef>> {
        if let Some(bean) = self.local_instance(token)? {
            return Ok(Some(bean));
        }
        match self.parent() {
            Some(parent) => parent.find_singleton_instance(token),
            None => Ok(None),
        }
    }

    fn local_instance(&self, token: &Token) -> BeanResult<Option<BeanRef>> {
        self.read_maps(|maps| {
            maps.instances
                .get(&InstanceKey::Token(token.clone()))
                .map(|managed| managed.instance.clone())
        })
    }

    /// 构造实例并立即放入缓存，然后装配、加载资源、注册工厂方法、执行初始化钩子
    ///
    /// 提前放入缓存使单例之间的相互依赖能拿到同一个实例。初始化失败时实例被移出缓存。
    async fn create_bean(
        &self,
        definition: &BeanDefinition,
        placement: Placement,
        extra: Arc<AliasMap>,
        frame: ResolveContext,
    ) -> BeanResult<BeanRef> {
        let token = &definition.token;
        match &definition.source {
            BeanSource::FactoryMethod { owner, method, invoke } => {
                debug!("调用工厂方法: {} -> {}", method, token);
                let bean = invoke(&**owner)?;
                self.place(token, &placement, bean.clone(), None)?;
                Ok(bean)
            }
            BeanSource::Constructor(class) => {
                debug!("构造 Bean: {} ({})", token, class.name());
                let bean: BeanRef = Arc::from(class.instantiate()?);
                self.place(token, &placement, bean.clone(), Some(class.clone()))?;

                if let Err(e) = self
                    .initialize(definition, class, &bean, extra, &frame)
                    .await
                {
                    warn!("Bean 初始化失败，移出缓存: {}, {}", token, e);
                    self.unplace(token, &placement, &bean);
                    return Err(e);
                }
                Ok(bean)
            }
        }
    }

    async fn initialize(
        &self,
        definition: &BeanDefinition,
        class: &BeanClass,
        bean: &BeanRef,
        extra: Arc<AliasMap>,
        frame: &ResolveContext,
    ) -> BeanResult<()> {
        self.autowire(definition, class, &**bean, extra, frame)
            .await?;
        self.load_resources(class, &**bean).await?;
        if class.is_configuration() {
            self.register_bean_methods(class, bean)?;
        }
        class.post_construct(&**bean).await
    }

    fn place(
        &self,
        token: &Token,
        placement: &Placement,
        bean: BeanRef,
        class: Option<Arc<BeanClass>>,
    ) -> BeanResult<()> {
        match placement {
            Placement::Local(key) => self.store_instance(key.clone(), bean, class),
            Placement::Global => {
                self.registry.store_global(token, bean);
                Ok(())
            }
        }
    }

    fn unplace(&self, token: &Token, placement: &Placement, bean: &BeanRef) {
        match placement {
            Placement::Local(key) => {
                // 容器已关闭时缓存已不存在
                self.write_maps(|maps| {
                    maps.instances.shift_remove(key);
                })
                .ok();
            }
            Placement::Global => {
                self.registry.remove_global(token, bean);
            }
        }
    }

    async fn autowire(
        &self,
        definition: &BeanDefinition,
        class: &BeanClass,
        target: &AnyBean,
        extra: Arc<AliasMap>,
        frame: &ResolveContext,
    ) -> BeanResult<()> {
        let mut scoped = extra;

        for record in class.autowires() {
            if record.is_populated(target)? {
                return Err(BeanError::invalid_state(format!(
                    "自动装配属性必须为空: {}.{}",
                    class.name(),
                    record.property
                )));
            }

            if let Some(path) = &record.resolve {
                let resolver = self
                    .resolver_for(definition, scoped.clone(), frame)
                    .await?;
                if let Some(pairs) = resolver.0.resolve(path, target) {
                    let mut merged: AliasMap = pairs.into_iter().collect();
                    for (key, value) in scoped.iter() {
                        merged.insert(key.clone(), value.clone());
                    }
                    scoped = Arc::new(merged);
                }
            }

            let value = self
                .get_bean_inner(
                    record.wished_bean.clone(),
                    record.required,
                    scoped.clone(),
                    frame.clone(),
                )
                .await?;
            debug!(
                "自动装配: {}.{} <- {} ({})",
                class.name(),
                record.property,
                record.wished_bean,
                if value.is_some() { "已注入" } else { "为空" }
            );
            record.assign(target, value)?;
        }
        Ok(())
    }

    async fn resolver_for(
        &self,
        definition: &BeanDefinition,
        scoped: Arc<AliasMap>,
        frame: &ResolveContext,
    ) -> BeanResult<Arc<ResolverBean>> {
        let wished = definition.resolver.clone().ok_or_else(|| {
            BeanError::invalid_argument(format!("Bean 定义未声明解析器: {}", definition.token))
        })?;
        let description = wished.to_string();

        let bean = self
            .get_bean_inner(wished, true, scoped, frame.clone())
            .await?
            .ok_or_else(|| BeanError::not_found(description.clone()))?;
        downcast_bean::<ResolverBean>(bean, &description)
    }

    async fn load_resources(&self, class: &BeanClass, target: &AnyBean) -> BeanResult<()> {
        for record in class.resources() {
            if record.is_populated(target)? {
                return Err(BeanError::invalid_state(format!(
                    "资源属性必须为空: {}.{}",
                    class.name(),
                    record.property
                )));
            }

            let loader = self.resource_loader.read().clone();
            let Some(loader) = loader else {
                if record.required {
                    return Err(BeanError::ResourceUnavailable {
                        url: record.url.clone(),
                        message: "容器未设置资源加载器".to_string(),
                    });
                }
                warn!("容器未设置资源加载器，跳过可选资源: {}", record.url);
                continue;
            };

            match loader.get_resource(&record.url).await {
                Ok(value) => record.assign(target, value)?,
                Err(e) if !record.required => {
                    warn!("可选资源加载失败: {}, 原因: {}", record.url, e);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    fn register_bean_methods(&self, class: &BeanClass, owner: &BeanRef) -> BeanResult<()> {
        for record in class.bean_methods() {
            self.registry.register(BeanDefinition::factory_method(
                &record.token,
                record.scope,
                owner.clone(),
                record.method.clone(),
                record.invoke.clone(),
            ));
            self.unset(record.token.clone())?;
        }
        Ok(())
    }

    fn store_instance(
        &self,
        key: InstanceKey,
        instance: BeanRef,
        class: Option<Arc<BeanClass>>,
    ) -> BeanResult<()> {
        self.write_maps(|maps| {
            maps.instances.insert(key, ManagedBean { instance, class });
        })
    }

    // ---------------------------------------------------------------------
    // 事件与生命周期
    // ---------------------------------------------------------------------

    /// 向本容器的实例广播事件，再转发给运行中的父容器
    pub fn publish_event(&self, event: &dyn ApplicationEvent) -> BeanResult<()> {
        let listeners = self.read_maps(|maps| {
            maps.instances
                .values()
                .filter_map(|managed| {
                    let class = managed.class.as_ref()?;
                    (!class.listeners().is_empty())
                        .then(|| (managed.instance.clone(), class.clone()))
                })
                .collect::<Vec<_>>()
        })?;

        debug!(
            "广播事件: {} -> {} ({} 个监听 Bean)",
            event.event_class(),
            self.name,
            listeners.len()
        );

        for (instance, class) in &listeners {
            for record in class.listeners().iter().filter(|record| record.matches(event)) {
                record.invoke(&**instance, event)?;
            }
        }

        if let Some(parent) = self.parent() {
            if parent.is_running() {
                parent.publish_event(event)?;
            }
        }
        Ok(())
    }

    /// 执行 Bean 声明的全部释放器
    pub fn dispose_bean(&self, instance: &BeanRef) -> BeanResult<()> {
        let (_, managed) = self.find_managed(instance)?;
        if let Some(class) = &managed.class {
            let disposed = class.dispose(&*managed.instance);
            if disposed > 0 {
                debug!("执行释放器: {} 个 ({})", disposed, class.name());
            }
        }
        Ok(())
    }

    /// 释放并销毁 Bean，然后从缓存中移除
    ///
    /// 销毁钩子失败时实例仍被移除，错误随后返回。
    pub fn destroy_bean(&self, instance: &BeanRef) -> BeanResult<()> {
        self.dispose_bean(instance)?;

        let (key, managed) = self.find_managed(instance)?;
        let destroyed = match &managed.class {
            Some(class) => class.pre_destroy(&*managed.instance),
            None => Ok(()),
        };
        self.write_maps(|maps| {
            maps.instances.shift_remove(&key);
        })?;
        destroyed
    }

    fn find_managed(&self, instance: &BeanRef) -> BeanResult<(InstanceKey, ManagedBean)> {
        let target = Arc::as_ptr(instance) as *const ();
        self.read_maps(|maps| {
            maps.instances
                .iter()
                .find(|(_, managed)| Arc::as_ptr(&managed.instance) as *const () == target)
                .map(|(key, managed)| (key.clone(), managed.clone()))
        })?
        .ok_or_else(|| BeanError::invalid_state(format!("实例不属于容器 {}", self.name)))
    }

    /// 启动容器并广播启动事件
    pub fn start(&self) -> BeanResult<()> {
        if self.is_running() {
            return Err(BeanError::AlreadyRunning {
                context: self.name.clone(),
            });
        }
        if self.maps.read().is_none() {
            return Err(self.not_configured());
        }

        *self.state.write() = ContextState::Running;
        info!("应用上下文已启动: {}", self.name);
        self.publish_event(&ContextStartEvent::new(self.event_source()))
    }

    /// 停止容器，释放并销毁本容器缓存的全部实例
    ///
    /// 某个实例销毁失败不会中断其余实例的销毁，容器总会进入停止状态，返回第一个错误。
    pub fn stop(&self) -> BeanResult<()> {
        if !self.is_running() {
            return Err(BeanError::NotRunning {
                context: self.name.clone(),
            });
        }

        self.publish_event(&ContextStopEvent::new(self.event_source()))?;

        let beans = self.read_maps(|maps| {
            maps.instances
                .values()
                .map(|managed| managed.instance.clone())
                .collect::<Vec<_>>()
        })?;
        let mut first_error = None;
        for bean in &beans {
            if let Err(e) = self.dispose_bean(bean) {
                error!("释放 Bean 失败: {} -> {}", e, self.name);
                first_error.get_or_insert(e);
            }
        }
        for bean in &beans {
            if let Err(e) = self.destroy_bean(bean) {
                error!("销毁 Bean 失败: {} -> {}", e, self.name);
                first_error.get_or_insert(e);
            }
        }

        *self.state.write() = ContextState::Stopped;
        info!("应用上下文已停止: {} (销毁 {} 个实例)", self.name, beans.len());
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// 关闭容器，之后不能再使用
    pub fn close(&self) -> BeanResult<()> {
        if self.is_running() {
            self.stop()?;
        }
        *self.maps.write() = None;
        self.in_flight.clear();
        *self.state.write() = ContextState::Closed;
        info!("应用上下文已关闭: {}", self.name);
        Ok(())
    }

    /// 执行 Bean 操作，失败时广播 [`BeanRuntimeExceptionEvent`] 并原样返回错误
    pub async fn throwable<T, F>(&self, operation: F) -> BeanResult<T>
    where
        F: Future<Output = BeanResult<T>>,
    {
        let result = operation.await;
        if let Err(e) = &result {
            error!("Bean 运行时异常: {} -> {}", e, self.name);
            let event = BeanRuntimeExceptionEvent::new(self.event_source(), e.to_string());
            if let Err(publish_error) = self.publish_event(&event) {
                warn!("异常事件广播失败: {}", publish_error);
            }
        }
        result
    }

    fn event_source(&self) -> ContextEventSource {
        ContextEventSource {
            context_id: self.id,
            context_name: self.name.clone(),
        }
    }

    fn mark_configured(&self) {
        let mut state = self.state.write();
        if *state == ContextState::Unconfigured {
            *state = ContextState::Configured;
        }
    }

    fn not_configured(&self) -> BeanError {
        BeanError::NotConfigured {
            context: self.name.clone(),
        }
    }

    fn read_maps<R>(&self, f: impl FnOnce(&ContextMaps) -> R) -> BeanResult<R> {
        let guard = self.maps.read();
        match guard.as_ref() {
            Some(maps) => Ok(f(maps)),
            None => Err(self.not_configured()),
        }
    }

    fn write_maps<R>(&self, f: impl FnOnce(&mut ContextMaps) -> R) -> BeanResult<R> {
        let mut guard = self.maps.write();
        match guard.as_mut() {
            Some(maps) => Ok(f(maps)),
            None => Err(self.not_configured()),
        }
    }
}

impl std::fmt::Debug for ApplicationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApplicationContext")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("state", &self.state())
            .field("instances", &self.instance_count())
            .field("aliases", &self.alias_count())
            .finish()
    }
}

#[async_trait]
impl BeanFactory for ApplicationContext {
    async fn get_bean_with(
        &self,
        wished: WishedBean,
        required: bool,
        extra: Option<&AliasMap>,
    ) -> BeanResult<Option<BeanRef>> {
        ApplicationContext::get_bean_with(self, wished, required, extra).await
    }

    fn get_cached_bean(&self, wished: &WishedBean, required: bool) -> BeanResult<Option<BeanRef>> {
        ApplicationContext::get_cached_bean(self, wished, required)
    }

    fn set(&self, key: AliasKey, value: WishedBean) -> BeanResult<()> {
        ApplicationContext::set(self, key, value)
    }
}

impl Lifecycle for ApplicationContext {
    fn start(&self) -> Result<(), BeanError> {
        ApplicationContext::start(self)
    }

    fn stop(&self) -> Result<(), BeanError> {
        ApplicationContext::stop(self)
    }

    fn is_running(&self) -> bool {
        ApplicationContext::is_running(self)
    }
}

impl Closeable for ApplicationContext {
    fn close(&self) -> Result<(), BeanError> {
        ApplicationContext::close(self)
    }
}
