//! 多容器场景的集中集成测试

use anyhow::Result;
use async_trait::async_trait;
use di_abstractions::{
    AliasKey, AliasMap, ApplicationEvent, Autowired, BeanClass, BeanDefinition, BeanFactory,
    BeanRef, BeanResolver, EventClass, InjectedResource, ResolverBean, Scope, Token, WishedBean,
    APPLICATION_EVENT,
};
use di_abstractions::{ContextLoader, ResourceLoader};
use di_impl::{ApplicationContext, BeanRegistry, JsonContextLoader, StaticResourceLoader};
use infrastructure_common::{BeanError, BeanResult};
use parking_lot::Mutex;
use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug)]
struct Repository {
    label: String,
}

#[derive(Default)]
struct Service {
    repository: Autowired<Repository>,
}

fn repository_class(label: &'static str, created: Arc<AtomicUsize>) -> BeanClass {
    BeanClass::builder(move || {
        created.fetch_add(1, Ordering::SeqCst);
        Repository {
            label: label.to_string(),
        }
    })
    .build()
}

fn service_class(repository: &Token) -> BeanClass {
    BeanClass::builder(Service::default)
        .autowire_required("repository", repository, |s: &Service| &s.repository)
        .build()
}

#[tokio::test]
async fn test_autowire_end_to_end() -> Result<()> {
    let registry = Arc::new(BeanRegistry::new());
    let repository = Token::new("repository");
    let service = Token::new("service");
    let created = Arc::new(AtomicUsize::new(0));
    registry.register(BeanDefinition::new(
        &repository,
        repository_class("primary", created.clone()),
    ));
    registry.register(BeanDefinition::new(&service, service_class(&repository)));

    let context = ApplicationContext::new("app", registry);
    let bean = context.get_bean_as::<Service>(&service).await?;
    let injected = bean.repository.get().expect("repository injected");

    let direct = context.get_bean_as::<Repository>(&repository).await?;
    assert!(Arc::ptr_eq(injected, &direct));
    assert_eq!(injected.label, "primary");
    assert_eq!(created.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn test_optional_dependency_stays_empty() -> Result<()> {
    let registry = Arc::new(BeanRegistry::new());
    let missing = Token::new("missing");
    let service = Token::new("service");
    registry.register(BeanDefinition::new(
        &service,
        BeanClass::builder(Service::default)
            .autowire("repository", &missing, |s: &Service| &s.repository)
            .build(),
    ));

    let context = ApplicationContext::new("app", registry);
    let bean = context.get_bean_as::<Service>(&service).await?;
    assert!(bean.repository.get().is_none());
    Ok(())
}

#[tokio::test]
async fn test_required_dependency_missing_fails() {
    let registry = Arc::new(BeanRegistry::new());
    let service = Token::new("service");
    registry.register(BeanDefinition::new(&service, service_class(&Token::new("absent"))));

    let context = ApplicationContext::new("app", registry);
    let error = context.get_bean(&service).await.unwrap_err();
    assert!(error.is_not_found());
}

#[tokio::test]
async fn test_populated_property_is_invalid_state() {
    let registry = Arc::new(BeanRegistry::new());
    let repository = Token::new("repository");
    let service = Token::new("service");
    registry.register(BeanDefinition::new(
        &repository,
        repository_class("primary", Arc::new(AtomicUsize::new(0))),
    ));
    registry.register(BeanDefinition::new(
        &service,
        BeanClass::builder(|| Service {
            repository: Autowired::with(Arc::new(Repository {
                label: "preset".to_string(),
            })),
        })
        .autowire("repository", &repository, |s: &Service| &s.repository)
        .build(),
    ));

    let context = ApplicationContext::new("app", registry);
    let error = context.get_bean(&service).await.unwrap_err();
    assert!(matches!(error, BeanError::InvalidState { .. }));
}

#[tokio::test]
async fn test_global_scope_is_shared_between_contexts() -> Result<()> {
    let registry = Arc::new(BeanRegistry::new());
    let global = Token::new("clock");
    let created = Arc::new(AtomicUsize::new(0));
    registry.register(
        BeanDefinition::new(&global, repository_class("clock", created.clone()))
            .with_scope(Scope::Global),
    );

    let first = ApplicationContext::new("first", registry.clone());
    let second = ApplicationContext::new("second", registry.clone());

    let a = first.get_bean(&global).await?;
    let b = second.get_bean(&global).await?;
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(created.load(Ordering::SeqCst), 1);

    // 全局实例不属于任何容器
    first.start()?;
    first.stop()?;
    assert_eq!(first.instance_count(), 0);
    assert!(registry.global_instance(&global).is_some());
    Ok(())
}

#[tokio::test]
async fn test_sibling_contexts_share_global_but_not_singleton() -> Result<()> {
    let registry = Arc::new(BeanRegistry::new());
    let shared = Token::new("shared-repository");
    let local = Token::new("local-repository");
    let consumer = Token::new("consumer");

    struct Consumer {
        shared: Autowired<Repository>,
        local: Autowired<Repository>,
    }

    registry.register(
        BeanDefinition::new(&shared, repository_class("shared", Arc::new(AtomicUsize::new(0))))
            .with_scope(Scope::Global),
    );
    registry.register(BeanDefinition::new(
        &local,
        repository_class("local", Arc::new(AtomicUsize::new(0))),
    ));
    registry.register(BeanDefinition::new(
        &consumer,
        BeanClass::builder(|| Consumer {
            shared: Autowired::new(),
            local: Autowired::new(),
        })
        .autowire_required("shared", &shared, |c: &Consumer| &c.shared)
        .autowire_required("local", &local, |c: &Consumer| &c.local)
        .build(),
    ));

    let left = ApplicationContext::new("left", registry.clone());
    let right = ApplicationContext::new("right", registry);

    let left_consumer = left.get_bean_as::<Consumer>(&consumer).await?;
    let right_consumer = right.get_bean_as::<Consumer>(&consumer).await?;

    assert!(Arc::ptr_eq(
        left_consumer.shared.get().unwrap(),
        right_consumer.shared.get().unwrap()
    ));
    assert!(!Arc::ptr_eq(
        left_consumer.local.get().unwrap(),
        right_consumer.local.get().unwrap()
    ));
    Ok(())
}

#[tokio::test]
async fn test_child_reuses_parent_singleton() -> Result<()> {
    let registry = Arc::new(BeanRegistry::new());
    let repository = Token::new("repository");
    let created = Arc::new(AtomicUsize::new(0));
    registry.register(BeanDefinition::new(
        &repository,
        repository_class("parent", created.clone()),
    ));

    let parent = ApplicationContext::new("parent", registry.clone());
    let child = ApplicationContext::new("child", registry);
    child.set_parent(parent.clone())?;

    let from_parent = parent.get_bean(&repository).await?;
    let from_child = child.get_bean(&repository).await?;

    assert!(Arc::ptr_eq(&from_parent, &from_child));
    assert_eq!(created.load(Ordering::SeqCst), 1);
    assert_eq!(child.instance_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_child_instantiates_locally_when_parent_has_nothing() -> Result<()> {
    let registry = Arc::new(BeanRegistry::new());
    let repository = Token::new("repository");
    registry.register(BeanDefinition::new(
        &repository,
        repository_class("child", Arc::new(AtomicUsize::new(0))),
    ));

    let parent = ApplicationContext::new("parent", registry.clone());
    let child = ApplicationContext::new("child", registry);
    child.set_parent(parent.clone())?;

    child.get_bean(&repository).await?;
    assert_eq!(child.instance_count(), 1);
    assert_eq!(parent.instance_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_child_follows_parent_aliases() -> Result<()> {
    let registry = Arc::new(BeanRegistry::new());
    let implementation = Token::new("implementation");
    registry.register(BeanDefinition::new(
        &implementation,
        repository_class("impl", Arc::new(AtomicUsize::new(0))),
    ));

    let parent = ApplicationContext::new("parent", registry.clone());
    parent.set("app.repository", &implementation)?;
    let child = ApplicationContext::new("child", registry);
    child.set_parent(parent)?;

    let bean = child.get_bean_as::<Repository>("app.repository").await?;
    assert_eq!(bean.label, "impl");
    Ok(())
}

#[tokio::test]
async fn test_set_parent_rejects_cycles() -> Result<()> {
    let registry = Arc::new(BeanRegistry::new());
    let root = ApplicationContext::new("root", registry.clone());
    let child = ApplicationContext::new("child", registry);

    assert!(root.set_parent(root.clone()).is_err());
    child.set_parent(root.clone())?;
    assert!(matches!(
        root.set_parent(child.clone()),
        Err(BeanError::InvalidArgument { .. })
    ));
    Ok(())
}

#[tokio::test]
async fn test_closed_parent_is_not_configured_for_child() -> Result<()> {
    let registry = Arc::new(BeanRegistry::new());
    let parent = ApplicationContext::new("parent", registry.clone());
    let child = ApplicationContext::new("child", registry);
    child.set_parent(parent.clone())?;

    parent.close()?;
    let error = child.get_bean("anything").await.unwrap_err();
    assert!(matches!(error, BeanError::NotConfigured { .. }));
    Ok(())
}

#[tokio::test]
async fn test_inherit_proxies_to_foreign_context() -> Result<()> {
    let foreign_registry = Arc::new(BeanRegistry::new());
    let repository = Token::new("repository");
    foreign_registry.register(BeanDefinition::new(
        &repository,
        repository_class("foreign", Arc::new(AtomicUsize::new(0))),
    ));
    let foreign = ApplicationContext::new("foreign", foreign_registry);

    let local = ApplicationContext::new("local", Arc::new(BeanRegistry::new()));
    local.inherit(foreign.clone(), vec![WishedBean::from(&repository)])?;

    let proxied = local.get_bean(&repository).await?;
    let original = foreign.get_bean(&repository).await?;
    assert!(Arc::ptr_eq(&proxied, &original));
    assert_eq!(local.instance_count(), 0);

    let factory: Arc<dyn BeanFactory> = foreign;
    assert!(local.inherit(factory, vec![WishedBean::value(1_u8)]).is_err());
    Ok(())
}

#[tokio::test]
async fn test_extra_map_overrides_dependency() -> Result<()> {
    let registry = Arc::new(BeanRegistry::new());
    let repository = Token::new("repository");
    let service = Token::new("service");
    registry.register(BeanDefinition::new(
        &repository,
        repository_class("real", Arc::new(AtomicUsize::new(0))),
    ));
    registry.register(
        BeanDefinition::new(&service, service_class(&repository)).with_scope(Scope::Prototype),
    );
    let context = ApplicationContext::new("app", registry);

    let mut extra = AliasMap::new();
    extra.insert(
        AliasKey::from(&repository),
        WishedBean::value(Repository {
            label: "mock".to_string(),
        }),
    );

    let mocked = context
        .get_bean_with(&service, true, Some(&extra))
        .await?
        .expect("service");
    let mocked = mocked.downcast_ref::<Service>().unwrap();
    assert_eq!(mocked.repository.get().unwrap().label, "mock");

    let real = context.get_bean_as::<Service>(&service).await?;
    assert_eq!(real.repository.get().unwrap().label, "real");
    Ok(())
}

struct TenantResolver;

impl BeanResolver for TenantResolver {
    fn resolve(
        &self,
        path: &AliasKey,
        _target: &(dyn Any + Send + Sync),
    ) -> Option<Vec<(AliasKey, WishedBean)>> {
        match path {
            AliasKey::Path(path) if path == "tenant" => Some(vec![(
                AliasKey::from("tenant.repository"),
                WishedBean::value(Repository {
                    label: "tenant-a".to_string(),
                }),
            )]),
            _ => None,
        }
    }
}

#[tokio::test]
async fn test_resolver_supplies_aliases_for_autowire() -> Result<()> {
    let registry = Arc::new(BeanRegistry::new());
    let resolver = Token::new("resolver");
    let service = Token::new("service");
    registry.register(BeanDefinition::new(
        &resolver,
        BeanClass::builder(|| ResolverBean::new(TenantResolver)).build(),
    ));
    registry.register(
        BeanDefinition::new(
            &service,
            BeanClass::builder(Service::default)
                .autowire_with(
                    "repository",
                    WishedBean::alias("tenant.repository"),
                    true,
                    Some(AliasKey::from("tenant")),
                    |s: &Service| &s.repository,
                )
                .build(),
        )
        .with_resolver(&resolver),
    );

    let context = ApplicationContext::new("app", registry);
    let bean = context.get_bean_as::<Service>(&service).await?;
    assert_eq!(bean.repository.get().unwrap().label, "tenant-a");
    Ok(())
}

#[tokio::test]
async fn test_resolve_path_without_resolver_is_invalid_argument() {
    let registry = Arc::new(BeanRegistry::new());
    let service = Token::new("service");
    registry.register(BeanDefinition::new(
        &service,
        BeanClass::builder(Service::default)
            .autowire_with(
                "repository",
                WishedBean::alias("tenant.repository"),
                true,
                Some(AliasKey::from("tenant")),
                |s: &Service| &s.repository,
            )
            .build(),
    ));

    let context = ApplicationContext::new("app", registry);
    let error = context.get_bean(&service).await.unwrap_err();
    assert!(matches!(error, BeanError::InvalidArgument { .. }));
}

struct DatabaseConfig {
    url: String,
}

#[tokio::test]
async fn test_configuration_class_registers_bean_methods() -> Result<()> {
    let registry = Arc::new(BeanRegistry::new());
    let configuration = Token::new("database-config");
    let connection = Token::new("connection");
    registry.register(BeanDefinition::new(
        &configuration,
        BeanClass::builder(|| DatabaseConfig {
            url: "postgres://localhost/app".to_string(),
        })
        .bean_method(&connection, Scope::Singleton, "connection", |config: &DatabaseConfig| {
            Ok(Repository {
                label: config.url.clone(),
            })
        })
        .build(),
    ));

    let context = ApplicationContext::new("app", registry.clone());
    context.set(&connection, WishedBean::value(Repository {
        label: "placeholder".to_string(),
    }))?;

    context.get_bean(&configuration).await?;
    assert!(registry.contains(&connection));
    assert_eq!(context.alias_count(), 0);

    let first = context.get_bean_as::<Repository>(&connection).await?;
    let second = context.get_bean_as::<Repository>(&connection).await?;
    assert_eq!(first.label, "postgres://localhost/app");
    assert!(Arc::ptr_eq(&first, &second));
    Ok(())
}

#[tokio::test]
async fn test_configuration_bean_methods_visible_in_post_construct() -> Result<()> {
    let registry = Arc::new(BeanRegistry::new());
    let configuration = Token::new("database-config");
    let connection = Token::new("connection");

    let view = registry.clone();
    let produced = connection.clone();
    registry.register(BeanDefinition::new(
        &configuration,
        BeanClass::builder(|| DatabaseConfig {
            url: "postgres://localhost/app".to_string(),
        })
        .bean_method(&connection, Scope::Singleton, "connection", |config: &DatabaseConfig| {
            Ok(Repository {
                label: config.url.clone(),
            })
        })
        .post_construct("verify", move |_config: &DatabaseConfig| {
            let result = if view.contains(&produced) {
                Ok(())
            } else {
                Err(BeanError::invalid_state("工厂方法尚未注册"))
            };
            Box::pin(async move { result })
        })
        .build(),
    ));

    let context = ApplicationContext::new("app", registry);
    context.get_bean(&configuration).await?;

    let bean = context.get_bean_as::<Repository>(&connection).await?;
    assert_eq!(bean.label, "postgres://localhost/app");
    Ok(())
}

struct Recorder {
    name: &'static str,
    seen: Arc<Mutex<Vec<String>>>,
}

fn recorder_class(
    name: &'static str,
    seen: Arc<Mutex<Vec<String>>>,
    class: &'static EventClass,
) -> BeanClass {
    BeanClass::builder(move || Recorder {
        name,
        seen: seen.clone(),
    })
    .listen("record", class, |bean: &Recorder, event: &dyn ApplicationEvent| {
        bean.seen
            .lock()
            .push(format!("{}:{}", bean.name, event.event_class().name()));
    })
    .build()
}

static ORDER_PLACED: EventClass = EventClass::extends("OrderPlaced", &APPLICATION_EVENT);

struct OrderPlaced;

impl ApplicationEvent for OrderPlaced {
    fn event_class(&self) -> &'static EventClass {
        &ORDER_PLACED
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[tokio::test]
async fn test_events_forward_to_running_parent() -> Result<()> {
    let registry = Arc::new(BeanRegistry::new());
    let parent_listener = Token::new("parent-listener");
    let child_listener = Token::new("child-listener");
    let seen = Arc::new(Mutex::new(Vec::new()));
    registry.register(BeanDefinition::new(
        &parent_listener,
        recorder_class("parent", seen.clone(), &APPLICATION_EVENT),
    ));
    registry.register(BeanDefinition::new(
        &child_listener,
        recorder_class("child", seen.clone(), &ORDER_PLACED),
    ));

    let parent = ApplicationContext::new("parent", registry.clone());
    let child = ApplicationContext::new("child", registry);
    child.set_parent(parent.clone())?;
    parent.get_bean(&parent_listener).await?;
    child.get_bean(&child_listener).await?;

    child.publish_event(&OrderPlaced)?;
    assert_eq!(*seen.lock(), vec!["child:OrderPlaced".to_string()]);

    parent.start()?;
    seen.lock().clear();
    child.publish_event(&OrderPlaced)?;
    assert_eq!(
        *seen.lock(),
        vec![
            "child:OrderPlaced".to_string(),
            "parent:OrderPlaced".to_string()
        ]
    );
    Ok(())
}

struct Slow;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_singleton_is_constructed_once() -> Result<()> {
    let registry = Arc::new(BeanRegistry::new());
    let token = Token::new("slow");
    let created = Arc::new(AtomicUsize::new(0));

    let counter = created.clone();
    registry.register(BeanDefinition::new(
        &token,
        BeanClass::builder(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Slow
        })
        .post_construct("warm_up", |_bean: &Slow| {
            Box::pin(async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok(())
            })
        })
        .build(),
    ));

    let context = ApplicationContext::new("app", registry);
    let tasks = (0..8).map(|_| {
        let context = context.clone();
        let token = token.clone();
        tokio::spawn(async move { context.get_bean(&token).await })
    });

    let beans: Vec<BeanRef> = futures::future::try_join_all(tasks)
        .await?
        .into_iter()
        .collect::<BeanResult<_>>()?;

    assert_eq!(created.load(Ordering::SeqCst), 1);
    assert!(beans.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
    Ok(())
}

struct Node {
    next: Autowired<Node>,
}

fn node_class(next: &Token) -> BeanClass {
    BeanClass::builder(|| Node {
        next: Autowired::new(),
    })
    .autowire_required("next", next, |n: &Node| &n.next)
    .build()
}

#[tokio::test]
async fn test_singleton_cycle_resolves_through_cache() -> Result<()> {
    let registry = Arc::new(BeanRegistry::new());
    let a = Token::new("a");
    let b = Token::new("b");
    registry.register(BeanDefinition::new(&a, node_class(&b)));
    registry.register(BeanDefinition::new(&b, node_class(&a)));

    let context = ApplicationContext::new("app", registry);
    let first = context.get_bean_as::<Node>(&a).await?;
    let second = context.get_bean_as::<Node>(&b).await?;

    assert!(Arc::ptr_eq(first.next.get().expect("a.next"), &second));
    assert!(Arc::ptr_eq(second.next.get().expect("b.next"), &first));
    assert_eq!(context.instance_count(), 2);
    Ok(())
}

#[tokio::test]
async fn test_prototype_cycle_is_reported() {
    let registry = Arc::new(BeanRegistry::new());
    let a = Token::new("a");
    let b = Token::new("b");
    registry.register(BeanDefinition::new(&a, node_class(&b)).with_scope(Scope::Prototype));
    registry.register(BeanDefinition::new(&b, node_class(&a)).with_scope(Scope::Prototype));

    let context = ApplicationContext::new("app", registry);
    let error = context.get_bean(&a).await.unwrap_err();
    assert!(matches!(error, BeanError::CircularDependency { .. }));
    assert_eq!(context.instance_count(), 0);
}

#[tokio::test]
async fn test_failed_initialization_leaves_no_instance() {
    let registry = Arc::new(BeanRegistry::new());
    let a = Token::new("a");
    let missing = Token::new("missing");
    registry.register(BeanDefinition::new(&a, node_class(&missing)));

    let context = ApplicationContext::new("app", registry);
    assert!(context.get_bean(&a).await.unwrap_err().is_not_found());
    assert_eq!(context.instance_count(), 0);
    assert!(context.get_cached_bean(&WishedBean::from(&a), false).unwrap().is_none());
}

#[tokio::test]
async fn test_schema_configures_and_starts_beans() -> Result<()> {
    let registry = Arc::new(BeanRegistry::new());
    let greeter = Token::new("greeter");
    let created = Arc::new(AtomicUsize::new(0));
    registry.register(BeanDefinition::new(&greeter, repository_class("greeter", created.clone())));

    let schema = JsonContextLoader::from_json(
        r#"{
            "beansDefinition": [{ "abstraction": "app.greeter", "support": "impl.greeter" }],
            "beans": [
                { "id": "app.greeter" },
                { "id": "app.optional", "optional": true }
            ]
        }"#,
    )
    .load()
    .await?;

    let context = ApplicationContext::new("schema", registry);
    context.set("impl.greeter", &greeter)?;
    context.configure_schema(&schema)?;

    let started = context.start_schema_beans(&schema).await?;
    assert_eq!(started, 1);
    assert_eq!(created.load(Ordering::SeqCst), 1);

    let bean = context.get_bean_as::<Repository>("app.greeter").await?;
    assert_eq!(bean.label, "greeter");
    Ok(())
}

#[derive(Default)]
struct Settings {
    database: InjectedResource,
    feature_flags: InjectedResource,
}

fn settings_class(required_flags: bool) -> BeanClass {
    BeanClass::builder(Settings::default)
        .resource("database", "config://database", true, |s: &Settings| {
            &s.database
        })
        .resource("feature_flags", "config://flags", required_flags, |s: &Settings| {
            &s.feature_flags
        })
        .build()
}

#[tokio::test]
async fn test_resources_are_loaded() -> Result<()> {
    let registry = Arc::new(BeanRegistry::new());
    let optional = Token::new("settings");
    let strict = Token::new("strict-settings");
    registry.register(BeanDefinition::new(&optional, settings_class(false)));
    registry.register(BeanDefinition::new(&strict, settings_class(true)));

    let context = ApplicationContext::new("app", registry);
    context.set_resource_loader(Arc::new(
        StaticResourceLoader::new()
            .with_resource("config://database", serde_json::json!({ "url": "sqlite::memory:" })),
    ));

    let settings = context.get_bean_as::<Settings>(&optional).await?;
    assert_eq!(settings.database.get().unwrap()["url"], "sqlite::memory:");
    assert!(settings.feature_flags.get().is_none());

    let error = context.get_bean(&strict).await.unwrap_err();
    assert!(matches!(error, BeanError::ResourceUnavailable { .. }));
    Ok(())
}

struct CountingLoader {
    calls: AtomicUsize,
}

#[async_trait]
impl ResourceLoader for CountingLoader {
    async fn get_resource(&self, url: &str) -> BeanResult<serde_json::Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(serde_json::json!({ "url": url }))
    }
}

#[tokio::test]
async fn test_custom_resource_loader() -> Result<()> {
    let registry = Arc::new(BeanRegistry::new());
    let token = Token::new("settings");
    registry.register(BeanDefinition::new(&token, settings_class(true)));

    let loader = Arc::new(CountingLoader {
        calls: AtomicUsize::new(0),
    });
    let context = ApplicationContext::new("app", registry);
    context.set_resource_loader(loader.clone());

    let settings = context.get_bean_as::<Settings>(&token).await?;
    assert_eq!(settings.feature_flags.get().unwrap()["url"], "config://flags");
    assert_eq!(loader.calls.load(Ordering::SeqCst), 2);
    Ok(())
}
