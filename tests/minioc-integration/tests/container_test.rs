//! 容器核心的端到端测试：依赖装配、作用域、循环依赖、
//! 属性注入与生命周期。

use minioc_common::component::ComponentRef;
use minioc_common::errors::{ContainerError, ContainerResult};
use minioc_core::post_processor::ComponentPostProcessor;
use minioc_core::{ComponentContainer, DefinitionBuilder, MapPropertyResolver};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;

fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("minioc_core=debug,minioc_aop=debug")
            .with_test_writer()
            .try_init();
    });
}

/// 共享事件日志
type EventLog = Arc<Mutex<Vec<String>>>;

#[derive(Debug)]
struct Repository {
    dsn: RwLock<String>,
}

impl Repository {
    fn new() -> Self {
        Self {
            dsn: RwLock::new(String::new()),
        }
    }
}

#[derive(Debug)]
struct Service {
    repository: RwLock<Option<ComponentRef>>,
}

impl Service {
    fn new() -> Self {
        Self {
            repository: RwLock::new(None),
        }
    }
}

#[test]
fn wires_an_acyclic_dependency_graph() -> anyhow::Result<()> {
    init_tracing();
    let container = ComponentContainer::new();
    container.set_property_resolver(Arc::new(
        MapPropertyResolver::new().with("db.dsn", "postgres://localhost/app"),
    ));

    container.register(
        DefinitionBuilder::new("repository", Repository::new)
            .value("dsn", "${db.dsn}", |repo: &Repository, value| {
                *repo.dsn.write() = value;
                Ok(())
            })
            .build(),
    )?;
    container.register(
        DefinitionBuilder::new("service", Service::new)
            .depends_on::<Repository, _>("repository", |service, dep| {
                *service.repository.write() = Some(dep);
                Ok(())
            })
            .build(),
    )?;

    let service = container.get_typed::<Service>()?;
    let repository = container.get_instance("repository")?;
    let injected = service.repository.read().clone().unwrap();
    assert!(Arc::ptr_eq(&injected, &repository));
    assert_eq!(
        *injected.downcast_ref::<Repository>().unwrap().dsn.read(),
        "postgres://localhost/app"
    );
    Ok(())
}

#[test]
fn value_placeholder_falls_back_to_default() -> anyhow::Result<()> {
    let container = ComponentContainer::new();
    container.set_property_resolver(Arc::new(MapPropertyResolver::new()));
    container.register(
        DefinitionBuilder::new("repository", Repository::new)
            .value("dsn", "${db.dsn:sqlite://memory}", |repo: &Repository, value| {
                *repo.dsn.write() = value;
                Ok(())
            })
            .build(),
    )?;

    let repository = container.get_typed::<Repository>()?;
    assert_eq!(*repository.dsn.read(), "sqlite://memory");
    Ok(())
}

#[derive(Debug)]
struct PeerA {
    peer: RwLock<Option<ComponentRef>>,
}

#[derive(Debug)]
struct PeerB {
    peer: RwLock<Option<ComponentRef>>,
}

fn register_peers(container: &ComponentContainer) -> ContainerResult<()> {
    container.register(
        DefinitionBuilder::new("peerA", || PeerA {
            peer: RwLock::new(None),
        })
        .depends_on::<PeerB, _>("peerB", |a, dep| {
            *a.peer.write() = Some(dep);
            Ok(())
        })
        .build(),
    )?;
    container.register(
        DefinitionBuilder::new("peerB", || PeerB {
            peer: RwLock::new(None),
        })
        .depends_on::<PeerA, _>("peerA", |b, dep| {
            *b.peer.write() = Some(dep);
            Ok(())
        })
        .build(),
    )
}

#[test]
fn mutual_singleton_cycle_shares_one_identity() -> anyhow::Result<()> {
    init_tracing();
    let container = ComponentContainer::new();
    register_peers(&container)?;

    let a = container.get_instance("peerA")?;
    let b = container.get_instance("peerB")?;

    let a_peer = a
        .downcast_ref::<PeerA>()
        .unwrap()
        .peer
        .read()
        .clone()
        .unwrap();
    let b_peer = b
        .downcast_ref::<PeerB>()
        .unwrap()
        .peer
        .read()
        .clone()
        .unwrap();
    assert!(Arc::ptr_eq(&a_peer, &b));
    assert!(Arc::ptr_eq(&b_peer, &a));
    Ok(())
}

#[test]
fn prototype_scope_returns_fresh_instances() -> anyhow::Result<()> {
    let container = ComponentContainer::new();
    container.register(
        DefinitionBuilder::new("repository", Repository::new)
            .prototype()
            .build(),
    )?;

    let first = container.get_instance("repository")?;
    let second = container.get_instance("repository")?;
    assert!(!Arc::ptr_eq(&first, &second));
    Ok(())
}

#[test]
fn prototype_cycle_is_unresolvable() -> anyhow::Result<()> {
    let container = ComponentContainer::new();
    container.register(
        DefinitionBuilder::new("peerA", || PeerA {
            peer: RwLock::new(None),
        })
        .prototype()
        .depends_on::<PeerB, _>("peerB", |a, dep| {
            *a.peer.write() = Some(dep);
            Ok(())
        })
        .build(),
    )?;
    container.register(
        DefinitionBuilder::new("peerB", || PeerB {
            peer: RwLock::new(None),
        })
        .prototype()
        .depends_on::<PeerA, _>("peerA", |b, dep| {
            *b.peer.write() = Some(dep);
            Ok(())
        })
        .build(),
    )?;

    let result = container.get_instance("peerA");
    assert!(matches!(
        result,
        Err(ContainerError::UnresolvableCircularReference { .. })
    ));
    Ok(())
}

#[test]
fn concurrent_prototype_creation_is_independent() -> anyhow::Result<()> {
    let container = Arc::new(ComponentContainer::new());
    container.register(
        DefinitionBuilder::new("slow", || {
            std::thread::sleep(std::time::Duration::from_millis(100));
            Repository::new()
        })
        .prototype()
        .build(),
    )?;

    // 两个线程同时创建同名原型，互不构成循环
    let workers: Vec<_> = (0..2)
        .map(|_| {
            let container = container.clone();
            std::thread::spawn(move || container.get_instance("slow"))
        })
        .collect();
    let mut instances = Vec::new();
    for worker in workers {
        instances.push(worker.join().expect("工作线程不应崩溃")?);
    }
    assert!(!Arc::ptr_eq(&instances[0], &instances[1]));
    Ok(())
}

#[test]
fn missing_candidate_fails_resolution() -> anyhow::Result<()> {
    let container = ComponentContainer::new();
    container.register(
        DefinitionBuilder::new("service", Service::new)
            .depends_on::<Repository, _>("repository", |service, dep| {
                *service.repository.write() = Some(dep);
                Ok(())
            })
            .build(),
    )?;

    let result = container.get_instance("service");
    let Err(ContainerError::CreationFailed { name, source }) = result else {
        panic!("期望创建失败");
    };
    assert_eq!(name, "service");
    assert!(source.to_string().contains("可注入组件"));
    Ok(())
}

#[test]
fn ambiguous_candidates_resolve_by_site_name() -> anyhow::Result<()> {
    let container = ComponentContainer::new();
    container.register(DefinitionBuilder::new("primaryRepo", Repository::new).build())?;
    container.register(DefinitionBuilder::new("backupRepo", Repository::new).build())?;
    container.register(
        DefinitionBuilder::new("service", Service::new)
            .depends_on::<Repository, _>("backupRepo", |service, dep| {
                *service.repository.write() = Some(dep);
                Ok(())
            })
            .build(),
    )?;

    let service = container.get_instance("service")?;
    let injected = service
        .downcast_ref::<Service>()
        .unwrap()
        .peer_handle()
        .unwrap();
    let backup = container.get_instance("backupRepo")?;
    assert!(Arc::ptr_eq(&injected, &backup));

    // 站点名不与任何候选同名时歧义不可解
    assert!(matches!(
        container.get_instance_by_type::<Repository>(),
        Err(ContainerError::AmbiguousComponent { .. })
    ));
    Ok(())
}

impl Service {
    fn peer_handle(&self) -> Option<ComponentRef> {
        self.repository.read().clone()
    }
}

#[derive(Debug)]
struct Lifecycled {
    name: &'static str,
    log: EventLog,
}

fn lifecycled(name: &'static str, log: &EventLog) -> DefinitionBuilder<Lifecycled> {
    let constructed = log.clone();
    DefinitionBuilder::new(name, move || Lifecycled {
        name,
        log: constructed.clone(),
    })
    .init_hook("start", |c: &Lifecycled| {
        c.log.lock().push(format!("init:{}", c.name));
        Ok(())
    })
    .destroy_hook("stop", |c: &Lifecycled| {
        c.log.lock().push(format!("destroy:{}", c.name));
        Ok(())
    })
}

#[test]
fn destruction_runs_in_reverse_creation_order_exactly_once() -> anyhow::Result<()> {
    let log: EventLog = Arc::new(Mutex::new(Vec::new()));
    let container = ComponentContainer::new();
    container.register(lifecycled("first", &log).build())?;
    container.register(lifecycled("second", &log).build())?;

    container.preinstantiate_singletons()?;
    container.destroy_singletons();
    // 再次销毁不应重复回调
    container.destroy_singletons();

    assert_eq!(
        *log.lock(),
        vec!["init:first", "init:second", "destroy:second", "destroy:first"]
    );
    Ok(())
}

#[test]
fn lazy_singleton_is_deferred_until_first_use() -> anyhow::Result<()> {
    let log: EventLog = Arc::new(Mutex::new(Vec::new()));
    let container = ComponentContainer::new();
    container.register(lifecycled("eager", &log).build())?;
    container.register(lifecycled("deferred", &log).lazy().build())?;

    container.preinstantiate_singletons()?;
    assert_eq!(*log.lock(), vec!["init:eager"]);

    container.get_instance("deferred")?;
    assert_eq!(*log.lock(), vec!["init:eager", "init:deferred"]);
    Ok(())
}

#[derive(Debug)]
struct Connection {
    log: EventLog,
}

impl minioc_common::lifecycle::InitializingComponent for Connection {
    fn after_properties_set(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.log.lock().push("connected".to_string());
        Ok(())
    }
}

impl minioc_common::lifecycle::DisposableComponent for Connection {
    fn destroy(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.log.lock().push("closed".to_string());
        Ok(())
    }
}

#[test]
fn lifecycle_trait_callbacks_fire_exactly_once() -> anyhow::Result<()> {
    let log: EventLog = Arc::new(Mutex::new(Vec::new()));
    let container = ComponentContainer::new();
    let conn_log = log.clone();
    container.register(
        DefinitionBuilder::new("connection", move || Connection {
            log: conn_log.clone(),
        })
        .initializing()
        .disposable()
        .build(),
    )?;

    container.preinstantiate_singletons()?;
    container.destroy_singletons();
    assert_eq!(*log.lock(), vec!["connected", "closed"]);
    Ok(())
}

/// 把指定组件替换为另一个对象的测试处理器
struct Replacer {
    target: String,
    replacement: ComponentRef,
}

impl ComponentPostProcessor for Replacer {
    fn name(&self) -> &str {
        "Replacer"
    }

    fn post_process_after_initialization(
        &self,
        bean: ComponentRef,
        component_name: &str,
    ) -> ContainerResult<ComponentRef> {
        if component_name == self.target {
            Ok(self.replacement.clone())
        } else {
            Ok(bean)
        }
    }
}

/// 在早期暴露与初始化后两处都替换的测试处理器
struct EarlyReplacer {
    target: String,
    replacement: ComponentRef,
}

impl ComponentPostProcessor for EarlyReplacer {
    fn name(&self) -> &str {
        "EarlyReplacer"
    }

    fn post_process_after_initialization(
        &self,
        bean: ComponentRef,
        component_name: &str,
    ) -> ContainerResult<ComponentRef> {
        if component_name == self.target {
            Ok(self.replacement.clone())
        } else {
            Ok(bean)
        }
    }

    fn early_reference(&self, bean: ComponentRef, component_name: &str) -> ComponentRef {
        if component_name == self.target {
            self.replacement.clone()
        } else {
            bean
        }
    }
}

#[test]
fn substitution_with_early_hook_survives_a_cycle() -> anyhow::Result<()> {
    let container = ComponentContainer::new();
    let replacement: ComponentRef = Arc::new(PeerA {
        peer: RwLock::new(None),
    });
    container.add_post_processor(Arc::new(EarlyReplacer {
        target: "peerA".to_string(),
        replacement: replacement.clone(),
    }));
    register_peers(&container)?;

    let a = container.get_instance("peerA")?;
    assert!(Arc::ptr_eq(&a, &replacement));

    // 循环另一侧注入的同样是替换后的对象
    let b = container.get_instance("peerB")?;
    let injected = b
        .downcast_ref::<PeerB>()
        .unwrap()
        .peer
        .read()
        .clone()
        .unwrap();
    assert!(Arc::ptr_eq(&injected, &replacement));
    Ok(())
}

#[test]
fn post_processor_substitution_is_visible_to_dependents() -> anyhow::Result<()> {
    let container = ComponentContainer::new();
    let replacement: ComponentRef = Arc::new(Repository::new());
    container.add_post_processor(Arc::new(Replacer {
        target: "repository".to_string(),
        replacement: replacement.clone(),
    }));

    container.register(DefinitionBuilder::new("repository", Repository::new).build())?;
    container.register(
        DefinitionBuilder::new("service", Service::new)
            .depends_on::<Repository, _>("repository", |service, dep| {
                *service.repository.write() = Some(dep);
                Ok(())
            })
            .build(),
    )?;

    let service = container.get_instance("service")?;
    let injected = service
        .downcast_ref::<Service>()
        .unwrap()
        .peer_handle()
        .unwrap();
    assert!(Arc::ptr_eq(&injected, &replacement));
    assert!(Arc::ptr_eq(&container.get_instance("repository")?, &replacement));
    Ok(())
}
