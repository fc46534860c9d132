//! 切面织入的端到端测试：通知嵌套顺序、代理身份、
//! 环绕控制流与循环依赖下的织入。

use minioc_aop::{AopPostProcessor, AspectProxy};
use minioc_common::advice::{AspectComponent, AspectMethod, ProceedingJoinPoint};
use minioc_common::component::{unit_value, ComponentRef, Interceptable, MethodArgs, MethodValue};
use minioc_common::errors::{InvocationError, InvocationResult};
use minioc_common::metadata::MethodMetadata;
use minioc_core::{ComponentContainer, DefinitionBuilder};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;

type EventLog = Arc<Mutex<Vec<String>>>;

struct OrderService {
    log: EventLog,
}

impl Interceptable for OrderService {
    fn class_name(&self) -> &str {
        "demo.order.OrderService"
    }

    fn methods(&self) -> Vec<MethodMetadata> {
        vec![MethodMetadata::new("place"), MethodMetadata::new("explode")]
    }

    fn invoke_method(&self, method: &str, _args: MethodArgs) -> InvocationResult<MethodValue> {
        match method {
            "place" => {
                self.log.lock().push("M".to_string());
                Ok(Arc::new(7_i64))
            }
            "explode" => Err(InvocationError::target(
                self.class_name(),
                method,
                "下单失败",
            )),
            other => Err(InvocationError::method_not_found(self.class_name(), other)),
        }
    }
}

/// 前置 + 后置各一条的标记切面
struct BracketAspect {
    tag: &'static str,
    log: EventLog,
}

impl AspectComponent for BracketAspect {
    fn aspect_methods(&self) -> Vec<AspectMethod> {
        let (tag, before_log) = (self.tag, self.log.clone());
        let (tag2, after_log) = (self.tag, self.log.clone());
        vec![
            AspectMethod::pointcut("orders", "execution(* demo.order.*.*(..))"),
            AspectMethod::before("enter", "orders", move |_jp| {
                before_log.lock().push(format!("{tag}.before"));
                Ok(())
            }),
            AspectMethod::after("leave", "orders", move |_jp| {
                after_log.lock().push(format!("{tag2}.after"));
                Ok(())
            }),
        ]
    }
}

fn container_with_aop(log: &EventLog) -> anyhow::Result<ComponentContainer> {
    let container = ComponentContainer::new();
    AopPostProcessor::install(&container);

    for tag in ["R1", "R2"] {
        let aspect_log = log.clone();
        container.register(
            DefinitionBuilder::new(format!("{tag}Aspect"), move || BracketAspect {
                tag,
                log: aspect_log.clone(),
            })
            .aspect()
            .build(),
        )?;
    }
    let service_log = log.clone();
    container.register(
        DefinitionBuilder::new("orderService", move || OrderService {
            log: service_log.clone(),
        })
        .class_name("demo.order.OrderService")
        .interceptable()
        .build(),
    )?;
    container.preinstantiate_singletons()?;
    Ok(container)
}

fn as_proxy(bean: &ComponentRef) -> &AspectProxy {
    bean.downcast_ref::<AspectProxy>()
        .expect("组件应已被代理替换")
}

#[test]
fn advice_nesting_follows_registration_order() -> anyhow::Result<()> {
    let log: EventLog = Arc::new(Mutex::new(Vec::new()));
    let container = container_with_aop(&log)?;

    let service = container.get_instance("orderService")?;
    as_proxy(&service).invoke_method("place", Vec::new())?;

    assert_eq!(
        *log.lock(),
        vec!["R1.before", "R2.before", "M", "R2.after", "R1.after"]
    );
    Ok(())
}

#[test]
fn after_advice_fires_on_the_error_path() -> anyhow::Result<()> {
    let log: EventLog = Arc::new(Mutex::new(Vec::new()));
    let container = container_with_aop(&log)?;

    let service = container.get_instance("orderService")?;
    let result = as_proxy(&service).invoke_method("explode", Vec::new());

    assert!(matches!(result, Err(InvocationError::Target { .. })));
    assert_eq!(
        *log.lock(),
        vec!["R1.before", "R2.before", "R2.after", "R1.after"]
    );
    Ok(())
}

#[test]
fn proxy_identity_is_stable_across_lookups() -> anyhow::Result<()> {
    let log: EventLog = Arc::new(Mutex::new(Vec::new()));
    let container = container_with_aop(&log)?;

    let first = container.get_instance("orderService")?;
    let second = container.get_instance("orderService")?;
    assert!(Arc::ptr_eq(&first, &second));
    assert!(first.downcast_ref::<AspectProxy>().is_some());
    Ok(())
}

#[test]
fn aspects_themselves_are_not_proxied() -> anyhow::Result<()> {
    let log: EventLog = Arc::new(Mutex::new(Vec::new()));
    let container = container_with_aop(&log)?;

    let aspect = container.get_instance("R1Aspect")?;
    assert!(aspect.downcast_ref::<BracketAspect>().is_some());
    Ok(())
}

struct RetryAspect;

impl AspectComponent for RetryAspect {
    fn aspect_methods(&self) -> Vec<AspectMethod> {
        vec![
            AspectMethod::around(
                "skip_explosions",
                "execution(* demo.order.*.explode(..))",
                |_pjp| Ok(unit_value()),
            ),
            AspectMethod::around(
                "double_place",
                "execution(* demo.order.*.place(..))",
                |pjp| {
                    pjp.proceed()?;
                    pjp.proceed()
                },
            ),
        ]
    }
}

#[test]
fn around_advice_controls_target_execution() -> anyhow::Result<()> {
    let log: EventLog = Arc::new(Mutex::new(Vec::new()));
    let container = ComponentContainer::new();
    AopPostProcessor::install(&container);
    container.register(
        DefinitionBuilder::new("retryAspect", || RetryAspect)
            .aspect()
            .build(),
    )?;
    let service_log = log.clone();
    container.register(
        DefinitionBuilder::new("orderService", move || OrderService {
            log: service_log.clone(),
        })
        .class_name("demo.order.OrderService")
        .interceptable()
        .build(),
    )?;
    container.preinstantiate_singletons()?;

    let service = container.get_instance("orderService")?;
    // 环绕短路：目标从未执行，错误被吞掉
    as_proxy(&service).invoke_method("explode", Vec::new())?;
    assert!(log.lock().is_empty());

    // 环绕重放：目标执行两次
    as_proxy(&service).invoke_method("place", Vec::new())?;
    assert_eq!(*log.lock(), vec!["M", "M"]);
    Ok(())
}

struct OutcomeAspect {
    log: EventLog,
}

impl AspectComponent for OutcomeAspect {
    fn aspect_methods(&self) -> Vec<AspectMethod> {
        let ok_log = self.log.clone();
        let err_log = self.log.clone();
        vec![
            AspectMethod::after_returning(
                "record_value",
                "execution(* demo.order.*.*(..))",
                move |_jp, value| {
                    let got = *value.downcast_ref::<i64>().unwrap_or(&0);
                    ok_log.lock().push(format!("returning:{got}"));
                    Ok(())
                },
            ),
            AspectMethod::after_throwing(
                "record_error",
                "execution(* demo.order.*.*(..))",
                move |jp, _error| {
                    err_log.lock().push(format!("throwing:{}", jp.method.name));
                    Ok(())
                },
            ),
        ]
    }
}

#[test]
fn returning_and_throwing_advice_are_exclusive() -> anyhow::Result<()> {
    let log: EventLog = Arc::new(Mutex::new(Vec::new()));
    let container = ComponentContainer::new();
    AopPostProcessor::install(&container);
    let aspect_log = log.clone();
    container.register(
        DefinitionBuilder::new("outcomeAspect", move || OutcomeAspect {
            log: aspect_log.clone(),
        })
        .aspect()
        .build(),
    )?;
    let service_log = log.clone();
    container.register(
        DefinitionBuilder::new("orderService", move || OrderService {
            log: service_log.clone(),
        })
        .class_name("demo.order.OrderService")
        .interceptable()
        .build(),
    )?;
    container.preinstantiate_singletons()?;
    let service = container.get_instance("orderService")?;

    as_proxy(&service).invoke_method("place", Vec::new())?;
    assert_eq!(*log.lock(), vec!["M", "returning:7"]);

    log.lock().clear();
    let result = as_proxy(&service).invoke_method("explode", Vec::new());
    assert!(matches!(result, Err(InvocationError::Target { .. })));
    assert_eq!(*log.lock(), vec!["throwing:explode"]);
    Ok(())
}

struct EngineA {
    peer: RwLock<Option<ComponentRef>>,
    log: EventLog,
}

impl Interceptable for EngineA {
    fn class_name(&self) -> &str {
        "demo.cycle.EngineA"
    }

    fn methods(&self) -> Vec<MethodMetadata> {
        vec![MethodMetadata::new("ping")]
    }

    fn invoke_method(&self, method: &str, _args: MethodArgs) -> InvocationResult<MethodValue> {
        match method {
            "ping" => {
                let wired = self.peer.read().is_some();
                self.log.lock().push(format!("ping:{wired}"));
                Ok(unit_value())
            }
            other => Err(InvocationError::method_not_found(self.class_name(), other)),
        }
    }
}

struct EngineB {
    peer: RwLock<Option<ComponentRef>>,
}

struct CycleAspect {
    log: EventLog,
}

impl AspectComponent for CycleAspect {
    fn aspect_methods(&self) -> Vec<AspectMethod> {
        let log = self.log.clone();
        vec![AspectMethod::before(
            "watch",
            "execution(* demo.cycle.*.*(..))",
            move |jp| {
                log.lock().push(format!("before:{}", jp.method.name));
                Ok(())
            },
        )]
    }
}

#[test]
fn weaving_inside_a_cycle_keeps_a_single_proxy_identity() -> anyhow::Result<()> {
    let log: EventLog = Arc::new(Mutex::new(Vec::new()));
    let container = ComponentContainer::new();
    AopPostProcessor::install(&container);

    let aspect_log = log.clone();
    container.register(
        DefinitionBuilder::new("cycleAspect", move || CycleAspect {
            log: aspect_log.clone(),
        })
        .aspect()
        .build(),
    )?;
    let engine_log = log.clone();
    container.register(
        DefinitionBuilder::new("engineA", move || EngineA {
            peer: RwLock::new(None),
            log: engine_log.clone(),
        })
        .class_name("demo.cycle.EngineA")
        .interceptable()
        .depends_on::<EngineB, _>("engineB", |a, dep| {
            *a.peer.write() = Some(dep);
            Ok(())
        })
        .build(),
    )?;
    container.register(
        DefinitionBuilder::new("engineB", || EngineB {
            peer: RwLock::new(None),
        })
        .depends_on::<EngineA, _>("engineA", |b, dep| {
            *b.peer.write() = Some(dep);
            Ok(())
        })
        .build(),
    )?;
    container.preinstantiate_singletons()?;

    let a = container.get_instance("engineA")?;
    assert!(a.downcast_ref::<AspectProxy>().is_some());

    // 循环另一侧注入的就是对外发布的同一个代理
    let b = container.get_typed::<EngineB>()?;
    let injected = b.peer.read().clone().unwrap();
    assert!(Arc::ptr_eq(&injected, &a));

    // 经由早期织入的代理同样触发通知
    as_proxy(&injected).invoke_method("ping", Vec::new())?;
    assert_eq!(*log.lock(), vec!["before:ping", "ping:true"]);
    Ok(())
}
