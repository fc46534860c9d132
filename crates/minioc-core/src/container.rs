//! 容器核心
//!
//! 组件创建引擎：三级缓存解决循环依赖，粗粒度可重入锁串行化
//! 单例创建，后置处理链作为代理替换的唯一集成点。
//!
//! 三级缓存的名称状态机：工厂层（延迟的早期引用供应器）→
//! 早期层（已构造未填充，仅循环解析期间可见）→ 完成层（全局可见，
//! 容器生命周期内永久）。每个名称至多占据一层，提升单向进行。

use crate::definition::{ComponentDefinition, InjectionSite};
use crate::post_processor::ComponentPostProcessor;
use crate::properties::{resolve_placeholder, PropertyResolver};
use crate::registry::DefinitionRegistry;
use dashmap::DashMap;
use minioc_common::component::ComponentRef;
use minioc_common::errors::{ContainerError, ContainerResult};
use minioc_common::metadata::TypeInfo;
use parking_lot::{Mutex, ReentrantMutex, ReentrantMutexGuard, RwLock};
use std::any::TypeId;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 早期引用供应器
type EarlyRefFn = Box<dyn FnOnce() -> ComponentRef + Send>;

/// 创建期状态：早期/工厂两级缓存与“创建中”集合
///
/// 整体挂在一把可重入锁之下：跨线程串行化单例创建，
/// 同线程允许因循环依赖重入。
#[derive(Default)]
struct CreationTiers {
    /// 二级缓存：早期引用（已构造、未完成填充）
    early: HashMap<String, ComponentRef>,
    /// 三级缓存：早期引用供应器
    factories: HashMap<String, EarlyRefFn>,
    /// 正在创建的单例名
    singletons_in_creation: HashSet<String>,
}

thread_local! {
    /// 本线程调用栈上正在创建的原型名（循环即不可解）
    ///
    /// 原型创建不跨线程串行化，循环检测只对同一调用栈内的重入
    /// 有意义：不同线程并发创建同名原型互不相关。
    static PROTOTYPES_IN_CREATION: RefCell<HashSet<String>> = RefCell::new(HashSet::new());
}

/// 组件容器
///
/// 持有定义注册表、三级单例缓存与后置处理链。
/// 完成层读取无锁；创建路径由一把粗粒度可重入锁保护。
pub struct ComponentContainer {
    registry: Arc<DefinitionRegistry>,
    /// 一级缓存：完成的单例
    finished: DashMap<String, ComponentRef>,
    creation: ReentrantMutex<RefCell<CreationTiers>>,
    post_processors: RwLock<Vec<Arc<dyn ComponentPostProcessor>>>,
    property_resolver: RwLock<Option<Arc<dyn PropertyResolver>>>,
    /// 创建顺序记录的原始单例实例，销毁阶段逆序消费
    raw_singletons: Mutex<Vec<(String, ComponentRef)>>,
}

impl ComponentContainer {
    /// 创建空容器
    pub fn new() -> Self {
        Self::with_registry(Arc::new(DefinitionRegistry::new()))
    }

    /// 以既有注册表创建容器
    pub fn with_registry(registry: Arc<DefinitionRegistry>) -> Self {
        Self {
            registry,
            finished: DashMap::new(),
            creation: ReentrantMutex::new(RefCell::new(CreationTiers::default())),
            post_processors: RwLock::new(Vec::new()),
            property_resolver: RwLock::new(None),
            raw_singletons: Mutex::new(Vec::new()),
        }
    }

    /// 定义注册表
    pub fn registry(&self) -> &Arc<DefinitionRegistry> {
        &self.registry
    }

    /// 注册组件定义
    pub fn register(&self, definition: ComponentDefinition) -> ContainerResult<()> {
        self.registry.register(definition)
    }

    /// 追加后置处理器，执行顺序即注册顺序
    pub fn add_post_processor(&self, processor: Arc<dyn ComponentPostProcessor>) {
        info!("注册后置处理器: {}", processor.name());
        self.post_processors.write().push(processor);
    }

    /// 配置属性解析器
    pub fn set_property_resolver(&self, resolver: Arc<dyn PropertyResolver>) {
        *self.property_resolver.write() = Some(resolver);
    }

    /// 获取组件实例
    ///
    /// 单例路径命中完成层直接返回；未命中时在创建锁内守卫创建。
    /// 原型路径每次新建，跳过全部缓存，但仍然填充依赖并走
    /// 后置处理链。
    pub fn get_instance(&self, name: &str) -> ContainerResult<ComponentRef> {
        if let Some(bean) = self.finished.get(name) {
            return Ok(bean.value().clone());
        }
        let definition =
            self.registry
                .get(name)
                .ok_or_else(|| ContainerError::DefinitionNotFound {
                    name: name.to_string(),
                })?;
        if definition.scope.is_singleton() {
            self.get_singleton(name, &definition)
        } else {
            self.create_prototype(name, &definition)
        }
    }

    /// 按类型获取组件实例
    ///
    /// 零候选失败 `NoQualifyingComponent`，多候选失败
    /// `AmbiguousComponent`（按类型获取没有注入站点名可供消歧）。
    pub fn get_instance_by_type<T: 'static>(&self) -> ContainerResult<ComponentRef> {
        let info = TypeInfo::of::<T>();
        self.get_by_type(info.id, info.name)
    }

    /// 按 `TypeId` 获取组件实例
    pub fn get_by_type(&self, type_id: TypeId, type_name: &str) -> ContainerResult<ComponentRef> {
        let candidates = self.registry.names_for_type(type_id);
        match candidates.as_slice() {
            [] => Err(ContainerError::NoQualifyingComponent {
                type_name: type_name.to_string(),
            }),
            [only] => self.get_instance(only),
            _ => Err(ContainerError::AmbiguousComponent {
                type_name: type_name.to_string(),
                candidates,
            }),
        }
    }

    /// 按类型获取并降型为具体类型
    ///
    /// 组件被代理替换后无法降型，此入口仅适用于未织入的组件。
    pub fn get_typed<T: Send + Sync + 'static>(&self) -> ContainerResult<Arc<T>> {
        self.get_instance_by_type::<T>()?
            .downcast::<T>()
            .map_err(|_| ContainerError::type_mismatch(std::any::type_name::<T>()))
    }

    /// 是否注册了指定名称的组件
    pub fn contains(&self, name: &str) -> bool {
        self.registry.contains(name) || self.finished.contains_key(name)
    }

    /// 指定名称的组件是否为单例作用域
    pub fn is_singleton(&self, name: &str) -> bool {
        self.registry
            .get(name)
            .is_some_and(|d| d.scope.is_singleton())
    }

    /// 指定名称组件的实现类型
    pub fn type_of(&self, name: &str) -> ContainerResult<TypeInfo> {
        self.registry
            .get(name)
            .map(|d| d.type_info)
            .ok_or_else(|| ContainerError::DefinitionNotFound {
                name: name.to_string(),
            })
    }

    /// 预实例化全部非延迟单例
    ///
    /// 两阶段启动的第二阶段：先注册全部定义，再统一实例化。
    /// 切面定义先于普通组件实例化，使织入不依赖注册顺序。
    pub fn preinstantiate_singletons(&self) -> ContainerResult<()> {
        info!("开始预实例化单例组件");
        let names = self.registry.names();
        for pass_aspects in [true, false] {
            for name in &names {
                let Some(definition) = self.registry.get(name) else {
                    continue;
                };
                if definition.is_aspect == pass_aspects
                    && definition.scope.is_singleton()
                    && !definition.lazy
                {
                    self.get_instance(name)?;
                }
            }
        }
        Ok(())
    }

    /// 销毁全部单例
    ///
    /// 按创建顺序的逆序执行销毁钩子与销毁回调，每个组件恰好
    /// 收到一次；单个失败只记录日志，不中断整体销毁。
    pub fn destroy_singletons(&self) {
        info!("开始销毁单例组件");
        let mut raw = self.raw_singletons.lock();
        for (name, bean) in raw.drain(..).rev() {
            let Some(definition) = self.registry.get(&name) else {
                continue;
            };
            if let Some(hook) = &definition.destroy_hook {
                debug!("调用销毁钩子 {}::{}", name, hook.name);
                if let Err(error) = (hook.invoke)(&bean) {
                    warn!("销毁钩子执行失败 {}::{}: {}", name, hook.name, error);
                }
            }
            if let Some(caster) = &definition.disposable {
                if let Some(disposable) = caster(&bean) {
                    if let Err(error) = disposable.destroy() {
                        warn!("组件销毁回调失败 {}: {}", name, error);
                    }
                }
            }
            self.finished.remove(&name);
        }
    }

    /// 单例获取：守卫创建
    fn get_singleton(
        &self,
        name: &str,
        definition: &ComponentDefinition,
    ) -> ContainerResult<ComponentRef> {
        // 粗粒度创建锁：跨线程串行化，同线程可因循环依赖重入
        let guard = self.creation.lock();

        if let Some(bean) = self.finished.get(name) {
            return Ok(bean.value().clone());
        }
        if let Some(early) = self.cached_early_reference(&guard, name) {
            debug!("检测到循环依赖，返回 {} 的早期引用", name);
            return Ok(early);
        }

        guard
            .borrow_mut()
            .singletons_in_creation
            .insert(name.to_string());

        let created = self.create_component(name, definition);

        guard.borrow_mut().singletons_in_creation.remove(name);

        let bean = match created {
            Ok(bean) => bean,
            Err(error) => return Err(wrap_creation_error(name, error)),
        };

        // 提升为完成态：清空早期/工厂层
        {
            let mut tiers = guard.borrow_mut();
            tiers.early.remove(name);
            tiers.factories.remove(name);
        }
        self.finished.insert(name.to_string(), bean.clone());
        info!("创建单例组件: {}", name);
        Ok(bean)
    }

    /// 从早期/工厂层取早期引用
    ///
    /// 仅当名称处于“创建中”时可见：首次命中工厂层会执行
    /// 供应器并把结果缓存进早期层，保证重复取得同一身份。
    fn cached_early_reference(
        &self,
        guard: &ReentrantMutexGuard<'_, RefCell<CreationTiers>>,
        name: &str,
    ) -> Option<ComponentRef> {
        let factory = {
            let mut tiers = guard.borrow_mut();
            if !tiers.singletons_in_creation.contains(name) {
                return None;
            }
            if let Some(early) = tiers.early.get(name) {
                return Some(early.clone());
            }
            tiers.factories.remove(name)?
        };
        // 供应器会调用后置处理器，须在释放内部借用后执行
        let early = factory();
        guard
            .borrow_mut()
            .early
            .insert(name.to_string(), early.clone());
        Some(early)
    }

    /// 原型获取：每次新建，同一调用栈内的重入即不可解循环
    fn create_prototype(
        &self,
        name: &str,
        definition: &ComponentDefinition,
    ) -> ContainerResult<ComponentRef> {
        let entered =
            PROTOTYPES_IN_CREATION.with(|names| names.borrow_mut().insert(name.to_string()));
        if !entered {
            return Err(ContainerError::UnresolvableCircularReference {
                name: name.to_string(),
            });
        }

        let created = self.create_component(name, definition);

        PROTOTYPES_IN_CREATION.with(|names| {
            names.borrow_mut().remove(name);
        });

        match created {
            Ok(bean) => {
                debug!("创建原型组件: {}", name);
                Ok(bean)
            }
            Err(error) => Err(wrap_creation_error(name, error)),
        }
    }

    /// 组件创建：构造 → 早期暴露 → 填充 → 初始化
    fn create_component(
        &self,
        name: &str,
        definition: &ComponentDefinition,
    ) -> Result<ComponentRef, Box<dyn std::error::Error + Send + Sync>> {
        debug!("开始创建组件: {}", name);
        let raw = (definition.constructor)()?;

        // 构造完成、填充之前安装早期引用供应器，循环依赖方
        // 经由它拿到与最终对象一致的身份（含代理替换）
        if definition.scope.is_singleton() {
            self.install_early_factory(name, raw.clone());
        }

        self.populate(name, definition, &raw)?;
        let mut exposed = self.initialize(name, definition, raw.clone())?;

        // 循环依赖消费过早期引用时以早期对象为准，全局共享一个身份
        if definition.scope.is_singleton() {
            let guard = self.creation.lock();
            let tiers = guard.borrow();
            if let Some(early) = tiers.early.get(name) {
                if !Arc::ptr_eq(early, &exposed) {
                    warn!(
                        "组件 {} 的初始化后替换被早期引用覆盖，仅在 after 钩子替换的处理器对循环依赖无效",
                        name
                    );
                }
                exposed = early.clone();
            }
        }

        if definition.scope.is_singleton() {
            self.raw_singletons.lock().push((name.to_string(), raw));
        }
        Ok(exposed)
    }

    fn install_early_factory(&self, name: &str, raw: ComponentRef) {
        let processors = self.post_processors.read().clone();
        let component_name = name.to_string();
        let factory: EarlyRefFn = Box::new(move || {
            let mut exposed = raw;
            for processor in &processors {
                exposed = processor.early_reference(exposed, &component_name);
            }
            exposed
        });

        let guard = self.creation.lock();
        let mut tiers = guard.borrow_mut();
        if tiers.singletons_in_creation.contains(name) && !self.finished.contains_key(name) {
            tiers.factories.insert(name.to_string(), factory);
            tiers.early.remove(name);
        }
    }

    /// 依赖与属性填充，递归解析其余组件
    fn populate(
        &self,
        name: &str,
        definition: &ComponentDefinition,
        bean: &ComponentRef,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        for site in &definition.injection_sites {
            match site {
                InjectionSite::Dependency {
                    site_name,
                    required,
                    apply,
                } => {
                    let dependency = self.resolve_dependency(required, site_name)?;
                    apply(bean, dependency)?;
                    debug!("注入依赖 {} -> {}.{}", required.name, name, site_name);
                }
                InjectionSite::Value {
                    site_name,
                    placeholder,
                    apply,
                } => {
                    let resolver = self.property_resolver.read().clone();
                    let value = resolve_placeholder(placeholder, resolver.as_deref())?;
                    apply(bean, value)?;
                    debug!("注入属性 {} -> {}.{}", placeholder, name, site_name);
                }
            }
        }
        Ok(())
    }

    /// 按声明类型解析依赖
    ///
    /// 多候选时尝试按名消歧：候选注册名与注入站点名一致则采纳。
    fn resolve_dependency(
        &self,
        required: &TypeInfo,
        site_name: &str,
    ) -> ContainerResult<ComponentRef> {
        let candidates = self.registry.names_for_type(required.id);
        match candidates.as_slice() {
            [] => Err(ContainerError::NoQualifyingComponent {
                type_name: required.name.to_string(),
            }),
            [only] => self.get_instance(only),
            _ => {
                if candidates.iter().any(|candidate| candidate == site_name) {
                    self.get_instance(site_name)
                } else {
                    Err(ContainerError::AmbiguousComponent {
                        type_name: required.name.to_string(),
                        candidates,
                    })
                }
            }
        }
    }

    /// 初始化：before 钩子 → 初始化回调 → after 钩子
    fn initialize(
        &self,
        name: &str,
        definition: &ComponentDefinition,
        bean: ComponentRef,
    ) -> Result<ComponentRef, Box<dyn std::error::Error + Send + Sync>> {
        let processors = self.post_processors.read().clone();

        let mut wrapped = bean;
        for processor in &processors {
            wrapped = processor.post_process_before_initialization(wrapped, name)?;
        }

        if let Some(hook) = &definition.init_hook {
            debug!("调用初始化钩子 {}::{}", name, hook.name);
            (hook.invoke)(&wrapped)?;
        }
        if let Some(caster) = &definition.initializing {
            if let Some(initializing) = caster(&wrapped) {
                initializing.after_properties_set()?;
            }
        }

        for processor in &processors {
            wrapped = processor.post_process_after_initialization(wrapped, name)?;
        }
        Ok(wrapped)
    }
}

impl Default for ComponentContainer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ComponentContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentContainer")
            .field("registry", &self.registry)
            .field("finished", &self.finished.len())
            .finish()
    }
}

/// 把创建过程中的任意失败包装为命名失败组件的创建错误
///
/// 原型循环错误原样穿透，便于调用方直接识别。
fn wrap_creation_error(
    name: &str,
    error: Box<dyn std::error::Error + Send + Sync>,
) -> ContainerError {
    match error.downcast::<ContainerError>() {
        Ok(container_error) => {
            if matches!(
                *container_error,
                ContainerError::UnresolvableCircularReference { .. }
            ) {
                *container_error
            } else {
                ContainerError::CreationFailed {
                    name: name.to_string(),
                    source: container_error,
                }
            }
        }
        Err(other) => ContainerError::CreationFailed {
            name: name.to_string(),
            source: other,
        },
    }
}
