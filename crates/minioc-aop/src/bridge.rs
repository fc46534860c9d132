//! 容器与切面机制的桥接
//!
//! 以后置处理器的形式接入容器：切面组件在初始化后登记进目录，
//! 可拦截组件在初始化后（或循环依赖早期暴露时）被代理替换。
//! 每个组件名至多织入一次，早期织入过的组件在初始化后复用
//! 同一个代理，保证容器内外只存在一个身份。

use crate::aspect::AspectCatalog;
use crate::proxy::AspectProxy;
use dashmap::{DashMap, DashSet};
use minioc_common::component::ComponentRef;
use minioc_common::errors::{AopError, ContainerError, ContainerResult};
use minioc_core::definition::ComponentDefinition;
use minioc_core::post_processor::ComponentPostProcessor;
use minioc_core::registry::DefinitionRegistry;
use minioc_core::ComponentContainer;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 基础设施类型的类名前缀，这些组件永不织入
const INFRASTRUCTURE_PREFIX: &str = "minioc";

/// 切面织入后置处理器
pub struct AopPostProcessor {
    registry: Arc<DefinitionRegistry>,
    catalog: AspectCatalog,
    /// 代理缓存：组件名（早期织入加 `#early` 后缀）→ 代理句柄
    proxies: DashMap<String, ComponentRef>,
    /// 早期已织入的组件名
    early_proxied: DashSet<String>,
}

impl AopPostProcessor {
    /// 以定义注册表创建处理器
    pub fn new(registry: Arc<DefinitionRegistry>) -> Self {
        Self {
            registry,
            catalog: AspectCatalog::new(),
            proxies: DashMap::new(),
            early_proxied: DashSet::new(),
        }
    }

    /// 创建处理器并挂接到容器
    pub fn install(container: &ComponentContainer) -> Arc<Self> {
        let processor = Arc::new(Self::new(container.registry().clone()));
        container.add_post_processor(processor.clone());
        processor
    }

    /// 切面目录
    pub fn catalog(&self) -> &AspectCatalog {
        &self.catalog
    }

    /// 把切面组件登记进目录
    fn register_aspect(
        &self,
        definition: &ComponentDefinition,
        bean: &ComponentRef,
    ) -> ContainerResult<()> {
        let Some(caster) = &definition.aspect else {
            return Err(weaving_failed(
                &definition.name,
                AopError::NotAnAspect {
                    type_name: definition.class_name.clone(),
                },
            ));
        };
        let Some(aspect) = caster(bean) else {
            return Err(ContainerError::type_mismatch(&definition.class_name));
        };
        self.catalog
            .register_aspect(&definition.name, &*aspect)
            .map_err(|error| weaving_failed(&definition.name, error))?;
        Ok(())
    }

    /// 尝试为组件织入代理，不命中任何通知时返回 `None`
    fn weave(&self, definition: &ComponentDefinition, bean: &ComponentRef) -> Option<ComponentRef> {
        if definition.class_name.starts_with(INFRASTRUCTURE_PREFIX) {
            return None;
        }
        if self.catalog.is_empty() {
            return None;
        }
        let caster = definition.interceptable.as_ref()?;
        let target = caster(bean)?;
        let records = self
            .catalog
            .records_for_class(target.class_name(), &target.methods());
        if records.is_empty() {
            return None;
        }
        info!(
            "为组件 {} 织入切面代理，{} 条通知生效",
            definition.name,
            records.len()
        );
        Some(Arc::new(AspectProxy::new(target, records)) as ComponentRef)
    }
}

impl ComponentPostProcessor for AopPostProcessor {
    fn name(&self) -> &str {
        "AopPostProcessor"
    }

    fn post_process_after_initialization(
        &self,
        bean: ComponentRef,
        component_name: &str,
    ) -> ContainerResult<ComponentRef> {
        // 代理自身不再二次织入
        if bean.downcast_ref::<AspectProxy>().is_some() {
            return Ok(bean);
        }
        let Some(definition) = self.registry.get(component_name) else {
            return Ok(bean);
        };
        if definition.is_aspect {
            self.register_aspect(&definition, &bean)?;
            return Ok(bean);
        }
        // 循环依赖期间已织入的组件复用同一个代理
        if self.early_proxied.contains(component_name) {
            if let Some(proxy) = self.proxies.get(&early_key(component_name)) {
                return Ok(proxy.value().clone());
            }
        }
        if let Some(proxy) = self.proxies.get(component_name) {
            return Ok(proxy.value().clone());
        }
        match self.weave(&definition, &bean) {
            Some(proxy) => {
                self.proxies
                    .insert(component_name.to_string(), proxy.clone());
                Ok(proxy)
            }
            None => Ok(bean),
        }
    }

    fn early_reference(&self, bean: ComponentRef, component_name: &str) -> ComponentRef {
        let Some(definition) = self.registry.get(component_name) else {
            return bean;
        };
        if definition.is_aspect {
            return bean;
        }
        let key = early_key(component_name);
        if let Some(proxy) = self.proxies.get(&key) {
            return proxy.value().clone();
        }
        match self.weave(&definition, &bean) {
            Some(proxy) => {
                debug!("循环依赖早期暴露，提前织入: {}", component_name);
                self.proxies.insert(key, proxy.clone());
                self.early_proxied.insert(component_name.to_string());
                proxy
            }
            None => bean,
        }
    }
}

impl std::fmt::Debug for AopPostProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AopPostProcessor")
            .field("catalog", &self.catalog)
            .field("proxies", &self.proxies.len())
            .finish()
    }
}

fn early_key(component_name: &str) -> String {
    format!("{component_name}#early")
}

/// 切面解析或织入失败，折算为组件创建错误
fn weaving_failed(name: &str, error: AopError) -> ContainerError {
    warn!("切面处理失败 {}: {}", name, error);
    ContainerError::creation_failed(name, error)
}
