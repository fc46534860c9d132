//! 组件定义注册表
//!
//! 独占持有全部组件定义；名称列表保持注册顺序，
//! 按类型查找的候选顺序即注册顺序。

use crate::definition::ComponentDefinition;
use minioc_common::errors::{ContainerError, ContainerResult};
use parking_lot::RwLock;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// 组件定义注册表
#[derive(Default)]
pub struct DefinitionRegistry {
    definitions: RwLock<HashMap<String, Arc<ComponentDefinition>>>,
    names: RwLock<Vec<String>>,
}

impl DefinitionRegistry {
    /// 创建空注册表
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册组件定义，名称重复时失败
    pub fn register(&self, definition: ComponentDefinition) -> ContainerResult<()> {
        let name = definition.name.clone();
        let mut definitions = self.definitions.write();
        if definitions.contains_key(&name) {
            return Err(ContainerError::DuplicateDefinition { name });
        }
        debug!("注册组件定义: {} ({})", name, definition.type_info.name);
        definitions.insert(name.clone(), Arc::new(definition));
        self.names.write().push(name);
        Ok(())
    }

    /// 按名称获取定义
    pub fn get(&self, name: &str) -> Option<Arc<ComponentDefinition>> {
        self.definitions.read().get(name).cloned()
    }

    /// 是否存在指定名称的定义
    pub fn contains(&self, name: &str) -> bool {
        self.definitions.read().contains_key(name)
    }

    /// 按注册顺序返回全部定义名
    pub fn names(&self) -> Vec<String> {
        self.names.read().clone()
    }

    /// 按注册顺序返回实现类型匹配的定义名
    pub fn names_for_type(&self, type_id: TypeId) -> Vec<String> {
        let definitions = self.definitions.read();
        self.names
            .read()
            .iter()
            .filter(|name| {
                definitions
                    .get(*name)
                    .is_some_and(|d| d.type_info.id == type_id)
            })
            .cloned()
            .collect()
    }

    /// 已注册定义数量
    pub fn len(&self) -> usize {
        self.names.read().len()
    }

    /// 注册表是否为空
    pub fn is_empty(&self) -> bool {
        self.names.read().is_empty()
    }
}

impl std::fmt::Debug for DefinitionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefinitionRegistry")
            .field("names", &*self.names.read())
            .finish()
    }
}
