//! # MiniIoC 容器核心
//!
//! 控制反转容器的创建引擎：组件定义注册表、三级单例缓存、
//! 依赖与属性填充、生命周期钩子以及后置处理链。
//!
//! ## 核心能力
//!
//! - **定义注册**: [`DefinitionRegistry`] 按唯一名称持有不可变的
//!   [`ComponentDefinition`]，候选顺序即注册顺序
//! - **实例获取**: [`ComponentContainer`] 提供按名与按类型两种入口，
//!   单例缓存复用，原型每次新建
//! - **循环依赖**: 三级缓存在填充阶段暴露早期引用，单例间的
//!   构造后循环可解，原型循环报错
//! - **扩展点**: [`ComponentPostProcessor`] 在初始化前后与早期暴露
//!   时可替换组件对象，是横切机制的接入面
//!
//! ## 使用示例
//!
//! ```rust,ignore
//! let container = ComponentContainer::new();
//! container.register(DefinitionBuilder::new("service", MyService::new).build())?;
//! container.preinstantiate_singletons()?;
//! let service = container.get_typed::<MyService>()?;
//! ```

pub mod container;
pub mod definition;
pub mod post_processor;
pub mod properties;
pub mod registry;

pub use container::ComponentContainer;
pub use definition::{
    ComponentDefinition, ConstructorFn, DefinitionBuilder, DependencyApplyFn, HookFn,
    InjectionSite, LifecycleHook, ValueApplyFn,
};
pub use post_processor::ComponentPostProcessor;
pub use properties::{resolve_placeholder, MapPropertyResolver, PropertyResolver};
pub use registry::DefinitionRegistry;
