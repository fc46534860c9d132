//! # MiniIoC 公共基础
//!
//! 提供容器各层共享的组件句柄、元数据、生命周期能力、
//! 切面声明标记与错误类型。

pub mod advice;
pub mod component;
pub mod errors;
pub mod lifecycle;
pub mod metadata;

pub use advice::{
    aspect_caster, AdviceHandler, AdviceKind, AdviceResult, AspectCaster, AspectComponent,
    AspectMarker, AspectMethod, JoinPoint, ProceedingJoinPoint,
};
pub use component::{
    interceptable_caster, unit_value, ComponentRef, Interceptable, InterceptableCaster,
    MethodArgs, MethodValue,
};
pub use errors::{
    AopError, AopResult, ContainerError, ContainerResult, InvocationError, InvocationResult,
};
pub use lifecycle::{
    disposable_caster, initializing_caster, DisposableCaster, DisposableComponent,
    InitializingCaster, InitializingComponent, Scope,
};
pub use metadata::{dotted_type_name, MethodMetadata, TypeInfo};
