//! 组件作用域与生命周期能力

use crate::component::ComponentRef;
use std::sync::Arc;

/// 组件作用域
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Scope {
    /// 单例模式 - 容器生命周期内共享一个实例
    #[default]
    Singleton,
    /// 原型模式 - 每次请求都创建新实例
    Prototype,
}

impl Scope {
    /// 是否为单例作用域
    pub const fn is_singleton(self) -> bool {
        matches!(self, Self::Singleton)
    }
}

/// 属性填充完成后回调能力
///
/// 实现此能力的组件在依赖注入完成后、后置处理链的
/// after 钩子之前收到恰好一次回调。
pub trait InitializingComponent: Send + Sync {
    /// 属性填充完成后执行
    fn after_properties_set(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// 销毁前回调能力
///
/// 实现此能力的组件在容器销毁阶段收到恰好一次回调。
pub trait DisposableComponent: Send + Sync {
    /// 销毁前执行
    fn destroy(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// 初始化能力转换函数
pub type InitializingCaster =
    Arc<dyn Fn(&ComponentRef) -> Option<Arc<dyn InitializingComponent>> + Send + Sync>;

/// 销毁能力转换函数
pub type DisposableCaster =
    Arc<dyn Fn(&ComponentRef) -> Option<Arc<dyn DisposableComponent>> + Send + Sync>;

/// 为具体类型生成初始化能力转换函数
pub fn initializing_caster<T>() -> InitializingCaster
where
    T: InitializingComponent + 'static,
{
    Arc::new(|bean: &ComponentRef| {
        bean.clone()
            .downcast::<T>()
            .ok()
            .map(|typed| typed as Arc<dyn InitializingComponent>)
    })
}

/// 为具体类型生成销毁能力转换函数
pub fn disposable_caster<T>() -> DisposableCaster
where
    T: DisposableComponent + 'static,
{
    Arc::new(|bean: &ComponentRef| {
        bean.clone()
            .downcast::<T>()
            .ok()
            .map(|typed| typed as Arc<dyn DisposableComponent>)
    })
}
