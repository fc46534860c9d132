//! 组件对象句柄与可拦截能力
//!
//! 容器内部统一以类型擦除的 [`ComponentRef`] 持有组件实例，
//! 代理替换后依然可以在同一个句柄类型下流转。

use crate::errors::InvocationResult;
use crate::metadata::MethodMetadata;
use std::any::Any;
use std::sync::Arc;

/// 组件实例句柄
pub type ComponentRef = Arc<dyn Any + Send + Sync>;

/// 方法调用参数列表
pub type MethodArgs = Vec<Arc<dyn Any + Send + Sync>>;

/// 方法调用返回值
pub type MethodValue = Arc<dyn Any + Send + Sync>;

/// 无返回值方法的返回值占位
pub fn unit_value() -> MethodValue {
    Arc::new(())
}

/// 可拦截能力
///
/// 切面适用的组件必须实现此 trait：以显式的方法分发表代替
/// 运行时生成子类，代理通过同一接口转发每一次调用。
pub trait Interceptable: Send + Sync + 'static {
    /// 完全限定类名（点分隔），供切点表达式匹配
    fn class_name(&self) -> &str;

    /// 可拦截的方法元数据表
    fn methods(&self) -> Vec<MethodMetadata>;

    /// 按方法名分发一次调用
    fn invoke_method(&self, method: &str, args: MethodArgs) -> InvocationResult<MethodValue>;
}

/// 可拦截能力转换函数
///
/// 组件实例以 [`ComponentRef`] 擦除存储，定义登记此闭包
/// 以便在后置处理阶段恢复 `Arc<dyn Interceptable>` 视图。
pub type InterceptableCaster =
    Arc<dyn Fn(&ComponentRef) -> Option<Arc<dyn Interceptable>> + Send + Sync>;

/// 为具体类型生成可拦截能力转换函数
pub fn interceptable_caster<T>() -> InterceptableCaster
where
    T: Interceptable,
{
    Arc::new(|bean: &ComponentRef| {
        bean.clone()
            .downcast::<T>()
            .ok()
            .map(|typed| typed as Arc<dyn Interceptable>)
    })
}
