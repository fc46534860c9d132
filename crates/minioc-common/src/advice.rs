//! 切面声明标记与通知类型
//!
//! 对应原有体系中的声明式标记：切面组件通过方法声明表
//! 暴露命名切点与五种通知，提取逻辑在 AOP 层完成。

use crate::component::{ComponentRef, MethodArgs, MethodValue};
use crate::errors::{InvocationError, InvocationResult};
use crate::metadata::MethodMetadata;
use std::sync::Arc;

/// 通知类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdviceKind {
    /// 前置通知
    Before,
    /// 后置通知（任何退出路径都执行）
    After,
    /// 环绕通知
    Around,
    /// 返回后通知（仅正常返回时执行）
    AfterReturning,
    /// 异常后通知（仅异常时执行，执行后原样重抛）
    AfterThrowing,
}

/// 切面方法上的声明标记
///
/// 五种通知标记的值为内联切点表达式（含 `(`）或命名切点引用。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AspectMarker {
    /// 命名切点定义
    Pointcut(String),
    /// 前置通知标记
    Before(String),
    /// 后置通知标记
    After(String),
    /// 环绕通知标记
    Around(String),
    /// 返回后通知标记
    AfterReturning(String),
    /// 异常后通知标记
    AfterThrowing(String),
}

impl AspectMarker {
    /// 标记对应的通知类型；命名切点定义返回 `None`
    pub const fn advice_kind(&self) -> Option<AdviceKind> {
        match self {
            Self::Pointcut(_) => None,
            Self::Before(_) => Some(AdviceKind::Before),
            Self::After(_) => Some(AdviceKind::After),
            Self::Around(_) => Some(AdviceKind::Around),
            Self::AfterReturning(_) => Some(AdviceKind::AfterReturning),
            Self::AfterThrowing(_) => Some(AdviceKind::AfterThrowing),
        }
    }

    /// 标记携带的表达式或引用值
    pub fn value(&self) -> &str {
        match self {
            Self::Pointcut(v)
            | Self::Before(v)
            | Self::After(v)
            | Self::Around(v)
            | Self::AfterReturning(v)
            | Self::AfterThrowing(v) => v,
        }
    }
}

/// 连接点：一次具体实例上的具体方法调用
#[derive(Clone)]
pub struct JoinPoint {
    /// 目标类的完全限定名（点分隔）
    pub class_name: String,
    /// 被调用方法的元数据
    pub method: MethodMetadata,
    /// 调用参数快照
    pub args: MethodArgs,
}

impl JoinPoint {
    /// 方法签名 `类名.方法名`
    pub fn signature(&self) -> String {
        format!("{}.{}", self.class_name, self.method.name)
    }
}

impl std::fmt::Debug for JoinPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JoinPoint")
            .field("class_name", &self.class_name)
            .field("method", &self.method.name)
            .field("args", &self.args.len())
            .finish()
    }
}

/// 可继续执行的连接点（环绕通知专用）
///
/// 环绕通知完全控制链路的剩余部分：可以不调用、重复调用，
/// 或以改写后的参数调用 `proceed`。
pub trait ProceedingJoinPoint {
    /// 当前连接点信息
    fn join_point(&self) -> &JoinPoint;

    /// 以当前参数继续执行链路剩余部分
    fn proceed(&mut self) -> InvocationResult<MethodValue>;

    /// 以改写后的参数继续执行链路剩余部分
    fn proceed_with(&mut self, args: MethodArgs) -> InvocationResult<MethodValue>;
}

/// 通知自身的执行结果
pub type AdviceResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// 通知处理函数
#[derive(Clone)]
pub enum AdviceHandler {
    /// 前置/后置通知：只观察连接点
    Notify(Arc<dyn Fn(&JoinPoint) -> AdviceResult + Send + Sync>),
    /// 环绕通知：持有 proceed 句柄
    Around(Arc<dyn Fn(&mut dyn ProceedingJoinPoint) -> InvocationResult<MethodValue> + Send + Sync>),
    /// 返回后通知：可观察返回值
    Returning(Arc<dyn Fn(&JoinPoint, &MethodValue) -> AdviceResult + Send + Sync>),
    /// 异常后通知：可观察原始错误
    Throwing(Arc<dyn Fn(&JoinPoint, &InvocationError) -> AdviceResult + Send + Sync>),
}

impl std::fmt::Debug for AdviceHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            Self::Notify(_) => "Notify",
            Self::Around(_) => "Around",
            Self::Returning(_) => "Returning",
            Self::Throwing(_) => "Throwing",
        };
        write!(f, "AdviceHandler::{kind}(<fn>)")
    }
}

/// 切面方法声明：方法名 + 标记 + 处理函数
#[derive(Debug, Clone)]
pub struct AspectMethod {
    /// 方法名
    pub name: String,
    /// 声明标记
    pub marker: AspectMarker,
    /// 通知处理函数；命名切点定义没有处理函数
    pub handler: Option<AdviceHandler>,
}

impl AspectMethod {
    /// 声明一个命名切点
    pub fn pointcut(name: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            marker: AspectMarker::Pointcut(expression.into()),
            handler: None,
        }
    }

    /// 声明前置通知
    pub fn before<F>(name: impl Into<String>, value: impl Into<String>, f: F) -> Self
    where
        F: Fn(&JoinPoint) -> AdviceResult + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            marker: AspectMarker::Before(value.into()),
            handler: Some(AdviceHandler::Notify(Arc::new(f))),
        }
    }

    /// 声明后置通知
    pub fn after<F>(name: impl Into<String>, value: impl Into<String>, f: F) -> Self
    where
        F: Fn(&JoinPoint) -> AdviceResult + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            marker: AspectMarker::After(value.into()),
            handler: Some(AdviceHandler::Notify(Arc::new(f))),
        }
    }

    /// 声明环绕通知
    pub fn around<F>(name: impl Into<String>, value: impl Into<String>, f: F) -> Self
    where
        F: Fn(&mut dyn ProceedingJoinPoint) -> InvocationResult<MethodValue>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: name.into(),
            marker: AspectMarker::Around(value.into()),
            handler: Some(AdviceHandler::Around(Arc::new(f))),
        }
    }

    /// 声明返回后通知
    pub fn after_returning<F>(name: impl Into<String>, value: impl Into<String>, f: F) -> Self
    where
        F: Fn(&JoinPoint, &MethodValue) -> AdviceResult + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            marker: AspectMarker::AfterReturning(value.into()),
            handler: Some(AdviceHandler::Returning(Arc::new(f))),
        }
    }

    /// 声明异常后通知
    pub fn after_throwing<F>(name: impl Into<String>, value: impl Into<String>, f: F) -> Self
    where
        F: Fn(&JoinPoint, &InvocationError) -> AdviceResult + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            marker: AspectMarker::AfterThrowing(value.into()),
            handler: Some(AdviceHandler::Throwing(Arc::new(f))),
        }
    }
}

/// 切面组件能力
///
/// 方法声明顺序即类内方法枚举顺序，决定同一切面内
/// 多个匹配通知之间的默认优先级。
pub trait AspectComponent: Send + Sync + 'static {
    /// 按声明顺序枚举切面方法
    fn aspect_methods(&self) -> Vec<AspectMethod>;
}

/// 切面能力转换函数
pub type AspectCaster =
    Arc<dyn Fn(&ComponentRef) -> Option<Arc<dyn AspectComponent>> + Send + Sync>;

/// 为具体类型生成切面能力转换函数
pub fn aspect_caster<T>() -> AspectCaster
where
    T: AspectComponent,
{
    Arc::new(|bean: &ComponentRef| {
        bean.clone()
            .downcast::<T>()
            .ok()
            .map(|typed| typed as Arc<dyn AspectComponent>)
    })
}
