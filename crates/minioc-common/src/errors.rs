//! 错误类型定义

use thiserror::Error;

/// 容器错误类型
#[derive(Error, Debug)]
pub enum ContainerError {
    #[error("未找到组件定义: {name}")]
    DefinitionNotFound { name: String },

    #[error("未找到类型 {type_name} 的可注入组件")]
    NoQualifyingComponent { type_name: String },

    #[error("类型 {type_name} 存在多个候选组件 {candidates:?}，无法确定注入目标")]
    AmbiguousComponent {
        type_name: String,
        candidates: Vec<String>,
    },

    #[error("组件创建失败: {name}, 原因: {source}")]
    CreationFailed {
        name: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("无法解析的循环依赖: {name}（原型作用域组件不可缓存）")]
    UnresolvableCircularReference { name: String },

    #[error("组件定义重复注册: {name}")]
    DuplicateDefinition { name: String },

    #[error("属性键不存在: {key}")]
    PropertyNotFound { key: String },

    #[error("未配置属性解析器，无法解析占位符: {placeholder}")]
    NoPropertyResolver { placeholder: String },

    #[error("组件类型不匹配: 期望 {expected}")]
    TypeMismatch { expected: String },
}

impl ContainerError {
    /// 包装组件创建过程中的失败，并标明出错的组件名
    pub fn creation_failed(
        name: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::CreationFailed {
            name: name.into(),
            source: source.into(),
        }
    }

    /// 创建类型不匹配错误
    pub fn type_mismatch(expected: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
        }
    }
}

/// 切面解析与织入错误类型
#[derive(Error, Debug)]
pub enum AopError {
    #[error("不支持的切点表达式: {expression}")]
    InvalidPointcutExpression { expression: String },

    #[error("找不到切点方法: {name}")]
    UnknownPointcutReference { name: String },

    #[error("类型 {type_name} 不是切面组件（缺少切面标记）")]
    NotAnAspect { type_name: String },

    #[error("通知方法缺少处理函数: {aspect}::{method}")]
    MissingAdviceHandler { aspect: String, method: String },
}

/// 方法调用错误类型
///
/// 同时承载目标方法自身的失败与通知方法的失败，
/// 代理链依据变体区分“原样重抛”与“通知自身故障”。
#[derive(Error, Debug)]
pub enum InvocationError {
    #[error("方法不存在: {class}.{method}")]
    MethodNotFound { class: String, method: String },

    #[error("参数不匹配: {class}.{method}, 原因: {message}")]
    BadArguments {
        class: String,
        method: String,
        message: String,
    },

    #[error("目标方法执行失败: {class}.{method}, 原因: {message}")]
    Target {
        class: String,
        method: String,
        message: String,
    },

    #[error("通知方法执行失败: {aspect}::{method}, 原因: {source}")]
    Advice {
        aspect: String,
        method: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl InvocationError {
    /// 创建方法不存在错误
    pub fn method_not_found(class: impl Into<String>, method: impl Into<String>) -> Self {
        Self::MethodNotFound {
            class: class.into(),
            method: method.into(),
        }
    }

    /// 创建参数不匹配错误
    pub fn bad_arguments(
        class: impl Into<String>,
        method: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::BadArguments {
            class: class.into(),
            method: method.into(),
            message: message.into(),
        }
    }

    /// 创建目标方法失败错误
    pub fn target(
        class: impl Into<String>,
        method: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Target {
            class: class.into(),
            method: method.into(),
            message: message.into(),
        }
    }
}

/// 结果类型别名
pub type ContainerResult<T> = Result<T, ContainerError>;
pub type AopResult<T> = Result<T, AopError>;
pub type InvocationResult<T> = Result<T, InvocationError>;
