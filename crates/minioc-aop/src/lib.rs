//! # MiniIoC 面向切面编程支持
//!
//! 在容器之上提供声明式的方法拦截：切点表达式匹配、切面目录
//! 与代理织入，全部通过容器的后置处理链接入，核心容器对切面
//! 机制零感知。
//!
//! ## 核心能力
//!
//! - **切点匹配**: [`PointcutExpression`] 支持 `execution`/`within`/
//!   `@annotation` 三种形态与 `*`、`..` 通配
//! - **切面目录**: [`AspectCatalog`] 从切面组件声明表提取五种通知，
//!   命名切点与内联表达式均可绑定
//! - **方法拦截**: [`AspectProxy`] 复述目标接口，拦截链共享单调
//!   游标，环绕通知可跳过、重放或改参执行目标
//! - **容器桥接**: [`AopPostProcessor`] 负责切面发现、代理织入与
//!   循环依赖下的身份保持

pub mod aspect;
pub mod bridge;
pub mod pointcut;
pub mod proxy;

pub use aspect::{AspectCatalog, AspectRecord};
pub use bridge::AopPostProcessor;
pub use pointcut::{ExpressionKind, PointcutExpression};
pub use proxy::AspectProxy;
