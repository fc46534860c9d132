//! 方法拦截代理
//!
//! [`AspectProxy`] 包装一个可拦截目标并复述其接口：每次调用
//! 先按方法筛出生效通知，命中为空直接转发，否则构建拦截链
//! 执行。链使用单调前进的游标，环绕通知重复 `proceed` 会越过
//! 链尾直接再次命中目标方法。

use crate::aspect::AspectRecord;
use minioc_common::advice::{AdviceHandler, AdviceKind, JoinPoint, ProceedingJoinPoint};
use minioc_common::component::{Interceptable, MethodArgs, MethodValue};
use minioc_common::errors::{InvocationError, InvocationResult};
use minioc_common::metadata::MethodMetadata;
use std::sync::Arc;
use tracing::debug;

/// 切面代理
///
/// 与目标实现同一可拦截接口，容器中以代理替换原始实例后，
/// 调用方无需感知织入的存在。
pub struct AspectProxy {
    target: Arc<dyn Interceptable>,
    records: Vec<AspectRecord>,
}

impl AspectProxy {
    /// 以目标与对该类生效的通知记录创建代理
    pub fn new(target: Arc<dyn Interceptable>, records: Vec<AspectRecord>) -> Self {
        Self { target, records }
    }

    /// 被包装的原始目标
    pub fn target(&self) -> &Arc<dyn Interceptable> {
        &self.target
    }
}

impl Interceptable for AspectProxy {
    fn class_name(&self) -> &str {
        self.target.class_name()
    }

    fn methods(&self) -> Vec<MethodMetadata> {
        self.target.methods()
    }

    fn invoke_method(&self, method: &str, args: MethodArgs) -> InvocationResult<MethodValue> {
        let class_name = self.target.class_name();
        let Some(metadata) = self
            .target
            .methods()
            .into_iter()
            .find(|m| m.name == method)
        else {
            // 未知方法交由目标自行报错
            return self.target.invoke_method(method, args);
        };

        let matched: Vec<AspectRecord> = self
            .records
            .iter()
            .filter(|record| record.pointcut.matches(class_name, &metadata))
            .cloned()
            .collect();
        if matched.is_empty() {
            return self.target.invoke_method(method, args);
        }
        debug!("拦截方法 {}.{}，{} 条通知生效", class_name, method, matched.len());

        let mut chain = InterceptorChain {
            target: &*self.target,
            records: matched,
            join_point: JoinPoint {
                class_name: class_name.to_string(),
                method: metadata,
                args,
            },
            cursor: 0,
        };
        chain.proceed()
    }
}

impl std::fmt::Debug for AspectProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AspectProxy")
            .field("class_name", &self.target.class_name())
            .field("records", &self.records.len())
            .finish()
    }
}

/// 拦截链：共享单调游标的通知序列
struct InterceptorChain<'a> {
    target: &'a dyn Interceptable,
    records: Vec<AspectRecord>,
    join_point: JoinPoint,
    cursor: usize,
}

impl ProceedingJoinPoint for InterceptorChain<'_> {
    fn join_point(&self) -> &JoinPoint {
        &self.join_point
    }

    fn proceed(&mut self) -> InvocationResult<MethodValue> {
        if self.cursor >= self.records.len() {
            // 链尾：以当前参数命中目标方法
            return self
                .target
                .invoke_method(&self.join_point.method.name, self.join_point.args.clone());
        }
        let record = self.records[self.cursor].clone();
        self.cursor += 1;

        match record.kind {
            AdviceKind::Before => {
                notify(&record, &self.join_point)?;
                self.proceed()
            }
            AdviceKind::After => {
                // 任何退出路径都执行，通知自身失败优先上抛
                let outcome = self.proceed();
                notify(&record, &self.join_point)?;
                outcome
            }
            AdviceKind::Around => match &record.handler {
                AdviceHandler::Around(handler) => handler(self),
                _ => Err(handler_mismatch(&record)),
            },
            AdviceKind::AfterReturning => {
                let value = self.proceed()?;
                match &record.handler {
                    AdviceHandler::Returning(handler) => {
                        handler(&self.join_point, &value)
                            .map_err(|error| advice_failure(&record, error))?;
                        Ok(value)
                    }
                    _ => Err(handler_mismatch(&record)),
                }
            }
            AdviceKind::AfterThrowing => match self.proceed() {
                Ok(value) => Ok(value),
                Err(original) => {
                    match &record.handler {
                        AdviceHandler::Throwing(handler) => {
                            handler(&self.join_point, &original)
                                .map_err(|error| advice_failure(&record, error))?;
                        }
                        _ => return Err(handler_mismatch(&record)),
                    }
                    // 观察完毕，原错误原样上抛
                    Err(original)
                }
            },
        }
    }

    fn proceed_with(&mut self, args: MethodArgs) -> InvocationResult<MethodValue> {
        self.join_point.args = args;
        self.proceed()
    }
}

fn notify(record: &AspectRecord, join_point: &JoinPoint) -> InvocationResult<()> {
    match &record.handler {
        AdviceHandler::Notify(handler) => {
            handler(join_point).map_err(|error| advice_failure(record, error))
        }
        _ => Err(handler_mismatch(record)),
    }
}

fn advice_failure(
    record: &AspectRecord,
    error: Box<dyn std::error::Error + Send + Sync>,
) -> InvocationError {
    InvocationError::Advice {
        aspect: record.aspect_name.clone(),
        method: record.method_name.clone(),
        source: error,
    }
}

fn handler_mismatch(record: &AspectRecord) -> InvocationError {
    InvocationError::Advice {
        aspect: record.aspect_name.clone(),
        method: record.method_name.clone(),
        source: "通知处理函数与通知类型不符".into(),
    }
}
