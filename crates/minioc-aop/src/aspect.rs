//! 切面目录
//!
//! 从切面组件的方法声明表提取通知记录：第一遍收集命名切点，
//! 第二遍解析五种通知标记并绑定切点。目录按切面注册顺序
//! 保存全部记录，记录顺序即通知执行的默认优先级。

use crate::pointcut::PointcutExpression;
use minioc_common::advice::{AdviceHandler, AdviceKind, AspectComponent, AspectMarker};
use minioc_common::errors::{AopError, AopResult};
use minioc_common::metadata::MethodMetadata;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};

/// 一条通知记录：切面方法与其绑定切点
#[derive(Debug, Clone)]
pub struct AspectRecord {
    /// 切面组件名
    pub aspect_name: String,
    /// 通知方法名
    pub method_name: String,
    /// 通知类型
    pub kind: AdviceKind,
    /// 绑定的切点
    pub pointcut: Arc<PointcutExpression>,
    /// 通知处理函数
    pub handler: AdviceHandler,
}

/// 切面目录
///
/// 同名切面只登记一次；记录顺序为切面注册顺序，
/// 同一切面内为方法声明顺序。
#[derive(Default)]
pub struct AspectCatalog {
    records: RwLock<Vec<AspectRecord>>,
    registered: RwLock<HashSet<String>>,
}

impl AspectCatalog {
    /// 创建空目录
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记一个切面组件，返回是否实际新增
    pub fn register_aspect(
        &self,
        aspect_name: &str,
        aspect: &dyn AspectComponent,
    ) -> AopResult<bool> {
        if !self.registered.write().insert(aspect_name.to_string()) {
            debug!("切面已登记，跳过: {}", aspect_name);
            return Ok(false);
        }
        let records = extract_records(aspect_name, aspect)?;
        info!("登记切面 {}，共 {} 条通知", aspect_name, records.len());
        self.records.write().extend(records);
        Ok(true)
    }

    /// 目录中是否尚无任何通知
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// 已登记的通知总数
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// 筛出对指定类任意方法生效的通知记录
    pub fn records_for_class(
        &self,
        class_name: &str,
        methods: &[MethodMetadata],
    ) -> Vec<AspectRecord> {
        self.records
            .read()
            .iter()
            .filter(|record| record.pointcut.matches_any(class_name, methods))
            .cloned()
            .collect()
    }
}

impl std::fmt::Debug for AspectCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AspectCatalog")
            .field("records", &self.records.read().len())
            .field("aspects", &*self.registered.read())
            .finish()
    }
}

/// 两遍提取：先命名切点表，后通知绑定
fn extract_records(
    aspect_name: &str,
    aspect: &dyn AspectComponent,
) -> AopResult<Vec<AspectRecord>> {
    let methods = aspect.aspect_methods();

    let mut named: HashMap<String, Arc<PointcutExpression>> = HashMap::new();
    for method in &methods {
        if let AspectMarker::Pointcut(expression) = &method.marker {
            named.insert(
                method.name.clone(),
                Arc::new(PointcutExpression::parse(expression)?),
            );
        }
    }

    let mut records = Vec::new();
    for method in &methods {
        let Some(kind) = method.marker.advice_kind() else {
            continue;
        };
        let value = method.marker.value();
        // 含括号视为内联表达式，否则按命名切点引用解析
        let pointcut = if value.contains('(') {
            Arc::new(PointcutExpression::parse(value)?)
        } else {
            named
                .get(value)
                .cloned()
                .ok_or_else(|| AopError::UnknownPointcutReference {
                    name: value.to_string(),
                })?
        };
        let handler =
            method
                .handler
                .clone()
                .ok_or_else(|| AopError::MissingAdviceHandler {
                    aspect: aspect_name.to_string(),
                    method: method.name.clone(),
                })?;
        records.push(AspectRecord {
            aspect_name: aspect_name.to_string(),
            method_name: method.name.clone(),
            kind,
            pointcut,
            handler,
        });
    }
    Ok(records)
}
