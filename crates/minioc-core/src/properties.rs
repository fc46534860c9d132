//! 外部配置属性解析
//!
//! 核心仅依赖一个窄接口：给定占位符键，返回最终字符串或失败。
//! 属性文件装载与字符串到类型的转换不在此层。

use minioc_common::errors::{ContainerError, ContainerResult};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

/// 属性解析器
pub trait PropertyResolver: Send + Sync {
    /// 按键查找属性值
    fn resolve(&self, key: &str) -> Option<String>;
}

/// 基于内存表的属性解析器
#[derive(Debug, Default)]
pub struct MapPropertyResolver {
    values: HashMap<String, String>,
}

impl MapPropertyResolver {
    /// 创建空解析器
    pub fn new() -> Self {
        Self::default()
    }

    /// 链式添加属性
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// 添加属性
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }
}

impl PropertyResolver for MapPropertyResolver {
    fn resolve(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

static PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\$\{([^}]+)\}$").expect("内置占位符正则必定合法"));

/// 解析占位符
///
/// `${key}` 按键查找；`${key:default}` 查找失败时落到默认值；
/// 非占位符字符串原样返回。
pub fn resolve_placeholder(
    raw: &str,
    resolver: Option<&dyn PropertyResolver>,
) -> ContainerResult<String> {
    let Some(caps) = PLACEHOLDER_RE.captures(raw) else {
        return Ok(raw.to_string());
    };
    let inner = &caps[1];
    let (key, default) = match inner.split_once(':') {
        Some((key, default)) => (key, Some(default)),
        None => (inner, None),
    };

    if let Some(resolver) = resolver {
        if let Some(value) = resolver.resolve(key) {
            return Ok(value);
        }
    }
    if let Some(default) = default {
        return Ok(default.to_string());
    }
    if resolver.is_none() {
        return Err(ContainerError::NoPropertyResolver {
            placeholder: raw.to_string(),
        });
    }
    Err(ContainerError::PropertyNotFound {
        key: key.to_string(),
    })
}
