//! 类型与方法元数据
//!
//! Rust 没有运行时反射，方法结构以启动期注册表的形式显式描述。

use std::any::TypeId;

/// 类型信息
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeInfo {
    /// 类型ID
    pub id: TypeId,
    /// 类型名称（Rust 路径形式）
    pub name: &'static str,
}

impl TypeInfo {
    /// 获取指定类型的类型信息
    pub fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }
}

/// 方法元数据
///
/// `markers` 为方法携带的声明标记名，供 `@annotation(...)` 切点匹配使用。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodMetadata {
    /// 方法名
    pub name: String,
    /// 方法标记
    pub markers: Vec<String>,
}

impl MethodMetadata {
    /// 创建方法元数据
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            markers: Vec::new(),
        }
    }

    /// 附加一个标记
    #[must_use]
    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.markers.push(marker.into());
        self
    }

    /// 是否携带指定标记
    pub fn has_marker(&self, marker: &str) -> bool {
        self.markers.iter().any(|m| m == marker)
    }
}

/// 将 Rust 类型路径转换为点分隔的完全限定类名
///
/// 切点表达式按点分隔路径段匹配，与原有表达式语法保持一致。
pub fn dotted_type_name<T: ?Sized>() -> String {
    std::any::type_name::<T>().replace("::", ".")
}
