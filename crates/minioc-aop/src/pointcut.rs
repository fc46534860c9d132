//! 切点表达式解析与匹配
//!
//! 支持三种表达式形态：`execution(签名模式)` 匹配方法签名，
//! `within(类名模式)` 匹配整个类，`@annotation(标记名)` 匹配
//! 方法上的精确标记。签名与类名模式支持 `*`（单段通配）与
//! `..`（跨段通配）。

use minioc_common::errors::{AopError, AopResult};
use minioc_common::metadata::MethodMetadata;
use regex::Regex;

/// 表达式形态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpressionKind {
    /// 按方法签名匹配
    Execution,
    /// 按类名匹配（类内全部方法）
    Within,
    /// 按方法标记精确匹配
    Annotation,
}

/// 已编译的切点表达式
///
/// 解析一次，匹配任意多次。匹配接口只消费类名与方法元数据，
/// 不触碰组件实例。
#[derive(Debug)]
pub struct PointcutExpression {
    expression: String,
    kind: ExpressionKind,
    /// execution/within 的编译产物；annotation 形态为 `None`
    pattern: Option<Regex>,
    /// annotation 形态要求的精确标记名
    marker: Option<String>,
}

impl PointcutExpression {
    /// 解析切点表达式
    pub fn parse(expression: &str) -> AopResult<Self> {
        let trimmed = expression.trim();
        let invalid = || AopError::InvalidPointcutExpression {
            expression: expression.to_string(),
        };

        let (kind, body) = if let Some(body) = strip_form(trimmed, "execution(") {
            (ExpressionKind::Execution, body)
        } else if let Some(body) = strip_form(trimmed, "within(") {
            (ExpressionKind::Within, body)
        } else if let Some(body) = strip_form(trimmed, "@annotation(") {
            (ExpressionKind::Annotation, body)
        } else {
            return Err(invalid());
        };
        if body.is_empty() {
            return Err(invalid());
        }

        let (pattern, marker) = match kind {
            ExpressionKind::Annotation => (None, Some(body.to_string())),
            _ => {
                let regex = Regex::new(&compile_wildcards(body)).map_err(|_| invalid())?;
                (Some(regex), None)
            }
        };

        Ok(Self {
            expression: trimmed.to_string(),
            kind,
            pattern,
            marker,
        })
    }

    /// 原始表达式文本
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// 表达式形态
    pub const fn kind(&self) -> ExpressionKind {
        self.kind
    }

    /// 判定类上的一个方法是否落入本切点
    pub fn matches(&self, class_name: &str, method: &MethodMetadata) -> bool {
        match self.kind {
            ExpressionKind::Execution => {
                // 统一以粗粒度参数占位合成签名参与匹配
                let signature = format!("* {}.{}(..)", class_name, method.name);
                self.pattern
                    .as_ref()
                    .is_some_and(|p| p.is_match(&signature))
            }
            ExpressionKind::Within => self
                .pattern
                .as_ref()
                .is_some_and(|p| p.is_match(class_name)),
            ExpressionKind::Annotation => self
                .marker
                .as_ref()
                .is_some_and(|marker| method.has_marker(marker)),
        }
    }

    /// 类中是否存在任何匹配方法（织入前的快速筛查）
    pub fn matches_any(&self, class_name: &str, methods: &[MethodMetadata]) -> bool {
        methods.iter().any(|m| self.matches(class_name, m))
    }
}

fn strip_form<'a>(expression: &'a str, prefix: &str) -> Option<&'a str> {
    expression
        .strip_prefix(prefix)
        .and_then(|rest| rest.strip_suffix(')'))
}

/// 把通配模式编译为锚定正则
///
/// `..` 跨越零个或多个完整的点分段（段边界处必须是 `.`），
/// `*` 单段通配（不越过 `.`），其余字符字面匹配。
fn compile_wildcards(pattern: &str) -> String {
    let mut regex = String::with_capacity(pattern.len() * 2 + 2);
    regex.push('^');
    let mut chars = pattern.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '.' if chars.peek() == Some(&'.') => {
                chars.next();
                regex.push_str(r"\.(?:[^.]*\.)*");
            }
            '.' => regex.push_str(r"\."),
            '*' => regex.push_str(r"[^.]*"),
            '(' | ')' | '[' | ']' | '{' | '}' | '^' | '$' | '+' | '?' | '|' | '\\' => {
                regex.push('\\');
                regex.push(ch);
            }
            other => regex.push(other),
        }
    }
    regex.push('$');
    regex
}
