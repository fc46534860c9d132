//! 组件后置处理链
//!
//! 后置处理器是容器与横切机制之间唯一的集成点：
//! 任何钩子都可以替换组件对象，替换结果对后续处理器与调用方可见。

use minioc_common::component::ComponentRef;
use minioc_common::errors::ContainerResult;

/// 组件后置处理器
///
/// 按注册顺序执行。`early_reference` 在循环依赖早期暴露时
/// 调用，是代理替换必须覆盖的第三个钩子。
pub trait ComponentPostProcessor: Send + Sync {
    /// 处理器名称
    fn name(&self) -> &str;

    /// 初始化前处理，可替换组件对象
    fn post_process_before_initialization(
        &self,
        bean: ComponentRef,
        _component_name: &str,
    ) -> ContainerResult<ComponentRef> {
        Ok(bean)
    }

    /// 初始化后处理，可替换组件对象
    fn post_process_after_initialization(
        &self,
        bean: ComponentRef,
        _component_name: &str,
    ) -> ContainerResult<ComponentRef> {
        Ok(bean)
    }

    /// 循环依赖早期引用处理，可替换组件对象
    ///
    /// 返回值会缓存在早期层，保证依赖方拿到的身份与
    /// 组件最终的身份一致。循环被消费后早期引用就是组件的
    /// 最终身份：只在 after 钩子里做替换的处理器，其替换结果
    /// 在循环下会被早期引用覆盖，需要替换在循环下仍然生效时
    /// 必须同时实现本钩子。
    fn early_reference(&self, bean: ComponentRef, _component_name: &str) -> ComponentRef {
        bean
    }
}
