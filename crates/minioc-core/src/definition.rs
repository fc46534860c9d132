//! 组件定义与定义构建器
//!
//! 一个定义对应一个命名组件：实现类型、作用域、注入站点与
//! 生命周期钩子。定义注册后不可变。注入站点以闭包表的形式
//! 描述，代替字段反射。

use minioc_common::advice::{aspect_caster, AspectCaster, AspectComponent};
use minioc_common::component::{interceptable_caster, ComponentRef, Interceptable, InterceptableCaster};
use minioc_common::errors::ContainerError;
use minioc_common::lifecycle::{
    disposable_caster, initializing_caster, DisposableCaster, DisposableComponent,
    InitializingCaster, InitializingComponent, Scope,
};
use minioc_common::metadata::{dotted_type_name, TypeInfo};
use std::marker::PhantomData;
use std::sync::Arc;

/// 组件构造函数
pub type ConstructorFn = Arc<
    dyn Fn() -> Result<ComponentRef, Box<dyn std::error::Error + Send + Sync>> + Send + Sync,
>;

/// 生命周期钩子调用函数
pub type HookFn = Arc<
    dyn Fn(&ComponentRef) -> Result<(), Box<dyn std::error::Error + Send + Sync>> + Send + Sync,
>;

/// 依赖注入应用函数：`(目标实例, 已解析依赖)`
pub type DependencyApplyFn = Arc<
    dyn Fn(&ComponentRef, ComponentRef) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
        + Send
        + Sync,
>;

/// 属性值注入应用函数：`(目标实例, 最终字符串)`
pub type ValueApplyFn = Arc<
    dyn Fn(&ComponentRef, String) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
        + Send
        + Sync,
>;

/// 注入站点
pub enum InjectionSite {
    /// 按声明类型解析的依赖注入
    Dependency {
        /// 注入站点名（参与多候选时的按名消歧）
        site_name: String,
        /// 声明的依赖类型
        required: TypeInfo,
        /// 注入应用函数
        apply: DependencyApplyFn,
    },
    /// 占位符属性注入
    Value {
        /// 注入站点名
        site_name: String,
        /// 占位符，形如 `${key}` 或 `${key:default}`
        placeholder: String,
        /// 注入应用函数，消费解析完成的字符串
        apply: ValueApplyFn,
    },
}

impl std::fmt::Debug for InjectionSite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dependency {
                site_name, required, ..
            } => f
                .debug_struct("Dependency")
                .field("site_name", site_name)
                .field("required", &required.name)
                .finish(),
            Self::Value {
                site_name,
                placeholder,
                ..
            } => f
                .debug_struct("Value")
                .field("site_name", site_name)
                .field("placeholder", placeholder)
                .finish(),
        }
    }
}

/// 命名生命周期钩子
#[derive(Clone)]
pub struct LifecycleHook {
    /// 钩子名
    pub name: String,
    /// 调用函数
    pub invoke: HookFn,
}

impl std::fmt::Debug for LifecycleHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LifecycleHook({})", self.name)
    }
}

/// 组件定义
///
/// 按唯一名称注册一次，注册后不可变。
pub struct ComponentDefinition {
    /// 组件名
    pub name: String,
    /// 实现类型信息
    pub type_info: TypeInfo,
    /// 点分隔的完全限定类名，供切点匹配
    pub class_name: String,
    /// 作用域
    pub scope: Scope,
    /// 是否延迟实例化（仅影响预实例化阶段）
    pub lazy: bool,
    /// 构造函数
    pub constructor: ConstructorFn,
    /// 注入站点，按声明顺序执行
    pub injection_sites: Vec<InjectionSite>,
    /// 初始化钩子
    pub init_hook: Option<LifecycleHook>,
    /// 销毁钩子
    pub destroy_hook: Option<LifecycleHook>,
    /// 是否携带切面标记
    pub is_aspect: bool,
    /// 可拦截能力转换函数
    pub interceptable: Option<InterceptableCaster>,
    /// 切面能力转换函数
    pub aspect: Option<AspectCaster>,
    /// 初始化能力转换函数
    pub initializing: Option<InitializingCaster>,
    /// 销毁能力转换函数
    pub disposable: Option<DisposableCaster>,
}

impl std::fmt::Debug for ComponentDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentDefinition")
            .field("name", &self.name)
            .field("type", &self.type_info.name)
            .field("scope", &self.scope)
            .field("lazy", &self.lazy)
            .field("injection_sites", &self.injection_sites)
            .field("is_aspect", &self.is_aspect)
            .finish()
    }
}

/// 组件定义构建器
///
/// 对具体类型 `T` 的类型化构建入口，落成时擦除为
/// [`ComponentDefinition`]。
pub struct DefinitionBuilder<T> {
    name: String,
    class_name: String,
    scope: Scope,
    lazy: bool,
    constructor: ConstructorFn,
    injection_sites: Vec<InjectionSite>,
    init_hook: Option<LifecycleHook>,
    destroy_hook: Option<LifecycleHook>,
    is_aspect: bool,
    interceptable: Option<InterceptableCaster>,
    aspect: Option<AspectCaster>,
    initializing: Option<InitializingCaster>,
    disposable: Option<DisposableCaster>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> DefinitionBuilder<T> {
    /// 以不可失败的构造函数创建构建器
    pub fn new<F>(name: impl Into<String>, constructor: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::try_new(name, move || Ok(constructor()))
    }

    /// 以可失败的构造函数创建构建器
    pub fn try_new<F>(name: impl Into<String>, constructor: F) -> Self
    where
        F: Fn() -> Result<T, Box<dyn std::error::Error + Send + Sync>> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            class_name: dotted_type_name::<T>(),
            scope: Scope::Singleton,
            lazy: false,
            constructor: Arc::new(move || constructor().map(|t| Arc::new(t) as ComponentRef)),
            injection_sites: Vec::new(),
            init_hook: None,
            destroy_hook: None,
            is_aspect: false,
            interceptable: None,
            aspect: None,
            initializing: None,
            disposable: None,
            _marker: PhantomData,
        }
    }

    /// 覆盖默认的完全限定类名
    #[must_use]
    pub fn class_name(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = class_name.into();
        self
    }

    /// 设为原型作用域
    #[must_use]
    pub fn prototype(mut self) -> Self {
        self.scope = Scope::Prototype;
        self
    }

    /// 设为延迟实例化
    #[must_use]
    pub fn lazy(mut self) -> Self {
        self.lazy = true;
        self
    }

    /// 声明一个按类型解析的依赖注入站点
    ///
    /// `apply` 收到类型擦除的依赖句柄：依赖可能已被代理替换，
    /// 持有方应以 [`ComponentRef`] 形式保存。
    #[must_use]
    pub fn depends_on<D, F>(mut self, site_name: impl Into<String>, apply: F) -> Self
    where
        D: 'static,
        F: Fn(&T, ComponentRef) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
            + Send
            + Sync
            + 'static,
    {
        let site_name = site_name.into();
        self.injection_sites.push(InjectionSite::Dependency {
            site_name,
            required: TypeInfo::of::<D>(),
            apply: Arc::new(move |bean, dep| {
                let typed = bean
                    .downcast_ref::<T>()
                    .ok_or_else(|| boxed_mismatch::<T>())?;
                apply(typed, dep)
            }),
        });
        self
    }

    /// 声明一个占位符属性注入站点
    #[must_use]
    pub fn value<F>(
        mut self,
        site_name: impl Into<String>,
        placeholder: impl Into<String>,
        apply: F,
    ) -> Self
    where
        F: Fn(&T, String) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
            + Send
            + Sync
            + 'static,
    {
        self.injection_sites.push(InjectionSite::Value {
            site_name: site_name.into(),
            placeholder: placeholder.into(),
            apply: Arc::new(move |bean, value| {
                let typed = bean
                    .downcast_ref::<T>()
                    .ok_or_else(|| boxed_mismatch::<T>())?;
                apply(typed, value)
            }),
        });
        self
    }

    /// 登记命名初始化钩子
    #[must_use]
    pub fn init_hook<F>(mut self, hook_name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&T) -> Result<(), Box<dyn std::error::Error + Send + Sync>> + Send + Sync + 'static,
    {
        self.init_hook = Some(LifecycleHook {
            name: hook_name.into(),
            invoke: wrap_hook(f),
        });
        self
    }

    /// 登记命名销毁钩子
    #[must_use]
    pub fn destroy_hook<F>(mut self, hook_name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&T) -> Result<(), Box<dyn std::error::Error + Send + Sync>> + Send + Sync + 'static,
    {
        self.destroy_hook = Some(LifecycleHook {
            name: hook_name.into(),
            invoke: wrap_hook(f),
        });
        self
    }

    /// 登记"属性填充完成后"回调能力
    #[must_use]
    pub fn initializing(mut self) -> Self
    where
        T: InitializingComponent,
    {
        self.initializing = Some(initializing_caster::<T>());
        self
    }

    /// 登记"销毁前"回调能力
    #[must_use]
    pub fn disposable(mut self) -> Self
    where
        T: DisposableComponent,
    {
        self.disposable = Some(disposable_caster::<T>());
        self
    }

    /// 登记可拦截能力，使组件成为切面织入候选
    #[must_use]
    pub fn interceptable(mut self) -> Self
    where
        T: Interceptable,
    {
        self.interceptable = Some(interceptable_caster::<T>());
        self
    }

    /// 附加切面标记
    #[must_use]
    pub fn aspect(mut self) -> Self
    where
        T: AspectComponent,
    {
        self.is_aspect = true;
        self.aspect = Some(aspect_caster::<T>());
        self
    }

    /// 落成为不可变的组件定义
    pub fn build(self) -> ComponentDefinition {
        ComponentDefinition {
            name: self.name,
            type_info: TypeInfo::of::<T>(),
            class_name: self.class_name,
            scope: self.scope,
            lazy: self.lazy,
            constructor: self.constructor,
            injection_sites: self.injection_sites,
            init_hook: self.init_hook,
            destroy_hook: self.destroy_hook,
            is_aspect: self.is_aspect,
            interceptable: self.interceptable,
            aspect: self.aspect,
            initializing: self.initializing,
            disposable: self.disposable,
        }
    }
}

fn wrap_hook<T, F>(f: F) -> HookFn
where
    T: Send + Sync + 'static,
    F: Fn(&T) -> Result<(), Box<dyn std::error::Error + Send + Sync>> + Send + Sync + 'static,
{
    Arc::new(move |bean: &ComponentRef| {
        let typed = bean
            .downcast_ref::<T>()
            .ok_or_else(|| boxed_mismatch::<T>())?;
        f(typed)
    })
}

fn boxed_mismatch<T>() -> Box<dyn std::error::Error + Send + Sync> {
    Box::new(ContainerError::type_mismatch(std::any::type_name::<T>()))
}
