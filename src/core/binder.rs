//! 动态绑定器
//!
//! 把接口的指令表与一个活动目标实例配对，返回门面。门面上的每次调用都实时
//! 经指令表分派到目标成员，参数与返回值原样透传，只缓存指令元数据。

use super::directive::{Access, DescriptorCache, Interface, InterfaceDescriptor, MemberDirective};
use super::reflect::{GetterRules, TypeDescriptor, TypeTable};
use crate::config::BinderConfig;
use crate::types::{Target, Value};
use crate::{GatewayError, Result};
use std::collections::HashSet;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, trace, warn};
use uuid::Uuid;

/// 运行时类型未登记时报告的类型名
pub const UNREGISTERED_TYPE: &str = "<unregistered>";

/// 动态绑定器
pub struct Binder {
    /// 成员解析所用的类型表
    types: Arc<TypeTable>,
    /// 接口描述缓存
    cache: Arc<DescriptorCache>,
    rules: GetterRules,
    warn_unregistered_types: bool,
}

impl Binder {
    /// 使用进程级描述缓存和默认规则
    pub fn new(types: Arc<TypeTable>) -> Self {
        Self::with_config(types, &BinderConfig::default())
    }

    pub fn with_config(types: Arc<TypeTable>, config: &BinderConfig) -> Self {
        Self {
            types,
            cache: DescriptorCache::global(),
            rules: config.getter_rules(),
            warn_unregistered_types: config.warn_unregistered_types,
        }
    }

    /// 替换描述缓存
    pub fn with_cache(mut self, cache: Arc<DescriptorCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn types(&self) -> &Arc<TypeTable> {
        &self.types
    }

    pub fn describe<I: Interface>(&self) -> Result<Arc<InterfaceDescriptor>> {
        self.cache.describe::<I>()
    }

    /// 绑定接口到目标实例
    ///
    /// 未标记成员与空目标在此立即失败；单个成员能否在目标上找到，推迟到首次调用时校验。
    pub fn bind<I: Interface>(&self, target: impl Into<Option<Target>>) -> Result<Facade<I>> {
        let descriptor = self.cache.describe::<I>()?;
        let target = target.into().ok_or_else(|| GatewayError::NullTarget {
            interface: descriptor.name().to_string(),
        })?;

        if self.warn_unregistered_types {
            self.warn_unresolvable_types(&descriptor, &target);
        }

        let binding = Binding {
            id: Uuid::new_v4(),
            descriptor,
            target,
            types: self.types.clone(),
            rules: self.rules,
        };
        debug!("Bound interface {} (binding {})", binding.descriptor.name(), binding.id);

        Ok(Facade {
            binding: Arc::new(binding),
            _interface: PhantomData,
        })
    }

    fn warn_unresolvable_types(&self, descriptor: &InterfaceDescriptor, target: &Target) {
        let mut missing = HashSet::new();
        for (member, directive) in descriptor.directives() {
            let registered = match directive.redirect_type() {
                Some(type_name) => self.types.contains(type_name),
                None => self.types.runtime_type_of(target).is_some(),
            };
            if !registered {
                missing.insert(directive.redirect_type().unwrap_or(UNREGISTERED_TYPE));
                trace!("Member {}::{} has no registered resolution type", descriptor.name(), member);
            }
        }
        for type_name in missing {
            warn!(
                "Interface {} resolves members against type {} which is not registered",
                descriptor.name(),
                type_name
            );
        }
    }
}

impl fmt::Debug for Binder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binder")
            .field("types", &self.types)
            .field("rules", &self.rules)
            .finish()
    }
}

/// 接口指令表与目标实例的配对，除此之外无内部可变状态
pub struct Binding {
    id: Uuid,
    descriptor: Arc<InterfaceDescriptor>,
    target: Target,
    types: Arc<TypeTable>,
    rules: GetterRules,
}

impl Binding {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn descriptor(&self) -> &InterfaceDescriptor {
        &self.descriptor
    }

    /// 分派一次调用：查指令 → 解析类型 → 查成员 → 原样调用
    pub fn dispatch(&self, member: &str, args: &[Value]) -> Result<Value> {
        let directive = self
            .descriptor
            .directive(member)
            .ok_or_else(|| GatewayError::member_not_found(self.descriptor.name(), member))?;
        let resolved = self.resolve_type(directive, member)?;
        trace!("Dispatching {}::{} via {}", self.descriptor.name(), member, resolved.name());

        match directive.access() {
            Access::Invoke => {
                let method = resolved
                    .method(member)
                    .ok_or_else(|| GatewayError::member_not_found(resolved.name(), member))?;
                method.call(self.target.as_ref(), args)
            }
            Access::AttributeRead => {
                if !args.is_empty() {
                    return Err(GatewayError::mismatch(
                        member,
                        format!("getter takes no arguments, got {}", args.len()),
                    ));
                }
                let accessor = resolved
                    .resolve_getter(member, &self.rules)
                    .ok_or_else(|| GatewayError::member_not_found(resolved.name(), member))?;
                accessor.read(self.target.as_ref())
            }
        }
    }

    /// 重定向只改变解析所用的类型名，目标实例始终不变
    fn resolve_type(&self, directive: &MemberDirective, member: &str) -> Result<Arc<TypeDescriptor>> {
        match directive.redirect_type() {
            Some(type_name) => self
                .types
                .lookup(type_name)
                .ok_or_else(|| GatewayError::member_not_found(type_name, member)),
            None => self
                .types
                .runtime_type_of(&self.target)
                .ok_or_else(|| GatewayError::member_not_found(UNREGISTERED_TYPE, member)),
        }
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("id", &self.id)
            .field("interface", &self.descriptor.name())
            .finish()
    }
}

/// 交给消费方的门面
///
/// 消费方为 `Facade<I>` 实现自己的接口trait，方法体委托给 [`Facade::invoke`] 或
/// [`Facade::get`]。门面只持有绑定，目标不会反向引用门面。
pub struct Facade<I> {
    binding: Arc<Binding>,
    _interface: PhantomData<fn() -> I>,
}

impl<I: Interface> Facade<I> {
    /// 调用 invoke 成员
    pub fn invoke(&self, member: &str, args: Vec<Value>) -> Result<Value> {
        self.binding.dispatch(member, &args)
    }

    /// 读取 getter 成员，每次都取目标当前值
    pub fn get(&self, member: &str) -> Result<Value> {
        self.binding.dispatch(member, &[])
    }

    pub fn descriptor(&self) -> &InterfaceDescriptor {
        self.binding.descriptor()
    }

    pub fn binding_id(&self) -> Uuid {
        self.binding.id()
    }

    /// 门面是否指向给定实例，只比较数据指针
    pub fn is_bound_to(&self, target: &Target) -> bool {
        Arc::as_ptr(&self.binding.target) as *const () == Arc::as_ptr(target) as *const ()
    }
}

impl<I> Clone for Facade<I> {
    fn clone(&self) -> Self {
        Self {
            binding: self.binding.clone(),
            _interface: PhantomData,
        }
    }
}

impl<I> fmt::Debug for Facade<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Facade").field("binding", &self.binding).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::directive::{InterfaceDecl, MemberDecl};
    use crate::core::reflect::TypeBuilder;
    use crate::types::{ParamKind, Signature, ValueKind};
    use parking_lot::Mutex;

    struct Greeter;

    impl Interface for Greeter {
        fn declaration() -> InterfaceDecl {
            InterfaceDecl::new("test.Greeter")
                .member(MemberDecl::invoke("hello"))
                .member(MemberDecl::invoke("greet"))
                .member(MemberDecl::getter("name"))
                .member(MemberDecl::getter("count"))
        }
    }

    struct Unbindable;

    impl Interface for Unbindable {
        fn declaration() -> InterfaceDecl {
            InterfaceDecl::new("test.Unbindable").member(MemberDecl::new("hello"))
        }
    }

    struct GreeterImpl {
        name: Mutex<String>,
    }

    fn table() -> Arc<TypeTable> {
        let types = TypeTable::new();
        types
            .register(
                TypeBuilder::<GreeterImpl>::new("test.GreeterImpl")
                    .method("hello", Signature::empty(), |_, _| Ok(Value::from("hi")))
                    .method(
                        "greet",
                        Signature::new([ValueKind::Str]).with_variadic(ParamKind::Any),
                        |this, args| Ok(Value::from(format!("{} greets {}", this.name.lock(), args[0]))),
                    )
                    .attribute("name", |this| Value::from(this.name.lock().clone()))
                    .build(),
            )
            .unwrap();
        Arc::new(types)
    }

    fn target() -> (Arc<GreeterImpl>, Target) {
        let instance = Arc::new(GreeterImpl {
            name: Mutex::new("ada".into()),
        });
        let target: Target = instance.clone();
        (instance, target)
    }

    #[test]
    fn test_invoke_forwards() {
        let binder = Binder::new(table()).with_cache(Arc::new(DescriptorCache::new()));
        let (_, target) = target();
        let facade = binder.bind::<Greeter>(target).unwrap();
        assert_eq!(facade.invoke("hello", vec![]).unwrap(), Value::from("hi"));
        assert_eq!(
            facade.invoke("greet", vec![Value::from("bob")]).unwrap(),
            Value::from("ada greets bob")
        );
    }

    #[test]
    fn test_getter_reads_live_value() {
        let binder = Binder::new(table());
        let (instance, target) = target();
        let facade = binder.bind::<Greeter>(target).unwrap();
        assert_eq!(facade.get("name").unwrap(), Value::from("ada"));
        *instance.name.lock() = "grace".into();
        assert_eq!(facade.get("name").unwrap(), Value::from("grace"));
    }

    #[test]
    fn test_missing_getter_fails_at_call_time() {
        let binder = Binder::new(table());
        let (_, target) = target();
        let facade = binder.bind::<Greeter>(target).unwrap();
        let err = facade.get("count").unwrap_err();
        assert!(matches!(err, GatewayError::MemberNotFound { ref type_name, .. } if type_name == "test.GreeterImpl"));
    }

    #[test]
    fn test_getter_with_arguments_is_mismatch() {
        let binder = Binder::new(table());
        let (_, target) = target();
        let facade = binder.bind::<Greeter>(target).unwrap();
        let err = facade.invoke("name", vec![Value::from(1)]).unwrap_err();
        assert!(matches!(err, GatewayError::ArityOrTypeMismatch { .. }));
    }

    #[test]
    fn test_unknown_member_is_not_found() {
        let binder = Binder::new(table());
        let (_, target) = target();
        let facade = binder.bind::<Greeter>(target).unwrap();
        let err = facade.invoke("wave", vec![]).unwrap_err();
        assert!(matches!(err, GatewayError::MemberNotFound { ref type_name, .. } if type_name == "test.Greeter"));
    }

    #[test]
    fn test_null_target_fails_at_bind() {
        let binder = Binder::new(table());
        let err = binder.bind::<Greeter>(None::<Target>).unwrap_err();
        assert!(matches!(err, GatewayError::NullTarget { .. }));
    }

    #[test]
    fn test_unresolvable_member_fails_at_bind() {
        let binder = Binder::new(table());
        let (_, target) = target();
        let err = binder.bind::<Unbindable>(target).unwrap_err();
        assert!(matches!(err, GatewayError::UnresolvableMember { .. }));
    }

    #[test]
    fn test_unregistered_runtime_type() {
        let binder = Binder::new(Arc::new(TypeTable::new()));
        let (_, target) = target();
        let facade = binder.bind::<Greeter>(target.clone()).unwrap();
        let err = facade.invoke("hello", vec![]).unwrap_err();
        assert!(matches!(err, GatewayError::MemberNotFound { ref type_name, .. } if type_name == UNREGISTERED_TYPE));

        // 登记后同一实例按自身类型解析
        let registered = Binder::new(table()).bind::<Greeter>(target).unwrap();
        assert_eq!(registered.invoke("hello", vec![]).unwrap(), Value::from("hi"));
    }

    #[test]
    fn test_facade_clones_share_binding() {
        let binder = Binder::new(table());
        let (_, target) = target();
        let facade = binder.bind::<Greeter>(target.clone()).unwrap();
        let copy = facade.clone();
        assert_eq!(facade.binding_id(), copy.binding_id());
        assert!(copy.is_bound_to(&target));

        let other = binder.bind::<Greeter>(target).unwrap();
        assert_ne!(facade.binding_id(), other.binding_id());
    }

    #[test]
    fn test_is_bound_to_compares_instances() {
        let binder = Binder::new(table());
        let (instance, bound) = target();
        let facade = binder.bind::<Greeter>(bound).unwrap();

        // 从具体类型重新擦除出的句柄仍指向同一实例
        let rewrapped: Target = instance.clone();
        assert!(facade.is_bound_to(&rewrapped));

        let (_, elsewhere) = target();
        assert!(!facade.is_bound_to(&elsewhere));
    }
}
