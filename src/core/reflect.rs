//! 类型成员表
//!
//! 具体类型在此登记可调用方法与可读属性，绑定器按类型名或实例的 `TypeId`
//! 解析成员。替代运行时反射，使成员查找规则可检查、可单独测试。

use crate::types::{Signature, Target, Value};
use crate::{GatewayError, Result, TargetError};
use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::debug;

type MethodFn = Arc<dyn Fn(&dyn Any, &[Value]) -> Result<Value> + Send + Sync>;
type AttributeFn = Arc<dyn Fn(&dyn Any) -> Result<Value> + Send + Sync>;

/// getter 成员的名称匹配规则
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetterRules {
    /// 允许回退到零参数访问器 `get_<name>`
    pub accessor_prefix: bool,
    /// 允许忽略ASCII大小写匹配属性
    pub case_insensitive: bool,
}

impl Default for GetterRules {
    fn default() -> Self {
        Self {
            accessor_prefix: true,
            case_insensitive: true,
        }
    }
}

impl GetterRules {
    /// 仅允许精确匹配
    pub fn exact() -> Self {
        Self {
            accessor_prefix: false,
            case_insensitive: false,
        }
    }
}

/// 已登记的方法
#[derive(Clone)]
pub struct MethodEntry {
    pub name: String,
    pub signature: Signature,
    invoker: MethodFn,
}

impl MethodEntry {
    /// 校验签名后调用，参数按位置原样传入
    pub fn call(&self, receiver: &dyn Any, args: &[Value]) -> Result<Value> {
        self.signature.check(&self.name, args)?;
        (self.invoker)(receiver, args)
    }
}

impl fmt::Debug for MethodEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodEntry")
            .field("name", &self.name)
            .field("signature", &self.signature)
            .finish()
    }
}

/// 已登记的属性
#[derive(Clone)]
pub struct AttributeEntry {
    pub name: String,
    reader: AttributeFn,
}

impl AttributeEntry {
    pub fn read(&self, receiver: &dyn Any) -> Result<Value> {
        (self.reader)(receiver)
    }
}

impl fmt::Debug for AttributeEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributeEntry").field("name", &self.name).finish()
    }
}

/// getter 解析结果：属性本身，或零参数方法
#[derive(Debug, Clone, Copy)]
pub enum Accessor<'a> {
    Attribute(&'a AttributeEntry),
    Method(&'a MethodEntry),
}

impl Accessor<'_> {
    pub fn read(&self, receiver: &dyn Any) -> Result<Value> {
        match self {
            Accessor::Attribute(attribute) => attribute.read(receiver),
            Accessor::Method(method) => method.call(receiver, &[]),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Accessor::Attribute(attribute) => &attribute.name,
            Accessor::Method(method) => &method.name,
        }
    }
}

/// 具体类型的成员描述
#[derive(Debug)]
pub struct TypeDescriptor {
    name: String,
    type_id: TypeId,
    methods: HashMap<String, MethodEntry>,
    attributes: HashMap<String, AttributeEntry>,
}

impl TypeDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 实例的运行时类型
    pub fn instance_type_id(&self) -> TypeId {
        self.type_id
    }

    /// 精确名称匹配方法
    pub fn method(&self, name: &str) -> Option<&MethodEntry> {
        self.methods.get(name)
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeEntry> {
        self.attributes.get(name)
    }

    /// 按 getter 规则解析：精确属性 → 同名零参数方法 → `get_<name>` → 忽略大小写属性
    pub fn resolve_getter(&self, name: &str, rules: &GetterRules) -> Option<Accessor<'_>> {
        if let Some(attribute) = self.attributes.get(name) {
            return Some(Accessor::Attribute(attribute));
        }

        let zero_arg = |candidate: &str| {
            self.methods
                .get(candidate)
                .filter(|method| method.signature.accepts_no_args())
                .map(Accessor::Method)
        };

        if let Some(accessor) = zero_arg(name) {
            return Some(accessor);
        }

        if rules.accessor_prefix {
            if let Some(accessor) = zero_arg(&format!("get_{}", name)) {
                return Some(accessor);
            }
        }

        if rules.case_insensitive {
            // 多个候选时取名称最小者，保证结果确定
            return self
                .attributes
                .values()
                .filter(|attribute| attribute.name.eq_ignore_ascii_case(name))
                .min_by(|a, b| a.name.cmp(&b.name))
                .map(Accessor::Attribute);
        }

        None
    }

    pub fn method_names(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(String::as_str)
    }

    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(String::as_str)
    }
}

/// 类型描述构建器
pub struct TypeBuilder<T> {
    name: String,
    methods: HashMap<String, MethodEntry>,
    attributes: HashMap<String, AttributeEntry>,
    _phantom: PhantomData<fn(&T)>,
}

impl<T: Any + Send + Sync> TypeBuilder<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            methods: HashMap::new(),
            attributes: HashMap::new(),
            _phantom: PhantomData,
        }
    }

    /// 登记方法，目标自身的错误原样包装为 `GatewayError::Target`
    pub fn method<F>(mut self, name: impl Into<String>, signature: Signature, f: F) -> Self
    where
        F: Fn(&T, &[Value]) -> std::result::Result<Value, TargetError> + Send + Sync + 'static,
    {
        let name = name.into();
        let member = name.clone();
        let type_name = self.name.clone();
        let invoker: MethodFn = Arc::new(move |receiver: &dyn Any, args: &[Value]| {
            let this = downcast_receiver::<T>(receiver, &type_name, &member)?;
            f(this, args).map_err(|source| GatewayError::Target {
                member: member.clone(),
                source,
            })
        });
        self.methods.insert(
            name.clone(),
            MethodEntry {
                name,
                signature,
                invoker,
            },
        );
        self
    }

    /// 登记属性，每次读取都实时取值
    pub fn attribute<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&T) -> Value + Send + Sync + 'static,
    {
        let name = name.into();
        let member = name.clone();
        let type_name = self.name.clone();
        let reader: AttributeFn = Arc::new(move |receiver: &dyn Any| {
            let this = downcast_receiver::<T>(receiver, &type_name, &member)?;
            Ok(f(this))
        });
        self.attributes.insert(name.clone(), AttributeEntry { name, reader });
        self
    }

    pub fn build(self) -> TypeDescriptor {
        TypeDescriptor {
            name: self.name,
            type_id: TypeId::of::<T>(),
            methods: self.methods,
            attributes: self.attributes,
        }
    }
}

fn downcast_receiver<'a, T: Any>(receiver: &'a dyn Any, type_name: &str, member: &str) -> Result<&'a T> {
    receiver.downcast_ref::<T>().ok_or_else(|| {
        GatewayError::mismatch(
            member,
            format!("target instance is not of resolved type '{}'", type_name),
        )
    })
}

/// 类型表
#[derive(Default)]
pub struct TypeTable {
    /// 按类型名索引
    types: RwLock<HashMap<String, Arc<TypeDescriptor>>>,
    /// 实例运行时类型到类型名，首次登记者优先
    runtime_names: RwLock<HashMap<TypeId, String>>,
}

impl TypeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记类型，同名重复登记报错
    pub fn register(&self, descriptor: TypeDescriptor) -> Result<Arc<TypeDescriptor>> {
        let mut types = self.types.write();
        if types.contains_key(descriptor.name()) {
            return Err(GatewayError::DuplicateType {
                type_name: descriptor.name().to_string(),
            });
        }

        let type_id = descriptor.instance_type_id();
        let descriptor = Arc::new(descriptor);
        self.runtime_names
            .write()
            .entry(type_id)
            .or_insert_with(|| descriptor.name().to_string());
        types.insert(descriptor.name().to_string(), descriptor.clone());

        debug!(
            "Registered type {} ({} methods, {} attributes)",
            descriptor.name(),
            descriptor.methods.len(),
            descriptor.attributes.len()
        );
        Ok(descriptor)
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<TypeDescriptor>> {
        self.types.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.read().contains_key(name)
    }

    /// 按实例的运行时类型查找描述
    pub fn runtime_type_of(&self, target: &Target) -> Option<Arc<TypeDescriptor>> {
        let receiver: &dyn Any = target.as_ref();
        let name = self.runtime_names.read().get(&Any::type_id(receiver)).cloned()?;
        self.lookup(&name)
    }

    pub fn len(&self) -> usize {
        self.types.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for TypeTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<String> = self.types.read().keys().cloned().collect();
        names.sort();
        f.debug_struct("TypeTable").field("types", &names).finish()
    }
}
