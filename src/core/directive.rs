//! 成员指令表
//!
//! 每个接口类型只扫描一次成员声明，把每个成员归类为 invoke、属性读取或重定向，
//! 结果不可变并在进程内按接口类型缓存。

use crate::{GatewayError, Result};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// 成员上的路由标记
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Marker {
    /// 转发为方法调用
    Invoke,
    /// 转发为属性读取
    Getter,
    /// 用指定类型名解析目标成员
    Redirect(String),
}

/// 接口成员声明
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberDecl {
    pub name: String,
    pub markers: Vec<Marker>,
    /// 成员在接口侧有默认实现，不转发
    pub has_default: bool,
}

impl MemberDecl {
    /// 未标记的成员
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            markers: Vec::new(),
            has_default: false,
        }
    }

    pub fn invoke(name: impl Into<String>) -> Self {
        Self::new(name).marked(Marker::Invoke)
    }

    pub fn getter(name: impl Into<String>) -> Self {
        Self::new(name).marked(Marker::Getter)
    }

    /// 带默认实现的成员
    pub fn defaulted(name: impl Into<String>) -> Self {
        Self {
            has_default: true,
            ..Self::new(name)
        }
    }

    pub fn marked(mut self, marker: Marker) -> Self {
        self.markers.push(marker);
        self
    }

    pub fn redirected(self, type_name: impl Into<String>) -> Self {
        self.marked(Marker::Redirect(type_name.into()))
    }
}

/// 接口声明
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceDecl {
    pub name: String,
    /// 接口级重定向，作用于所有没有自身重定向的成员
    pub redirect: Option<String>,
    pub members: Vec<MemberDecl>,
}

impl InterfaceDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            redirect: None,
            members: Vec::new(),
        }
    }

    /// 接口级重定向到具体实现的类型名
    pub fn proxied(mut self, type_name: impl Into<String>) -> Self {
        self.redirect = Some(type_name.into());
        self
    }

    pub fn member(mut self, member: MemberDecl) -> Self {
        self.members.push(member);
        self
    }
}

/// 可绑定的接口
///
/// 实现者通常是一个零大小的标记类型，消费方再为 `Facade<Self>` 实现自己的接口trait。
pub trait Interface: Send + Sync + 'static {
    /// 接口的成员声明
    fn declaration() -> InterfaceDecl;
}

/// 目标成员的访问方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Access {
    Invoke,
    AttributeRead,
}

/// 成员指令
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemberDirective {
    Invoke,
    AttributeRead,
    /// 改用 `type_name` 解析目标成员，目标实例不变
    Redirect { type_name: String, access: Access },
}

impl MemberDirective {
    pub fn access(&self) -> Access {
        match self {
            MemberDirective::Invoke => Access::Invoke,
            MemberDirective::AttributeRead => Access::AttributeRead,
            MemberDirective::Redirect { access, .. } => *access,
        }
    }

    pub fn redirect_type(&self) -> Option<&str> {
        match self {
            MemberDirective::Redirect { type_name, .. } => Some(type_name),
            _ => None,
        }
    }

    /// 按标记优先级归类单个成员；无默认实现且无标记时返回None
    fn classify(
        interface: &str,
        interface_redirect: Option<&str>,
        member: &MemberDecl,
    ) -> Result<Option<Self>> {
        let mut access = None;
        let mut redirect = None;

        for marker in &member.markers {
            let next = match marker {
                Marker::Invoke => Access::Invoke,
                Marker::Getter => Access::AttributeRead,
                Marker::Redirect(type_name) => {
                    redirect = Some(type_name.as_str());
                    continue;
                }
            };
            if access.is_some_and(|current| current != next) {
                return Err(GatewayError::ConflictingMarkers {
                    interface: interface.to_string(),
                    member: member.name.clone(),
                });
            }
            access = Some(next);
        }

        // 只有重定向标记的成员按方法调用转发
        let access = match (access, redirect) {
            (Some(access), _) => access,
            (None, Some(_)) => Access::Invoke,
            (None, None) => return Ok(None),
        };

        let directive = match redirect.or(interface_redirect) {
            Some(type_name) => MemberDirective::Redirect {
                type_name: type_name.to_string(),
                access,
            },
            None => match access {
                Access::Invoke => MemberDirective::Invoke,
                Access::AttributeRead => MemberDirective::AttributeRead,
            },
        };
        Ok(Some(directive))
    }
}

/// 接口描述：成员名到指令的有序映射
#[derive(Debug)]
pub struct InterfaceDescriptor {
    name: String,
    type_id: TypeId,
    directives: Vec<(String, MemberDirective)>,
    index: HashMap<String, usize>,
    defaulted: Vec<String>,
}

impl InterfaceDescriptor {
    /// 从声明构建描述，所有配置错误在此立即暴露
    pub fn from_decl(type_id: TypeId, decl: InterfaceDecl) -> Result<Self> {
        let mut directives = Vec::with_capacity(decl.members.len());
        let mut index = HashMap::with_capacity(decl.members.len());
        let mut defaulted = Vec::new();

        for member in &decl.members {
            let duplicate = index.contains_key(&member.name) || defaulted.contains(&member.name);
            if duplicate {
                return Err(GatewayError::DuplicateMember {
                    interface: decl.name.clone(),
                    member: member.name.clone(),
                });
            }

            match MemberDirective::classify(&decl.name, decl.redirect.as_deref(), member)? {
                Some(directive) => {
                    index.insert(member.name.clone(), directives.len());
                    directives.push((member.name.clone(), directive));
                }
                None if member.has_default => defaulted.push(member.name.clone()),
                None => {
                    return Err(GatewayError::UnresolvableMember {
                        interface: decl.name.clone(),
                        member: member.name.clone(),
                    })
                }
            }
        }

        Ok(Self {
            name: decl.name,
            type_id,
            directives,
            index,
            defaulted,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn interface_type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn directive(&self, member: &str) -> Option<&MemberDirective> {
        self.index.get(member).map(|&i| &self.directives[i].1)
    }

    /// 按声明顺序遍历转发成员
    pub fn directives(&self) -> impl Iterator<Item = (&str, &MemberDirective)> {
        self.directives.iter().map(|(name, directive)| (name.as_str(), directive))
    }

    /// 有默认实现、不转发的成员
    pub fn defaulted(&self) -> &[String] {
        &self.defaulted
    }

    pub fn is_defaulted(&self, member: &str) -> bool {
        self.defaulted.iter().any(|name| name == member)
    }

    pub fn len(&self) -> usize {
        self.directives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }
}

static GLOBAL_CACHE: Lazy<Arc<DescriptorCache>> = Lazy::new(|| Arc::new(DescriptorCache::new()));

/// 接口描述缓存
///
/// 同一接口的首次构建在分片锁内串行执行，并发调用者得到同一个 `Arc`。
/// 构建失败不缓存。`Interface::declaration` 内不得再调用同一缓存的 `describe`。
#[derive(Debug, Default)]
pub struct DescriptorCache {
    entries: DashMap<TypeId, Arc<InterfaceDescriptor>>,
}

impl DescriptorCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// 进程级缓存，无显式销毁
    pub fn global() -> Arc<DescriptorCache> {
        GLOBAL_CACHE.clone()
    }

    pub fn describe<I: Interface>(&self) -> Result<Arc<InterfaceDescriptor>> {
        let type_id = TypeId::of::<I>();
        if let Some(found) = self.entries.get(&type_id) {
            return Ok(found.value().clone());
        }

        match self.entries.entry(type_id) {
            Entry::Occupied(entry) => Ok(entry.get().clone()),
            Entry::Vacant(entry) => {
                let descriptor = Arc::new(InterfaceDescriptor::from_decl(type_id, I::declaration())?);
                debug!(
                    "Described interface {} ({} forwarded, {} defaulted)",
                    descriptor.name(),
                    descriptor.len(),
                    descriptor.defaulted().len()
                );
                entry.insert(descriptor.clone());
                Ok(descriptor)
            }
        }
    }

    pub fn contains<I: Interface>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<I>())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// 在进程级缓存中描述接口
pub fn describe<I: Interface>() -> Result<Arc<InterfaceDescriptor>> {
    GLOBAL_CACHE.describe::<I>()
}
