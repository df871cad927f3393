//! 组件实例注册表
//!
//! 每个组件类型登记唯一的活动实例。注册表以句柄形式显式传递给需要它的组件，
//! 实例的构造与销毁由宿主负责。

use crate::types::Target;
use crate::{GatewayError, Result};
use dashmap::DashMap;
use std::any::{Any, TypeId};
use std::sync::Arc;
use tracing::{debug, info};

/// 组件实例注册表
#[derive(Debug, Default)]
pub struct InstanceRegistry {
    instances: DashMap<TypeId, Registered>,
}

#[derive(Debug, Clone)]
struct Registered {
    type_name: &'static str,
    instance: Target,
}

impl InstanceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记组件实例，同一类型重复登记报错
    pub fn register<T: Any + Send + Sync>(&self, instance: Arc<T>) -> Result<()> {
        let type_name = std::any::type_name::<T>();
        match self.instances.entry(TypeId::of::<T>()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(GatewayError::InstanceAlreadyRegistered {
                type_name: type_name.to_string(),
            }),
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(Registered {
                    type_name,
                    instance,
                });
                info!("Registered instance of {}", type_name);
                Ok(())
            }
        }
    }

    /// 获取组件类型的唯一实例
    pub fn instance<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.target::<T>()?.downcast::<T>().ok()
    }

    /// 以绑定目标形式获取实例
    pub fn target<T: Any + Send + Sync>(&self) -> Option<Target> {
        self.instances
            .get(&TypeId::of::<T>())
            .map(|entry| entry.instance.clone())
    }

    /// 移除实例，宿主关闭组件时调用
    pub fn remove<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        let (_, registered) = self.instances.remove(&TypeId::of::<T>())?;
        debug!("Removed instance of {}", registered.type_name);
        registered.instance.downcast::<T>().ok()
    }

    pub fn contains<T: Any + Send + Sync>(&self) -> bool {
        self.instances.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Engine {
        id: u32,
    }

    #[test]
    fn test_register_and_resolve() {
        let registry = InstanceRegistry::new();
        let engine = Arc::new(Engine { id: 7 });
        registry.register(engine.clone()).unwrap();

        let resolved = registry.instance::<Engine>().unwrap();
        assert!(Arc::ptr_eq(&engine, &resolved));
        assert_eq!(resolved.id, 7);
        assert!(registry.target::<Engine>().is_some());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_missing_instance() {
        let registry = InstanceRegistry::new();
        assert!(registry.instance::<Engine>().is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_single_instance_per_type() {
        let registry = InstanceRegistry::new();
        registry.register(Arc::new(Engine { id: 1 })).unwrap();
        let result = registry.register(Arc::new(Engine { id: 2 }));
        assert!(matches!(result, Err(GatewayError::InstanceAlreadyRegistered { .. })));
        assert_eq!(registry.instance::<Engine>().unwrap().id, 1);
    }

    #[test]
    fn test_remove() {
        let registry = InstanceRegistry::new();
        registry.register(Arc::new(Engine { id: 3 })).unwrap();
        let removed = registry.remove::<Engine>().unwrap();
        assert_eq!(removed.id, 3);
        assert!(!registry.contains::<Engine>());
    }
}
