//! 服务发布点
//!
//! 绑定好的门面按接口类型发布，其他组件按接口类型发现它

use crate::core::{Facade, Interface};
use crate::types::ProviderId;
use dashmap::DashMap;
use std::any::{Any, TypeId};
use std::sync::Arc;
use tracing::{info, warn};

/// 已发布的服务
#[derive(Debug, Clone)]
pub struct PublishedService {
    /// 发布者
    pub provider: ProviderId,
    /// 接口名称
    pub interface: String,
    facade: Arc<dyn Any + Send + Sync>,
}

/// 服务管理器
#[derive(Debug, Default)]
pub struct ServiceManager {
    providers: DashMap<TypeId, PublishedService>,
}

impl ServiceManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// 发布门面，同一接口再次发布时替换旧的提供者
    pub fn set_provider<I: Interface>(&self, provider: impl Into<ProviderId>, facade: Facade<I>) {
        let service = PublishedService {
            provider: provider.into(),
            interface: facade.descriptor().name().to_string(),
            facade: Arc::new(facade),
        };

        info!("Published {} provided by {}", service.interface, service.provider);
        if let Some(previous) = self.providers.insert(TypeId::of::<I>(), service) {
            warn!(
                "Replaced provider {} of {}",
                previous.provider, previous.interface
            );
        }
    }

    /// 按接口类型发现门面
    pub fn provide<I: Interface>(&self) -> Option<Facade<I>> {
        let entry = self.providers.get(&TypeId::of::<I>())?;
        entry.facade.downcast_ref::<Facade<I>>().cloned()
    }

    /// 接口的当前提供者
    pub fn provider_of<I: Interface>(&self) -> Option<ProviderId> {
        self.providers
            .get(&TypeId::of::<I>())
            .map(|entry| entry.provider.clone())
    }

    /// 撤销发布
    pub fn unset_provider<I: Interface>(&self) -> Option<ProviderId> {
        self.providers
            .remove(&TypeId::of::<I>())
            .map(|(_, service)| service.provider)
    }

    /// 所有已发布接口名称，按名称排序
    pub fn published_interfaces(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .providers
            .iter()
            .map(|entry| entry.interface.clone())
            .collect();
        names.sort();
        names
    }
}
