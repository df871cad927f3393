//! 插件运行时环境
//!
//! 插件通过显式传入的上下文访问实例注册表、类型表、绑定器与服务发布点，
//! 不依赖任何全局可达的获取函数

use crate::config::GatewayConfig;
use crate::core::{Binder, TypeTable};
use crate::services::{DebugFlag, EnvDebugFlag, InstanceRegistry, ServiceManager};
use crate::types::ProviderId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// 插件上下文 - 提供插件运行时环境
#[derive(Clone)]
pub struct PluginContext {
    /// 组件实例注册表
    pub instances: Arc<InstanceRegistry>,
    /// 类型成员表
    pub types: Arc<TypeTable>,
    /// 绑定器
    pub binder: Arc<Binder>,
    /// 服务发布点
    pub services: Arc<ServiceManager>,
    /// 调试开关
    pub debug_flag: Arc<dyn DebugFlag>,
}

impl PluginContext {
    /// 按配置创建新的插件上下文
    pub fn new(config: &GatewayConfig) -> Self {
        let types = Arc::new(TypeTable::new());
        Self {
            instances: Arc::new(InstanceRegistry::new()),
            binder: Arc::new(Binder::with_config(types.clone(), &config.binder)),
            types,
            services: Arc::new(ServiceManager::new()),
            debug_flag: Arc::new(EnvDebugFlag::new(config.logging.debug_env_var.clone())),
        }
    }

    /// 替换调试开关
    pub fn with_debug_flag(mut self, debug_flag: Arc<dyn DebugFlag>) -> Self {
        self.debug_flag = debug_flag;
        self
    }
}

impl std::fmt::Debug for PluginContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginContext")
            .field("instances", &self.instances.len())
            .field("types", &self.types)
            .field("services", &self.services.published_interfaces())
            .finish()
    }
}

/// 插件状态枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PluginState {
    /// 已构造，尚未启用
    Loaded,
    /// 已启用并发布服务
    Enabled,
}

/// 插件元数据
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginMetadata {
    /// 插件ID
    pub id: ProviderId,
    /// 插件描述
    pub description: String,
    /// 插件作者
    pub authors: Vec<String>,
    /// 依赖的插件ID
    pub dependencies: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::MockDebugFlag;

    #[test]
    fn test_context_shares_type_table_with_binder() {
        let ctx = PluginContext::new(&GatewayConfig::default());
        assert!(Arc::ptr_eq(&ctx.types, ctx.binder.types()));
        assert!(ctx.instances.is_empty());
    }

    #[test]
    fn test_with_debug_flag() {
        let mut flag = MockDebugFlag::new();
        flag.expect_is_enabled().return_const(true);
        let ctx = PluginContext::new(&GatewayConfig::default()).with_debug_flag(Arc::new(flag));
        assert!(ctx.debug_flag.is_enabled());
    }

    #[test]
    fn test_metadata_serialization() {
        let metadata = PluginMetadata {
            id: "swindle".into(),
            description: "An anti cheat system".into(),
            authors: vec!["ewized".into()],
            dependencies: vec!["utilities".into()],
        };
        let json = serde_json::to_string(&metadata).unwrap();
        let back: PluginMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(back, metadata);
    }
}
