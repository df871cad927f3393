//! Gateways - 插件接口绑定框架
//!
//! 让独立加载的组件暴露稳定的公开接口，同时隐藏具体实现与生命周期。
//! 消费方只知道接口；满足接口的对象在运行时解析，并通过绑定生成的门面按
//! 成员标记转发方法调用和属性读取。
//!
//! # 架构分层
//!
//! - **核心绑定层**: 成员指令表、类型成员表、动态绑定器
//! - **宿主服务层**: 组件实例注册表、日志输出与调试开关、服务发布点
//! - **插件层**: 宿主插件及其公开接口

pub mod types;
pub mod error;
pub mod config;
pub mod core;
pub mod services;
pub mod plugins;

// 重新导出核心类型
pub use crate::types::*;
pub use crate::error::*;
pub use crate::core::*;
pub use crate::services::*;
pub use crate::plugins::*;

use crate::config::GatewayConfig;
use tracing_subscriber::EnvFilter;

/// 框架信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const FRAMEWORK_NAME: &str = "Gateways";

/// 初始化日志系统，重复调用不会报错
pub fn initialize(config: &GatewayConfig) -> Result<()> {
    config.validate()?;

    let filter = EnvFilter::try_new(&config.logging.level)
        .map_err(|e| GatewayError::config(&format!("Invalid log filter: {}", e)))?;

    if tracing_subscriber::fmt().with_env_filter(filter).try_init().is_ok() {
        tracing::info!("Initializing {} v{}", FRAMEWORK_NAME, VERSION);
    }
    Ok(())
}
