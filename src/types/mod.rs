//! Gateways 核心数据类型模块
//!
//! 动态分派过程中流转的值与成员签名

pub mod value;
pub mod signature;

// 重新导出所有公共类型
pub use value::*;
pub use signature::*;

use std::any::Any;
use std::sync::Arc;

/// 绑定目标 - 任意可跨线程共享的实例
pub type Target = Arc<dyn Any + Send + Sync>;

/// 服务提供者标识
pub type ProviderId = String;
