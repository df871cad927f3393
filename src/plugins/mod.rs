//! 插件层模块
//!
//! 宿主插件、它的公开接口，以及插件运行时上下文

pub mod context;
pub mod api;
pub mod host;

// 重新导出插件组件
pub use context::*;
pub use api::*;
pub use host::*;
