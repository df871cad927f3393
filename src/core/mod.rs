//! 核心绑定层模块
//!
//! 成员指令表、类型成员表与动态绑定器

pub mod directive;
pub mod reflect;
pub mod binder;

// 重新导出核心组件
pub use directive::*;
pub use reflect::*;
pub use binder::*;
