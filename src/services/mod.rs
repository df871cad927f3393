//! 宿主服务层模块
//!
//! 绑定核心之外的协作者：组件实例注册表、日志输出与调试开关、服务发布点

pub mod instances;
pub mod logging;
pub mod publication;

// 重新导出宿主服务
pub use instances::*;
pub use logging::*;
pub use publication::*;
