//! 插件公开接口
//!
//! 外部插件只通过 `PluginApi` 与宿主插件交互；具体实现类型隐藏在绑定之后

use super::context::PluginContext;
use super::host::{HostPlugin, PacketManager};
use crate::core::{Facade, Interface, InterfaceDecl, MemberDecl};
use crate::types::{Value, ValueKind};
use crate::{GatewayError, Result};
use std::sync::Arc;

/// 宿主插件在类型表中的类型名
pub const HOST_TYPE_NAME: &str = "gateways.plugin.HostPlugin";

/// 公开接口的标记类型
pub struct PluginApiInterface;

impl Interface for PluginApiInterface {
    fn declaration() -> InterfaceDecl {
        InterfaceDecl::new("gateways.PluginApi")
            .proxied(HOST_TYPE_NAME)
            .member(MemberDecl::invoke("log"))
            .member(MemberDecl::invoke("debug"))
            .member(MemberDecl::getter("packets"))
            .member(MemberDecl::getter("is_debug"))
    }
}

/// 宿主插件的公开接口
pub trait PluginApi {
    /// 输出日志
    fn log(&self, message: &str, args: &[Value]) -> Result<()>;

    /// 输出调试日志，仅在调试模式开启时生效
    fn debug(&self, message: &str, args: &[Value]) -> Result<()>;

    /// 数据包管理器，宿主启用前为None
    fn packets(&self) -> Result<Option<Arc<PacketManager>>>;

    /// 是否处于调试模式，与 `debug` 读取同一个开关
    fn is_debug(&self) -> Result<bool>;
}

fn message_args(message: &str, args: &[Value]) -> Vec<Value> {
    std::iter::once(Value::from(message))
        .chain(args.iter().cloned())
        .collect()
}

impl PluginApi for Facade<PluginApiInterface> {
    fn log(&self, message: &str, args: &[Value]) -> Result<()> {
        self.invoke("log", message_args(message, args))?.try_into()
    }

    fn debug(&self, message: &str, args: &[Value]) -> Result<()> {
        self.invoke("debug", message_args(message, args))?.try_into()
    }

    fn packets(&self) -> Result<Option<Arc<PacketManager>>> {
        match self.get("packets")? {
            Value::Unit => Ok(None),
            value => value
                .downcast_object::<PacketManager>()
                .map(Some)
                .ok_or_else(|| GatewayError::UnexpectedValue {
                    expected: ValueKind::Object,
                    found: value.kind(),
                }),
        }
    }

    fn is_debug(&self) -> Result<bool> {
        self.get("is_debug")?.try_into()
    }
}

/// 把公开接口绑定到已登记的宿主插件实例
///
/// 宿主尚未登记时立即失败，不会返回延迟检查的门面。
pub fn plugin_api(ctx: &PluginContext) -> Result<Facade<PluginApiInterface>> {
    ctx.binder
        .bind::<PluginApiInterface>(ctx.instances.target::<HostPlugin>())
}
