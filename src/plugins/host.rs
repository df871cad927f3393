//! 宿主插件
//!
//! 公开接口背后的具体实现。类型表中登记 log、debug 方法和 packets 属性，
//! 启用时把公开接口绑定到自身并发布

use super::api::{plugin_api, PluginApiInterface, HOST_TYPE_NAME};
use super::context::{PluginContext, PluginMetadata, PluginState};
use crate::core::{Facade, TypeBuilder, TypeDescriptor, TypeTable};
use crate::services::{DebugFlag, InstanceRegistry, LogSink};
use crate::types::{ParamKind, Signature, Value};
use crate::{GatewayError, Result};
use parking_lot::{Mutex, RwLock};
use std::any::TypeId;
use std::sync::Arc;
use tracing::info;

/// 数据包管理器
#[derive(Debug, Default)]
pub struct PacketManager {
    listeners: Mutex<Vec<String>>,
}

impl PacketManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记数据包监听器
    pub fn register_listener(&self, name: impl Into<String>) {
        self.listeners.lock().push(name.into());
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    pub fn listeners(&self) -> Vec<String> {
        self.listeners.lock().clone()
    }
}

/// 宿主插件
pub struct HostPlugin {
    metadata: PluginMetadata,
    sink: Arc<dyn LogSink>,
    debug_flag: Arc<dyn DebugFlag>,
    /// 启用后才可用
    packets: RwLock<Option<Arc<PacketManager>>>,
    state: RwLock<PluginState>,
}

impl HostPlugin {
    pub fn new(sink: Arc<dyn LogSink>, debug_flag: Arc<dyn DebugFlag>) -> Self {
        Self {
            metadata: PluginMetadata {
                id: "gateways".to_string(),
                description: "Host plugin exposing the public plugin API".to_string(),
                authors: vec!["Gateways Team".to_string()],
                dependencies: vec!["utilities".to_string()],
            },
            sink,
            debug_flag,
            packets: RwLock::new(None),
            state: RwLock::new(PluginState::Loaded),
        }
    }

    /// 宿主插件在类型表中的成员
    pub fn type_descriptor() -> TypeDescriptor {
        let message = || Signature::new([ParamKind::Any]).with_variadic(ParamKind::Any);
        TypeBuilder::<HostPlugin>::new(HOST_TYPE_NAME)
            .method("log", message(), |this, args| {
                this.log(&args[0], &args[1..]);
                Ok(Value::Unit)
            })
            .method("debug", message(), |this, args| {
                this.debug(&args[0], &args[1..]);
                Ok(Value::Unit)
            })
            .attribute("packets", |this| {
                this.packets().map(Value::object).unwrap_or_default()
            })
            .attribute("is_debug", |this| Value::Bool(this.is_debug()))
            .build()
    }

    /// 登记类型与实例，返回唯一实例
    pub fn boot(ctx: &PluginContext, sink: Arc<dyn LogSink>) -> Result<Arc<Self>> {
        Self::register_type(&ctx.types)?;
        let plugin = Arc::new(Self::new(sink, ctx.debug_flag.clone()));
        ctx.instances.register(plugin.clone())?;
        info!("Loaded plugin {}", plugin.metadata.id);
        Ok(plugin)
    }

    /// 登记宿主类型；同名类型已由宿主自身登记时视为成功
    fn register_type(types: &TypeTable) -> Result<()> {
        match types.register(Self::type_descriptor()) {
            Ok(_) => Ok(()),
            Err(GatewayError::DuplicateType { .. })
                if types
                    .lookup(HOST_TYPE_NAME)
                    .is_some_and(|existing| existing.instance_type_id() == TypeId::of::<Self>()) =>
            {
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// 获取已登记的唯一实例
    pub fn get(instances: &InstanceRegistry) -> Option<Arc<Self>> {
        instances.instance::<Self>()
    }

    /// 启用：创建数据包管理器，绑定公开接口并发布
    pub fn enable(&self, ctx: &PluginContext) -> Result<Facade<PluginApiInterface>> {
        *self.packets.write() = Some(Arc::new(PacketManager::new()));

        let facade = plugin_api(ctx)?;
        ctx.services.set_provider(self.metadata.id.clone(), facade.clone());
        *self.state.write() = PluginState::Enabled;

        info!("Enabled plugin {}", self.metadata.id);
        Ok(facade)
    }

    pub fn metadata(&self) -> &PluginMetadata {
        &self.metadata
    }

    pub fn state(&self) -> PluginState {
        *self.state.read()
    }

    pub fn log(&self, message: &Value, args: &[Value]) {
        self.sink.log(&message.to_string(), args);
    }

    /// 调试开关在每次调用时读取
    pub fn is_debug(&self) -> bool {
        self.debug_flag.is_enabled()
    }

    pub fn debug(&self, message: &Value, args: &[Value]) {
        if self.is_debug() {
            self.sink.debug(&message.to_string(), args);
        }
    }

    pub fn packets(&self) -> Option<Arc<PacketManager>> {
        self.packets.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GatewayConfig;
    use crate::plugins::api::PluginApi;
    use crate::services::{MockDebugFlag, MockLogSink};
    use mockall::Sequence;
    use std::sync::Barrier;

    fn context(flag: MockDebugFlag) -> PluginContext {
        PluginContext::new(&GatewayConfig::default()).with_debug_flag(Arc::new(flag))
    }

    #[test]
    fn test_log_forwards_unmodified() {
        let mut sink = MockLogSink::new();
        sink.expect_log()
            .withf(|template, args| template == "{} joined" && args == [Value::from("ada")])
            .times(1)
            .return_const(());

        let ctx = context(MockDebugFlag::new());
        let host = HostPlugin::boot(&ctx, Arc::new(sink)).unwrap();
        let api = host.enable(&ctx).unwrap();
        api.log("{} joined", &[Value::from("ada")]).unwrap();
    }

    #[test]
    fn test_debug_polls_flag_each_call() {
        let mut flag = MockDebugFlag::new();
        let mut seq = Sequence::new();
        flag.expect_is_enabled().times(1).in_sequence(&mut seq).return_const(false);
        flag.expect_is_enabled().times(1).in_sequence(&mut seq).return_const(true);

        let mut sink = MockLogSink::new();
        sink.expect_debug()
            .withf(|template, args| template == "second" && args.is_empty())
            .times(1)
            .return_const(());

        let ctx = context(flag);
        let host = HostPlugin::boot(&ctx, Arc::new(sink)).unwrap();
        let api = host.enable(&ctx).unwrap();
        api.debug("first", &[]).unwrap();
        api.debug("second", &[]).unwrap();
    }

    #[test]
    fn test_is_debug_follows_host_flag() {
        let mut flag = MockDebugFlag::new();
        let mut seq = Sequence::new();
        flag.expect_is_enabled().times(1).in_sequence(&mut seq).return_const(true);
        flag.expect_is_enabled().times(1).in_sequence(&mut seq).return_const(false);

        let ctx = context(flag);
        let host = HostPlugin::boot(&ctx, Arc::new(MockLogSink::new())).unwrap();
        let api = host.enable(&ctx).unwrap();
        assert!(api.is_debug().unwrap());
        assert!(!api.is_debug().unwrap());
    }

    #[test]
    fn test_is_debug_uses_configured_env_var() {
        let var = "GATEWAYS_HOST_TEST_DEBUG";
        let mut config = GatewayConfig::default();
        config.logging.debug_env_var = var.to_string();
        let ctx = PluginContext::new(&config);

        let mut sink = MockLogSink::new();
        sink.expect_debug().times(1).return_const(());
        let host = HostPlugin::boot(&ctx, Arc::new(sink)).unwrap();
        let api = host.enable(&ctx).unwrap();

        std::env::set_var(var, "1");
        assert!(api.is_debug().unwrap());
        assert_eq!(api.is_debug().unwrap(), ctx.debug_flag.is_enabled());
        api.debug("visible", &[]).unwrap();

        std::env::remove_var(var);
        assert!(!api.is_debug().unwrap());
        api.debug("hidden", &[]).unwrap();
    }

    #[test]
    fn test_packets_present_after_enable() {
        let ctx = context(MockDebugFlag::new());
        let host = HostPlugin::boot(&ctx, Arc::new(MockLogSink::new())).unwrap();
        assert_eq!(host.state(), PluginState::Loaded);

        // 启用前绑定同样成功，getter 读到的是当前值
        let early = plugin_api(&ctx).unwrap();
        assert!(early.packets().unwrap().is_none());

        let api = host.enable(&ctx).unwrap();
        let packets = api.packets().unwrap().unwrap();
        packets.register_listener("movement");
        assert_eq!(host.packets().unwrap().listener_count(), 1);
        assert_eq!(early.packets().unwrap().unwrap().listeners(), vec!["movement".to_string()]);
        assert_eq!(host.state(), PluginState::Enabled);
    }

    #[test]
    fn test_enable_publishes_api() {
        let ctx = context(MockDebugFlag::new());
        let host = HostPlugin::boot(&ctx, Arc::new(MockLogSink::new())).unwrap();
        let api = host.enable(&ctx).unwrap();

        let published = ctx.services.provide::<PluginApiInterface>().unwrap();
        assert_eq!(published.binding_id(), api.binding_id());
        assert_eq!(ctx.services.provider_of::<PluginApiInterface>().as_deref(), Some("gateways"));
        assert!(HostPlugin::get(&ctx.instances).is_some());
    }

    #[test]
    fn test_boot_twice_rejected() {
        let ctx = context(MockDebugFlag::new());
        HostPlugin::boot(&ctx, Arc::new(MockLogSink::new())).unwrap();
        let result = HostPlugin::boot(&ctx, Arc::new(MockLogSink::new()));
        assert!(matches!(result, Err(GatewayError::InstanceAlreadyRegistered { .. })));
    }

    #[test]
    fn test_concurrent_boot_reports_existing_instance() {
        let ctx = context(MockDebugFlag::new());
        let barrier = Barrier::new(4);
        let (ctx_ref, barrier_ref) = (&ctx, &barrier);

        let results: Vec<_> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    scope.spawn(move || {
                        let (ctx, barrier) = (ctx_ref, barrier_ref);
                        barrier.wait();
                        HostPlugin::boot(&ctx, Arc::new(MockLogSink::new()))
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        for result in results.iter().filter(|r| r.is_err()) {
            assert!(matches!(result, Err(GatewayError::InstanceAlreadyRegistered { .. })));
        }
        assert_eq!(ctx.types.len(), 1);
    }

    #[test]
    fn test_foreign_type_under_host_name_rejected() {
        struct Impostor;
        let ctx = context(MockDebugFlag::new());
        ctx.types
            .register(TypeBuilder::<Impostor>::new(HOST_TYPE_NAME).build())
            .unwrap();
        let result = HostPlugin::boot(&ctx, Arc::new(MockLogSink::new()));
        assert!(matches!(result, Err(GatewayError::DuplicateType { .. })));
    }

    #[test]
    fn test_log_requires_message() {
        let ctx = context(MockDebugFlag::new());
        let host = HostPlugin::boot(&ctx, Arc::new(MockLogSink::new())).unwrap();
        let api = host.enable(&ctx).unwrap();
        let err = api.invoke("log", vec![]).unwrap_err();
        assert!(matches!(err, GatewayError::ArityOrTypeMismatch { .. }));
    }
}
