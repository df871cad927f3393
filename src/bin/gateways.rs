//! Gateways 演示程序
//!
//! 启动宿主插件，发布公开接口，再以外部插件的身份通过接口交互

use anyhow::Context;
use gateways::{
    config::ConfigManager, initialize, HostPlugin, PluginApi, PluginApiInterface, PluginContext,
    TracingSink, Value,
};
use std::env;
use std::sync::Arc;

/// 程序入口点
fn main() {
    if let Err(e) = run_main() {
        tracing::error!("Gateways demo failed: {:#}", e);
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

/// 主要逻辑函数
fn run_main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();

    let config_manager = match args.len() {
        1 => ConfigManager::new_default(),
        2 => ConfigManager::load_from_file(&args[1])
            .with_context(|| format!("failed to load config file {}", args[1]))?,
        _ => {
            print_usage();
            return Ok(());
        }
    };
    let config = config_manager.get_config();
    initialize(config)?;

    // 宿主启动阶段
    let ctx = PluginContext::new(config);
    let host = HostPlugin::boot(&ctx, Arc::new(TracingSink::new("gateways")))?;
    host.enable(&ctx)?;

    // 外部插件只按接口类型发现服务
    let api = ctx
        .services
        .provide::<PluginApiInterface>()
        .context("plugin API was not published")?;

    api.log("{} v{} ready", &[Value::from(gateways::FRAMEWORK_NAME), Value::from(gateways::VERSION)])?;
    api.debug("debug mode enabled via {}", &[Value::from(config.logging.debug_env_var.as_str())])?;

    if let Some(packets) = api.packets()? {
        packets.register_listener("demo");
        api.log("{} packet listener(s) registered", &[Value::from(packets.listener_count() as i64)])?;
    }

    Ok(())
}

fn print_usage() {
    println!("Gateways plugin API demo");
    println!();
    println!("Usage:");
    println!("  gateways                 # run with default configuration");
    println!("  gateways <config.yaml>   # run with a YAML or TOML configuration file");
}
