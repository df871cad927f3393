//! 日志输出与调试开关
//!
//! 门面上的 log/debug 调用原样转发到日志输出；调试开关在每次调用时读取，不缓存

use crate::config::DEFAULT_DEBUG_ENV_VAR;
use crate::types::Value;
use tracing::{debug, info};

/// 日志输出
#[cfg_attr(test, mockall::automock)]
pub trait LogSink: Send + Sync {
    /// 普通日志
    fn log(&self, template: &str, args: &[Value]);

    /// 调试日志
    fn debug(&self, template: &str, args: &[Value]);
}

/// 调试开关来源
#[cfg_attr(test, mockall::automock)]
pub trait DebugFlag: Send + Sync {
    fn is_enabled(&self) -> bool;
}

/// 按位置填充模板中的 `{}` 占位符，多余参数忽略，缺少的占位符保留原样
pub fn render(template: &str, args: &[Value]) -> String {
    let mut rendered = String::with_capacity(template.len());
    let mut args = args.iter();
    let mut rest = template;

    while let Some(pos) = rest.find("{}") {
        rendered.push_str(&rest[..pos]);
        match args.next() {
            Some(arg) => rendered.push_str(&arg.to_string()),
            None => rendered.push_str("{}"),
        }
        rest = &rest[pos + 2..];
    }
    rendered.push_str(rest);
    rendered
}

/// 转发到 `tracing` 的日志输出
#[derive(Debug, Clone)]
pub struct TracingSink {
    /// 日志前缀，通常为插件ID
    prefix: String,
}

impl TracingSink {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }
}

impl LogSink for TracingSink {
    fn log(&self, template: &str, args: &[Value]) {
        info!("[{}] {}", self.prefix, render(template, args));
    }

    fn debug(&self, template: &str, args: &[Value]) {
        debug!("[{}] {}", self.prefix, render(template, args));
    }
}

/// 环境变量存在即开启调试
#[derive(Debug, Clone)]
pub struct EnvDebugFlag {
    var: String,
}

impl EnvDebugFlag {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }

    pub fn var(&self) -> &str {
        &self.var
    }
}

impl Default for EnvDebugFlag {
    fn default() -> Self {
        Self::new(DEFAULT_DEBUG_ENV_VAR)
    }
}

impl DebugFlag for EnvDebugFlag {
    fn is_enabled(&self) -> bool {
        std::env::var_os(&self.var).is_some()
    }
}
