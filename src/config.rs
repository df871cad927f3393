//! Gateways 配置管理系统
//!
//! 支持YAML/TOML配置文件，控制日志级别、调试开关来源与 getter 命名规则

use crate::core::GetterRules;
use crate::{GatewayError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing_subscriber::EnvFilter;

/// 默认调试开关环境变量
pub const DEFAULT_DEBUG_ENV_VAR: &str = "GATEWAYS_DEBUG";

/// 覆盖日志级别的环境变量
pub const LOG_LEVEL_ENV_VAR: &str = "GATEWAYS_LOG";

/// 框架配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// 日志配置
    pub logging: LoggingConfig,
    /// 绑定器配置
    pub binder: BinderConfig,
}

/// 日志配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志过滤指令，如 "info" 或 "gateways=debug"
    pub level: String,
    /// 调试开关环境变量，存在即开启
    pub debug_env_var: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            debug_env_var: DEFAULT_DEBUG_ENV_VAR.to_string(),
        }
    }
}

/// 绑定器配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BinderConfig {
    /// 绑定时解析类型未登记是否告警
    pub warn_unregistered_types: bool,
    /// getter 是否回退到 `get_<name>` 访问器
    pub getter_accessor_prefix: bool,
    /// getter 是否忽略大小写匹配属性
    pub getter_case_insensitive: bool,
}

impl Default for BinderConfig {
    fn default() -> Self {
        Self {
            warn_unregistered_types: true,
            getter_accessor_prefix: true,
            getter_case_insensitive: true,
        }
    }
}

impl BinderConfig {
    pub fn getter_rules(&self) -> GetterRules {
        GetterRules {
            accessor_prefix: self.getter_accessor_prefix,
            case_insensitive: self.getter_case_insensitive,
        }
    }
}

/// 配置文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFileFormat {
    Yaml,
    Toml,
}

impl ConfigFileFormat {
    /// 按扩展名判断格式
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => Ok(Self::Yaml),
            Some("toml") => Ok(Self::Toml),
            _ => Err(GatewayError::ConfigParsing {
                message: format!("Unsupported config file format: {:?}", path),
            }),
        }
    }
}

impl GatewayConfig {
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| GatewayError::ConfigParsing {
            message: format!("Failed to parse YAML config: {}", e),
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| GatewayError::ConfigParsing {
            message: format!("Failed to parse TOML config: {}", e),
        })
    }

    /// 用环境变量覆盖日志级别
    pub fn apply_env_overrides(&mut self) {
        if let Ok(level) = std::env::var(LOG_LEVEL_ENV_VAR) {
            if !level.trim().is_empty() {
                self.logging.level = level;
            }
        }
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<()> {
        if self.logging.debug_env_var.trim().is_empty() {
            return Err(GatewayError::config("Debug environment variable name cannot be empty"));
        }

        EnvFilter::try_new(&self.logging.level).map_err(|e| {
            GatewayError::config(&format!("Invalid log level '{}': {}", self.logging.level, e))
        })?;

        tracing::debug!("Configuration validation passed");
        Ok(())
    }
}

/// 配置管理器
#[derive(Debug, Default)]
pub struct ConfigManager {
    config: GatewayConfig,
}

impl ConfigManager {
    /// 从文件加载配置，并应用环境变量覆盖
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let format = ConfigFileFormat::from_path(path)?;
        let content = std::fs::read_to_string(path)?;

        let mut config = match format {
            ConfigFileFormat::Yaml => GatewayConfig::from_yaml_str(&content)?,
            ConfigFileFormat::Toml => GatewayConfig::from_toml_str(&content)?,
        };
        config.apply_env_overrides();

        Ok(Self { config })
    }

    /// 创建默认配置
    pub fn new_default() -> Self {
        let mut config = GatewayConfig::default();
        config.apply_env_overrides();
        Self { config }
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = match ConfigFileFormat::from_path(path)? {
            ConfigFileFormat::Yaml => serde_yaml::to_string(&self.config).map_err(|e| {
                GatewayError::config(&format!("Failed to serialize config: {}", e))
            })?,
            ConfigFileFormat::Toml => toml::to_string_pretty(&self.config).map_err(|e| {
                GatewayError::config(&format!("Failed to serialize config: {}", e))
            })?,
        };
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn get_config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn get_config_mut(&mut self) -> &mut GatewayConfig {
        &mut self.config
    }

    pub fn validate(&self) -> Result<()> {
        self.config.validate()
    }
}

/// 生成默认配置文件
pub fn generate_default_config_file<P: AsRef<Path>>(path: P) -> Result<()> {
    ConfigManager {
        config: GatewayConfig::default(),
    }
    .save_to_file(path)
}
