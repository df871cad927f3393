//! Gateways 错误处理系统
//!
//! 统一的错误类型：绑定期错误、调用期错误、配置错误

use crate::types::ValueKind;
use thiserror::Error;

/// 目标成员自身抛出的错误，原样透传给调用者
pub type TargetError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// 框架统一错误类型
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 接口成员既没有标记也没有默认实现（绑定期，致命）
    #[error("Unresolvable member '{member}' on interface '{interface}': no marker and no default implementation")]
    UnresolvableMember { interface: String, member: String },

    /// 同一成员同时声明了 invoke 和 getter
    #[error("Conflicting markers on member '{member}' of interface '{interface}'")]
    ConflictingMarkers { interface: String, member: String },

    #[error("Duplicate member '{member}' on interface '{interface}'")]
    DuplicateMember { interface: String, member: String },

    /// 绑定目标为空
    #[error("Cannot bind interface '{interface}' to a null target")]
    NullTarget { interface: String },

    /// 解析出的类型上找不到对应成员（调用期）
    #[error("Member '{member}' not found on type '{type_name}'")]
    MemberNotFound { type_name: String, member: String },

    /// 参数个数或类型与目标成员签名不符（调用期）
    #[error("Arity or type mismatch calling '{member}': {message}")]
    ArityOrTypeMismatch { member: String, message: String },

    /// 返回值类别与预期不符
    #[error("Unexpected value: expected {expected}, found {found}")]
    UnexpectedValue { expected: ValueKind, found: ValueKind },

    #[error("Type '{type_name}' is already registered")]
    DuplicateType { type_name: String },

    /// 同一组件类型只能登记一个实例
    #[error("An instance of '{type_name}' is already registered")]
    InstanceAlreadyRegistered { type_name: String },

    /// 目标成员自身的失败
    #[error("Target member '{member}' failed: {source}")]
    Target {
        member: String,
        #[source]
        source: TargetError,
    },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Configuration parsing error: {message}")]
    ConfigParsing { message: String },
}

impl GatewayError {
    /// 创建成员未找到错误
    pub fn member_not_found(type_name: &str, member: &str) -> Self {
        Self::MemberNotFound {
            type_name: type_name.to_string(),
            member: member.to_string(),
        }
    }

    /// 创建参数不匹配错误
    pub fn mismatch(member: &str, message: impl Into<String>) -> Self {
        Self::ArityOrTypeMismatch {
            member: member.to_string(),
            message: message.into(),
        }
    }

    /// 创建配置相关错误
    pub fn config(message: &str) -> Self {
        Self::Config {
            message: message.to_string(),
        }
    }

    /// 是否为绑定期错误
    pub fn is_bind_time(&self) -> bool {
        matches!(
            self,
            Self::UnresolvableMember { .. }
                | Self::ConflictingMarkers { .. }
                | Self::DuplicateMember { .. }
                | Self::NullTarget { .. }
        )
    }
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let error = GatewayError::member_not_found("demo.Impl", "count");
        assert!(matches!(error, GatewayError::MemberNotFound { .. }));
        assert_eq!(error.to_string(), "Member 'count' not found on type 'demo.Impl'");
    }

    #[test]
    fn test_error_from_io() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let error = GatewayError::from(io_error);
        assert!(matches!(error, GatewayError::Io(_)));
    }

    #[test]
    fn test_bind_time_classification() {
        let unresolvable = GatewayError::UnresolvableMember {
            interface: "Greeter".into(),
            member: "wave".into(),
        };
        assert!(unresolvable.is_bind_time());
        assert!(!GatewayError::mismatch("hello", "expected 0 arguments, got 1").is_bind_time());
    }

    #[test]
    fn test_target_error_keeps_source() {
        let source: TargetError = "boom".into();
        let error = GatewayError::Target { member: "hello".into(), source };
        let inner = std::error::Error::source(&error).map(|e| e.to_string());
        assert_eq!(inner.as_deref(), Some("boom"));
    }
}
