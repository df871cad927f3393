//! 成员签名
//!
//! 描述目标方法的位置参数与可变参数尾部，调用前用于校验参数个数和类别

use super::value::{Value, ValueKind};
use crate::{GatewayError, Result};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// 参数类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamKind {
    /// 接受任意值
    Any,
    /// 只接受指定类别
    Exact(ValueKind),
}

impl ParamKind {
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            ParamKind::Any => true,
            ParamKind::Exact(kind) => value.kind() == *kind,
        }
    }
}

impl From<ValueKind> for ParamKind {
    fn from(kind: ValueKind) -> Self {
        ParamKind::Exact(kind)
    }
}

impl Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamKind::Any => f.write_str("any"),
            ParamKind::Exact(kind) => write!(f, "{}", kind),
        }
    }
}

/// 方法签名
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    /// 固定位置参数
    pub params: Vec<ParamKind>,
    /// 可变参数尾部
    pub variadic: Option<ParamKind>,
}

impl Signature {
    /// 无参数签名
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new<I, P>(params: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<ParamKind>,
    {
        Self {
            params: params.into_iter().map(Into::into).collect(),
            variadic: None,
        }
    }

    /// 追加可变参数尾部
    pub fn with_variadic(mut self, kind: impl Into<ParamKind>) -> Self {
        self.variadic = Some(kind.into());
        self
    }

    /// 是否可以零参数调用
    pub fn accepts_no_args(&self) -> bool {
        self.params.is_empty()
    }

    /// 校验调用参数，不做任何强制转换
    pub fn check(&self, member: &str, args: &[Value]) -> Result<()> {
        let fixed = self.params.len();
        let arity_ok = match self.variadic {
            Some(_) => args.len() >= fixed,
            None => args.len() == fixed,
        };
        if !arity_ok {
            return Err(GatewayError::mismatch(
                member,
                format!("expected {} argument(s), got {}", self, args.len()),
            ));
        }

        for (index, arg) in args.iter().enumerate() {
            let expected = self.params.get(index).or(self.variadic.as_ref());
            if let Some(kind) = expected {
                if !kind.accepts(arg) {
                    return Err(GatewayError::mismatch(
                        member,
                        format!("argument {} expected {}, found {}", index, kind, arg.kind()),
                    ));
                }
            }
        }
        Ok(())
    }
}

impl Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", param)?;
        }
        if let Some(tail) = &self.variadic {
            if !self.params.is_empty() {
                f.write_str(", ")?;
            }
            write!(f, "{}...", tail)?;
        }
        f.write_str(")")
    }
}
