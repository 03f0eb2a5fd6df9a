//! Errors - エラー型と分類
//!
//! # 分類
//! - **DispatchError**: receiver 側。`call()` がどの段階で失敗したかを区別する
//! - **HandlerError**: handler 自身の失敗。DispatchError::HandlerExecution の source になる
//! - **CallError**: caller 側。送信・応答待ち・型変換の失敗
//!
//! どのエラーも core の中では retry もログ出力もしません。
//! どう扱うか（エラー応答を返す、捨てる、ログに出す）は transport が決めます。

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::typed::codec::ValidationErrors;

/// ErrorKind は handler エラーの運用分類
///
/// - Transient: 一時的なエラー（caller が再試行してよい）
/// - Permanent: 恒久的なエラー（再試行しても無意味）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Transient,
    Permanent,
}

/// HandlerError は handler が返す失敗
#[derive(Debug)]
pub struct HandlerError {
    kind: ErrorKind,
    message: String,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Permanent,
            message: message.into(),
            source: None,
        }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(message).with_kind(ErrorKind::Transient)
    }

    pub fn with_kind(mut self, kind: ErrorKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for HandlerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (kind: {:?})", self.message, self.kind)
    }
}

impl std::error::Error for HandlerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Failure of a single dispatch, in the order the steps run.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("malformed envelope: {detail}")]
    EnvelopeDecode { detail: String },

    #[error("unknown function: {0}")]
    UnknownFunction(String),

    #[error("invalid input for {name}: {detail}")]
    InputDecode {
        name: String,
        detail: ValidationErrors,
    },

    #[error("handler {name} failed: {source}")]
    HandlerExecution {
        name: String,
        #[source]
        source: HandlerError,
    },

    #[error("invalid output from {name}: {detail}")]
    OutputEncode {
        name: String,
        detail: ValidationErrors,
    },
}

/// Wire-friendly tag of a [`DispatchError`], for transports that report failures back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchErrorKind {
    EnvelopeDecode,
    UnknownFunction,
    InputDecode,
    HandlerExecution,
    OutputEncode,
}

impl DispatchError {
    pub fn kind(&self) -> DispatchErrorKind {
        match self {
            DispatchError::EnvelopeDecode { .. } => DispatchErrorKind::EnvelopeDecode,
            DispatchError::UnknownFunction(_) => DispatchErrorKind::UnknownFunction,
            DispatchError::InputDecode { .. } => DispatchErrorKind::InputDecode,
            DispatchError::HandlerExecution { .. } => DispatchErrorKind::HandlerExecution,
            DispatchError::OutputEncode { .. } => DispatchErrorKind::OutputEncode,
        }
    }

    /// Transient / Permanent classification, when the handler itself failed.
    pub fn handler_kind(&self) -> Option<ErrorKind> {
        match self {
            DispatchError::HandlerExecution { source, .. } => Some(source.kind()),
            _ => None,
        }
    }

    /// Name of the call the error belongs to, once the envelope was readable.
    pub fn call_name(&self) -> Option<&str> {
        match self {
            DispatchError::EnvelopeDecode { .. } => None,
            DispatchError::UnknownFunction(name)
            | DispatchError::InputDecode { name, .. }
            | DispatchError::HandlerExecution { name, .. }
            | DispatchError::OutputEncode { name, .. } => Some(name),
        }
    }
}

/// Caller-side failure of a realized call.
#[derive(Debug, Error)]
pub enum CallError {
    #[error("failed to encode input for {name}: {detail}")]
    InputEncode {
        name: String,
        detail: ValidationErrors,
    },

    #[error("failed to decode output of {name}: {detail}")]
    OutputDecode {
        name: String,
        detail: ValidationErrors,
    },

    #[error("remote call {name} failed ({kind:?}): {message}")]
    Remote {
        name: String,
        kind: DispatchErrorKind,
        /// handler が失敗したときだけ Some
        handler_kind: Option<ErrorKind>,
        message: String,
    },

    #[error("timed out waiting for reply to {name} (token={token})")]
    Timeout { name: String, token: String },

    #[error("connection closed")]
    ConnectionClosed,

    #[error("transport error: {0}")]
    Transport(String),
}

impl CallError {
    /// The remote handler reported a transient failure, so the same call may succeed later.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            CallError::Remote {
                handler_kind: Some(ErrorKind::Transient),
                ..
            }
        )
    }
}
