//! Codec - 未型付けの値と型付きの値の相互変換（structural validator）
//!
//! wire 上の payload は `serde_json::Value` のまま流れ、
//! 宣言（`Call`）の境界でだけ型に変換されます。
//!
//! # 提供するもの
//! - `decode::<T>(raw)`: Value → T（失敗時は ValidationErrors）
//! - `encode::<T>(&value)`: T → Value
//! - `shape_of(&raw)`: 値の動的な形（エラーメッセージ用）

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;

/// One problem found while validating a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Location inside the value (`""` for the root).
    pub path: String,
    pub message: String,
}

/// ValidationErrors は検証失敗の詳細（1 件以上）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors {
    issues: Vec<ValidationIssue>,
}

impl ValidationErrors {
    pub fn single(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            issues: vec![ValidationIssue {
                path: path.into(),
                message: message.into(),
            }],
        }
    }

    pub fn push(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.issues.push(ValidationIssue {
            path: path.into(),
            message: message.into(),
        });
    }

    pub fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, issue) in self.issues.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            if issue.path.is_empty() {
                write!(f, "{}", issue.message)?;
            } else {
                write!(f, "{}: {}", issue.path, issue.message)?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

impl From<serde_json::Error> for ValidationErrors {
    fn from(err: serde_json::Error) -> Self {
        ValidationErrors::single("", err.to_string())
    }
}

/// Dynamic shape of an untyped value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Null,
    Bool,
    Number,
    String,
    Array(usize),
    Object,
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Null => f.write_str("null"),
            Shape::Bool => f.write_str("boolean"),
            Shape::Number => f.write_str("number"),
            Shape::String => f.write_str("string"),
            Shape::Array(len) => write!(f, "array of {len}"),
            Shape::Object => f.write_str("object"),
        }
    }
}

pub fn shape_of(raw: &Value) -> Shape {
    match raw {
        Value::Null => Shape::Null,
        Value::Bool(_) => Shape::Bool,
        Value::Number(_) => Shape::Number,
        Value::String(_) => Shape::String,
        Value::Array(items) => Shape::Array(items.len()),
        Value::Object(_) => Shape::Object,
    }
}

pub fn decode<T: DeserializeOwned>(raw: Value) -> Result<T, ValidationErrors> {
    serde_json::from_value(raw).map_err(ValidationErrors::from)
}

pub fn encode<T: Serialize>(value: &T) -> Result<Value, ValidationErrors> {
    serde_json::to_value(value).map_err(ValidationErrors::from)
}
