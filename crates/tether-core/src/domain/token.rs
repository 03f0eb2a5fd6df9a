//! Token - 呼び出しと応答を対応付ける相関キー
//!
//! Token は caller 側が選ぶ文字列です。空文字列は予約済みの sentinel で、
//! 「応答不要（fire-and-forget）」を意味します。
//!
//! # 規約
//! - 応答を省略するかどうかは Token が空かどうか **だけ** で判断する
//! - Dispatcher は sentinel を解釈しない（そのまま echo する）
//! - 解釈するのは transport の責務

use serde::{Deserialize, Serialize};
use std::fmt;

/// Correlation token carried by every envelope and echoed back in the result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// 空の sentinel token（応答不要）
    pub fn none() -> Self {
        Self(String::new())
    }

    /// `true` when the caller does not expect a response.
    pub fn is_fire_and_forget(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<String> for Token {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Token {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
