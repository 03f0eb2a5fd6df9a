//! Config - 起動時設定（JSON）
//!
//! すべてのフィールドにデフォルトがあるので、空の `{}` でも有効な設定です。
//!
//! ```json
//! {
//!   "registry": { "duplicate_policy": "reject", "expected_calls": ["math.add.v1"] },
//!   "loopback": { "reply_mode": "await", "reply_timeout_ms": 5000, "channel_capacity": 64 }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::typed::DuplicatePolicy;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TetherConfig {
    pub registry: RegistryConfig,
    pub loopback: LoopbackConfig,
}

impl TetherConfig {
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(s)?)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub duplicate_policy: DuplicatePolicy,

    /// build() 時に登録済みであるべき呼び出し名
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub expected_calls: Vec<String>,
}

/// How the loopback sender treats replies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyMode {
    /// Issue a token and wait for the matching reply.
    #[default]
    Await,
    /// Send with the empty token and return immediately.
    Detached,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopbackConfig {
    pub reply_mode: ReplyMode,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_timeout_ms: Option<u64>,

    pub channel_capacity: usize,
}

impl LoopbackConfig {
    pub fn reply_timeout(&self) -> Option<Duration> {
        self.reply_timeout_ms.map(Duration::from_millis)
    }
}

impl Default for LoopbackConfig {
    fn default() -> Self {
        Self {
            reply_mode: ReplyMode::Await,
            reply_timeout_ms: None,
            channel_capacity: 64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_gives_defaults() {
        let config = TetherConfig::from_json_str("{}").unwrap();
        assert_eq!(config, TetherConfig::default());
        assert_eq!(config.registry.duplicate_policy, DuplicatePolicy::Reject);
        assert_eq!(config.loopback.channel_capacity, 64);
        assert_eq!(config.loopback.reply_timeout(), None);
    }

    #[test]
    fn parses_all_fields() {
        let config = TetherConfig::from_json_str(
            r#"{
                "registry": { "duplicate_policy": "overwrite", "expected_calls": ["math.add.v1"] },
                "loopback": { "reply_mode": "detached", "reply_timeout_ms": 250, "channel_capacity": 8 }
            }"#,
        )
        .unwrap();

        assert_eq!(config.registry.duplicate_policy, DuplicatePolicy::Overwrite);
        assert_eq!(config.registry.expected_calls, vec!["math.add.v1".to_string()]);
        assert_eq!(config.loopback.reply_mode, ReplyMode::Detached);
        assert_eq!(config.loopback.reply_timeout(), Some(Duration::from_millis(250)));
        assert_eq!(config.loopback.channel_capacity, 8);
    }

    #[test]
    fn rejects_unknown_policy() {
        let err = TetherConfig::from_json_str(r#"{"registry": {"duplicate_policy": "maybe"}}"#)
            .unwrap_err();
        assert!(err.to_string().starts_with("invalid config"));
    }
}
