//! DispatchResult - Dispatcher の戻り値

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::token::Token;

/// Result of a successful dispatch.
///
/// `token` is echoed back unchanged from the inbound envelope, including the
/// empty sentinel. Whether to route it anywhere is the transport's call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchResult {
    pub token: Token,
    pub result: Value,
}

impl DispatchResult {
    pub fn new(token: Token, result: Value) -> Self {
        Self { token, result }
    }

    pub fn expects_reply(&self) -> bool {
        !self.token.is_fire_and_forget()
    }
}
