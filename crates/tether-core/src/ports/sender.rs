//! CallSender port - caller 側の送信関数
//!
//! core は送信の仕組みを持ちません。`Caller` は宣言の名前、LazyToken、
//! エンコード済みの入力を CallSender に渡し、その結果をそのまま待ちます。
//!
//! # 実装者の責務
//! - 応答を待つなら `token.issue()` で token を作り、その token で応答を待つ
//! - 応答を待たないなら `token.skip()`（空の sentinel）を使い、`Ok(None)` を返す
//! - タイムアウトや待ち続ける token の後始末も実装者の責務

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::CallError;
use crate::ports::token_generator::LazyToken;

#[async_trait]
pub trait CallSender: Send + Sync {
    /// Transmit one call.
    ///
    /// Returns `Ok(Some(result))` when a reply came back, `Ok(None)` when the
    /// sender chose not to wait for one.
    async fn send(
        &self,
        name: &'static str,
        token: LazyToken,
        input: Value,
    ) -> Result<Option<Value>, CallError>;
}
