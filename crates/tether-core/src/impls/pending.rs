//! PendingCalls - caller 側の token → resolver マップ
//!
//! 応答を待っている呼び出しを token で管理します。core ではなく transport が所有します。
//!
//! # 後始末
//! - 応答が届いたら `resolve()` がエントリを取り除く
//! - 待っている側（PendingReply）が drop されたら（タイムアウト、キャンセル）エントリを取り除く
//! - `close_all()` で全エントリを捨てると、待っている側は ConnectionClosed を受け取る
//!
//! これで届かない応答のエントリが溜まり続けることはありません。

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::oneshot;

use crate::domain::{CallError, DispatchError, DispatchErrorKind, ErrorKind, Token};

/// Failure reported back to the caller over the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteError {
    pub kind: DispatchErrorKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handler_kind: Option<ErrorKind>,
    pub message: String,
}

impl From<&DispatchError> for RemoteError {
    fn from(err: &DispatchError) -> Self {
        Self {
            kind: err.kind(),
            handler_kind: err.handler_kind(),
            message: err.to_string(),
        }
    }
}

/// Reply routed back to the caller, keyed by the original token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireReply {
    pub token: Token,
    pub outcome: Result<Value, RemoteError>,
}

#[derive(Default)]
pub struct PendingCalls {
    waiters: Mutex<HashMap<Token, oneshot::Sender<Result<Value, RemoteError>>>>,
}

impl PendingCalls {
    pub fn new() -> Self {
        Self::default()
    }

    fn waiters(&self) -> MutexGuard<'_, HashMap<Token, oneshot::Sender<Result<Value, RemoteError>>>> {
        // handler のパニックでロックが poison されてもマップ自体は壊れていない
        self.waiters.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start waiting for `token`. Must happen before the envelope is sent.
    pub fn register(self: &Arc<Self>, token: Token) -> PendingReply {
        let (tx, rx) = oneshot::channel();
        self.waiters().insert(token.clone(), tx);
        PendingReply {
            token,
            rx,
            pending: Arc::clone(self),
        }
    }

    /// Hand a reply to whoever waits on its token.
    ///
    /// Returns `false` when nobody does (abandoned, timed out, or never issued).
    pub fn resolve(&self, reply: WireReply) -> bool {
        let Some(tx) = self.waiters().remove(&reply.token) else {
            return false;
        };
        tx.send(reply.outcome).is_ok()
    }

    /// Drop every waiter; their `recv()` fails with `ConnectionClosed`.
    pub fn close_all(&self) {
        self.waiters().clear();
    }

    pub fn len(&self) -> usize {
        self.waiters().len()
    }

    pub fn is_empty(&self) -> bool {
        self.waiters().is_empty()
    }

    fn forget(&self, token: &Token) {
        self.waiters().remove(token);
    }
}

/// One outstanding call. Dropping it abandons the call.
pub struct PendingReply {
    token: Token,
    rx: oneshot::Receiver<Result<Value, RemoteError>>,
    pending: Arc<PendingCalls>,
}

impl PendingReply {
    pub fn token(&self) -> &Token {
        &self.token
    }

    pub async fn recv(mut self) -> Result<Result<Value, RemoteError>, CallError> {
        (&mut self.rx).await.map_err(|_| CallError::ConnectionClosed)
    }
}

impl Drop for PendingReply {
    fn drop(&mut self) {
        self.pending.forget(&self.token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ok_reply(token: &str, v: Value) -> WireReply {
        WireReply {
            token: Token::from(token),
            outcome: Ok(v),
        }
    }

    #[tokio::test]
    async fn resolve_routes_by_token() {
        let pending = Arc::new(PendingCalls::new());
        let a = pending.register(Token::from("a"));
        let b = pending.register(Token::from("b"));
        assert_eq!(pending.len(), 2);

        assert!(pending.resolve(ok_reply("b", json!(2))));
        assert!(pending.resolve(ok_reply("a", json!(1))));

        assert_eq!(a.recv().await.unwrap(), Ok(json!(1)));
        assert_eq!(b.recv().await.unwrap(), Ok(json!(2)));
        assert!(pending.is_empty());
    }

    #[test]
    fn resolve_without_waiter_is_reported() {
        let pending = PendingCalls::new();
        assert!(!pending.resolve(ok_reply("nobody", json!(null))));
    }

    #[test]
    fn dropping_the_waiter_abandons_the_call() {
        let pending = Arc::new(PendingCalls::new());
        let reply = pending.register(Token::from("t"));
        assert_eq!(pending.len(), 1);

        drop(reply);
        assert!(pending.is_empty());
        assert!(!pending.resolve(ok_reply("t", json!(1))));
    }

    #[tokio::test]
    async fn close_all_fails_waiters() {
        let pending = Arc::new(PendingCalls::new());
        let reply = pending.register(Token::from("t"));

        pending.close_all();
        assert!(matches!(reply.recv().await, Err(CallError::ConnectionClosed)));
    }

    #[tokio::test]
    async fn remote_errors_are_delivered_as_is() {
        let pending = Arc::new(PendingCalls::new());
        let reply = pending.register(Token::from("t"));

        let err = DispatchError::UnknownFunction("nope".to_string());
        pending.resolve(WireReply {
            token: Token::from("t"),
            outcome: Err(RemoteError::from(&err)),
        });

        let outcome = reply.recv().await.unwrap().unwrap_err();
        assert_eq!(outcome.kind, DispatchErrorKind::UnknownFunction);
        assert_eq!(outcome.handler_kind, None);
        assert_eq!(outcome.message, "unknown function: nope");
    }

    #[test]
    fn handler_failures_keep_their_classification() {
        let err = DispatchError::HandlerExecution {
            name: "store.put.v1".to_string(),
            source: crate::domain::HandlerError::transient("lock busy"),
        };
        let remote = RemoteError::from(&err);
        assert_eq!(remote.kind, DispatchErrorKind::HandlerExecution);
        assert_eq!(remote.handler_kind, Some(ErrorKind::Transient));

        let wire = serde_json::to_value(&remote).unwrap();
        assert_eq!(wire["handler_kind"], json!("transient"));
        assert_eq!(serde_json::from_value::<RemoteError>(wire).unwrap(), remote);
    }
}
