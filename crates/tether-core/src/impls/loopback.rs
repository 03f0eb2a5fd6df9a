//! LoopbackTransport - 開発用・テスト用のプロセス内 transport
//!
//! caller 側と receiver 側を tokio の channel でつなぎ、
//! transport の契約（3-tuple の配送、token による応答のルーティング、
//! 空 token の応答破棄）を満たします。
//!
//! # 構成
//! - **LoopbackSender**: `CallSender` の実装。envelope を inbound channel に流す
//! - **serve loop**: envelope を受け取り、1 件ごとに dispatch タスクを起動する
//! - **reply router**: 応答を token で PendingCalls に振り分ける
//!
//! # 使用例
//! ```ignore
//! let (sender, handle) = LoopbackTransport::connect(dispatcher, ctx, LoopbackConfig::default());
//! let client = Client::new(Arc::new(sender));
//! let sum = client.realize::<Add>().call(AddInput { a: 1, b: 2 }).await?;
//! handle.shutdown_and_join().await;
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};

use super::pending::{PendingCalls, RemoteError, WireReply};
use crate::app::{Dispatcher, LoopbackConfig, ReplyMode};
use crate::domain::{CallError, DispatchErrorKind, Envelope};
use crate::ports::{CallSender, LazyToken};

pub struct LoopbackTransport;

impl LoopbackTransport {
    /// Spawn the receiver side and return the caller side.
    ///
    /// `ctx` is cloned into every dispatch.
    pub fn connect<Ctx>(
        dispatcher: Dispatcher<Ctx>,
        ctx: Ctx,
        config: LoopbackConfig,
    ) -> (LoopbackSender, ServeHandle)
    where
        Ctx: Clone + Send + Sync + 'static,
    {
        let capacity = config.channel_capacity.max(1);
        let (inbound_tx, inbound_rx) = mpsc::channel(capacity);
        let (reply_tx, reply_rx) = mpsc::channel(capacity);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let pending = Arc::new(PendingCalls::new());

        let serve = tokio::spawn(serve_loop(
            dispatcher,
            ctx,
            inbound_rx,
            reply_tx,
            shutdown_rx,
        ));
        let router = tokio::spawn(reply_router(reply_rx, pending.clone()));

        let sender = LoopbackSender {
            inbound: inbound_tx,
            pending,
            reply_mode: config.reply_mode,
            reply_timeout: config.reply_timeout(),
        };
        let handle = ServeHandle {
            shutdown_tx,
            joins: vec![serve, router],
        };
        (sender, handle)
    }
}

/// Caller side of the loopback transport.
#[derive(Clone)]
pub struct LoopbackSender {
    inbound: mpsc::Sender<Value>,
    pending: Arc<PendingCalls>,
    reply_mode: ReplyMode,
    reply_timeout: Option<Duration>,
}

impl LoopbackSender {
    /// Push an arbitrary value at the receiver, without correlation.
    pub async fn send_raw(&self, raw: Value) -> Result<(), CallError> {
        self.inbound
            .send(raw)
            .await
            .map_err(|_| CallError::ConnectionClosed)
    }

    /// Number of calls still waiting for a reply.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

#[async_trait]
impl CallSender for LoopbackSender {
    async fn send(
        &self,
        name: &'static str,
        token: LazyToken,
        input: Value,
    ) -> Result<Option<Value>, CallError> {
        if self.reply_mode == ReplyMode::Detached {
            let envelope = Envelope::new(name, token.skip(), input);
            self.send_raw(envelope.into_value()).await?;
            return Ok(None);
        }

        let token = token.issue();
        // 応答が先に届いても取りこぼさないよう、送信前に登録する
        let waiter = self.pending.register(token.clone());
        self.send_raw(Envelope::new(name, token.clone(), input).into_value())
            .await?;

        let outcome = match self.reply_timeout {
            Some(limit) => tokio::time::timeout(limit, waiter.recv())
                .await
                .map_err(|_| {
                    tracing::warn!(call = name, token = %token, "call timed out");
                    CallError::Timeout {
                        name: name.to_string(),
                        token: token.to_string(),
                    }
                })??,
            None => waiter.recv().await?,
        };

        outcome.map(Some).map_err(|err| CallError::Remote {
            name: name.to_string(),
            kind: err.kind,
            handler_kind: err.handler_kind,
            message: err.message,
        })
    }
}

/// Serve loop handle.
/// - `request_shutdown()` で新しい envelope の受け付けを止める
/// - `shutdown_and_join()` で実行中の dispatch の完了まで待てる
pub struct ServeHandle {
    shutdown_tx: watch::Sender<bool>,
    joins: Vec<JoinHandle<()>>,
}

impl ServeHandle {
    /// Stop accepting envelopes.
    ///
    /// Envelopes already queued and in-flight dispatches still finish and reply.
    pub fn request_shutdown(&self) {
        // ignore send error: the serve loop may already be gone
        let _ = self.shutdown_tx.send(true);
    }

    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        for j in self.joins {
            let _ = j.await;
        }
    }
}

async fn serve_loop<Ctx>(
    dispatcher: Dispatcher<Ctx>,
    ctx: Ctx,
    mut inbound: mpsc::Receiver<Value>,
    replies: mpsc::Sender<WireReply>,
    mut shutdown_rx: watch::Receiver<bool>,
) where
    Ctx: Clone + Send + Sync + 'static,
{
    let mut in_flight = JoinSet::new();

    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        let raw = tokio::select! {
            changed = shutdown_rx.changed() => {
                // ServeHandle が drop されたら止まる
                if changed.is_err() {
                    break;
                }
                continue;
            }
            Some(_) = in_flight.join_next(), if !in_flight.is_empty() => continue,
            raw = inbound.recv() => raw,
        };
        let Some(raw) = raw else {
            // caller 側が全部 drop された
            break;
        };

        in_flight.spawn(dispatch_one(
            dispatcher.clone(),
            ctx.clone(),
            raw,
            replies.clone(),
        ));
    }

    // 受け付けは止めるが、channel に入っている分は dispatch する
    inbound.close();
    while let Some(raw) = inbound.recv().await {
        in_flight.spawn(dispatch_one(
            dispatcher.clone(),
            ctx.clone(),
            raw,
            replies.clone(),
        ));
    }

    while in_flight.join_next().await.is_some() {}
    tracing::debug!("loopback serve loop stopped");
}

async fn dispatch_one<Ctx>(
    dispatcher: Dispatcher<Ctx>,
    ctx: Ctx,
    raw: Value,
    replies: mpsc::Sender<WireReply>,
) where
    Ctx: Send + 'static,
{
    // token がわからないと応答を返せないので、envelope は transport 側で先に読む
    let envelope = match Envelope::decode(raw) {
        Ok(envelope) => envelope,
        Err(err) => {
            tracing::warn!(error = %err, "dropping malformed envelope");
            return;
        }
    };

    let name = envelope.name.clone();
    let token = envelope.token.clone();
    tracing::debug!(call = %name, token = %token, "dispatching");

    // handler が panic しても caller には応答を返す
    let call = tokio::spawn(async move { dispatcher.call_envelope(ctx, envelope).await });
    let outcome = match call.await {
        Ok(Ok(res)) => Ok(res.result),
        Ok(Err(err)) => {
            tracing::warn!(call = %name, token = %token, error = %err, "dispatch failed");
            Err(RemoteError::from(&err))
        }
        Err(join_err) => {
            tracing::error!(call = %name, token = %token, error = %join_err, "handler aborted");
            Err(RemoteError {
                kind: DispatchErrorKind::HandlerExecution,
                handler_kind: None,
                message: format!("handler {name} aborted: {join_err}"),
            })
        }
    };

    if token.is_fire_and_forget() {
        tracing::trace!(call = %name, "no reply expected, discarding result");
        return;
    }

    if replies.send(WireReply { token, outcome }).await.is_err() {
        tracing::debug!(call = %name, "reply router gone, dropping reply");
    }
}

async fn reply_router(mut replies: mpsc::Receiver<WireReply>, pending: Arc<PendingCalls>) {
    while let Some(reply) = replies.recv().await {
        let token = reply.token.clone();
        if !pending.resolve(reply) {
            tracing::debug!(token = %token, "reply for abandoned call");
        }
    }
    // serve 側が止まった。まだ待っている呼び出しはもう応答を受け取れない
    pending.close_all();
}
