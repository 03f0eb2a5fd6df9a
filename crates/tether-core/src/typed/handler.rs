//! Handler trait - 宣言された Call を実行する Handler の定義
//!
//! # 学習ポイント
//! - ジェネリック trait (Handler<C, Ctx>)
//! - Object-safe trait (DynHandler<Ctx>)
//! - Type erasure パターン (TypedHandler<C, H> → DynHandler<Ctx>)

use super::call::{Call, Declaration};
use crate::domain::errors::{DispatchError, HandlerError};
use async_trait::async_trait;
use serde_json::Value;
use std::future::Future;
use std::marker::PhantomData;

/// Handler は検証済みの Input を受け取って Output を返す
///
/// `Ctx` は transport が渡す文脈（接続の識別子など）です。
///
/// # 使用例
/// ```ignore
/// struct AddHandler;
///
/// #[async_trait]
/// impl Handler<Add, PeerId> for AddHandler {
///     async fn handle(&self, _peer: PeerId, input: AddInput) -> Result<i64, HandlerError> {
///         Ok(input.a + input.b)
///     }
/// }
/// ```
#[async_trait]
pub trait Handler<C: Call, Ctx: Send + 'static>: Send + Sync {
    async fn handle(&self, ctx: Ctx, input: C::Input) -> Result<C::Output, HandlerError>;
}

/// Closure adapter, see [`handler_fn`].
pub struct FnHandler<F> {
    f: F,
}

/// Wrap an async closure `|ctx, input| async { ... }` as a [`Handler`].
pub fn handler_fn<F>(f: F) -> FnHandler<F> {
    FnHandler { f }
}

#[async_trait]
impl<C, Ctx, F, Fut> Handler<C, Ctx> for FnHandler<F>
where
    C: Call,
    Ctx: Send + 'static,
    F: Fn(Ctx, C::Input) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<C::Output, HandlerError>> + Send + 'static,
{
    async fn handle(&self, ctx: Ctx, input: C::Input) -> Result<C::Output, HandlerError> {
        (self.f)(ctx, input).await
    }
}

/// DynHandler は object-safe な Handler の抽象化
///
/// payload の検証 → handler 実行 → 出力のエンコード を 1 つにまとめ、
/// `HashMap<&str, Arc<dyn DynHandler<Ctx>>>` に格納できるようにします。
#[async_trait]
pub trait DynHandler<Ctx>: Send + Sync {
    async fn handle_dyn(&self, ctx: Ctx, payload: Value) -> Result<Value, DispatchError>;
    fn declaration(&self) -> Declaration;
}

pub struct TypedHandler<C: Call, H> {
    handler: H,
    _marker: PhantomData<C>,
}

impl<C: Call, H> TypedHandler<C, H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<C, H, Ctx> DynHandler<Ctx> for TypedHandler<C, H>
where
    C: Call,
    H: Handler<C, Ctx>,
    Ctx: Send + 'static,
{
    async fn handle_dyn(&self, ctx: Ctx, payload: Value) -> Result<Value, DispatchError> {
        let input = C::decode_input(payload).map_err(|detail| DispatchError::InputDecode {
            name: C::NAME.to_string(),
            detail,
        })?;

        let output = self.handler.handle(ctx, input).await.map_err(|source| {
            DispatchError::HandlerExecution {
                name: C::NAME.to_string(),
                source,
            }
        })?;

        C::validate_output(&output)
            .and_then(|()| super::codec::encode(&output))
            .map_err(|detail| DispatchError::OutputEncode {
                name: C::NAME.to_string(),
                detail,
            })
    }

    fn declaration(&self) -> Declaration {
        C::declaration()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typed::call::fixtures::{Abs, Add, AddInput};
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct AddHandler;

    #[async_trait]
    impl Handler<Add, ()> for AddHandler {
        async fn handle(&self, _ctx: (), input: AddInput) -> Result<i64, HandlerError> {
            Ok(input.a + input.b)
        }
    }

    #[tokio::test]
    async fn typed_handler_decodes_runs_and_encodes() {
        let typed = TypedHandler::<Add, _>::new(AddHandler);
        let out = typed.handle_dyn((), json!({"a": 1, "b": 2})).await.unwrap();
        assert_eq!(out, json!(3));
        assert_eq!(DynHandler::<()>::declaration(&typed).name, "math.add.v1");
    }

    #[tokio::test]
    async fn invalid_payload_never_reaches_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let typed = TypedHandler::<Add, _>::new(handler_fn(move |_ctx: (), input: AddInput| {
            seen.fetch_add(1, Ordering::SeqCst);
            async move { Ok::<_, HandlerError>(input.a + input.b) }
        }));

        let err = typed.handle_dyn((), json!({"a": "x"})).await.unwrap_err();
        assert!(matches!(err, DispatchError::InputDecode { ref name, .. } if name == "math.add.v1"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn handler_failure_is_propagated_with_cause() {
        let typed = TypedHandler::<Add, _>::new(handler_fn(|_ctx: (), _input: AddInput| async {
            Err::<i64, _>(HandlerError::new("overflow"))
        }));

        let err = typed.handle_dyn((), json!({"a": 1, "b": 2})).await.unwrap_err();
        match err {
            DispatchError::HandlerExecution { name, source } => {
                assert_eq!(name, "math.add.v1");
                assert_eq!(source.message(), "overflow");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn handler_sees_transport_context() {
        let typed = TypedHandler::<Add, _>::new(handler_fn(|peer: u32, input: AddInput| async move {
            Ok::<_, HandlerError>(input.a + input.b + i64::from(peer))
        }));

        let out = typed.handle_dyn(100u32, json!({"a": 1, "b": 2})).await.unwrap();
        assert_eq!(out, json!(103));
    }

    #[tokio::test]
    async fn output_validation_failure_is_reported() {
        let typed = TypedHandler::<Abs, _>::new(handler_fn(|_ctx: (), n: i64| async move { Ok::<_, HandlerError>(n) }));

        assert_eq!(typed.handle_dyn((), json!(5)).await.unwrap(), json!(5));
        let err = typed.handle_dyn((), json!(-5)).await.unwrap_err();
        assert!(matches!(err, DispatchError::OutputEncode { .. }));
    }
}
