//! Caller - 宣言から型付きの呼び出し関数を作る（realize）
//!
//! # 流れ
//! 1. `C::Input` を Value にエンコード
//! 2. `CallSender::send(C::NAME, LazyToken, input)` を await
//! 3. 返ってきた Value を `C::Output` に戻す
//!
//! 応答の中身は検証しません（型への変換だけ）。応答を検証したいなら transport 側で行います。

use std::marker::PhantomData;
use std::sync::Arc;

use crate::domain::CallError;
use crate::ports::{CallSender, LazyToken, SequenceTokenGenerator, TokenGenerator};
use crate::typed::{Call, codec};

/// Client は送信関数と token 生成器を保持し、宣言ごとの Caller を作る
///
/// # 使用例
/// ```ignore
/// let client = Client::new(Arc::new(sender));
/// let add = client.realize::<Add>();
/// let sum = add.call(AddInput { a: 1, b: 2 }).await?;
/// ```
#[derive(Clone)]
pub struct Client {
    sender: Arc<dyn CallSender>,
    tokens: Arc<dyn TokenGenerator>,
}

impl Client {
    pub fn new(sender: Arc<dyn CallSender>) -> Self {
        Self::with_tokens(sender, Arc::new(SequenceTokenGenerator::new()))
    }

    pub fn with_tokens(sender: Arc<dyn CallSender>, tokens: Arc<dyn TokenGenerator>) -> Self {
        Self { sender, tokens }
    }

    pub fn realize<C: Call>(&self) -> Caller<C> {
        realize(self.sender.clone(), self.tokens.clone())
    }
}

/// Bind a declaration to a send function.
pub fn realize<C: Call>(sender: Arc<dyn CallSender>, tokens: Arc<dyn TokenGenerator>) -> Caller<C> {
    Caller {
        sender,
        tokens,
        _marker: PhantomData,
    }
}

/// Strongly-typed callable for one declaration.
pub struct Caller<C: Call> {
    sender: Arc<dyn CallSender>,
    tokens: Arc<dyn TokenGenerator>,
    _marker: PhantomData<C>,
}

impl<C: Call> Clone for Caller<C> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            tokens: self.tokens.clone(),
            _marker: PhantomData,
        }
    }
}

impl<C: Call> Caller<C> {
    pub fn name(&self) -> &'static str {
        C::NAME
    }

    /// Send `input` and wait for whatever the sender resolves to.
    ///
    /// `Ok(None)` means the sender did not wait for a reply.
    pub async fn call(&self, input: C::Input) -> Result<Option<C::Output>, CallError> {
        let input = codec::encode(&input).map_err(|detail| CallError::InputEncode {
            name: C::NAME.to_string(),
            detail,
        })?;

        let token = LazyToken::new(self.tokens.clone());
        let reply = self.sender.send(C::NAME, token, input).await?;

        reply
            .map(|raw| {
                codec::decode::<C::Output>(raw).map_err(|detail| CallError::OutputDecode {
                    name: C::NAME.to_string(),
                    detail,
                })
            })
            .transpose()
    }
}
