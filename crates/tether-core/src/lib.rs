//! tether-core
//!
//! Core building blocks for declaring remote-callable functions, dispatching
//! incoming calls and correlating replies with a caller-side token.
//!
//! # モジュール構成
//! - **domain**: wire の形（envelope, token, dispatch result, errors）
//! - **typed**: 型付き Call API（Call trait, Handler trait, Registry, codec）
//! - **ports**: 抽象化レイヤー（CallSender, TokenGenerator, Clock）
//! - **app**: 両端のロジック（ServiceBuilder, Dispatcher, Client/Caller, config）
//! - **impls**: 実装（LoopbackTransport など開発用）
//!
//! transport そのもの（ソケット、HTTP など）はこのクレートの外側の責務です。

pub mod app;
pub mod domain;
pub mod impls;
pub mod ports;
pub mod typed;

pub use app::{Caller, Client, Dispatcher, ServiceBuilder, realize};
pub use domain::{CallError, DispatchError, DispatchResult, Envelope, HandlerError, Token};
pub use typed::{Call, Handler, Registry, handler_fn};
