//! Impls - ports の実装（開発用・テスト用）
//!
//! # 含まれる実装
//! - **LoopbackTransport**: プロセス内で caller と receiver をつなぐ transport
//! - **PendingCalls**: caller 側の token → resolver マップ
//!
//! # 本番用実装
//! ソケットや HTTP の transport は別クレートに置き、`CallSender` を実装して
//! 受信側で `Dispatcher::call` を呼びます。

pub mod loopback;
pub mod pending;

// 主要な型を再エクスポート
pub use self::loopback::{LoopbackSender, LoopbackTransport, ServeHandle};
pub use self::pending::{PendingCalls, PendingReply, RemoteError, WireReply};
