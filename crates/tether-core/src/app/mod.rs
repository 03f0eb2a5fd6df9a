//! App - アプリケーション層
//!
//! このモジュールは、typed と ports を組み合わせて呼び出しの両端を実装します。
//!
//! # 主要コンポーネント
//! - **ServiceBuilder**: receiver 側の構築とワイヤリング（起動時検証つき）
//! - **Dispatcher**: envelope を検証して Handler に振り分ける
//! - **Client / Caller**: caller 側。宣言を型付きの呼び出し関数にする（realize）
//! - **Config**: 起動時設定

pub mod builder;
pub mod caller;
pub mod config;
pub mod dispatcher;

// 主要な型を再エクスポート
pub use self::builder::{BuildError, ServiceBuilder};
pub use self::caller::{Caller, Client, realize};
pub use self::config::{ConfigError, LoopbackConfig, RegistryConfig, ReplyMode, TetherConfig};
pub use self::dispatcher::Dispatcher;
