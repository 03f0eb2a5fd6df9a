//! Ports - 抽象化レイヤー
//!
//! このモジュールは Hexagonal Architecture の「ポート」を定義します。
//! 送信手段（transport）、token 生成、時刻を trait として切り出し、
//! core をそれらの実装から独立させます。

pub mod clock;
pub mod sender;
pub mod token_generator;

// 主要な trait を再エクスポート
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::sender::CallSender;
pub use self::token_generator::{LazyToken, SequenceTokenGenerator, TokenGenerator, UlidTokenGenerator};
