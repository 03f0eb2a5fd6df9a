//! Typed - 型付き Call API
//!
//! このモジュールは呼び出し名の typo を型で排除し、
//! 宣言と Handler の対応付けを静的に保証します。
//!
//! # 二層構造
//! - **表層（Typed）**: `Call` trait, `Handler<C, Ctx>` trait - 型安全
//! - **内部（Dyn）**: `DynHandler<Ctx>` trait - object-safe, type erasure
//!
//! wire 上の payload は `serde_json::Value` のままで、型への変換は
//! `codec` を通して宣言の境界でだけ行います。

pub mod call;
pub mod codec;
pub mod handler;
pub mod registry;

// 主要な trait/型 を再エクスポート
pub use self::call::{Call, Declaration};
pub use self::codec::{Shape, ValidationErrors, ValidationIssue};
pub use self::handler::{DynHandler, FnHandler, Handler, TypedHandler, handler_fn};
pub use self::registry::{DuplicatePolicy, Registry, RegistryBuilder, RegistryError};
