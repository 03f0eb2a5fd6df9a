//! Domain model (envelope, token, dispatch result, errors).
//!
//! transport やランタイムを仮定しない「形」だけを定義します。

pub mod envelope;
pub mod errors;
pub mod reply;
pub mod token;

pub use self::envelope::Envelope;
pub use self::errors::{CallError, DispatchError, DispatchErrorKind, ErrorKind, HandlerError};
pub use self::reply::DispatchResult;
pub use self::token::Token;
