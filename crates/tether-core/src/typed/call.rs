//! Call trait - リモート呼び出し可能な関数の宣言
//!
//! # 学習ポイント
//! - Associated Constants (`const NAME`)
//! - Associated Types (`Input` / `Output`) で入出力の型を宣言に束ねる
//! - デフォルト実装付きの関数で検証をカスタマイズ可能にする

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::codec::{self, ValidationErrors};

/// Call は呼び出し名と入出力の型を対応付ける（caller と receiver が共有する契約）
///
/// # 使用例
/// ```ignore
/// pub struct Add;
///
/// impl Call for Add {
///     const NAME: &'static str = "math.add.v1";
///     type Input = AddInput;
///     type Output = i64;
/// }
/// ```
///
/// # 名前は明示的に
/// 名前は束縛された識別子から推測せず、`NAME` で明示します。
/// 型名を変えても wire 上の名前は変わりません。
///
/// # Trait Bounds
/// - `Input: Serialize`: caller 側で wire に載せるため
/// - `Input: DeserializeOwned`: receiver 側で payload から復元するため
/// - `Output` はその逆
pub trait Call: Send + Sync + 'static {
    /// 呼び出し名（Registry 内で一意）
    ///
    /// # 命名規約
    /// - `{domain}.{action}.v{major}`
    /// - 例: `math.add.v1`
    const NAME: &'static str;

    type Input: Serialize + DeserializeOwned + Send + 'static;
    type Output: Serialize + DeserializeOwned + Send + 'static;

    /// Decode an untyped payload into `Input`.
    ///
    /// Override to add checks beyond the structural ones serde performs.
    fn decode_input(raw: Value) -> Result<Self::Input, ValidationErrors> {
        codec::decode(raw)
    }

    /// Optional check applied to the handler's output before it leaves the dispatcher.
    fn validate_output(_output: &Self::Output) -> Result<(), ValidationErrors> {
        Ok(())
    }

    fn declaration() -> Declaration {
        Declaration {
            name: Self::NAME,
            input_type: std::any::type_name::<Self::Input>(),
            output_type: std::any::type_name::<Self::Output>(),
        }
    }
}

/// Runtime description of a declared call, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Declaration {
    pub name: &'static str,
    pub input_type: &'static str,
    pub output_type: &'static str,
}
