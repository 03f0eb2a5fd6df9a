//! ServiceBuilder - receiver 側の構築とワイヤリング
//!
//! # 学習ポイント
//! - Builder パターンの実装
//! - 起動時検証（Fail-fast 設計）
//! - 開発体験の改善（明確なエラーメッセージ）

use std::sync::Arc;

use super::config::RegistryConfig;
use super::dispatcher::Dispatcher;
use crate::typed::{Call, DuplicatePolicy, Handler, RegistryBuilder, RegistryError};

/// ServiceBuilder は Registry を組み立てて Dispatcher を生成
///
/// # 使用例
/// ```ignore
/// let dispatcher = ServiceBuilder::new()
///     .register::<Add, _>(AddHandler)?
///     .expect_calls(&["math.add.v1"])
///     .build()?;
/// ```
///
/// # Fail-fast 設計
/// - expect_calls() で期待される呼び出し名を登録
/// - build() 時に「期待集合 ⊆ 登録済み集合」をチェック
/// - 不足があれば BuildError を返す
pub struct ServiceBuilder<Ctx> {
    registry: RegistryBuilder<Ctx>,
    expected_calls: Option<Vec<String>>,
}

/// BuildError は構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Missing calls: {0:?}. These calls were expected but not registered.")]
    MissingCalls(Vec<String>),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl<Ctx: Send + 'static> ServiceBuilder<Ctx> {
    pub fn new() -> Self {
        Self::with_policy(DuplicatePolicy::default())
    }

    pub fn with_policy(policy: DuplicatePolicy) -> Self {
        Self {
            registry: RegistryBuilder::with_policy(policy),
            expected_calls: None,
        }
    }

    /// 設定から構築（重複ポリシーと期待される呼び出し名）
    pub fn from_config(config: &RegistryConfig) -> Self {
        let builder = Self::with_policy(config.duplicate_policy);
        if config.expected_calls.is_empty() {
            return builder;
        }
        let expected: Vec<&str> = config.expected_calls.iter().map(String::as_str).collect();
        builder.expect_calls(&expected)
    }

    /// Handler を登録
    pub fn register<C: Call, H: Handler<C, Ctx> + 'static>(
        mut self,
        handler: H,
    ) -> Result<Self, RegistryError> {
        self.registry.register::<C, H>(handler)?;
        Ok(self)
    }

    /// 期待される呼び出し名のリストを設定
    pub fn expect_calls(mut self, names: &[&str]) -> Self {
        self.expected_calls = Some(names.iter().map(|n| n.to_string()).collect());
        self
    }

    /// 検証して Dispatcher を生成
    ///
    /// # 検証
    /// - expect_calls() で設定された名前が全て登録されているかチェック
    /// - 不足があれば BuildError::MissingCalls を返す
    pub fn build(self) -> Result<Dispatcher<Ctx>, BuildError> {
        if let Some(expected_calls) = &self.expected_calls {
            let missing: Vec<String> = expected_calls
                .iter()
                .filter(|name| !self.registry.contains(name))
                .cloned()
                .collect();
            if !missing.is_empty() {
                return Err(BuildError::MissingCalls(missing));
            }
        }
        Ok(Dispatcher::new(Arc::new(self.registry.seal())))
    }
}

impl<Ctx: Send + 'static> Default for ServiceBuilder<Ctx> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::HandlerError;
    use crate::typed::call::fixtures::{Add, AddInput, Greet};
    use crate::typed::handler_fn;

    fn add_handler() -> impl Handler<Add, ()> + 'static {
        handler_fn(|_ctx: (), input: AddInput| async move {
            Ok::<_, HandlerError>(input.a + input.b)
        })
    }

    #[test]
    fn test_build_success() {
        let dispatcher = ServiceBuilder::new()
            .register::<Add, _>(add_handler())
            .unwrap()
            .expect_calls(&[Add::NAME])
            .build();
        assert!(dispatcher.is_ok());
    }

    #[test]
    fn test_build_missing_calls() {
        let dispatcher = ServiceBuilder::new()
            .register::<Add, _>(add_handler())
            .unwrap()
            .expect_calls(&[Add::NAME, Greet::NAME])
            .build();
        assert!(matches!(
            dispatcher,
            Err(BuildError::MissingCalls(missing)) if missing == vec![Greet::NAME.to_string()]
        ));
    }

    #[test]
    fn test_build_no_expect_calls() {
        let dispatcher = ServiceBuilder::new()
            .register::<Add, _>(add_handler())
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(dispatcher.registry().names(), vec![Add::NAME]);
    }

    #[test]
    fn test_from_config() {
        let config = RegistryConfig {
            duplicate_policy: DuplicatePolicy::Overwrite,
            expected_calls: vec![Greet::NAME.to_string()],
        };

        let result = ServiceBuilder::from_config(&config)
            .register::<Add, _>(add_handler())
            .unwrap()
            .register::<Add, _>(add_handler())
            .unwrap()
            .build();
        assert!(matches!(result, Err(BuildError::MissingCalls(_))));
    }
}
