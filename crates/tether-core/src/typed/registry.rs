//! Registry - Handler の登録と管理
//!
//! # 二段階構成
//! - **RegistryBuilder**: 初期化時に Handler を登録（mutable）
//! - **Registry**: `seal()` 後は読み取り専用（immutable）
//!
//! dispatch 中に Registry が変わることはないので、読み取りにロックは不要です。
//! 複数の worker で共有するときは `Arc<Registry<Ctx>>` で渡します。

use crate::typed::handler::TypedHandler;

use super::call::{Call, Declaration};
use super::handler::{DynHandler, Handler};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// 同じ名前が二度登録されたときの扱い
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// 二重登録はエラー（RegistryError::AlreadyRegistered）
    #[default]
    Reject,
    /// 後から登録したものが黙って勝つ
    Overwrite,
}

/// RegistryError は Registry 構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Handler for call '{0}' is already registered")]
    AlreadyRegistered(String),

    #[error("Invalid call name '{0}': names must be non-empty and contain no whitespace")]
    InvalidName(String),
}

/// RegistryBuilder は Handler を蓄積する
///
/// # 使用例
/// ```ignore
/// let mut builder = RegistryBuilder::new();
/// builder.register::<Add, _>(AddHandler)?;
/// let registry = builder.seal();
/// ```
pub struct RegistryBuilder<Ctx> {
    handlers: HashMap<&'static str, Arc<dyn DynHandler<Ctx>>>,
    policy: DuplicatePolicy,
}

impl<Ctx: Send + 'static> RegistryBuilder<Ctx> {
    pub fn new() -> Self {
        Self::with_policy(DuplicatePolicy::default())
    }

    pub fn with_policy(policy: DuplicatePolicy) -> Self {
        Self {
            handlers: HashMap::new(),
            policy,
        }
    }

    pub fn policy(&self) -> DuplicatePolicy {
        self.policy
    }

    /// `C::NAME` をキーに Handler を登録
    pub fn register<C: Call, H: Handler<C, Ctx> + 'static>(
        &mut self,
        handler: H,
    ) -> Result<&mut Self, RegistryError> {
        let name = C::NAME;
        if name.is_empty() || name.chars().any(char::is_whitespace) {
            return Err(RegistryError::InvalidName(name.to_string()));
        }
        if self.policy == DuplicatePolicy::Reject && self.handlers.contains_key(name) {
            return Err(RegistryError::AlreadyRegistered(name.to_string()));
        }
        let typed_handler = TypedHandler::<C, H>::new(handler);
        self.handlers.insert(name, Arc::new(typed_handler));
        Ok(self)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn registered_names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.handlers.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Freeze the builder. No entries can be added afterwards.
    pub fn seal(self) -> Registry<Ctx> {
        Registry {
            handlers: self.handlers,
        }
    }
}

impl<Ctx: Send + 'static> Default for RegistryBuilder<Ctx> {
    fn default() -> Self {
        Self::new()
    }
}

/// Registry は name → Handler の読み取り専用マップ
pub struct Registry<Ctx> {
    handlers: HashMap<&'static str, Arc<dyn DynHandler<Ctx>>>,
}

impl<Ctx: Send + 'static> Registry<Ctx> {
    pub fn builder() -> RegistryBuilder<Ctx> {
        RegistryBuilder::new()
    }

    /// Build a registry by running `loader` against a fresh builder, then seal it.
    ///
    /// # Example
    /// ```ignore
    /// let registry = Registry::load(DuplicatePolicy::Reject, |r| {
    ///     r.register::<Add, _>(AddHandler)?;
    ///     r.register::<Greet, _>(GreetHandler)?;
    ///     Ok(())
    /// })?;
    /// ```
    pub fn load<F>(policy: DuplicatePolicy, loader: F) -> Result<Self, RegistryError>
    where
        F: FnOnce(&mut RegistryBuilder<Ctx>) -> Result<(), RegistryError>,
    {
        let mut builder = RegistryBuilder::with_policy(policy);
        loader(&mut builder)?;
        Ok(builder.seal())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn DynHandler<Ctx>>> {
        self.handlers.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.handlers.keys().copied().collect();
        names.sort_unstable();
        names
    }

    pub fn declarations(&self) -> Vec<Declaration> {
        let mut decls: Vec<Declaration> =
            self.handlers.values().map(|h| h.declaration()).collect();
        decls.sort_unstable_by_key(|d| d.name);
        decls
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
