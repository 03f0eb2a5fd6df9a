//! TokenGenerator port - 相関 token 生成の抽象化
//!
//! 応答を待つ呼び出しごとに、未完了の token と衝突しない token を生成します。
//! テスト容易性のために trait として抽象化しています。
//!
//! # 実装
//! - **UlidTokenGenerator**: ULID ベース（時刻でソート可能、Clock を差し替え可能）
//! - **SequenceTokenGenerator**: プロセスごとのランダム seed + 単調増加カウンタ
//!
//! # LazyToken
//! caller wrapper は token を先に作らず、`LazyToken` を send 関数に渡します。
//! `issue()` も `skip()` も self を消費するので、token は高々 1 回しか作られません。

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::domain::Token;
use crate::ports::Clock;
use ulid::Ulid;

/// TokenGenerator は一意な相関 token を生成
///
/// # Thread Safety
/// - `Send + Sync` を要求（複数タスクから使える）
pub trait TokenGenerator: Send + Sync {
    fn next_token(&self) -> Token;
}

/// UlidTokenGenerator は ULID ベースの token 生成器
///
/// 時刻部分は Clock から、残り 80 bit は乱数から作ります。
pub struct UlidTokenGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidTokenGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }
}

impl<C: Clock> TokenGenerator for UlidTokenGenerator<C> {
    fn next_token(&self) -> Token {
        let timestamp_ms = self.clock.now().timestamp_millis() as u64;
        let ulid = Ulid::from_parts(timestamp_ms, rand::random());
        Token::new(ulid.to_string())
    }
}

/// SequenceTokenGenerator はカウンタベースの token 生成器
///
/// 同じインスタンスから出る token は seed が同じでカウンタだけが進むので、
/// 同一プロセス内では絶対に衝突しません。seed は別プロセスとの区別用です。
pub struct SequenceTokenGenerator {
    seed: u64,
    next: AtomicU64,
}

impl SequenceTokenGenerator {
    pub fn new() -> Self {
        Self::with_seed(rand::random())
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            next: AtomicU64::new(0),
        }
    }

    /// Number of tokens handed out so far.
    pub fn issued(&self) -> u64 {
        self.next.load(Ordering::Relaxed)
    }
}

impl Default for SequenceTokenGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenGenerator for SequenceTokenGenerator {
    fn next_token(&self) -> Token {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        Token::new(format!("{:016x}-{:x}", self.seed, n))
    }
}

/// Deferred token, handed to the send function.
///
/// A send function that waits for a reply calls [`LazyToken::issue`]; a
/// fire-and-forget one calls [`LazyToken::skip`] and gets the empty sentinel.
pub struct LazyToken {
    generator: Arc<dyn TokenGenerator>,
}

impl LazyToken {
    pub fn new(generator: Arc<dyn TokenGenerator>) -> Self {
        Self { generator }
    }

    pub fn issue(self) -> Token {
        self.generator.next_token()
    }

    pub fn skip(self) -> Token {
        Token::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{FixedClock, SystemClock};
    use chrono::{TimeZone, Utc};
    use std::collections::HashSet;

    #[test]
    fn ulid_generator_generates_unique_tokens() {
        let token_gen = UlidTokenGenerator::new(SystemClock);

        let t1 = token_gen.next_token();
        let t2 = token_gen.next_token();

        assert_ne!(t1, t2);
        assert!(!t1.is_fire_and_forget());
    }

    #[test]
    fn ulid_generator_with_fixed_clock_shares_timestamp() {
        let fixed_time = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let token_gen = UlidTokenGenerator::new(FixedClock::new(fixed_time));

        let t1 = token_gen.next_token();
        let t2 = token_gen.next_token();

        // FixedClock でもランダム部分があるので token は異なる
        assert_ne!(t1, t2);

        let u1 = Ulid::from_string(t1.as_str()).unwrap();
        let u2 = Ulid::from_string(t2.as_str()).unwrap();
        assert_eq!(u1.timestamp_ms(), u2.timestamp_ms());
        assert_eq!(u1.timestamp_ms(), fixed_time.timestamp_millis() as u64);
    }

    #[test]
    fn sequence_generator_never_repeats() {
        let token_gen = SequenceTokenGenerator::with_seed(0xabcd);
        let tokens: HashSet<Token> = (0..1000).map(|_| token_gen.next_token()).collect();

        assert_eq!(tokens.len(), 1000);
        assert_eq!(token_gen.issued(), 1000);
        assert!(tokens.contains(&Token::from("000000000000abcd-0")));
    }

    #[test]
    fn sequence_generator_is_unique_across_threads() {
        let token_gen = Arc::new(SequenceTokenGenerator::new());
        let joins: Vec<_> = (0..4)
            .map(|_| {
                let token_gen = token_gen.clone();
                std::thread::spawn(move || {
                    (0..250).map(|_| token_gen.next_token()).collect::<Vec<_>>()
                })
            })
            .collect();

        let mut all = HashSet::new();
        for join in joins {
            all.extend(join.join().unwrap());
        }
        assert_eq!(all.len(), 1000);
    }

    #[test]
    fn lazy_token_skip_does_not_touch_generator() {
        let token_gen = Arc::new(SequenceTokenGenerator::with_seed(1));

        let token = LazyToken::new(token_gen.clone()).skip();
        assert!(token.is_fire_and_forget());
        assert_eq!(token_gen.issued(), 0);

        let token = LazyToken::new(token_gen.clone()).issue();
        assert!(!token.is_fire_and_forget());
        assert_eq!(token_gen.issued(), 1);
    }
}
