use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use clap::Parser;
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use tether_core::app::{ReplyMode, TetherConfig};
use tether_core::impls::LoopbackTransport;
use tether_core::{Call, Client, Handler, HandlerError, ServiceBuilder, handler_fn};

#[derive(Debug, Parser)]
#[command(name = "tether", about = "Declared remote calls over an in-process loopback transport")]
struct Args {
    /// JSON config file (registry / loopback settings)
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, default_value_t = 1)]
    a: i64,

    #[arg(long, default_value_t = 2)]
    b: i64,

    #[arg(long, default_value = "tether")]
    name: String,

    /// Send every call fire-and-forget
    #[arg(long)]
    detached: bool,
}

/// 接続ごとの context（handler に渡される）
#[derive(Debug, Clone)]
struct Peer {
    id: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct AddInput {
    a: i64,
    b: i64,
}

struct Add;

impl Call for Add {
    const NAME: &'static str = "math.add.v1";
    type Input = AddInput;
    type Output = i64;
}

#[derive(Debug, Serialize, Deserialize)]
struct HelloInput {
    name: String,
}

struct Hello;

impl Call for Hello {
    const NAME: &'static str = "greet.hello.v1";
    type Input = HelloInput;
    type Output = String;
}

struct Audit;

impl Call for Audit {
    const NAME: &'static str = "audit.log.v1";
    type Input = String;
    type Output = ();
}

struct HelloHandler;

#[async_trait]
impl Handler<Hello, Peer> for HelloHandler {
    async fn handle(&self, peer: Peer, input: HelloInput) -> Result<String, HandlerError> {
        if input.name.is_empty() {
            return Err(HandlerError::new("name must not be empty"));
        }
        Ok(format!("Hello, {}! (from {})", input.name, peer.id))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    // (A) 設定を読む
    let mut config = match &args.config {
        Some(path) => TetherConfig::from_json_str(&std::fs::read_to_string(path)?)?,
        None => TetherConfig::default(),
    };
    if args.detached {
        config.loopback.reply_mode = ReplyMode::Detached;
    }

    // (B) receiver 側: 宣言と handler を登録して Dispatcher を作る
    let dispatcher = ServiceBuilder::from_config(&config.registry)
        .register::<Add, _>(handler_fn(|_peer: Peer, input: AddInput| async move {
            input
                .a
                .checked_add(input.b)
                .ok_or_else(|| HandlerError::new("overflow"))
        }))?
        .register::<Hello, _>(HelloHandler)?
        .register::<Audit, _>(handler_fn(|peer: Peer, line: String| async move {
            tracing::info!(peer = %peer.id, line = %line, "audit");
            Ok::<_, HandlerError>(())
        }))?
        .build()?;
    tracing::info!(calls = ?dispatcher.registry().names(), "registry sealed");

    // (C) transport をつなぐ
    let peer = Peer {
        id: "loopback-1".to_string(),
    };
    let (sender, handle) = LoopbackTransport::connect(dispatcher, peer, config.loopback.clone());
    let client = Client::new(Arc::new(sender.clone()));

    // (D) 呼び出し
    let sum = client
        .realize::<Add>()
        .call(AddInput {
            a: args.a,
            b: args.b,
        })
        .await;
    println!("{} -> {:?}", Add::NAME, sum);

    let greeting = client
        .realize::<Hello>()
        .call(HelloInput { name: args.name })
        .await;
    println!("{} -> {:?}", Hello::NAME, greeting);

    let audit = client
        .realize::<Audit>()
        .call("demo finished".to_string())
        .await;
    println!("{} -> {:?}", Audit::NAME, audit);

    // 存在しない名前の envelope は receiver 側で UnknownFunction になる
    sender
        .send_raw(serde_json::json!(["math.mul.v1", "", {"a": 1, "b": 2}]))
        .await?;

    // (E) 実行中の dispatch を待って止める
    handle.shutdown_and_join().await;
    Ok(())
}
