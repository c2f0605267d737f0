//! Room-based WebSocket chat server.
//!
//! Clients connect to `/ws?room=<name>`, optionally authenticate with a bearer
//! token and exchange chat messages with the other members of their rooms.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin hiroba-server
//! cargo run --bin hiroba-server -- --host 0.0.0.0 --port 3000 --token secret-1=alice
//! HIROBA_JWT_SECRET=change-me cargo run --bin hiroba-server
//! ```

use std::{sync::Arc, time::Duration};

use clap::Parser;
use hiroba_server::{
    config::{EchoPolicy, HubConfig, PumpConfig, ServerConfig},
    domain::{AuthGate, Identity},
    infrastructure::{
        auth::{JwtAuthGate, StaticTokenAuthGate},
        history::InMemoryHistoryStore,
    },
    ui::Server,
    usecase::Hub,
};
use hiroba_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "hiroba-server")]
#[command(about = "Room-based WebSocket chat server", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, default_value = "8080")]
    port: u16,

    /// Room readable and writable without authentication
    #[arg(long, default_value = "public")]
    public_room: String,

    /// Number of history entries replayed on join and authenticate
    #[arg(long, default_value = "20")]
    history_limit: usize,

    /// Number of history entries kept per room; never below the history limit
    #[arg(long)]
    history_retention: Option<usize>,

    /// Capacity of each connection's outbound queue
    #[arg(long, default_value = "256")]
    queue_capacity: usize,

    /// Interval between heartbeat pings, in seconds
    #[arg(long, default_value = "30")]
    heartbeat_secs: u64,

    /// Drop connections that send nothing for this long, in seconds
    #[arg(long, default_value = "60")]
    read_timeout_secs: u64,

    /// Echo chat messages back to their sender
    #[arg(long)]
    echo_sender: bool,

    /// Shared secret for HS256 tokens; enables JWT authentication
    #[arg(long, env = "HIROBA_JWT_SECRET", hide_env_values = true)]
    jwt_secret: Option<String>,

    /// Static token in the form TOKEN=NAME (repeatable)
    #[arg(long = "token", value_name = "TOKEN=NAME", value_parser = parse_token)]
    tokens: Vec<(String, Identity)>,
}

fn parse_token(value: &str) -> Result<(String, Identity), String> {
    let (token, name) = value
        .split_once('=')
        .ok_or_else(|| format!("expected TOKEN=NAME, got '{}'", value))?;
    if token.is_empty() {
        return Err("token must not be empty".to_string());
    }
    let identity = Identity::new(name.to_string()).map_err(|e| e.to_string())?;
    Ok((token.to_string(), identity))
}

/// Entries the store keeps per room: `--history-retention`, or the replay limit
fn history_retention(args: &Args) -> usize {
    args.history_retention
        .unwrap_or(args.history_limit)
        .max(args.history_limit)
}

fn build_auth_gate(args: &Args) -> Arc<dyn AuthGate> {
    match &args.jwt_secret {
        Some(secret) => {
            tracing::info!("Authentication: HS256 signed tokens");
            Arc::new(JwtAuthGate::new(secret.as_bytes()))
        }
        None => {
            let gate = args
                .tokens
                .iter()
                .cloned()
                .fold(StaticTokenAuthGate::default(), |gate, (token, identity)| {
                    gate.with_token(token, identity)
                });
            tracing::info!("Authentication: {} static token(s)", gate.len());
            Arc::new(gate)
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();

    // 1. Configuration
    let hub_config = match HubConfig::default().with_public_room(args.public_room.clone()) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid --public-room '{}': {}", args.public_room, e);
            std::process::exit(2);
        }
    };
    let echo_policy = if args.echo_sender {
        EchoPolicy::IncludeSender
    } else {
        EchoPolicy::ExcludeSender
    };
    let hub_config = hub_config
        .with_history_limit(args.history_limit)
        .with_queue_capacity(args.queue_capacity)
        .with_echo_policy(echo_policy);
    let pump_config = PumpConfig::default()
        .with_heartbeat_interval(Duration::from_secs(args.heartbeat_secs.max(1)))
        .with_read_timeout(Duration::from_secs(args.read_timeout_secs.max(1)));
    let server_config = ServerConfig {
        host: args.host.clone(),
        port: args.port,
    };

    // 2. AuthGate / HistoryStore
    let auth_gate = build_auth_gate(&args);
    let history = Arc::new(InMemoryHistoryStore::new(history_retention(&args)));

    // 3. Hub
    tracing::info!(
        "Public room '{}', history limit {} (retention {}), queue capacity {}",
        hub_config.public_room,
        hub_config.history_limit,
        history.retention(),
        hub_config.queue_capacity
    );
    if hub_config.queue_capacity <= hub_config.history_limit {
        tracing::warn!(
            "Queue capacity {} leaves no room for a full replay of {} entries; replays will be truncated",
            hub_config.queue_capacity,
            hub_config.history_limit
        );
    }
    let hub = Arc::new(Hub::new(hub_config, auth_gate, history));

    // 4. Create and run the server
    let server = Server::new(hub, pump_config);
    if let Err(e) = server.run(&server_config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_token_pair() {
        // テスト項目: TOKEN=NAME 形式の引数がトークンと Identity に分解される
        // given (前提条件):
        let value = "12345=alice";

        // when (操作):
        let result = parse_token(value);

        // then (期待する結果):
        let (token, identity) = result.unwrap();
        assert_eq!(token, "12345");
        assert_eq!(identity.as_str(), "alice");
    }

    #[test]
    fn test_parse_token_rejects_missing_separator() {
        // テスト項目: '=' を含まない引数は拒否される
        // given (前提条件):
        let value = "12345";

        // when (操作):
        let result = parse_token(value);

        // then (期待する結果):
        assert!(result.is_err());
    }

    #[test]
    fn test_args_defaults() {
        // テスト項目: 引数なしで既定値が使われる
        // given (前提条件):
        let argv = ["hiroba-server"];

        // when (操作):
        let args = Args::try_parse_from(argv).unwrap();

        // then (期待する結果):
        assert_eq!(args.host, "127.0.0.1");
        assert_eq!(args.port, 8080);
        assert_eq!(args.public_room, "public");
        assert_eq!(args.history_limit, 20);
        assert_eq!(history_retention(&args), 20);
        assert!(!args.echo_sender);
        assert!(args.tokens.is_empty());
    }

    #[test]
    fn test_history_retention_is_at_least_the_limit() {
        // テスト項目: 履歴の保持件数は指定値を使い、再送上限を下回らない
        // given (前提条件):
        let longer = ["hiroba-server", "--history-limit", "10", "--history-retention", "50"];
        let shorter = ["hiroba-server", "--history-limit", "10", "--history-retention", "5"];

        // when (操作):
        let longer = Args::try_parse_from(longer).unwrap();
        let shorter = Args::try_parse_from(shorter).unwrap();

        // then (期待する結果):
        assert_eq!(history_retention(&longer), 50);
        assert_eq!(history_retention(&shorter), 10);
    }

    #[test]
    fn test_args_repeated_tokens() {
        // テスト項目: --token を複数指定できる
        // given (前提条件):
        let argv = [
            "hiroba-server",
            "--token",
            "t1=alice",
            "--token",
            "t2=bob",
        ];

        // when (操作):
        let args = Args::try_parse_from(argv).unwrap();

        // then (期待する結果):
        assert_eq!(args.tokens.len(), 2);
        assert_eq!(args.tokens[1].1.as_str(), "bob");
    }
}
