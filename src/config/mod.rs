use rust_decimal::Decimal;
use std::env;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_RPC_URL: &str = "https://api.mainnet-beta.solana.com";
const DEFAULT_MINT: &str = "DnUsQnwNot38V9JbisNC18VHZkae1eKK5N2Dgy55pump";
const DEFAULT_PRICE_API_URL: &str = "https://api.jup.ag/price/v2";

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Postgres connection string. When unset the service runs on an
    /// in-memory store and loses state on restart.
    pub database_url: Option<String>,
    pub host: String,
    pub port: u16,
    pub api_token: Option<String>,
    pub log_format: String,

    // Data source
    pub solana_rpc_url: String,
    pub token_mint: String,
    pub token_symbol: String,
    pub price_api_url: String,
    pub rpc_timeout_secs: u64,

    // Discovery
    pub whale_threshold: Decimal,
    pub discovery_interval_secs: u64,
    pub discovery_batch_size: usize,
    pub discovery_batch_delay_ms: u64,

    // Transaction monitor
    pub monitor_interval_secs: u64,
    pub monitor_top_n: i64,
    pub monitor_signature_limit: usize,
    pub min_transfer_amount: Decimal,

    // Alert engine
    pub alert_interval_secs: u64,
    pub snapshot_whale_limit: i64,
    pub price_ttl_secs: u64,
    pub metrics_broadcast_secs: u64,

    // Notification channels (each optional; unconfigured channels are skipped)
    pub notification_timeout_secs: u64,
    pub discord_webhook_url: Option<String>,
    pub slack_bot_token: Option<String>,
    pub slack_channel: String,
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub alert_webhook_url: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            host: "0.0.0.0".into(),
            port: 8080,
            api_token: None,
            log_format: "pretty".into(),

            solana_rpc_url: DEFAULT_RPC_URL.into(),
            token_mint: DEFAULT_MINT.into(),
            token_symbol: "CHONK9K".into(),
            price_api_url: DEFAULT_PRICE_API_URL.into(),
            rpc_timeout_secs: 15,

            whale_threshold: Decimal::from(100_000),
            discovery_interval_secs: 300,
            discovery_batch_size: 10,
            discovery_batch_delay_ms: 100,

            monitor_interval_secs: 15,
            monitor_top_n: 20,
            monitor_signature_limit: 5,
            min_transfer_amount: Decimal::from(10_000),

            alert_interval_secs: 30,
            snapshot_whale_limit: 100,
            price_ttl_secs: 60,
            metrics_broadcast_secs: 60,

            notification_timeout_secs: 10,
            discord_webhook_url: None,
            slack_bot_token: None,
            slack_channel: "#whale-alerts".into(),
            telegram_bot_token: None,
            telegram_chat_id: None,
            alert_webhook_url: None,
        }
    }
}

fn var_or(key: &str, default: String) -> String {
    env::var(key).unwrap_or(default)
}

/// Tuning knobs fall back to the default on a malformed value.
fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Empty values count as unset so `.env` placeholders don't enable a channel.
fn optional_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let d = Self::default();

        Ok(Self {
            database_url: optional_var("DATABASE_URL"),
            host: var_or("HOST", d.host),
            port: match env::var("PORT") {
                Ok(raw) => raw
                    .trim()
                    .parse()
                    .map_err(|e| anyhow::anyhow!("invalid PORT {raw:?}: {e}"))?,
                Err(_) => d.port,
            },
            api_token: optional_var("API_TOKEN"),
            log_format: var_or("LOG_FORMAT", d.log_format),

            solana_rpc_url: var_or("SOLANA_RPC_URL", d.solana_rpc_url),
            token_mint: var_or("TOKEN_MINT", d.token_mint),
            token_symbol: var_or("TOKEN_SYMBOL", d.token_symbol),
            price_api_url: var_or("PRICE_API_URL", d.price_api_url),
            rpc_timeout_secs: parse_or("RPC_TIMEOUT_SECS", d.rpc_timeout_secs),

            whale_threshold: parse_or("WHALE_THRESHOLD", d.whale_threshold),
            discovery_interval_secs: parse_or("DISCOVERY_INTERVAL_SECS", d.discovery_interval_secs),
            discovery_batch_size: parse_or("DISCOVERY_BATCH_SIZE", d.discovery_batch_size),
            discovery_batch_delay_ms: parse_or(
                "DISCOVERY_BATCH_DELAY_MS",
                d.discovery_batch_delay_ms,
            ),

            monitor_interval_secs: parse_or("MONITOR_INTERVAL_SECS", d.monitor_interval_secs),
            monitor_top_n: parse_or("MONITOR_TOP_N", d.monitor_top_n),
            monitor_signature_limit: parse_or("MONITOR_SIGNATURE_LIMIT", d.monitor_signature_limit),
            min_transfer_amount: parse_or("MIN_TRANSFER_AMOUNT", d.min_transfer_amount),

            alert_interval_secs: parse_or("ALERT_INTERVAL_SECS", d.alert_interval_secs),
            snapshot_whale_limit: parse_or("SNAPSHOT_WHALE_LIMIT", d.snapshot_whale_limit),
            price_ttl_secs: parse_or("PRICE_TTL_SECS", d.price_ttl_secs),
            metrics_broadcast_secs: parse_or("METRICS_BROADCAST_SECS", d.metrics_broadcast_secs),

            notification_timeout_secs: parse_or(
                "NOTIFICATION_TIMEOUT_SECS",
                d.notification_timeout_secs,
            ),
            discord_webhook_url: optional_var("DISCORD_WEBHOOK_URL"),
            slack_bot_token: optional_var("SLACK_BOT_TOKEN"),
            slack_channel: var_or("SLACK_CHANNEL", d.slack_channel),
            telegram_bot_token: optional_var("TELEGRAM_BOT_TOKEN"),
            telegram_chat_id: optional_var("TELEGRAM_CHAT_ID"),
            alert_webhook_url: optional_var("ALERT_WEBHOOK_URL"),
        })
    }

    pub fn discovery(&self) -> DiscoveryConfig {
        DiscoveryConfig {
            mint: self.token_mint.clone(),
            threshold: self.whale_threshold,
            batch_size: self.discovery_batch_size.max(1),
            batch_delay: Duration::from_millis(self.discovery_batch_delay_ms),
        }
    }

    pub fn monitor(&self) -> MonitorConfig {
        MonitorConfig {
            mint: self.token_mint.clone(),
            top_n: self.monitor_top_n.max(1),
            signature_limit: self.monitor_signature_limit,
            min_transfer_amount: self.min_transfer_amount,
        }
    }

    pub fn engine(&self) -> EngineConfig {
        EngineConfig {
            token_symbol: self.token_symbol.clone(),
            snapshot_whale_limit: self.snapshot_whale_limit.max(1),
        }
    }

    pub fn price_ttl(&self) -> Duration {
        Duration::from_secs(self.price_ttl_secs)
    }

    pub fn notification_timeout(&self) -> Duration {
        Duration::from_secs(self.notification_timeout_secs)
    }
}

// ---------------------------------------------------------------------------
// Per-component settings, derived from AppConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    pub mint: String,
    /// Minimum balance (inclusive) for an address to count as a whale.
    pub threshold: Decimal,
    pub batch_size: usize,
    pub batch_delay: Duration,
}

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub mint: String,
    pub top_n: i64,
    pub signature_limit: usize,
    /// Transfers must be strictly larger than this to be recorded.
    pub min_transfer_amount: Decimal,
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub token_symbol: String,
    pub snapshot_whale_limit: i64,
}
