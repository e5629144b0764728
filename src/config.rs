use crate::error::MonitorError;

fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(default)
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

/// Log filter straight from the environment, so logging is up before the
/// full config parses and startup failures reach the log pipeline too.
pub fn initial_log_filter() -> log::LevelFilter {
    std::env::var("LOG_LEVEL").ok().and_then(|v| v.parse().ok()).unwrap_or(log::LevelFilter::Info)
}

#[derive(Clone, Debug)]
pub struct Config {
    pub symbols: Vec<String>,
    pub min_notional: f64,
    pub enable_spot: bool,
    pub enable_futures: bool,
    pub max_notifications_per_minute: usize,
    pub reconnect_delay_secs: u64,
    pub stats_interval_secs: u64,
    pub subscriber_poll_secs: u64,
    pub log_level: String,
    pub telegram_token: String,
    pub telegram_api_base: String,
    pub subscribers_path: String,
    pub spot_ws_base: String,
    pub futures_ws_base: String,
    pub delivery_timeout_secs: u64,
    pub update_batch_limit: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, MonitorError> {
        let token = match std::env::var("TELEGRAM_TOKEN") {
            Ok(t) if !t.is_empty() && t != "YOUR_TELEGRAM_BOT_TOKEN" => t,
            _ => return Err(MonitorError::Config("TELEGRAM_TOKEN is not set".into())),
        };
        let symbols: Vec<String> = std::env::var("SYMBOLS")
            .unwrap_or_else(|_| "btcusdt,ethusdt,bnbusdt,solusdt,dogeusdt,xrpusdt".to_string())
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();
        if symbols.is_empty() {
            return Err(MonitorError::Config("SYMBOLS resolved to an empty list".into()));
        }
        let cfg = Self {
            symbols,
            min_notional: env_parse("MIN_NOTIONAL", 1_000_000.0),
            enable_spot: env_bool("ENABLE_SPOT", true),
            enable_futures: env_bool("ENABLE_FUTURES", true),
            max_notifications_per_minute: env_parse("MAX_NOTIFICATIONS_PER_MINUTE", 10),
            reconnect_delay_secs: env_parse("RECONNECT_DELAY_SECS", 5),
            stats_interval_secs: env_parse("STATS_INTERVAL_SECS", 60),
            subscriber_poll_secs: env_parse("SUBSCRIBER_POLL_SECS", 300),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            telegram_token: token,
            telegram_api_base: std::env::var("TELEGRAM_API_BASE")
                .unwrap_or_else(|_| "https://api.telegram.org".to_string()),
            subscribers_path: std::env::var("SUBSCRIBERS_PATH")
                .unwrap_or_else(|_| "./subscribers.json".to_string()),
            spot_ws_base: std::env::var("BINANCE_WS_BASE")
                .unwrap_or_else(|_| "wss://stream.binance.com:9443".to_string()),
            futures_ws_base: std::env::var("BINANCE_FWS_BASE")
                .unwrap_or_else(|_| "wss://fstream.binance.com".to_string()),
            delivery_timeout_secs: env_parse("DELIVERY_TIMEOUT_SECS", 10),
            update_batch_limit: env_parse("UPDATE_BATCH_LIMIT", 100),
        };
        if cfg.min_notional <= 0.0 {
            return Err(MonitorError::Config(format!(
                "MIN_NOTIONAL must be positive, got {}",
                cfg.min_notional
            )));
        }
        if cfg.max_notifications_per_minute == 0 {
            return Err(MonitorError::Config(
                "MAX_NOTIFICATIONS_PER_MINUTE must be at least 1".into(),
            ));
        }
        Ok(cfg)
    }
}
