use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use log::info;
use tokio::sync::watch;
use tokio::time::{sleep, Duration};

use crate::classifier::Market;
use crate::config::Config;
use crate::registry::Registry;

/// Aggregate counters across all feed tasks. Per-pair counts live behind a
/// mutex keyed by (market, symbol); the global totals are plain atomics.
pub struct Stats {
    start_ts: i64,
    total_trades: AtomicU64,
    notifications_sent: AtomicU64,
    per_pair: Mutex<HashMap<(Market, String), u64>>,
}

impl Stats {
    pub fn new() -> Self {
        Self {
            start_ts: chrono::Utc::now().timestamp(),
            total_trades: AtomicU64::new(0),
            notifications_sent: AtomicU64::new(0),
            per_pair: Mutex::new(HashMap::new()),
        }
    }

    pub fn record_trade(&self, market: Market, symbol: &str) {
        self.total_trades.fetch_add(1, Ordering::Relaxed);
        let mut pairs = self.per_pair.lock().expect("stats lock poisoned");
        *pairs.entry((market, symbol.to_string())).or_insert(0) += 1;
    }

    pub fn add_notifications(&self, n: u64) {
        self.notifications_sent.fetch_add(n, Ordering::Relaxed);
    }

    pub fn total_trades(&self) -> u64 {
        self.total_trades.load(Ordering::Relaxed)
    }

    pub fn notifications_sent(&self) -> u64 {
        self.notifications_sent.load(Ordering::Relaxed)
    }

    pub fn pair_count(&self, market: Market, symbol: &str) -> u64 {
        let pairs = self.per_pair.lock().expect("stats lock poisoned");
        pairs.get(&(market, symbol.to_string())).copied().unwrap_or(0)
    }

    pub fn market_total(&self, market: Market) -> u64 {
        let pairs = self.per_pair.lock().expect("stats lock poisoned");
        pairs.iter().filter(|((m, _), _)| *m == market).map(|(_, c)| c).sum()
    }

    pub fn uptime_secs(&self) -> i64 {
        chrono::Utc::now().timestamp() - self.start_ts
    }
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}

/// Periodic read-only stats readout. Runs until shutdown is flagged.
pub async fn run_reporter(
    stats: Arc<Stats>,
    registry: Arc<Registry>,
    cfg: Config,
    mut shutdown: watch::Receiver<bool>,
) {
    let interval = Duration::from_secs(cfg.stats_interval_secs);
    loop {
        tokio::select! {
            _ = shutdown.changed() => return,
            _ = sleep(interval) => {}
        }
        info!(
            "=== stats === uptime={}s spot_trades={} futures_trades={} \
             notifications_sent={} subscribers={} min_notional=${:.0} pairs={}",
            stats.uptime_secs(),
            stats.market_total(Market::Spot),
            stats.market_total(Market::Futures),
            stats.notifications_sent(),
            registry.len(),
            cfg.min_notional,
            cfg.symbols.len(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_pair_and_totals_track_independently() {
        let stats = Stats::new();
        stats.record_trade(Market::Spot, "btcusdt");
        stats.record_trade(Market::Spot, "btcusdt");
        stats.record_trade(Market::Futures, "btcusdt");
        stats.record_trade(Market::Spot, "ethusdt");
        assert_eq!(stats.total_trades(), 4);
        assert_eq!(stats.pair_count(Market::Spot, "btcusdt"), 2);
        assert_eq!(stats.pair_count(Market::Futures, "btcusdt"), 1);
        assert_eq!(stats.market_total(Market::Spot), 3);
        assert_eq!(stats.market_total(Market::Futures), 1);
        assert_eq!(stats.pair_count(Market::Futures, "ethusdt"), 0);
    }

    #[test]
    fn notification_counter_accumulates() {
        let stats = Stats::new();
        stats.add_notifications(3);
        stats.add_notifications(2);
        assert_eq!(stats.notifications_sent(), 5);
    }
}
