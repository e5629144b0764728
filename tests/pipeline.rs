//! Classifier-to-dispatcher pipeline with a mock transport: threshold
//! filtering, alert formatting, and fan-out accounting end to end.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use whalewatch::classifier::{Classifier, Market};
use whalewatch::dispatch::Dispatcher;
use whalewatch::registry::Registry;
use whalewatch::stats::Stats;
use whalewatch::transport::{DeliveryStatus, Transport};

#[derive(Default)]
struct RecordingTransport {
    sent: Mutex<Vec<(i64, String)>>,
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn verify_identity(&self) -> Result<String> {
        Ok("recorder".to_string())
    }

    async fn fetch_inbound_senders(&self, _limit: u32) -> Result<Vec<i64>> {
        Ok(vec![])
    }

    async fn deliver(&self, recipient: i64, text: &str) -> DeliveryStatus {
        self.sent.lock().unwrap().push((recipient, text.to_string()));
        DeliveryStatus::Delivered
    }
}

fn trade_frame(price: &str, qty: &str, maker: bool) -> String {
    format!(
        r#"{{"e":"trade","E":1700000000100,"s":"BTCUSDT","t":42,"p":"{}","q":"{}","b":1,"a":2,"T":1700000000000,"m":{},"M":true}}"#,
        price, qty, maker
    )
}

struct Pipeline {
    registry: Arc<Registry>,
    transport: Arc<RecordingTransport>,
    stats: Arc<Stats>,
    classifier: Classifier,
    dispatcher: Dispatcher,
    _dir: tempfile::TempDir,
}

fn pipeline(min_notional: f64, subscribers: &[i64]) -> Pipeline {
    let dir = tempfile::tempdir().unwrap();
    let registry = Arc::new(Registry::new(dir.path().join("subscribers.json")));
    registry.add_many(subscribers);
    let transport = Arc::new(RecordingTransport::default());
    let stats = Arc::new(Stats::new());
    let classifier = Classifier::new(min_notional, stats.clone());
    let dispatcher = Dispatcher::new(
        registry.clone(),
        transport.clone(),
        stats.clone(),
        60,
        Duration::from_secs(1),
    );
    Pipeline { registry, transport, stats, classifier, dispatcher, _dir: dir }
}

async fn push(p: &Pipeline, raw: &str, symbol: &str, market: Market) {
    if let Ok(Some(alert)) = p.classifier.classify(raw, symbol, market) {
        p.dispatcher.broadcast(&alert).await;
    }
}

#[tokio::test]
async fn qualifying_trade_broadcasts_exactly_once_per_recipient() {
    let p = pipeline(1_000_000.0, &[10, 20]);
    // price=50000.00, qty=25.0 => notional 1,250,000
    push(&p, &trade_frame("50000.00", "25.0", false), "btcusdt", Market::Spot).await;

    let sent = p.transport.sent.lock().unwrap().clone();
    assert_eq!(sent.len(), 2);
    for (_, text) in &sent {
        assert!(text.contains("$1.25M"), "alert was: {}", text);
        assert!(text.contains("BUY"));
        assert!(text.contains("SPOT BTCUSDT"));
    }
    assert_eq!(p.stats.notifications_sent(), 2);
    assert_eq!(p.stats.pair_count(Market::Spot, "btcusdt"), 1);
}

#[tokio::test]
async fn below_threshold_trade_is_counted_but_silent() {
    let p = pipeline(1_000_000.0, &[10]);
    // notional 999,999: one counter tick, zero alerts
    push(&p, &trade_frame("999999.00", "1.0", false), "btcusdt", Market::Spot).await;

    assert!(p.transport.sent.lock().unwrap().is_empty());
    assert_eq!(p.stats.pair_count(Market::Spot, "btcusdt"), 1);
    assert_eq!(p.stats.notifications_sent(), 0);
}

#[tokio::test]
async fn threshold_is_inclusive() {
    let p = pipeline(1_000_000.0, &[10]);
    push(&p, &trade_frame("1000000.00", "1.0", true), "ethusdt", Market::Futures).await;

    let sent = p.transport.sent.lock().unwrap().clone();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].1.contains("SELL"));
    assert!(sent[0].1.contains("FUTURES ETHUSDT"));
}

#[tokio::test]
async fn bad_frame_is_skipped_without_broadcast() {
    let p = pipeline(1.0, &[10]);
    assert!(p.classifier.classify("{malformed", "btcusdt", Market::Spot).is_err());
    assert!(p.transport.sent.lock().unwrap().is_empty());
    assert_eq!(p.stats.total_trades(), 0);
}

#[tokio::test]
async fn mid_pass_additions_show_up_next_pass() {
    let p = pipeline(1.0, &[10]);
    push(&p, &trade_frame("100.0", "1.0", false), "btcusdt", Market::Spot).await;
    p.registry.add(20);
    push(&p, &trade_frame("100.0", "1.0", false), "btcusdt", Market::Spot).await;

    let sent = p.transport.sent.lock().unwrap().clone();
    let first_pass: Vec<i64> = sent.iter().take(1).map(|(id, _)| *id).collect();
    assert_eq!(first_pass, vec![10]);
    assert_eq!(sent.len(), 3);
    assert!(sent[1..].iter().any(|(id, _)| *id == 20));
}
