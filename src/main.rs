use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{error, info, warn};
use tokio::sync::watch;
use tokio::task::JoinSet;

use whalewatch::classifier::{Classifier, Market};
use whalewatch::config::Config;
use whalewatch::dispatch::Dispatcher;
use whalewatch::feed::FeedConn;
use whalewatch::poller;
use whalewatch::registry::Registry;
use whalewatch::stats::{self, Stats};
use whalewatch::transport::telegram::TelegramTransport;
use whalewatch::transport::Transport;

#[tokio::main]
async fn main() -> Result<()> {
    // Logging first, so configuration failures are logged like everything else.
    env_logger::Builder::new()
        .filter_level(whalewatch::config::initial_log_filter())
        .init();

    let cfg = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("{}", e);
            return Err(e.into());
        }
    };

    info!(
        "starting whalewatch: threshold=${:.0} pairs={} spot={} futures={}",
        cfg.min_notional,
        cfg.symbols.len(),
        cfg.enable_spot,
        cfg.enable_futures
    );

    // Fail fast before any feed connection is opened.
    let transport: Arc<dyn Transport> = Arc::new(TelegramTransport::new(
        &cfg.telegram_api_base,
        &cfg.telegram_token,
        cfg.delivery_timeout_secs,
    )?);
    let bot = transport
        .verify_identity()
        .await
        .context("telegram identity check failed, verify TELEGRAM_TOKEN")?;
    info!("telegram transport verified: @{}", bot);

    let registry = Arc::new(Registry::load(cfg.subscribers_path.clone()));
    poller::poll_once(transport.as_ref(), &registry, cfg.update_batch_limit).await;
    if registry.is_empty() {
        warn!("no subscribers yet; send the bot a message to subscribe");
    }

    let stats = Arc::new(Stats::new());
    let classifier = Arc::new(Classifier::new(cfg.min_notional, stats.clone()));
    let dispatcher = Arc::new(Dispatcher::new(
        registry.clone(),
        transport.clone(),
        stats.clone(),
        cfg.max_notifications_per_minute,
        Duration::from_secs(cfg.delivery_timeout_secs),
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut tasks = JoinSet::new();
    let reconnect = Duration::from_secs(cfg.reconnect_delay_secs);
    for symbol in &cfg.symbols {
        if cfg.enable_spot {
            let conn = FeedConn::new(symbol, Market::Spot, &cfg.spot_ws_base, reconnect);
            tasks.spawn(conn.run(classifier.clone(), dispatcher.clone(), shutdown_rx.clone()));
        }
        if cfg.enable_futures {
            let conn = FeedConn::new(symbol, Market::Futures, &cfg.futures_ws_base, reconnect);
            tasks.spawn(conn.run(classifier.clone(), dispatcher.clone(), shutdown_rx.clone()));
        }
    }
    tasks.spawn(stats::run_reporter(
        stats.clone(),
        registry.clone(),
        cfg.clone(),
        shutdown_rx.clone(),
    ));
    tasks.spawn(poller::run(
        transport.clone(),
        registry.clone(),
        cfg.subscriber_poll_secs,
        cfg.update_batch_limit,
        shutdown_rx.clone(),
    ));
    drop(shutdown_rx);

    tokio::signal::ctrl_c().await.context("waiting for interrupt")?;
    info!("interrupt received, shutting down");
    let _ = shutdown_tx.send(true);
    // Stop accepting new work, then drain; in-flight deliveries finish under
    // their bounded timeout.
    while tasks.join_next().await.is_some() {}
    info!("all tasks stopped");
    Ok(())
}
