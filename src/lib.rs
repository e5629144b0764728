//! whalewatch: large-trade monitor for Binance spot and futures streams.
//!
//! One websocket task per (symbol, market) pair feeds a shared classifier;
//! trades at or above the configured notional threshold are broadcast to a
//! dynamic Telegram subscriber set, rate limited per minute and persisted
//! across restarts.

pub mod classifier;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod feed;
pub mod limiter;
pub mod poller;
pub mod registry;
pub mod stats;
pub mod transport;
