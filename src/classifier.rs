use std::sync::Arc;

use chrono::DateTime;
use num_format::{Locale, ToFormattedString};
use serde::Deserialize;

use crate::error::MonitorError;
use crate::stats::Stats;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Market {
    Spot,
    Futures,
}

impl Market {
    pub fn label(&self) -> &'static str {
        match self {
            Market::Spot => "SPOT",
            Market::Futures => "FUTURES",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Market::Spot => "\u{1F4B1}",  // 💱
            Market::Futures => "\u{1F4C8}", // 📈
        }
    }
}

/// Raw payload of a Binance `<symbol>@trade` frame. Only the fields the
/// classifier needs; everything else in the frame is ignored.
#[derive(Debug, Deserialize)]
pub struct RawTrade {
    #[serde(rename = "p")]
    pub price: String,
    #[serde(rename = "q")]
    pub qty: String,
    #[serde(rename = "T")]
    pub trade_time: i64,
    #[serde(rename = "m", default)]
    pub is_buyer_maker: bool,
}

#[derive(Debug, Clone)]
pub struct TradeEvent {
    pub symbol: String,
    pub market: Market,
    pub price: f64,
    pub qty: f64,
    pub is_buyer_maker: bool,
    pub event_time_ms: i64,
}

impl TradeEvent {
    pub fn from_raw(raw: &RawTrade, symbol: &str, market: Market) -> Result<Self, MonitorError> {
        Ok(Self {
            symbol: symbol.to_string(),
            market,
            price: raw.price.parse()?,
            qty: raw.qty.parse()?,
            is_buyer_maker: raw.is_buyer_maker,
            event_time_ms: raw.trade_time,
        })
    }

    pub fn notional(&self) -> f64 {
        self.price * self.qty
    }
}

const ASSET_EMOJIS: &[(&str, &str)] = &[
    ("BTC", "\u{20BF}"),
    ("ETH", "\u{39E}"),
    ("BNB", "\u{1F7E1}"),
    ("SOL", "\u{2600}\u{FE0F}"),
    ("DOGE", "\u{1F415}"),
    ("XRP", "\u{1F48E}"),
    ("DOT", "\u{1F517}"),
    ("NEAR", "\u{1F310}"),
];

fn asset_emoji(symbol: &str) -> &'static str {
    let upper = symbol.to_uppercase();
    for (asset, emoji) in ASSET_EMOJIS {
        if upper.contains(asset) {
            return emoji;
        }
    }
    "\u{1F4B1}"
}

/// Format a dollar value with thousands grouping and a fixed number of
/// decimal places, e.g. `format_usd(50123.5, 4)` -> "$50,123.5000".
fn format_usd(value: f64, decimals: usize) -> String {
    let rendered = format!("{:.*}", decimals, value);
    let (int_part, frac_part) = match rendered.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (rendered.as_str(), None),
    };
    let grouped = int_part
        .parse::<i64>()
        .map(|n| n.to_formatted_string(&Locale::en))
        .unwrap_or_else(|_| int_part.to_string());
    match frac_part {
        Some(f) => format!("${}.{}", grouped, f),
        None => format!("${}", grouped),
    }
}

/// Abbreviate a notional to K/M at the 1,000 / 1,000,000 thresholds.
pub fn format_notional(amount: f64) -> String {
    if amount >= 1_000_000.0 {
        format!("${:.2}M", amount / 1_000_000.0)
    } else if amount >= 1_000.0 {
        format!("${:.1}K", amount / 1_000.0)
    } else {
        format_usd(amount, 0)
    }
}

fn format_event_time(event_time_ms: i64) -> String {
    DateTime::from_timestamp_millis(event_time_ms)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| event_time_ms.to_string())
}

pub fn format_alert(event: &TradeEvent) -> String {
    let symbol_upper = event.symbol.to_uppercase();
    // "buyer is maker" means the sell side was aggressive.
    let direction = if event.is_buyer_maker {
        "\u{1F534} SELL"
    } else {
        "\u{1F7E2} BUY"
    };
    format!(
        "{market_emoji} <b>{market} {symbol}</b> {asset_emoji}\n\n\
         {direction}\n\
         \u{1F4B0} Amount: <b>{amount}</b>\n\
         \u{1F4B5} Price: <b>{price}</b>\n\
         \u{1F4CA} Quantity: <b>{qty:.6}</b>\n\
         \u{23F0} Time: <b>{time}</b>\n\n\
         \u{1F517} <a href=\"https://www.binance.com/en/trade/{symbol}\">Open Binance</a>",
        market_emoji = event.market.emoji(),
        market = event.market.label(),
        symbol = symbol_upper,
        asset_emoji = asset_emoji(&event.symbol),
        direction = direction,
        amount = format_notional(event.notional()),
        price = format_usd(event.price, 4),
        qty = event.qty,
        time = format_event_time(event.event_time_ms),
    )
}

/// Turns raw feed frames into alert text. Every decoded trade bumps the
/// per-pair and global counters whether or not it crosses the threshold.
pub struct Classifier {
    min_notional: f64,
    stats: Arc<Stats>,
}

impl Classifier {
    pub fn new(min_notional: f64, stats: Arc<Stats>) -> Self {
        Self { min_notional, stats }
    }

    pub fn classify(
        &self,
        raw: &str,
        symbol: &str,
        market: Market,
    ) -> Result<Option<String>, MonitorError> {
        let frame: RawTrade = serde_json::from_str(raw)?;
        let event = TradeEvent::from_raw(&frame, symbol, market)?;
        self.stats.record_trade(market, symbol);
        if event.notional() >= self.min_notional {
            Ok(Some(format_alert(&event)))
        } else {
            Ok(None)
        }
    }
}
