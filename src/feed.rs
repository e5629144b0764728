use std::sync::Arc;

use futures_util::StreamExt;
use log::{error, info, warn};
use tokio::sync::watch;
use tokio::time::{sleep, Duration};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use crate::classifier::{Classifier, Market};
use crate::dispatch::Dispatcher;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedState {
    Disconnected,
    Connecting,
    Streaming,
    Backoff,
}

/// One autonomous connection per (symbol, market) pair. Owned exclusively by
/// its own task; cycles Connecting -> Streaming -> Backoff forever, with no
/// terminal state short of process shutdown. A slow classifier only delays
/// the next read on this connection.
pub struct FeedConn {
    symbol: String,
    market: Market,
    url: String,
    reconnect_delay: Duration,
    state: FeedState,
}

impl FeedConn {
    pub fn new(symbol: &str, market: Market, ws_base: &str, reconnect_delay: Duration) -> Self {
        Self {
            symbol: symbol.to_string(),
            market,
            url: stream_url(ws_base, symbol),
            reconnect_delay,
            state: FeedState::Disconnected,
        }
    }

    pub fn state(&self) -> FeedState {
        self.state
    }

    pub async fn run(
        mut self,
        classifier: Arc<Classifier>,
        dispatcher: Arc<Dispatcher>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        loop {
            self.state = FeedState::Connecting;
            let connect = tokio::select! {
                _ = shutdown.changed() => return,
                c = connect_async(self.url.as_str()) => c,
            };
            match connect {
                Ok((mut ws, _)) => {
                    self.state = FeedState::Streaming;
                    info!("{} {} stream connected", self.market.label(), self.symbol);
                    loop {
                        let frame = tokio::select! {
                            _ = shutdown.changed() => return,
                            f = ws.next() => f,
                        };
                        match frame {
                            Some(Ok(Message::Text(text))) => {
                                self.handle_frame(&text, &classifier, &dispatcher).await;
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                warn!(
                                    "{} {} stream closed by peer",
                                    self.market.label(),
                                    self.symbol
                                );
                                break;
                            }
                            // Pings are answered by the stream itself.
                            Some(Ok(_)) => {}
                            Some(Err(e)) => {
                                error!(
                                    "{} {} stream error: {}",
                                    self.market.label(),
                                    self.symbol,
                                    e
                                );
                                break;
                            }
                        }
                    }
                }
                Err(e) => {
                    error!("{} {} connect failed: {}", self.market.label(), self.symbol, e);
                }
            }
            self.state = FeedState::Backoff;
            tokio::select! {
                _ = shutdown.changed() => return,
                _ = sleep(self.reconnect_delay) => {}
            }
        }
    }

    /// One bad frame is skipped; it never tears the connection down.
    async fn handle_frame(
        &self,
        text: &str,
        classifier: &Classifier,
        dispatcher: &Dispatcher,
    ) {
        match classifier.classify(text, &self.symbol, self.market) {
            Ok(Some(alert)) => dispatcher.broadcast(&alert).await,
            Ok(None) => {}
            Err(e) => {
                warn!(
                    "skipping bad frame on {} {}: {}",
                    self.market.label(),
                    self.symbol,
                    e
                );
            }
        }
    }
}

pub fn stream_url(ws_base: &str, symbol: &str) -> String {
    format!("{}/ws/{}@trade", ws_base.trim_end_matches('/'), symbol)
}
