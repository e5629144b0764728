use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{info, warn};
use tokio::time::timeout;

use crate::limiter::RateLimiter;
use crate::registry::Registry;
use crate::stats::Stats;
use crate::transport::{DeliveryStatus, Transport};

/// Fans one alert out to every registered recipient. Recipients reported as
/// permanently unreachable during the pass are pruned from the registry in a
/// single batch afterwards; transient failures are logged and never retried
/// within the pass.
pub struct Dispatcher {
    registry: Arc<Registry>,
    transport: Arc<dyn Transport>,
    stats: Arc<Stats>,
    limiter: Mutex<RateLimiter>,
    delivery_timeout: Duration,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<Registry>,
        transport: Arc<dyn Transport>,
        stats: Arc<Stats>,
        max_per_minute: usize,
        delivery_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            transport,
            stats,
            limiter: Mutex::new(RateLimiter::new(max_per_minute)),
            delivery_timeout,
        }
    }

    /// A dropped alert (no recipients, or rate limit hit) is never queued or
    /// retried.
    pub async fn broadcast(&self, text: &str) {
        let recipients = self.registry.snapshot();
        if recipients.is_empty() {
            warn!("no subscribers, dropping alert");
            return;
        }
        if !self.limiter.lock().expect("limiter lock poisoned").admit() {
            warn!("per-minute notification limit reached, dropping alert");
            return;
        }

        let mut delivered: u64 = 0;
        let mut blocked: Vec<i64> = Vec::new();
        for id in recipients {
            match timeout(self.delivery_timeout, self.transport.deliver(id, text)).await {
                Ok(DeliveryStatus::Delivered) => delivered += 1,
                Ok(DeliveryStatus::Blocked) => blocked.push(id),
                Ok(DeliveryStatus::Failed(reason)) => {
                    warn!("delivery to {} failed: {}", id, reason);
                }
                Err(_) => warn!("delivery to {} timed out", id),
            }
        }

        // One batch removal, one persistence write, regardless of count.
        if !blocked.is_empty() {
            self.registry.remove_many(&blocked);
        }
        self.stats.add_notifications(delivered);
        // The window tracks broadcast passes, not per-recipient sends.
        self.limiter.lock().expect("limiter lock poisoned").record();
        info!("alert delivered to {} subscribers", delivered);
    }
}
