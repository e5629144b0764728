use std::sync::Arc;

use log::{debug, error, info};
use tokio::sync::watch;
use tokio::time::{sleep, Duration};

use crate::registry::Registry;
use crate::transport::Transport;

/// Fetch one batch of inbound senders and merge the new ones into the
/// registry (one persistence write per batch). A failed cycle is logged and
/// the next one runs at the normal interval.
pub async fn poll_once(transport: &dyn Transport, registry: &Registry, batch_limit: u32) {
    match transport.fetch_inbound_senders(batch_limit).await {
        Ok(senders) => {
            let added = registry.add_many(&senders);
            if added > 0 {
                info!("discovered {} new subscribers ({} total)", added, registry.len());
            } else {
                debug!("no new subscribers ({} total)", registry.len());
            }
        }
        Err(e) => error!("subscriber poll failed: {}", e),
    }
}

pub async fn run(
    transport: Arc<dyn Transport>,
    registry: Arc<Registry>,
    poll_interval_secs: u64,
    batch_limit: u32,
    mut shutdown: watch::Receiver<bool>,
) {
    let interval = Duration::from_secs(poll_interval_secs);
    loop {
        tokio::select! {
            _ = shutdown.changed() => return,
            _ = sleep(interval) => {}
        }
        poll_once(transport.as_ref(), registry.as_ref(), batch_limit).await;
    }
}
