use anyhow::Result;
use async_trait::async_trait;

pub mod telegram;

/// Outcome of a single delivery attempt. `Blocked` is the permanent-failure
/// signal: the recipient has blocked or removed the sender and should be
/// dropped from the registry. `Failed` covers transient trouble and is only
/// logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryStatus {
    Delivered,
    Blocked,
    Failed(String),
}

/// Boundary to the notification push API. The dispatcher, poller, and startup
/// identity check all go through this seam so tests can stand in a mock.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Verify the transport identity at startup. Returns a display name for
    /// logging; failure here is fatal before any feed connection opens.
    async fn verify_identity(&self) -> Result<String>;

    /// Fetch a bounded batch of recent inbound sender ids.
    async fn fetch_inbound_senders(&self, limit: u32) -> Result<Vec<i64>>;

    /// Deliver a text message to one recipient.
    async fn deliver(&self, recipient: i64, text: &str) -> DeliveryStatus;
}
