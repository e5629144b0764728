use thiserror::Error;

/// Typed errors for the paths that return them to a caller. Connection-level
/// trouble is consumed where it happens (the feed logs it and enters backoff),
/// and delivery outcomes travel as `DeliveryStatus` data, not errors.
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("bad trade payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("bad decimal in trade payload: {0}")]
    Numeric(#[from] std::num::ParseFloatError),

    #[error("invalid configuration: {0}")]
    Config(String),
}
