use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use super::{DeliveryStatus, Transport};

#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    ok: bool,
    #[serde(default)]
    result: Option<T>,
}

#[derive(Debug, Default, Deserialize)]
struct BotInfo {
    username: String,
}

#[derive(Debug, Deserialize)]
struct Update {
    message: Option<Message>,
}

#[derive(Debug, Deserialize)]
struct Message {
    from: Option<Sender>,
}

#[derive(Debug, Deserialize)]
struct Sender {
    id: i64,
}

/// Telegram Bot API client. The reqwest client carries a bounded timeout so
/// one slow recipient cannot stall a broadcast pass.
pub struct TelegramTransport {
    client: Client,
    base: String,
}

impl TelegramTransport {
    pub fn new(api_base: &str, token: &str, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("building telegram http client")?;
        Ok(Self {
            client,
            base: format!("{}/bot{}", api_base.trim_end_matches('/'), token),
        })
    }

    fn url(&self, method: &str) -> String {
        format!("{}/{}", self.base, method)
    }
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn verify_identity(&self) -> Result<String> {
        let resp = self.client.get(self.url("getMe")).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("getMe returned HTTP {}", status));
        }
        let body: ApiEnvelope<BotInfo> = resp.json().await?;
        match (body.ok, body.result) {
            (true, Some(info)) => Ok(info.username),
            _ => Err(anyhow!("getMe response not ok")),
        }
    }

    async fn fetch_inbound_senders(&self, limit: u32) -> Result<Vec<i64>> {
        let url = format!("{}?limit={}&timeout=1", self.url("getUpdates"), limit);
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("getUpdates returned HTTP {}", status));
        }
        let body: ApiEnvelope<Vec<Update>> = resp.json().await?;
        if !body.ok {
            return Err(anyhow!("getUpdates response not ok"));
        }
        let senders = body
            .result
            .unwrap_or_default()
            .into_iter()
            .filter_map(|u| u.message.and_then(|m| m.from).map(|s| s.id))
            .collect();
        Ok(senders)
    }

    async fn deliver(&self, recipient: i64, text: &str) -> DeliveryStatus {
        let payload = json!({
            "chat_id": recipient,
            "text": text,
            "parse_mode": "HTML",
            "disable_web_page_preview": true,
        });
        let resp = self.client.post(self.url("sendMessage")).json(&payload).send().await;
        match resp {
            Ok(resp) if resp.status().is_success() => DeliveryStatus::Delivered,
            // 403: the recipient blocked the bot. Permanent.
            Ok(resp) if resp.status() == reqwest::StatusCode::FORBIDDEN => {
                debug!("recipient {} blocked the bot", recipient);
                DeliveryStatus::Blocked
            }
            Ok(resp) => {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                DeliveryStatus::Failed(format!("HTTP {}: {}", status, body))
            }
            Err(e) => DeliveryStatus::Failed(e.to_string()),
        }
    }
}
