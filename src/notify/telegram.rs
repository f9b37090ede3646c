use crate::error::ScoutError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const API_BASE: &str = "https://api.telegram.org";

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub enum ParseMode {
    #[serde(rename = "HTML")]
    Html,
}

/// Payload of a Bot API `sendMessage` call
#[derive(Debug, Clone, Serialize)]
pub struct OutgoingMessage {
    pub chat_id: String,
    pub text: String,
    pub parse_mode: ParseMode,
    pub disable_web_page_preview: bool,
}

/// Delivers a formatted message to a chat
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send(&self, message: &OutgoingMessage) -> Result<(), ScoutError>;
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    description: Option<String>,
}

/// Telegram Bot API client
pub struct TelegramBot {
    client: Client,
    endpoint: String,
}

impl TelegramBot {
    pub fn new(token: &str) -> Result<Self> {
        Self::with_base(API_BASE, token)
    }

    pub fn with_base(base: &str, token: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .context("Failed to create Telegram HTTP client")?;

        Ok(Self {
            client,
            endpoint: format!("{}/bot{}/sendMessage", base.trim_end_matches('/'), token),
        })
    }
}

#[async_trait]
impl Messenger for TelegramBot {
    async fn send(&self, message: &OutgoingMessage) -> Result<(), ScoutError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(message)
            .send()
            .await
            // The request URL embeds the bot token
            .map_err(|e| ScoutError::Delivery(e.without_url().to_string()))?;

        let status = response.status();
        let body: ApiResponse = response.json().await.map_err(|e| {
            ScoutError::Delivery(format!("unreadable response ({}): {}", status, e.without_url()))
        })?;

        if status.is_success() && body.ok {
            Ok(())
        } else {
            Err(ScoutError::Delivery(format!(
                "Telegram returned {}: {}",
                status,
                body.description.unwrap_or_default()
            )))
        }
    }
}
