use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

use crate::config::{TelegramConfig, TelegramCredentials};
use crate::plugins::traits::NotifierPlugin;
use crate::utils::error::AppError;

pub struct TelegramNotifier {
    client: Client,
    endpoint: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(credentials: &TelegramCredentials, config: &TelegramConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}/bot{}/sendMessage",
                config.api_base.trim_end_matches('/'),
                credentials.bot_token
            ),
            chat_id: credentials.chat_id.clone(),
        })
    }

    fn create_payload(&self, text: &str) -> serde_json::Value {
        json!({
            "chat_id": self.chat_id,
            "text": text,
            "parse_mode": "Markdown"
        })
    }
}

#[async_trait]
impl NotifierPlugin for TelegramNotifier {
    fn name(&self) -> &'static str {
        "telegram"
    }

    async fn deliver(&self, text: &str) -> Result<(), AppError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&self.create_payload(text))
            .send()
            .await
            // the URL carries the bot token
            .map_err(|e| AppError::Transport(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Transport(format!("Telegram returned {}: {}", status, body.trim())));
        }

        Ok(())
    }
}
