//! WhatsApp Business Cloud API transport.
//!
//! Outbound messages go through the Graph API `messages` endpoint.
//! Inbound messages arrive via webhook (HTTP POST) and are turned into
//! `IncomingMessage`s by [`parse_webhook_payload`].
//! Requires: Access Token + Phone Number ID from Meta Business Suite.

use async_trait::async_trait;
use subclaw_core::config::WhatsAppConfig;
use subclaw_core::error::{Result, SubClawError};
use subclaw_core::phone::{CONTACT_DOMAIN, identifier_digits, to_digits};
use subclaw_core::traits::ChatTransport;
use subclaw_core::types::IncomingMessage;

/// WhatsApp Business transport.
pub struct WhatsAppTransport {
    config: WhatsAppConfig,
    client: reqwest::Client,
}

impl WhatsAppTransport {
    pub fn new(config: WhatsAppConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/{}/messages",
            self.config.api_base.trim_end_matches('/'),
            self.config.phone_number_id
        )
    }

    /// Check the credentials against the phone number resource.
    /// Called once at startup; a failure here is fatal for the service.
    pub async fn verify(&self) -> Result<()> {
        if self.config.access_token.is_empty() {
            return Err(SubClawError::Config(
                "WhatsApp access_token not configured".into(),
            ));
        }
        if self.config.phone_number_id.is_empty() {
            return Err(SubClawError::Config(
                "WhatsApp phone_number_id not configured".into(),
            ));
        }

        let url = format!(
            "{}/{}",
            self.config.api_base.trim_end_matches('/'),
            self.config.phone_number_id
        );

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.config.access_token)
            .send()
            .await
            .map_err(|e| SubClawError::Channel(format!("WhatsApp verification failed: {e}")))?;

        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(SubClawError::Channel(format!(
                "WhatsApp token verification failed: {text}"
            )));
        }

        tracing::info!(
            "WhatsApp Business: connected (phone_id={})",
            self.config.phone_number_id
        );
        Ok(())
    }

    /// Send a text message via WhatsApp Cloud API. Returns the message id.
    async fn send_text_message(&self, to: &str, text: &str) -> Result<String> {
        let recipient = identifier_digits(to);
        let body = text_message_body(&recipient, text);

        let response = self
            .client
            .post(self.messages_url())
            .bearer_auth(&self.config.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| SubClawError::send(to, format!("WhatsApp API request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(SubClawError::send(
                to,
                format!("WhatsApp API error {status}: {error_text}"),
            ));
        }

        let result: serde_json::Value = response
            .json()
            .await
            .map_err(|e| SubClawError::send(to, format!("Invalid WhatsApp response: {e}")))?;

        let msg_id = result["messages"][0]["id"]
            .as_str()
            .unwrap_or("unknown")
            .to_string();

        tracing::debug!("WhatsApp message sent: {} → {}", msg_id, recipient);
        Ok(msg_id)
    }
}

#[async_trait]
impl ChatTransport for WhatsAppTransport {
    fn name(&self) -> &str {
        "whatsapp"
    }

    async fn send_message(&self, to: &str, text: &str) -> Result<()> {
        self.send_text_message(to, text).await?;
        Ok(())
    }
}

fn text_message_body(recipient_digits: &str, text: &str) -> serde_json::Value {
    serde_json::json!({
        "messaging_product": "whatsapp",
        "recipient_type": "individual",
        "to": recipient_digits,
        "type": "text",
        "text": {
            "preview_url": false,
            "body": text
        }
    })
}

/// Extract text messages from a Cloud API webhook notification.
///
/// Non-text messages and empty bodies are skipped. The Cloud API `from`
/// field already carries the country code, so it is only tagged with the
/// contact domain and never re-prefixed.
pub fn parse_webhook_payload(body: &serde_json::Value) -> Vec<IncomingMessage> {
    let mut out = Vec::new();
    let Some(entries) = body["entry"].as_array() else {
        return out;
    };
    for entry in entries {
        let Some(changes) = entry["changes"].as_array() else {
            continue;
        };
        for change in changes {
            let Some(messages) = change["value"]["messages"].as_array() else {
                continue;
            };
            for msg in messages {
                if msg["type"].as_str().unwrap_or("") != "text" {
                    continue;
                }
                let from = msg["from"].as_str().unwrap_or("");
                let text = msg["text"]["body"].as_str().unwrap_or("");
                if from.is_empty() || text.is_empty() {
                    continue;
                }
                let sender = format!("{}@{CONTACT_DOMAIN}", to_digits(from));
                out.push(IncomingMessage::new(sender, text));
            }
        }
    }
    out
}
