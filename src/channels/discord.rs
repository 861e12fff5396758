//! Discord adapter: REST forwarding and message payload conversion.
//!
//! Forwarding posts each content block as a single-embed message via
//! `POST /channels/{id}/messages`. Gateway ingress is not handled here;
//! `MESSAGE_CREATE` payloads from any transport are converted with
//! [`event_from_message`].

use std::collections::HashMap;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::RwLock;

use crate::error::ChannelError;
use crate::pipeline::{ContentBlock, Forwarder, InboundEvent};
use crate::rules::ChannelId;

/// Default REST API base.
pub const DISCORD_API_BASE: &str = "https://discord.com/api/v10";

/// Discord REST forwarder.
pub struct DiscordForwarder {
    bot_token: SecretString,
    api_base: String,
    client: reqwest::Client,
    /// Reachability per destination, learned on first lookup.
    reachable: RwLock<HashMap<ChannelId, bool>>,
}

impl DiscordForwarder {
    pub fn new(bot_token: SecretString) -> Self {
        Self::with_api_base(bot_token, DISCORD_API_BASE)
    }

    pub fn with_api_base(bot_token: SecretString, api_base: impl Into<String>) -> Self {
        Self {
            bot_token,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            reachable: RwLock::new(HashMap::new()),
        }
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path.trim_start_matches('/'))
    }

    fn auth_header(&self) -> String {
        format!("Bot {}", self.bot_token.expose_secret())
    }

    /// Fetch the bot's own user id (`GET /users/@me`).
    pub async fn fetch_self_id(&self) -> Result<u64, ChannelError> {
        let resp = self
            .client
            .get(self.api_url("users/@me"))
            .header(reqwest::header::AUTHORIZATION, self.auth_header())
            .send()
            .await
            .map_err(|e| ChannelError::StartupFailed {
                name: "discord".into(),
                reason: e.to_string(),
            })?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ChannelError::AuthFailed {
                name: "discord".into(),
                reason: "bot token rejected".into(),
            });
        }
        if !status.is_success() {
            return Err(ChannelError::StartupFailed {
                name: "discord".into(),
                reason: format!("users/@me returned {status}"),
            });
        }

        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| ChannelError::Http(e.to_string()))?;
        snowflake(body.get("id")).ok_or_else(|| {
            ChannelError::InvalidMessage("users/@me response has no id".into())
        })
    }

    /// `None` when the answer is transient: transport errors, rate limits
    /// and server errors.
    async fn lookup_channel(&self, destination: ChannelId) -> Option<bool> {
        let resp = self
            .client
            .get(self.api_url(&format!("channels/{destination}")))
            .header(reqwest::header::AUTHORIZATION, self.auth_header())
            .send()
            .await;

        let status = match resp {
            Ok(r) => r.status(),
            Err(e) => {
                tracing::warn!(destination = %destination, "Discord channel lookup failed: {e}");
                return None;
            }
        };

        match status {
            s if s.is_success() => Some(true),
            reqwest::StatusCode::FORBIDDEN | reqwest::StatusCode::NOT_FOUND => Some(false),
            s => {
                tracing::warn!(destination = %destination, status = %s, "Discord channel lookup inconclusive");
                None
            }
        }
    }
}

#[async_trait]
impl Forwarder for DiscordForwarder {
    fn name(&self) -> &str {
        "discord"
    }

    async fn is_reachable(&self, destination: ChannelId) -> bool {
        if let Some(&known) = self.reachable.read().await.get(&destination) {
            return known;
        }
        // Only definitive answers are cached; transient failures retry next event.
        match self.lookup_channel(destination).await {
            Some(found) => {
                self.reachable.write().await.insert(destination, found);
                found
            }
            None => false,
        }
    }

    async fn forward(
        &self,
        destination: ChannelId,
        block: &ContentBlock,
    ) -> Result<(), ChannelError> {
        let send_failed = |reason: String| ChannelError::SendFailed {
            name: "discord".into(),
            destination: destination.to_string(),
            reason,
        };

        let body = serde_json::json!({ "embeds": [block.to_payload()] });
        let resp = self
            .client
            .post(self.api_url(&format!("channels/{destination}/messages")))
            .header(reqwest::header::AUTHORIZATION, self.auth_header())
            .json(&body)
            .send()
            .await
            .map_err(|e| send_failed(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let err = resp.text().await.unwrap_or_default();
            return Err(send_failed(format!("{status}: {err}")));
        }

        tracing::debug!(destination = %destination, "Discord embed forwarded");
        Ok(())
    }
}

// ── Payload conversion ──────────────────────────────────────────────

/// Convert a Discord message object into an [`InboundEvent`].
///
/// Each embed becomes one content block carrying its full JSON. Returns
/// `None` when the channel or author id is missing.
pub fn event_from_message(message: &serde_json::Value) -> Option<InboundEvent> {
    let source_id = snowflake(message.get("channel_id"))?;
    let author_id = snowflake(message.get("author").and_then(|a| a.get("id")))?;

    let blocks = message
        .get("embeds")
        .and_then(serde_json::Value::as_array)
        .map(|embeds| embeds.iter().map(block_from_embed).collect())
        .unwrap_or_default();

    Some(InboundEvent {
        source_id: ChannelId(source_id),
        author_id,
        blocks,
    })
}

fn block_from_embed(embed: &serde_json::Value) -> ContentBlock {
    let text = |key: &str| embed.get(key).and_then(|v| v.as_str()).map(String::from);
    ContentBlock {
        title: text("title"),
        description: text("description"),
        url: text("url"),
        raw: embed.clone(),
    }
}

/// Discord ids arrive as strings; accept plain numbers too.
fn snowflake(value: Option<&serde_json::Value>) -> Option<u64> {
    match value? {
        serde_json::Value::String(s) => s.parse().ok(),
        serde_json::Value::Number(n) => n.as_u64(),
        _ => None,
    }
}
