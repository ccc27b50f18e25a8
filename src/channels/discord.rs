use crate::channels::traits::{
    ChannelAdapter, ChannelInboundMessage, ChannelOutboundMessage, MessageTone,
};
use crate::config::DiscordConfig;
use crate::watch::{DeliverySink, IdentityResolver, ResolveError, SubscriberHandle, SubscriberId};
use async_trait::async_trait;
use base64::Engine;
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use std::collections::HashMap;
use tokio::sync::{Mutex, mpsc};
use tokio_tungstenite::tungstenite::Message;
use tracing::debug;

/// Embed colour for findings and confirmations.
const SUCCESS_COLOR: u32 = 0x0f_8000;

/// Embed colour for errors and rejections.
const FAILURE_COLOR: u32 = 0xc2_0000;

/// Discord rejects embed descriptions longer than this (in characters).
const EMBED_DESCRIPTION_LIMIT: usize = 4096;

/// Room kept free for the "and N more" trailer.
const OVERFLOW_RESERVE: usize = 32;

/// Discord adapter using the gateway websocket for commands and the REST API
/// for replies, direct messages and user lookups.
pub struct DiscordAdapter {
    bot_token: String,
    api_base: String,
    allowed_user_ids: Vec<String>,
    allowed_channel_ids: Vec<String>,
    client: reqwest::Client,
    dm_channels: Mutex<HashMap<SubscriberId, String>>,
}

impl DiscordAdapter {
    pub fn new(config: &DiscordConfig, bot_token: impl Into<String>) -> Self {
        Self {
            bot_token: bot_token.into(),
            api_base: config.api_base.trim_end_matches('/').to_owned(),
            allowed_user_ids: config.allowed_user_ids.clone(),
            allowed_channel_ids: config.allowed_channel_ids.clone(),
            client: reqwest::Client::new(),
            dm_channels: Mutex::new(HashMap::new()),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.api_base)
    }

    fn auth_header(&self) -> String {
        format!("Bot {}", self.bot_token)
    }

    fn is_user_allowed(&self, user_id: &str) -> bool {
        if self.allowed_user_ids.is_empty() {
            return false;
        }
        self.allowed_user_ids
            .iter()
            .any(|u| u == "*" || u.as_str() == user_id)
    }

    fn is_channel_allowed(&self, channel_id: &str) -> bool {
        if self.allowed_channel_ids.is_empty() {
            return true;
        }
        self.allowed_channel_ids
            .iter()
            .any(|c| c == "*" || c.as_str() == channel_id)
    }

    fn bot_user_id_from_token(token: &str) -> Option<String> {
        let first = token.split('.').next()?;
        let decoded = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(first)
            .ok()?;
        String::from_utf8(decoded).ok()
    }

    /// Turn a gateway dispatch into an inbound message, or `None` if it is
    /// not a user message the bot should see.
    fn inbound_from_event(
        &self,
        payload: &serde_json::Value,
        bot_user_id: &str,
    ) -> Option<ChannelInboundMessage> {
        let event_name = payload.get("t").and_then(serde_json::Value::as_str)?;
        if event_name != "MESSAGE_CREATE" {
            return None;
        }
        let data = payload.get("d")?;
        let author = data.get("author")?;

        let author_id = author
            .get("id")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default();
        if author_id.is_empty() || author_id == bot_user_id {
            return None;
        }
        let author_is_bot = author
            .get("bot")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false);
        if author_is_bot || !self.is_user_allowed(author_id) {
            return None;
        }

        let channel_id = data
            .get("channel_id")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default();
        if channel_id.is_empty() || !self.is_channel_allowed(channel_id) {
            return None;
        }

        let content = data
            .get("content")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default()
            .trim();
        if content.is_empty() {
            return None;
        }

        Some(ChannelInboundMessage {
            channel: self.id().to_owned(),
            sender: author_id.to_owned(),
            reply_target: channel_id.to_owned(),
            text: content.to_owned(),
        })
    }

    /// Id of the DM channel with `user`, opened on first use.
    async fn dm_channel(&self, user: &SubscriberId) -> anyhow::Result<String> {
        let mut cache = self.dm_channels.lock().await;
        if let Some(channel_id) = cache.get(user) {
            return Ok(channel_id.clone());
        }

        let response = self
            .client
            .post(self.endpoint("users/@me/channels"))
            .header("Authorization", self.auth_header())
            .json(&json!({ "recipient_id": user.as_str() }))
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("discord DM channel creation failed ({status}): {body}");
        }

        let body: serde_json::Value = response.json().await?;
        let channel_id = body
            .get("id")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| anyhow::anyhow!("discord DM channel response has no id"))?
            .to_owned();
        debug!(subscriber = %user, channel = %channel_id, "opened DM channel");
        cache.insert(user.clone(), channel_id.clone());
        Ok(channel_id)
    }

    async fn post_embed(&self, channel_id: &str, embed: serde_json::Value) -> anyhow::Result<()> {
        let response = self
            .client
            .post(self.endpoint(&format!("channels/{channel_id}/messages")))
            .header("Authorization", self.auth_header())
            .json(&json!({ "embeds": [embed] }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("discord send failed ({status}): {body}");
        }
        Ok(())
    }
}

/// Embed payload with the colour matching `tone`.
pub fn embed(title: &str, description: Option<&str>, tone: MessageTone) -> serde_json::Value {
    let color = match tone {
        MessageTone::Success => SUCCESS_COLOR,
        MessageTone::Failure => FAILURE_COLOR,
    };
    let mut embed = json!({ "title": title, "color": color });
    if let Some(description) = description {
        embed["description"] = json!(description);
    }
    embed
}

/// Bulleted list of item labels, cut short to fit an embed description.
pub fn findings_description(lines: &[String]) -> String {
    let mut out = String::new();
    let mut used = 0usize;

    for (index, line) in lines.iter().enumerate() {
        let entry = format!("- {line}");
        let cost = entry.chars().count() + usize::from(!out.is_empty());
        if used + cost > EMBED_DESCRIPTION_LIMIT - OVERFLOW_RESERVE {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(&format!("… and {} more", lines.len() - index));
            return out;
        }
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&entry);
        used += cost;
    }
    out
}

#[async_trait]
impl ChannelAdapter for DiscordAdapter {
    fn id(&self) -> &'static str {
        "discord"
    }

    async fn send(&self, message: ChannelOutboundMessage) -> anyhow::Result<()> {
        self.post_embed(
            &message.reply_target,
            embed(&message.text, None, message.tone),
        )
        .await
    }

    async fn run(&self, inbound_tx: mpsc::Sender<ChannelInboundMessage>) -> anyhow::Result<()> {
        if self.bot_token.trim().is_empty() {
            anyhow::bail!("discord bot token is empty");
        }

        let bot_user_id = Self::bot_user_id_from_token(&self.bot_token).unwrap_or_default();

        let gateway_resp: serde_json::Value = self
            .client
            .get(self.endpoint("gateway/bot"))
            .header("Authorization", self.auth_header())
            .send()
            .await?
            .json()
            .await?;

        let gateway_url = gateway_resp
            .get("url")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("wss://gateway.discord.gg");
        let ws_url = format!("{gateway_url}/?v=10&encoding=json");

        let (stream, _) = tokio_tungstenite::connect_async(&ws_url).await?;
        let (mut write, mut read) = stream.split();

        let hello = read
            .next()
            .await
            .ok_or_else(|| anyhow::anyhow!("no hello"))??;
        let hello_text = match hello {
            Message::Text(text) => text.to_string(),
            _ => anyhow::bail!("unexpected discord hello payload"),
        };
        let hello_json: serde_json::Value = serde_json::from_str(&hello_text)?;
        let heartbeat_interval_ms = hello_json
            .get("d")
            .and_then(|v| v.get("heartbeat_interval"))
            .and_then(serde_json::Value::as_u64)
            .unwrap_or(41_250);

        let identify = json!({
            "op": 2,
            "d": {
                "token": self.bot_token,
                // GUILDS | GUILD_MESSAGES | MESSAGE_CONTENT | DIRECT_MESSAGES
                "intents": 33281,
                "properties": {
                    "os": std::env::consts::OS,
                    "browser": "listwatch",
                    "device": "listwatch"
                }
            }
        });
        write.send(Message::Text(identify.to_string())).await?;
        tracing::info!("discord gateway connected");

        let mut heartbeat =
            tokio::time::interval(std::time::Duration::from_millis(heartbeat_interval_ms));

        loop {
            tokio::select! {
                _ = heartbeat.tick() => {
                    let beat = json!({"op": 1, "d": serde_json::Value::Null});
                    if write.send(Message::Text(beat.to_string())).await.is_err() {
                        anyhow::bail!("discord heartbeat failed");
                    }
                }
                maybe_msg = read.next() => {
                    let raw = match maybe_msg {
                        Some(Ok(Message::Text(text))) => text.to_string(),
                        Some(Ok(Message::Close(_))) | None => {
                            anyhow::bail!("discord websocket closed");
                        }
                        Some(Ok(_)) => continue,
                        Some(Err(err)) => anyhow::bail!("discord websocket error: {err}"),
                    };

                    let Ok(payload) = serde_json::from_str::<serde_json::Value>(&raw) else {
                        continue;
                    };
                    let Some(inbound) = self.inbound_from_event(&payload, &bot_user_id) else {
                        continue;
                    };
                    if inbound_tx.send(inbound).await.is_err() {
                        anyhow::bail!("discord inbound channel closed");
                    }
                }
            }
        }
    }

    async fn health_check(&self) -> anyhow::Result<bool> {
        if self.bot_token.trim().is_empty() {
            return Ok(false);
        }
        let response = self
            .client
            .get(self.endpoint("users/@me"))
            .header("Authorization", self.auth_header())
            .send()
            .await?;
        Ok(response.status().is_success())
    }
}

#[async_trait]
impl DeliverySink for DiscordAdapter {
    async fn notify(
        &self,
        subscriber: &SubscriberId,
        title: &str,
        lines: &[String],
    ) -> anyhow::Result<()> {
        let channel_id = self.dm_channel(subscriber).await?;
        let description = findings_description(lines);
        self.post_embed(
            &channel_id,
            embed(title, Some(&description), MessageTone::Success),
        )
        .await
    }

    async fn error(&self, subscriber: &SubscriberId, message: &str) -> anyhow::Result<()> {
        let channel_id = self.dm_channel(subscriber).await?;
        self.post_embed(
            &channel_id,
            embed("Download failed.", Some(message), MessageTone::Failure),
        )
        .await
    }
}

#[async_trait]
impl IdentityResolver for DiscordAdapter {
    async fn resolve(&self, id: &SubscriberId) -> Result<SubscriberHandle, ResolveError> {
        let response = self
            .client
            .get(self.endpoint(&format!("users/{id}")))
            .header("Authorization", self.auth_header())
            .send()
            .await
            .map_err(|e| ResolveError::Lookup(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ResolveError::NotFound(id.clone()));
        }
        if !status.is_success() {
            return Err(ResolveError::Lookup(format!("discord answered {status}")));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ResolveError::Lookup(e.to_string()))?;
        let display_name = body
            .get("global_name")
            .and_then(serde_json::Value::as_str)
            .or_else(|| body.get("username").and_then(serde_json::Value::as_str))
            .unwrap_or(id.as_str())
            .to_owned();

        Ok(SubscriberHandle {
            id: id.clone(),
            display_name,
        })
    }
}
