// ABOUTME: Boundary types and ports shared with chat adapters.
// ABOUTME: Incoming message shape, user identity, and the outbound send port.

use crate::chat_key::ChatKey;
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Identity of the chat user behind a message.
///
/// `platform` is accepted as `channel` when deserializing (the original
/// wire shape's word for it).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(alias = "channel")]
    pub platform: String,
}

impl UserInfo {
    pub fn new(id: impl Into<String>, platform: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: None,
            display_name: None,
            platform: platform.into(),
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Best human-readable label for replies and logs
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .or(self.username.as_deref())
            .unwrap_or(&self.id)
    }
}

/// Inbound message from a chat adapter
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    /// Which platform this message came from (e.g., "telegram", "discord")
    pub platform: String,
    /// Receiving bot identity, in multi-bot deployments
    pub bot_id: Option<String>,
    /// Peer id for DMs, group/channel id otherwise
    pub peer_id: String,
    /// Whether this arrived in a group/channel conversation
    pub is_group: bool,
    /// The user who sent the message
    pub sender: UserInfo,
    /// Message body (text content)
    pub body: String,
    /// Timestamp in seconds since Unix epoch
    pub timestamp: i64,
}

impl IncomingMessage {
    /// Canonical key for the conversation this message belongs to
    pub fn chat_key(&self) -> ChatKey {
        let key = if self.is_group {
            ChatKey::group(&self.platform, &self.peer_id)
        } else {
            ChatKey::direct(&self.platform, &self.peer_id)
        };
        match &self.bot_id {
            Some(bot) => key.with_bot(bot),
            None => key,
        }
    }
}

/// Outbound delivery port. Adapters own the wire protocol; the core only
/// hands them text addressed by chat key.
#[async_trait]
pub trait SendPort: Send + Sync {
    /// Fire-and-forget delivery to whichever platform owns the key
    async fn send(&self, chat_key: &ChatKey, text: &str) -> Result<()>;
}
