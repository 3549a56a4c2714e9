//! Discord REST API v10 client implementing the `ChatPlatform` contract.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use vigil_core::traits::{ChatPlatform, PlatformCallError};
use vigil_core::types::{
    ChannelId, ChannelInfo, ChannelKind, GroupId, GroupInfo, MessageId, Occupant, UserId,
};

use crate::cache::VoiceStateCache;
use crate::snowflake;

const API_BASE: &str = "https://discord.com/api/v10";

/// Permission bit for sending messages.
const SEND_MESSAGES: u64 = 1 << 11;

pub struct DiscordRest {
    token: String,
    client: reqwest::Client,
    cache: Arc<VoiceStateCache>,
}

impl DiscordRest {
    pub fn new(token: &str, cache: Arc<VoiceStateCache>) -> Self {
        Self {
            token: token.to_string(),
            client: reqwest::Client::new(),
            cache,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{API_BASE}{path}")
    }

    fn auth(&self) -> String {
        format!("Bot {}", self.token)
    }

    /// Send a request, mapping HTTP status to the call-error taxonomy:
    /// 403 is `Forbidden`, any other failure is `Failed`.
    async fn call(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, PlatformCallError> {
        let response = request
            .header("Authorization", self.auth())
            .send()
            .await
            .map_err(|e| PlatformCallError::Failed(format!("request failed: {e}")))?;

        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else if status == reqwest::StatusCode::FORBIDDEN {
            Err(PlatformCallError::Forbidden)
        } else {
            Err(PlatformCallError::Failed(format!("HTTP {status}")))
        }
    }

    /// Fetch a JSON body for a directory lookup; any failure reads as
    /// "not found".
    async fn fetch_json(&self, path: &str) -> Option<Value> {
        match self.call(self.client.get(self.url(path))).await {
            Ok(response) => response.json().await.ok(),
            Err(e) => {
                tracing::debug!(path, error = %e, "directory lookup failed");
                None
            }
        }
    }

    async fn fetch_channels(&self, group_id: GroupId) -> Vec<ChannelInfo> {
        let Some(body) = self.fetch_json(&format!("/guilds/{group_id}/channels")).await else {
            return Vec::new();
        };
        body.as_array()
            .map(|channels| channels.iter().filter_map(parse_channel).collect())
            .unwrap_or_default()
    }
}

/// Parse one channel object from the API.
pub(crate) fn parse_channel(value: &Value) -> Option<ChannelInfo> {
    Some(ChannelInfo {
        id: snowflake(&value["id"])?,
        name: value["name"].as_str().unwrap_or("").to_string(),
        kind: ChannelKind::from_discord(value["type"].as_i64().unwrap_or(-1)),
    })
}

/// Parse one guild object from the API.
pub(crate) fn parse_group(value: &Value) -> Option<GroupInfo> {
    Some(GroupInfo {
        id: snowflake(&value["id"])?,
        name: value["name"].as_str().unwrap_or("").to_string(),
    })
}

#[async_trait]
impl ChatPlatform for DiscordRest {
    async fn list_groups(&self) -> Vec<GroupInfo> {
        let Some(body) = self.fetch_json("/users/@me/guilds").await else {
            return Vec::new();
        };
        body.as_array()
            .map(|groups| groups.iter().filter_map(parse_group).collect())
            .unwrap_or_default()
    }

    async fn resolve_group(&self, group_id: GroupId) -> Option<GroupInfo> {
        let body = self.fetch_json(&format!("/guilds/{group_id}")).await?;
        parse_group(&body)
    }

    async fn channel_info(&self, group_id: GroupId, channel_id: ChannelId) -> Option<ChannelInfo> {
        self.fetch_channels(group_id).await.into_iter().find(|c| c.id == channel_id)
    }

    async fn list_channels(&self, group_id: GroupId) -> Vec<ChannelInfo> {
        self.fetch_channels(group_id).await
    }

    async fn find_text_channel(&self, group_id: GroupId, name: &str) -> Option<ChannelId> {
        self.fetch_channels(group_id)
            .await
            .into_iter()
            .find(|c| c.kind.is_textual() && c.name == name)
            .map(|c| c.id)
    }

    async fn current_voice_channel(
        &self,
        group_id: GroupId,
        user_id: UserId,
    ) -> Option<ChannelId> {
        self.cache.current(group_id, user_id)
    }

    async fn voice_occupants(&self, group_id: GroupId, channel_id: ChannelId) -> Vec<Occupant> {
        self.cache.occupants(group_id, channel_id)
    }

    async fn disconnect_occupant(
        &self,
        group_id: GroupId,
        user_id: UserId,
        reason: &str,
    ) -> Result<(), PlatformCallError> {
        let request = self
            .client
            .patch(self.url(&format!("/guilds/{group_id}/members/{user_id}")))
            .header("X-Audit-Log-Reason", reason)
            .json(&serde_json::json!({ "channel_id": null }));
        self.call(request).await.map(|_| ())
    }

    async fn post_message(
        &self,
        channel_id: ChannelId,
        text: &str,
    ) -> Result<(), PlatformCallError> {
        let request = self
            .client
            .post(self.url(&format!("/channels/{channel_id}/messages")))
            .json(&serde_json::json!({ "content": text }));
        self.call(request).await.map(|_| ())
    }

    async fn delete_message(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
    ) -> Result<(), PlatformCallError> {
        let request = self
            .client
            .delete(self.url(&format!("/channels/{channel_id}/messages/{message_id}")))
            .header("X-Audit-Log-Reason", "Vigil: filtered post");
        self.call(request).await.map(|_| ())
    }

    async fn deny_send_permission(
        &self,
        group_id: GroupId,
        channel_id: ChannelId,
        reason: &str,
    ) -> Result<(), PlatformCallError> {
        // The @everyone role shares the guild's id; type 0 = role overwrite.
        let request = self
            .client
            .put(self.url(&format!("/channels/{channel_id}/permissions/{group_id}")))
            .header("X-Audit-Log-Reason", reason)
            .json(&serde_json::json!({
                "type": 0,
                "allow": "0",
                "deny": SEND_MESSAGES.to_string(),
            }));
        self.call(request).await.map(|_| ())
    }

    async fn dm_user(&self, user_id: UserId, text: &str) -> Result<(), PlatformCallError> {
        let request = self
            .client
            .post(self.url("/users/@me/channels"))
            .json(&serde_json::json!({ "recipient_id": user_id.to_string() }));
        let response = self.call(request).await?;
        let body: Value = response
            .json()
            .await
            .map_err(|e| PlatformCallError::Failed(format!("bad DM channel response: {e}")))?;
        let channel_id = snowflake(&body["id"])
            .ok_or_else(|| PlatformCallError::Failed("DM channel without id".into()))?;
        self.post_message(channel_id, text).await
    }
}
