//! The chat-platform contract consumed by the watchdog and moderation
//! features. The Discord adapter implements it for production; tests use
//! an in-memory mock.

use async_trait::async_trait;

use crate::types::{ChannelId, ChannelInfo, GroupId, GroupInfo, MessageId, Occupant, UserId};

/// Failure of a single platform call.
///
/// "Not found" is never an error: directory lookups return `None` or an
/// empty list instead, since entities can vanish at any time.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PlatformCallError {
    /// The bot lacks permission for this call.
    #[error("permission denied")]
    Forbidden,
    /// Transient API/network failure.
    #[error("call failed: {0}")]
    Failed(String),
}

/// Abstract chat platform: directory lookups, voice state, moderation
/// actions, and messaging.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// Groups the bot is currently a member of.
    async fn list_groups(&self) -> Vec<GroupInfo>;

    /// Resolve a group, or `None` if it no longer exists.
    async fn resolve_group(&self, group_id: GroupId) -> Option<GroupInfo>;

    /// Resolve a channel within a group.
    async fn channel_info(&self, group_id: GroupId, channel_id: ChannelId) -> Option<ChannelInfo>;

    /// All channels of a group (empty when the group is gone).
    async fn list_channels(&self, group_id: GroupId) -> Vec<ChannelInfo>;

    /// Find a text channel by exact name.
    async fn find_text_channel(&self, group_id: GroupId, name: &str) -> Option<ChannelId>;

    /// The voice channel a user currently occupies, if any.
    async fn current_voice_channel(&self, group_id: GroupId, user_id: UserId)
        -> Option<ChannelId>;

    /// Current occupants of a voice channel.
    async fn voice_occupants(&self, group_id: GroupId, channel_id: ChannelId) -> Vec<Occupant>;

    /// Force-disconnect a user from voice.
    async fn disconnect_occupant(
        &self,
        group_id: GroupId,
        user_id: UserId,
        reason: &str,
    ) -> Result<(), PlatformCallError>;

    /// Post a message to a channel.
    async fn post_message(&self, channel_id: ChannelId, text: &str)
        -> Result<(), PlatformCallError>;

    /// Delete a message from a channel.
    async fn delete_message(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
    ) -> Result<(), PlatformCallError>;

    /// Deny send-message permission for the group's default role on a
    /// channel.
    async fn deny_send_permission(
        &self,
        group_id: GroupId,
        channel_id: ChannelId,
        reason: &str,
    ) -> Result<(), PlatformCallError>;

    /// Send a direct message to a user.
    async fn dm_user(&self, user_id: UserId, text: &str) -> Result<(), PlatformCallError>;
}
