//! Event and directory types shared between the gateway adapter and the
//! bot features.

/// Snowflake-style platform identifiers.
pub type GroupId = u64;
pub type ChannelId = u64;
pub type UserId = u64;
pub type MessageId = u64;

/// What kind of channel a directory entry is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Text,
    Voice,
    Stage,
    Forum,
    Other,
}

impl ChannelKind {
    /// Voice-capable channels are the only valid sweep targets.
    pub fn is_voice(self) -> bool {
        matches!(self, ChannelKind::Voice | ChannelKind::Stage)
    }

    /// Channels that carry text messages (mute targets).
    pub fn is_textual(self) -> bool {
        matches!(self, ChannelKind::Text | ChannelKind::Forum)
    }

    /// Map a Discord channel type code to a kind.
    pub fn from_discord(code: i64) -> Self {
        match code {
            0 | 5 => ChannelKind::Text,
            2 => ChannelKind::Voice,
            13 => ChannelKind::Stage,
            15 => ChannelKind::Forum,
            _ => ChannelKind::Other,
        }
    }
}

/// A resolved group (guild/server).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupInfo {
    pub id: GroupId,
    pub name: String,
}

/// A resolved channel within a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelInfo {
    pub id: ChannelId,
    pub name: String,
    pub kind: ChannelKind,
}

/// One participant currently inside a voice channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occupant {
    pub user_id: UserId,
    pub is_bot: bool,
}

/// A voice membership change for some participant.
///
/// `previous_channel`/`new_channel` are both `None` only for events that
/// carry no session change at all; equal ids mean an in-channel update
/// (mute toggle, stream start) rather than a move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoiceEvent {
    pub group_id: GroupId,
    pub user_id: UserId,
    pub previous_channel: Option<ChannelId>,
    pub new_channel: Option<ChannelId>,
}

/// A message posted to a text channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageEvent {
    pub group_id: GroupId,
    pub channel_id: ChannelId,
    pub message_id: MessageId,
    pub author_id: UserId,
    pub author_name: String,
    pub author_is_bot: bool,
    pub content: String,
}

/// A channel newly created in a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelCreatedEvent {
    pub group_id: GroupId,
    pub channel_id: ChannelId,
    pub name: String,
    pub kind: ChannelKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_voice_capable_kinds() {
        assert!(ChannelKind::Voice.is_voice());
        assert!(ChannelKind::Stage.is_voice());
        assert!(!ChannelKind::Text.is_voice());
        assert!(!ChannelKind::Forum.is_voice());
    }

    #[test]
    fn test_textual_kinds() {
        assert!(ChannelKind::Text.is_textual());
        assert!(ChannelKind::Forum.is_textual());
        assert!(!ChannelKind::Voice.is_textual());
    }

    #[test]
    fn test_discord_type_codes() {
        assert_eq!(ChannelKind::from_discord(0), ChannelKind::Text);
        assert_eq!(ChannelKind::from_discord(2), ChannelKind::Voice);
        assert_eq!(ChannelKind::from_discord(13), ChannelKind::Stage);
        assert_eq!(ChannelKind::from_discord(15), ChannelKind::Forum);
        assert_eq!(ChannelKind::from_discord(4), ChannelKind::Other);
    }
}
