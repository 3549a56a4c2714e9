//! Machine-code channel filter: the designated channel accepts only
//! 8-character alphanumeric codes; everything else is removed and the
//! admin is notified by DM.

use regex::Regex;
use std::sync::{Arc, OnceLock};

use vigil_core::traits::{ChatPlatform, PlatformCallError};
use vigil_core::types::{ChannelId, MessageEvent, UserId};

/// Exact match on an 8-character ASCII alphanumeric code.
fn code_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-zA-Z0-9]{8}$").expect("static pattern"))
}

/// Is this message a well-formed machine code?
pub fn is_machine_code(content: &str) -> bool {
    code_pattern().is_match(content)
}

/// Deletes non-code posts from the code channel.
pub struct CodeFilter {
    platform: Arc<dyn ChatPlatform>,
    code_channel: ChannelId,
    admin_user: UserId,
}

impl CodeFilter {
    pub fn new(platform: Arc<dyn ChatPlatform>, code_channel: ChannelId, admin_user: UserId) -> Self {
        Self { platform, code_channel, admin_user }
    }

    /// Inspect one message and remove it if it does not belong.
    pub async fn handle_message(&self, message: &MessageEvent) {
        // Filter disabled.
        if self.code_channel == 0 {
            return;
        }
        if message.author_is_bot {
            return;
        }
        if message.channel_id != self.code_channel {
            return;
        }
        if is_machine_code(&message.content) {
            return;
        }

        match self.platform.delete_message(message.channel_id, message.message_id).await {
            Ok(()) => {
                tracing::info!(
                    channel = message.channel_id,
                    author = message.author_id,
                    "filtered a non-code post"
                );
                let notice = format!(
                    "Filter removed a post\nchannel: {}\nauthor: {} ({})\ncontent:\n```\n{}\n```",
                    message.channel_id, message.author_name, message.author_id, message.content
                );
                self.dm_admin(&notice).await;
            }
            Err(PlatformCallError::Forbidden) => {
                let notice = format!(
                    "Filter permission error\nCould not delete a post in channel {}.\nCheck the bot's manage-messages permission.\nauthor: {} ({})",
                    message.channel_id, message.author_name, message.author_id
                );
                self.dm_admin(&notice).await;
            }
            Err(PlatformCallError::Failed(e)) => {
                tracing::warn!(channel = message.channel_id, error = %e, "failed to delete post");
            }
        }
    }

    async fn dm_admin(&self, text: &str) {
        if self.admin_user == 0 {
            return;
        }
        if let Err(e) = self.platform.dm_user(self.admin_user, text).await {
            tracing::warn!(error = %e, "failed to DM admin");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_core::mock::MockPlatform;

    const CODE_CHANNEL: u64 = 50;
    const ADMIN: u64 = 9;

    fn message(channel_id: u64, content: &str, is_bot: bool) -> MessageEvent {
        MessageEvent {
            group_id: 1,
            channel_id,
            message_id: 777,
            author_id: 33,
            author_name: "poster".into(),
            author_is_bot: is_bot,
            content: content.into(),
        }
    }

    #[test]
    fn test_machine_code_pattern() {
        assert!(is_machine_code("abcd1234"));
        assert!(is_machine_code("AAAA0000"));
        assert!(!is_machine_code("abcd123"));
        assert!(!is_machine_code("abcd12345"));
        assert!(!is_machine_code("abcd-123"));
        assert!(!is_machine_code("abcd 123"));
        assert!(!is_machine_code(""));
        assert!(!is_machine_code("あいうえおかきく"));
    }

    #[tokio::test]
    async fn test_non_code_post_is_deleted_and_reported() {
        let mock = Arc::new(MockPlatform::new());
        let filter = CodeFilter::new(mock.clone(), CODE_CHANNEL, ADMIN);

        filter.handle_message(&message(CODE_CHANNEL, "hello there", false)).await;

        assert_eq!(mock.deleted(), vec![(CODE_CHANNEL, 777)]);
        let dms = mock.dms();
        assert_eq!(dms.len(), 1);
        assert_eq!(dms[0].0, ADMIN);
        assert!(dms[0].1.contains("hello there"));
    }

    #[tokio::test]
    async fn test_valid_code_is_kept() {
        let mock = Arc::new(MockPlatform::new());
        let filter = CodeFilter::new(mock.clone(), CODE_CHANNEL, ADMIN);

        filter.handle_message(&message(CODE_CHANNEL, "abcd1234", false)).await;

        assert!(mock.deleted().is_empty());
        assert!(mock.dms().is_empty());
    }

    #[tokio::test]
    async fn test_bots_and_other_channels_ignored() {
        let mock = Arc::new(MockPlatform::new());
        let filter = CodeFilter::new(mock.clone(), CODE_CHANNEL, ADMIN);

        filter.handle_message(&message(CODE_CHANNEL, "not a code", true)).await;
        filter.handle_message(&message(51, "not a code", false)).await;

        assert!(mock.deleted().is_empty());
    }

    #[tokio::test]
    async fn test_disabled_filter_is_inert() {
        let mock = Arc::new(MockPlatform::new());
        let filter = CodeFilter::new(mock.clone(), 0, ADMIN);

        filter.handle_message(&message(0, "anything", false)).await;

        assert!(mock.deleted().is_empty());
    }

    #[tokio::test]
    async fn test_forbidden_delete_notifies_admin() {
        let mock = Arc::new(MockPlatform::new());
        mock.set_forbidden_deletes(true);
        let filter = CodeFilter::new(mock.clone(), CODE_CHANNEL, ADMIN);

        filter.handle_message(&message(CODE_CHANNEL, "spam", false)).await;

        assert!(mock.deleted().is_empty());
        let dms = mock.dms();
        assert_eq!(dms.len(), 1);
        assert!(dms[0].1.contains("permission"));
    }

    #[tokio::test]
    async fn test_dm_failure_is_swallowed() {
        let mock = Arc::new(MockPlatform::new());
        mock.set_fail_dms(true);
        let filter = CodeFilter::new(mock.clone(), CODE_CHANNEL, ADMIN);

        // Must not panic or error out.
        filter.handle_message(&message(CODE_CHANNEL, "oops", false)).await;
        assert_eq!(mock.deleted().len(), 1);
    }
}
