//! The sweep: disconnect every non-bot occupant of a voice channel and
//! report the tally.

use std::sync::Arc;

use vigil_core::traits::{ChatPlatform, PlatformCallError};
use vigil_core::types::{ChannelInfo, GroupInfo};

const DISCONNECT_REASON: &str = "Vigil: overnight sweep";

/// Outcome of one sweep. Ephemeral, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepResult {
    /// Occupants successfully disconnected.
    pub removed: usize,
    /// Whether the tally report reached the report channel.
    pub report_delivered: bool,
}

/// Executes sweeps against the chat platform. Failures of individual
/// calls are logged and absorbed; nothing escapes this boundary.
pub struct SweepExecutor {
    platform: Arc<dyn ChatPlatform>,
    report_channel: String,
}

impl SweepExecutor {
    pub fn new(platform: Arc<dyn ChatPlatform>, report_channel: impl Into<String>) -> Self {
        Self { platform, report_channel: report_channel.into() }
    }

    /// Disconnect all non-bot occupants of `channel`, then post the tally.
    pub async fn sweep(&self, group: &GroupInfo, channel: &ChannelInfo) -> SweepResult {
        let occupants = self.platform.voice_occupants(group.id, channel.id).await;
        let mut removed = 0;

        for occupant in occupants.iter().filter(|o| !o.is_bot) {
            match self
                .platform
                .disconnect_occupant(group.id, occupant.user_id, DISCONNECT_REASON)
                .await
            {
                Ok(()) => removed += 1,
                Err(PlatformCallError::Forbidden) => {
                    tracing::warn!(
                        group = %group.name,
                        channel = %channel.name,
                        "missing permission to disconnect an occupant"
                    );
                }
                Err(PlatformCallError::Failed(e)) => {
                    tracing::warn!(
                        group = %group.name,
                        channel = %channel.name,
                        error = %e,
                        "failed to disconnect an occupant"
                    );
                }
            }
        }

        let report_delivered = self.report(group, removed).await;
        SweepResult { removed, report_delivered }
    }

    /// Post the tally to the report channel. The report carries only the
    /// aggregate count; occupant identities never leave this module.
    async fn report(&self, group: &GroupInfo, removed: usize) -> bool {
        let Some(channel_id) =
            self.platform.find_text_channel(group.id, &self.report_channel).await
        else {
            tracing::info!(
                group = %group.name,
                channel = %self.report_channel,
                "report channel not found"
            );
            return false;
        };

        let text = format!(
            "Sleep-watch tally: **{removed}** occupant(s) disconnected tonight. Good night."
        );
        match self.platform.post_message(channel_id, &text).await {
            Ok(()) => true,
            Err(PlatformCallError::Forbidden) => {
                tracing::warn!(
                    group = %group.name,
                    channel = %self.report_channel,
                    "missing permission to post sweep report"
                );
                false
            }
            Err(PlatformCallError::Failed(e)) => {
                tracing::warn!(error = %e, "failed to post sweep report");
                false
            }
        }
    }
}
