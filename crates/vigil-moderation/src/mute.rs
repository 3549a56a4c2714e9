//! Notification mutes: deny @everyone send-message on a configured list
//! of channel names, both on channel creation and in a daily pass.

use chrono::{DateTime, Days, TimeZone, Utc};
use chrono_tz::Tz;
use std::sync::Arc;

use vigil_core::config::MuteConfig;
use vigil_core::traits::ChatPlatform;
use vigil_core::types::ChannelCreatedEvent;

const MUTE_REASON: &str = "Vigil: notification mute";

/// Applies send-message denies to the configured channel names.
pub struct NotificationMuter {
    platform: Arc<dyn ChatPlatform>,
    channel_names: Vec<String>,
    daily_hour: u32,
    tz: Tz,
    admin_user: u64,
}

impl NotificationMuter {
    pub fn new(
        platform: Arc<dyn ChatPlatform>,
        config: &MuteConfig,
        tz: Tz,
        admin_user: u64,
    ) -> Self {
        Self {
            platform,
            channel_names: config.channel_names.clone(),
            daily_hour: config.daily_hour % 24,
            tz,
            admin_user,
        }
    }

    /// Exact-name membership in the mute list.
    pub fn matches(&self, name: &str) -> bool {
        self.channel_names.iter().any(|n| n == name)
    }

    /// Mute a freshly created channel if it is on the list.
    pub async fn handle_channel_created(&self, event: &ChannelCreatedEvent) {
        if !self.matches(&event.name) || !event.kind.is_textual() {
            return;
        }
        match self
            .platform
            .deny_send_permission(event.group_id, event.channel_id, MUTE_REASON)
            .await
        {
            Ok(()) => {
                tracing::info!(
                    group = event.group_id,
                    channel = %event.name,
                    "muted newly created channel"
                );
                self.dm_admin(&format!(
                    "Auto-mute applied\nNew channel **#{}** had send-message denied for everyone.",
                    event.name
                ))
                .await;
            }
            Err(e) => {
                tracing::warn!(group = event.group_id, channel = %event.name, error = %e, "failed to mute new channel");
            }
        }
    }

    /// Walk every group and re-apply the deny to all listed channels.
    /// Returns how many channels were touched.
    pub async fn mute_pass(&self) -> usize {
        let mut applied = 0;
        for group in self.platform.list_groups().await {
            for channel in self.platform.list_channels(group.id).await {
                if !self.matches(&channel.name) || !channel.kind.is_textual() {
                    continue;
                }
                match self
                    .platform
                    .deny_send_permission(group.id, channel.id, MUTE_REASON)
                    .await
                {
                    Ok(()) => {
                        applied += 1;
                        tracing::info!(group = %group.name, channel = %channel.name, "notification mute applied");
                    }
                    Err(e) => {
                        tracing::warn!(group = %group.name, channel = %channel.name, error = %e, "failed to apply mute");
                    }
                }
            }
        }
        applied
    }

    /// Run the daily pass at the configured local hour, forever. Inert
    /// when the mute list is empty.
    pub async fn daily_loop(self: Arc<Self>) {
        if self.channel_names.is_empty() {
            return;
        }
        tracing::info!(hour = self.daily_hour, timezone = %self.tz, "daily mute pass scheduled");
        loop {
            let next = next_occurrence(Utc::now(), self.daily_hour, self.tz);
            let wait = (next - Utc::now()).to_std().unwrap_or_default();
            tokio::time::sleep(wait).await;

            let applied = self.mute_pass().await;
            tracing::info!(applied, "daily mute pass finished");
            self.dm_admin(&format!(
                "Daily mute pass complete\n{applied} channel(s) had notification mutes re-applied."
            ))
            .await;
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

/// The next wall-clock occurrence of `hour:00` in `tz`, strictly after
/// `now`. Skips days where the local time does not exist (DST gaps).
fn next_occurrence(now: DateTime<Utc>, hour: u32, tz: Tz) -> DateTime<Utc> {
    let mut day = now.with_timezone(&tz).date_naive();
    loop {
        if let Some(naive) = day.and_hms_opt(hour % 24, 0, 0) {
            if let Some(local) = tz.from_local_datetime(&naive).earliest() {
                let candidate = local.with_timezone(&Utc);
                if candidate > now {
                    return candidate;
                }
            }
        }
        day = day + Days::new(1);
    }
}
