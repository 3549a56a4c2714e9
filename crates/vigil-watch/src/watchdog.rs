//! The delayed-action scheduler: turns qualifying departures of the
//! monitored participant into grace timers, and re-checks the world
//! before sweeping when a timer fires.

use std::sync::Arc;
use std::time::Duration;

use vigil_core::config::WatchConfig;
use vigil_core::traits::ChatPlatform;
use vigil_core::types::{UserId, VoiceEvent};

use crate::registry::{WatchKey, WatchRegistry};
use crate::sweep::{SweepExecutor, SweepResult};
use crate::window::ActiveWindow;

/// What happened when a watch fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchOutcome {
    /// The re-check passed and the channel was swept.
    Swept(SweepResult),
    /// The group vanished during the grace period.
    GroupGone,
    /// The channel vanished or is no longer voice-capable.
    ChannelGone,
    /// The monitored participant is back in the watched channel.
    HostReturned,
    /// The active window lapsed while waiting.
    WindowLapsed,
}

/// Watches the monitored participant's voice membership. A departure from
/// channel S during the active hours starts (or restarts) a grace timer
/// for S; when it fires, the channel is swept unless the participant
/// returned, the entities vanished, or the window lapsed in the meantime.
#[derive(Clone)]
pub struct VoiceWatchdog {
    platform: Arc<dyn ChatPlatform>,
    registry: Arc<WatchRegistry>,
    sweeper: Arc<SweepExecutor>,
    target_user_id: UserId,
    grace: Duration,
    window: ActiveWindow,
}

impl VoiceWatchdog {
    pub fn new(platform: Arc<dyn ChatPlatform>, config: &WatchConfig) -> Self {
        let window = ActiveWindow::with_timezone_name(
            config.active_start_hour,
            config.active_end_hour,
            &config.timezone,
        );
        Self::with_parts(
            platform,
            config.target_user_id,
            Duration::from_secs(config.grace_secs),
            window,
            &config.report_channel,
        )
    }

    /// Assemble a watchdog from explicit parts.
    pub fn with_parts(
        platform: Arc<dyn ChatPlatform>,
        target_user_id: UserId,
        grace: Duration,
        window: ActiveWindow,
        report_channel: &str,
    ) -> Self {
        Self {
            sweeper: Arc::new(SweepExecutor::new(platform.clone(), report_channel)),
            platform,
            registry: Arc::new(WatchRegistry::new()),
            target_user_id,
            grace,
            window,
        }
    }

    /// Number of grace timers currently counting down.
    pub fn pending_watches(&self) -> usize {
        self.registry.len()
    }

    /// Feed one membership-change event. Synchronous: decides and, for a
    /// qualifying departure, spawns the grace timer before returning.
    pub fn handle_event(&self, event: &VoiceEvent) {
        // Monitoring disabled entirely.
        if self.target_user_id == 0 {
            return;
        }
        if event.user_id != self.target_user_id {
            return;
        }
        if !self.window.is_active_now() {
            return;
        }
        // No originating channel to watch (pure join, or no voice change).
        let Some(origin) = event.previous_channel else {
            return;
        };
        // In-channel update such as a mute toggle.
        if event.new_channel == Some(origin) {
            return;
        }

        let key = WatchKey { group_id: event.group_id, channel_id: origin };
        let generation = self.registry.start_or_replace(key, |generation| {
            let watchdog = self.clone();
            tokio::spawn(async move { watchdog.watch(key, generation).await })
        });
        tracing::debug!(
            group = key.group_id,
            channel = key.channel_id,
            generation,
            grace_secs = self.grace.as_secs(),
            "departure accepted, watch timer started"
        );
    }

    /// The grace timer task. Sleeps, claims its registry entry, then runs
    /// the re-check-and-sweep sequence to completion.
    async fn watch(self, key: WatchKey, generation: u64) {
        tokio::time::sleep(self.grace).await;

        // Take ownership of the entry. Failure means a newer departure
        // superseded this watch while it slept. After a successful claim
        // the registry no longer holds this task's handle, so only the
        // re-check itself can abort from here on.
        if !self.registry.claim(key, generation) {
            return;
        }

        match self.recheck_and_sweep(key).await {
            WatchOutcome::Swept(result) => {
                tracing::info!(
                    group = key.group_id,
                    channel = key.channel_id,
                    removed = result.removed,
                    report_delivered = result.report_delivered,
                    "sweep executed"
                );
            }
            outcome => {
                tracing::debug!(
                    group = key.group_id,
                    channel = key.channel_id,
                    ?outcome,
                    "watch fired without sweeping"
                );
            }
        }
    }

    /// The fire-time re-check, in order: group exists, channel exists and
    /// is voice-capable, participant has not returned, window still holds.
    async fn recheck_and_sweep(&self, key: WatchKey) -> WatchOutcome {
        let Some(group) = self.platform.resolve_group(key.group_id).await else {
            return WatchOutcome::GroupGone;
        };
        let Some(channel) = self.platform.channel_info(key.group_id, key.channel_id).await else {
            return WatchOutcome::ChannelGone;
        };
        if !channel.kind.is_voice() {
            return WatchOutcome::ChannelGone;
        }
        let current =
            self.platform.current_voice_channel(key.group_id, self.target_user_id).await;
        if current == Some(key.channel_id) {
            return WatchOutcome::HostReturned;
        }
        if !self.window.is_active_now() {
            return WatchOutcome::WindowLapsed;
        }
        WatchOutcome::Swept(self.sweeper.sweep(&group, &channel).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;
    use chrono_tz::Tz;
    use vigil_core::mock::MockPlatform;
    use vigil_core::types::ChannelKind;

    const GROUP: u64 = 1;
    const HOST: u64 = 7;
    const VOICE_A: u64 = 100;
    const VOICE_B: u64 = 101;
    const REPORT: u64 = 200;

    fn always_active() -> ActiveWindow {
        ActiveWindow::new(0, 0, Tz::UTC)
    }

    /// A window that is closed at the current wall-clock hour.
    fn closed_now() -> ActiveWindow {
        let hour = chrono::Utc::now().hour();
        ActiveWindow::new((hour + 2) % 24, (hour + 3) % 24, Tz::UTC)
    }

    fn seeded() -> Arc<MockPlatform> {
        let mock = Arc::new(MockPlatform::new());
        mock.add_group(GROUP, "den");
        mock.add_channel(GROUP, VOICE_A, "night-voice", ChannelKind::Voice);
        mock.add_channel(GROUP, VOICE_B, "day-voice", ChannelKind::Voice);
        mock.add_channel(GROUP, REPORT, "voice-log", ChannelKind::Text);
        for user in [11, 12, 13] {
            mock.join_voice(GROUP, user, VOICE_A);
        }
        mock.join_voice(GROUP, 99, VOICE_A);
        mock.mark_bot(99);
        mock
    }

    fn watchdog(mock: &Arc<MockPlatform>, grace: Duration, window: ActiveWindow) -> VoiceWatchdog {
        VoiceWatchdog::with_parts(mock.clone(), HOST, grace, window, "voice-log")
    }

    fn departure(previous: Option<u64>, new: Option<u64>) -> VoiceEvent {
        VoiceEvent { group_id: GROUP, user_id: HOST, previous_channel: previous, new_channel: new }
    }

    #[tokio::test]
    async fn test_departure_sweeps_after_grace() {
        let mock = seeded();
        let wd = watchdog(&mock, Duration::from_millis(50), always_active());

        wd.handle_event(&departure(Some(VOICE_A), None));
        assert_eq!(wd.pending_watches(), 1);

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(mock.disconnected(), vec![11, 12, 13], "bots stay, everyone else goes");
        assert_eq!(mock.posts().len(), 1);
        assert!(mock.posts()[0].1.contains("**3**"));
        assert_eq!(wd.pending_watches(), 0);
    }

    #[tokio::test]
    async fn test_host_return_prevents_sweep() {
        let mock = seeded();
        let wd = watchdog(&mock, Duration::from_millis(80), always_active());

        wd.handle_event(&departure(Some(VOICE_A), None));
        // Host rejoins the watched channel during the grace period. The
        // re-arrival is not a cancelling event; the fire-time re-check
        // resolves it.
        mock.join_voice(GROUP, HOST, VOICE_A);
        assert_eq!(wd.pending_watches(), 1);

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert!(mock.disconnected().is_empty());
        assert!(mock.posts().is_empty());
        assert_eq!(wd.pending_watches(), 0);
    }

    #[tokio::test]
    async fn test_second_departure_restarts_timer() {
        let mock = seeded();
        let wd = watchdog(&mock, Duration::from_millis(300), always_active());

        wd.handle_event(&departure(Some(VOICE_A), None));
        tokio::time::sleep(Duration::from_millis(100)).await;
        // Host came back to A and left again: supersedes the first timer.
        wd.handle_event(&departure(Some(VOICE_A), None));
        assert_eq!(wd.pending_watches(), 1, "replace, not stack");

        // The first timer would have fired by now; the replacement has not.
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(mock.disconnected().is_empty(), "superseded timer must not sweep");

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(mock.posts().len(), 1, "exactly one sweep from the second timer");
        assert_eq!(mock.disconnected().len(), 3);
    }

    #[tokio::test]
    async fn test_move_watches_origin_and_keys_are_independent() {
        let mock = seeded();
        mock.join_voice(GROUP, 21, VOICE_B);
        let wd = watchdog(&mock, Duration::from_millis(60), always_active());

        // Host moves A -> B: watch on A.
        wd.handle_event(&departure(Some(VOICE_A), Some(VOICE_B)));
        // Then leaves B entirely: watch on B; A's watch is untouched.
        wd.handle_event(&departure(Some(VOICE_B), None));
        assert_eq!(wd.pending_watches(), 2);

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(wd.pending_watches(), 0);
        // Both channels swept: A's three occupants and B's one.
        assert_eq!(mock.disconnected().len(), 4);
    }

    #[tokio::test]
    async fn test_ignored_events_start_no_watch() {
        let mock = seeded();
        let wd = watchdog(&mock, Duration::from_millis(30), always_active());

        // Someone else's movement.
        wd.handle_event(&VoiceEvent {
            group_id: GROUP,
            user_id: 12,
            previous_channel: Some(VOICE_A),
            new_channel: None,
        });
        // In-channel update (mute toggle).
        wd.handle_event(&departure(Some(VOICE_A), Some(VOICE_A)));
        // Pure join: no originating channel.
        wd.handle_event(&departure(None, Some(VOICE_A)));
        // No voice change at all.
        wd.handle_event(&departure(None, None));

        assert_eq!(wd.pending_watches(), 0);
    }

    #[tokio::test]
    async fn test_disabled_monitoring_is_inert() {
        let mock = seeded();
        let wd = VoiceWatchdog::with_parts(
            mock.clone(),
            0,
            Duration::from_millis(30),
            always_active(),
            "voice-log",
        );
        wd.handle_event(&VoiceEvent {
            group_id: GROUP,
            user_id: 0,
            previous_channel: Some(VOICE_A),
            new_channel: None,
        });
        assert_eq!(wd.pending_watches(), 0);
    }

    #[tokio::test]
    async fn test_outside_window_departure_ignored() {
        let mock = seeded();
        let wd = watchdog(&mock, Duration::from_millis(30), closed_now());
        wd.handle_event(&departure(Some(VOICE_A), None));
        assert_eq!(wd.pending_watches(), 0);
    }

    #[tokio::test]
    async fn test_window_lapse_during_grace_prevents_sweep() {
        let mock = seeded();
        // Window already closed at fire time; drive the timer directly to
        // model a watch accepted while the window was still open.
        let wd = watchdog(&mock, Duration::from_millis(40), closed_now());
        let key = WatchKey { group_id: GROUP, channel_id: VOICE_A };
        wd.registry.start_or_replace(key, |generation| {
            let task = wd.clone();
            tokio::spawn(async move { task.watch(key, generation).await })
        });

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(mock.disconnected().is_empty());
        assert!(mock.posts().is_empty());
        assert_eq!(wd.pending_watches(), 0, "entry cleared even without a sweep");
    }

    #[tokio::test]
    async fn test_group_vanishing_aborts_silently() {
        let mock = seeded();
        let wd = watchdog(&mock, Duration::from_millis(50), always_active());
        wd.handle_event(&departure(Some(VOICE_A), None));
        mock.remove_group(GROUP);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(mock.disconnected().is_empty());
        assert_eq!(wd.pending_watches(), 0);
    }

    #[tokio::test]
    async fn test_channel_vanishing_aborts_silently() {
        let mock = seeded();
        let wd = watchdog(&mock, Duration::from_millis(50), always_active());
        wd.handle_event(&departure(Some(VOICE_A), None));
        mock.remove_channel(GROUP, VOICE_A);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(mock.disconnected().is_empty());
    }

    #[tokio::test]
    async fn test_non_voice_channel_is_never_swept() {
        let mock = seeded();
        let wd = watchdog(&mock, Duration::from_millis(50), always_active());
        // The watched id now resolves to a text channel.
        mock.remove_channel(GROUP, VOICE_A);
        mock.add_channel(GROUP, VOICE_A, "renamed", ChannelKind::Text);
        wd.handle_event(&departure(Some(VOICE_A), None));

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(mock.disconnected().is_empty());
    }

    #[tokio::test]
    async fn test_host_in_other_channel_still_sweeps() {
        let mock = seeded();
        let wd = watchdog(&mock, Duration::from_millis(50), always_active());
        wd.handle_event(&departure(Some(VOICE_A), Some(VOICE_B)));
        mock.join_voice(GROUP, HOST, VOICE_B);

        tokio::time::sleep(Duration::from_millis(200)).await;
        // Host is in B, not back in A: A still gets swept.
        assert_eq!(mock.disconnected(), vec![11, 12, 13]);
    }
}
