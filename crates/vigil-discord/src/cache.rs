//! Gateway-fed voice-state cache.
//!
//! Discord exposes who-is-in-which-voice-channel only as a stream of
//! VOICE_STATE_UPDATE events, so the adapter keeps the latest state here
//! and answers directory queries from it.

use std::collections::HashMap;
use std::sync::Mutex;

use vigil_core::types::{ChannelId, GroupId, Occupant, UserId};

#[derive(Debug, Clone, Copy)]
struct VoiceSlot {
    channel_id: ChannelId,
    is_bot: bool,
}

/// group -> user -> occupied voice channel.
#[derive(Default)]
pub struct VoiceStateCache {
    inner: Mutex<HashMap<GroupId, HashMap<UserId, VoiceSlot>>>,
}

impl VoiceStateCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<GroupId, HashMap<UserId, VoiceSlot>>> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Record a voice-state update and return the channel the user was in
    /// before it, if any. `None` channel means the user left voice.
    pub fn apply(
        &self,
        group_id: GroupId,
        user_id: UserId,
        channel_id: Option<ChannelId>,
        is_bot: bool,
    ) -> Option<ChannelId> {
        let mut state = self.lock();
        let group = state.entry(group_id).or_default();
        let previous = match channel_id {
            Some(channel_id) => group.insert(user_id, VoiceSlot { channel_id, is_bot }),
            None => group.remove(&user_id),
        };
        previous.map(|slot| slot.channel_id)
    }

    /// The voice channel a user currently occupies.
    pub fn current(&self, group_id: GroupId, user_id: UserId) -> Option<ChannelId> {
        self.lock().get(&group_id)?.get(&user_id).map(|slot| slot.channel_id)
    }

    /// Everyone currently in a voice channel.
    pub fn occupants(&self, group_id: GroupId, channel_id: ChannelId) -> Vec<Occupant> {
        let state = self.lock();
        let Some(group) = state.get(&group_id) else {
            return Vec::new();
        };
        let mut occupants: Vec<_> = group
            .iter()
            .filter(|(_, slot)| slot.channel_id == channel_id)
            .map(|(user_id, slot)| Occupant { user_id: *user_id, is_bot: slot.is_bot })
            .collect();
        occupants.sort_by_key(|o| o.user_id);
        occupants
    }
}
