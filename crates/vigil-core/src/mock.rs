//! Mock chat platform for testing.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::traits::{ChatPlatform, PlatformCallError};
use crate::types::{
    ChannelId, ChannelInfo, ChannelKind, GroupId, GroupInfo, MessageId, Occupant, UserId,
};

#[derive(Default)]
struct MockState {
    groups: HashMap<GroupId, GroupInfo>,
    channels: HashMap<(GroupId, ChannelId), ChannelInfo>,
    /// Who is in which voice channel.
    voice: HashMap<(GroupId, UserId), ChannelId>,
    bots: HashSet<UserId>,

    // Failure knobs.
    forbidden_disconnects: HashSet<UserId>,
    failing_disconnects: HashSet<UserId>,
    fail_posts: bool,
    forbidden_deletes: bool,
    fail_dms: bool,

    // Recorded side effects.
    disconnected: Vec<UserId>,
    posts: Vec<(ChannelId, String)>,
    deleted: Vec<(ChannelId, MessageId)>,
    denied: Vec<(GroupId, ChannelId)>,
    dms: Vec<(UserId, String)>,
}

/// In-memory `ChatPlatform` for unit tests: seed directory/voice state,
/// flip failure knobs, then inspect the recorded side effects.
#[derive(Default)]
pub struct MockPlatform {
    state: Mutex<MockState>,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn add_group(&self, id: GroupId, name: &str) {
        self.lock().groups.insert(id, GroupInfo { id, name: name.into() });
    }

    pub fn remove_group(&self, id: GroupId) {
        self.lock().groups.remove(&id);
    }

    pub fn add_channel(&self, group_id: GroupId, id: ChannelId, name: &str, kind: ChannelKind) {
        self.lock()
            .channels
            .insert((group_id, id), ChannelInfo { id, name: name.into(), kind });
    }

    pub fn remove_channel(&self, group_id: GroupId, id: ChannelId) {
        self.lock().channels.remove(&(group_id, id));
    }

    /// Put a user into a voice channel.
    pub fn join_voice(&self, group_id: GroupId, user_id: UserId, channel_id: ChannelId) {
        self.lock().voice.insert((group_id, user_id), channel_id);
    }

    pub fn leave_voice(&self, group_id: GroupId, user_id: UserId) {
        self.lock().voice.remove(&(group_id, user_id));
    }

    pub fn mark_bot(&self, user_id: UserId) {
        self.lock().bots.insert(user_id);
    }

    pub fn set_disconnect_forbidden(&self, user_id: UserId) {
        self.lock().forbidden_disconnects.insert(user_id);
    }

    pub fn set_disconnect_failing(&self, user_id: UserId) {
        self.lock().failing_disconnects.insert(user_id);
    }

    pub fn set_fail_posts(&self, fail: bool) {
        self.lock().fail_posts = fail;
    }

    pub fn set_forbidden_deletes(&self, forbidden: bool) {
        self.lock().forbidden_deletes = forbidden;
    }

    pub fn set_fail_dms(&self, fail: bool) {
        self.lock().fail_dms = fail;
    }

    pub fn disconnected(&self) -> Vec<UserId> {
        self.lock().disconnected.clone()
    }

    pub fn posts(&self) -> Vec<(ChannelId, String)> {
        self.lock().posts.clone()
    }

    pub fn deleted(&self) -> Vec<(ChannelId, MessageId)> {
        self.lock().deleted.clone()
    }

    pub fn denied(&self) -> Vec<(GroupId, ChannelId)> {
        self.lock().denied.clone()
    }

    pub fn dms(&self) -> Vec<(UserId, String)> {
        self.lock().dms.clone()
    }
}

#[async_trait]
impl ChatPlatform for MockPlatform {
    async fn list_groups(&self) -> Vec<GroupInfo> {
        let mut groups: Vec<_> = self.lock().groups.values().cloned().collect();
        groups.sort_by_key(|g| g.id);
        groups
    }

    async fn resolve_group(&self, group_id: GroupId) -> Option<GroupInfo> {
        self.lock().groups.get(&group_id).cloned()
    }

    async fn channel_info(&self, group_id: GroupId, channel_id: ChannelId) -> Option<ChannelInfo> {
        self.lock().channels.get(&(group_id, channel_id)).cloned()
    }

    async fn list_channels(&self, group_id: GroupId) -> Vec<ChannelInfo> {
        let state = self.lock();
        let mut channels: Vec<_> = state
            .channels
            .iter()
            .filter(|((g, _), _)| *g == group_id)
            .map(|(_, c)| c.clone())
            .collect();
        channels.sort_by_key(|c| c.id);
        channels
    }

    async fn find_text_channel(&self, group_id: GroupId, name: &str) -> Option<ChannelId> {
        self.lock()
            .channels
            .iter()
            .find(|((g, _), c)| *g == group_id && c.kind.is_textual() && c.name == name)
            .map(|((_, id), _)| *id)
    }

    async fn current_voice_channel(
        &self,
        group_id: GroupId,
        user_id: UserId,
    ) -> Option<ChannelId> {
        self.lock().voice.get(&(group_id, user_id)).copied()
    }

    async fn voice_occupants(&self, group_id: GroupId, channel_id: ChannelId) -> Vec<Occupant> {
        let state = self.lock();
        let mut occupants: Vec<_> = state
            .voice
            .iter()
            .filter(|((g, _), c)| *g == group_id && **c == channel_id)
            .map(|((_, user_id), _)| Occupant {
                user_id: *user_id,
                is_bot: state.bots.contains(user_id),
            })
            .collect();
        occupants.sort_by_key(|o| o.user_id);
        occupants
    }

    async fn disconnect_occupant(
        &self,
        group_id: GroupId,
        user_id: UserId,
        _reason: &str,
    ) -> Result<(), PlatformCallError> {
        let mut state = self.lock();
        if state.forbidden_disconnects.contains(&user_id) {
            return Err(PlatformCallError::Forbidden);
        }
        if state.failing_disconnects.contains(&user_id) {
            return Err(PlatformCallError::Failed("simulated failure".into()));
        }
        state.voice.remove(&(group_id, user_id));
        state.disconnected.push(user_id);
        Ok(())
    }

    async fn post_message(
        &self,
        channel_id: ChannelId,
        text: &str,
    ) -> Result<(), PlatformCallError> {
        let mut state = self.lock();
        if state.fail_posts {
            return Err(PlatformCallError::Failed("simulated post failure".into()));
        }
        state.posts.push((channel_id, text.to_string()));
        Ok(())
    }

    async fn delete_message(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
    ) -> Result<(), PlatformCallError> {
        let mut state = self.lock();
        if state.forbidden_deletes {
            return Err(PlatformCallError::Forbidden);
        }
        state.deleted.push((channel_id, message_id));
        Ok(())
    }

    async fn deny_send_permission(
        &self,
        group_id: GroupId,
        channel_id: ChannelId,
        _reason: &str,
    ) -> Result<(), PlatformCallError> {
        self.lock().denied.push((group_id, channel_id));
        Ok(())
    }

    async fn dm_user(&self, user_id: UserId, text: &str) -> Result<(), PlatformCallError> {
        let mut state = self.lock();
        if state.fail_dms {
            return Err(PlatformCallError::Failed("simulated dm failure".into()));
        }
        state.dms.push((user_id, text.to_string()));
        Ok(())
    }
}
